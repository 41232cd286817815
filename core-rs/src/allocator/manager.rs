/**
 * manager.rs
 * Port allocator over the shared bit store
 *
 * Allocation strategy:
 * - Lazy one-time initialization merges the enabled exclusion sources
 *   into the shared bit store: well-known ports, configured exclusions,
 *   OS in-use scan, OS ephemeral and excluded ranges. OS queries run
 *   outside the lock; only the merge holds it.
 * - get_random_free_port: rejection sampling over [min,max], guarded
 *   by a full-range pre-check so the retry loop always terminates.
 * - try_get_random_free_port: enumerate free ports, pick one uniformly;
 *   exhaustion is a normal return value, not an error.
 * - Selection and marking happen in the same critical section, so two
 *   concurrent callers can never claim the same port.
 *
 * Every handle carries its own seeded random source; a fixed seed
 * yields a reproducible allocation sequence against unperturbed state.
 */

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::bitmap::PORT_SPACE_SIZE;
use crate::config::PortClaimConfig;
use crate::errors::{PortClaimError, Result};
use crate::exclusions::{mark_explicit, mark_well_known};
use crate::probe;

use super::shared_state::{PortStateInner, SharedPortState};

/// Minimum requested port that avoids the privileged/system range
pub const RECOMMENDED_MIN_PORT: u16 = 1024;

/// Exclusions gathered from the OS probes, outside the shared lock
#[derive(Default)]
struct ProbedExclusions {
    in_use: Option<HashSet<u16>>,
    ephemeral: Option<(u16, u16)>,
    excluded: Vec<(u16, u16)>,
}

/// Port allocator handle
///
/// Cheap to construct; all handles built over the same
/// `SharedPortState` observe and mutate the same allocation state.
pub struct PortAllocator {
    state: Arc<SharedPortState>,
    config: Mutex<PortClaimConfig>,
    rng: Mutex<StdRng>,
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl PortAllocator {
    /// Create an allocator over the process-wide state with defaults
    pub fn new() -> Self {
        Self::with_config(PortClaimConfig::default())
    }

    /// Create an allocator over the process-wide state
    ///
    /// # Arguments
    /// * `config` - Options snapshot (seed, default range, source flags)
    pub fn with_config(config: PortClaimConfig) -> Self {
        Self::with_state(SharedPortState::global(), config)
    }

    /// Create an allocator over an injected state instance
    ///
    /// Used by tests and embedders that want allocation state isolated
    /// from the process-wide instance.
    pub fn with_state(state: Arc<SharedPortState>, config: PortClaimConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        PortAllocator {
            state,
            config: Mutex::new(config),
            rng: Mutex::new(rng),
        }
    }

    /// Mark a port used
    ///
    /// # Arguments
    /// * `port` - Port number, 1-65535
    ///
    /// # Errors
    /// `InvalidPort` outside 1-65535; `PortConflict` if the port is
    /// already unavailable.
    pub fn mark_used(&self, port: u32) -> Result<()> {
        let port = validate_port(port)?;
        self.ensure_initialized();

        let mut inner = self.state.lock();
        if inner.bitmap.test(port) {
            tracing::debug!(port, "port already allocated");
            return Err(PortClaimError::PortConflict(port as u32));
        }
        inner.bitmap.set(port);
        tracing::debug!(port, "port marked used");
        Ok(())
    }

    /// Mark a port free
    ///
    /// # Arguments
    /// * `port` - Port number, 0-65535 (boundary index 0 tolerated)
    ///
    /// # Returns
    /// true if the port was unavailable and is now cleared, false if
    /// it was already free.
    ///
    /// # Errors
    /// `InvalidPort` outside 0-65535.
    pub fn mark_free(&self, port: u32) -> Result<bool> {
        let port = validate_index(port)?;
        self.ensure_initialized();

        let mut inner = self.state.lock();
        if inner.bitmap.test(port) {
            inner.bitmap.clear(port);
            tracing::debug!(port, "port marked free");
            Ok(true)
        } else {
            tracing::debug!(port, "port already free");
            Ok(false)
        }
    }

    /// Mark a port used unless it already is
    ///
    /// # Arguments
    /// * `port` - Port number, 1-65535
    ///
    /// # Returns
    /// true if newly marked, false if it was already unavailable.
    /// Conflict is never an error on this path.
    ///
    /// # Errors
    /// `InvalidPort` outside 1-65535.
    pub fn try_mark_used(&self, port: u32) -> Result<bool> {
        let port = validate_port(port)?;
        self.ensure_initialized();

        let mut inner = self.state.lock();
        if inner.bitmap.test(port) {
            tracing::debug!(port, "port already allocated");
            Ok(false)
        } else {
            inner.bitmap.set(port);
            tracing::debug!(port, "port marked used");
            Ok(true)
        }
    }

    /// Allocate a random free port within the configured default range
    ///
    /// # Errors
    /// `RangeExhausted` when every port in the default range is
    /// unavailable.
    pub fn get_random_free_port(&self) -> Result<u16> {
        let (min, max) = {
            let config = self.config.lock().unwrap();
            (config.default_min_port, config.default_max_port)
        };
        self.get_random_free_port_in_range(min as u32, max as u32)
    }

    /// Allocate a random free port within [min,max]
    ///
    /// Draws uniformly and retries until a free port is found; a cheap
    /// full-range pre-check guarantees the retry loop terminates. The
    /// winning port is marked in the same critical section.
    ///
    /// # Arguments
    /// * `min` - Lower bound, 0-65535
    /// * `max` - Upper bound, 0-65535, max >= min
    ///
    /// # Errors
    /// `InvalidRange` on bad bounds; `RangeExhausted` when the range
    /// is fully unavailable.
    pub fn get_random_free_port_in_range(&self, min: u32, max: u32) -> Result<u16> {
        let (min, max) = validate_range(min, max)?;
        if min < RECOMMENDED_MIN_PORT {
            tracing::warn!(
                min,
                "requested minimum below recommended {}",
                RECOMMENDED_MIN_PORT
            );
        }
        self.ensure_initialized();

        let mut rng = self.rng.lock().unwrap();
        let mut inner = self.state.lock();

        if inner.bitmap.all_set(min, max) {
            tracing::debug!(min, max, "no free port in range");
            return Err(PortClaimError::RangeExhausted { min, max });
        }

        let port = loop {
            let candidate = rng.gen_range(min..=max);
            if !inner.bitmap.test(candidate) {
                break candidate;
            }
        };
        inner.bitmap.set(port);
        tracing::debug!(port, min, max, "allocated random free port");
        Ok(port)
    }

    /// Allocate a random free port within [min,max], exhaustion as a
    /// normal return
    ///
    /// Enumerates the free ports in range and picks one uniformly, so
    /// "none left" is directly observable instead of surfacing as an
    /// error.
    ///
    /// # Returns
    /// `Some(port)` now marked unavailable, `None` when the range has
    /// no free port.
    ///
    /// # Errors
    /// `InvalidRange` on bad bounds only.
    pub fn try_get_random_free_port(&self, min: u32, max: u32) -> Result<Option<u16>> {
        let (min, max) = validate_range(min, max)?;
        self.ensure_initialized();

        let mut rng = self.rng.lock().unwrap();
        let mut inner = self.state.lock();

        let free: Vec<u16> = (min..=max).filter(|&p| !inner.bitmap.test(p)).collect();
        if free.is_empty() {
            tracing::debug!(min, max, "no free port in range");
            return Ok(None);
        }

        let port = free[rng.gen_range(0..free.len())];
        inner.bitmap.set(port);
        tracing::debug!(port, min, max, "allocated random free port");
        Ok(Some(port))
    }

    /// Count of free ports across the entire 65,536 space
    pub fn get_free_port_count(&self) -> usize {
        self.ensure_initialized();
        let inner = self.state.lock();
        PORT_SPACE_SIZE - inner.bitmap.count_set()
    }

    /// Count of free ports within [min,max]
    ///
    /// # Errors
    /// `InvalidRange` on bad bounds.
    pub fn get_free_port_count_in_range(&self, min: u32, max: u32) -> Result<usize> {
        let (min, max) = validate_range(min, max)?;
        self.ensure_initialized();

        let inner = self.state.lock();
        let span = (max - min) as usize + 1;
        Ok(span - inner.bitmap.count_set_in(min, max))
    }

    /// Every currently free port within [min,max], ascending
    ///
    /// # Errors
    /// `InvalidRange` on bad bounds.
    pub fn get_free_ports(&self, min: u32, max: u32) -> Result<Vec<u16>> {
        let (min, max) = validate_range(min, max)?;
        self.ensure_initialized();

        let inner = self.state.lock();
        Ok((min..=max).filter(|&p| !inner.bitmap.test(p)).collect())
    }

    /// Re-run the OS in-use scan and merge the result
    ///
    /// # Returns
    /// Whether the OS scan succeeded. Discovered ports are merged into
    /// the shared store as a side effect regardless of prior state.
    pub fn try_scan_in_use_ports(&self) -> bool {
        self.ensure_initialized();

        match probe::scan_in_use_ports() {
            Ok(ports) => {
                let count = ports.len();
                let mut inner = self.state.lock();
                for port in ports {
                    inner.bitmap.set(port);
                }
                tracing::info!(count, "merged in-use port scan");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "in-use port scan failed");
                false
            }
        }
    }

    /// Fold in an updated configuration snapshot
    ///
    /// Additive only: sources flipped on are run and merged now,
    /// newly added explicit exclusions are marked, a new seed resets
    /// the random source. Sources flipped off free nothing; exclusions
    /// are sticky for the lifetime of the shared store.
    pub fn apply_config(&self, new: PortClaimConfig) {
        self.ensure_initialized();

        let old = {
            let mut config = self.config.lock().unwrap();
            std::mem::replace(&mut *config, new.clone())
        };

        // OS query work happens before the shared lock is taken
        let mut probed = ProbedExclusions::default();
        if new.scan_in_use && !old.scan_in_use {
            probed.in_use = run_in_use_probe();
        }
        if new.exclude_ephemeral && !old.exclude_ephemeral {
            probed.ephemeral = run_ephemeral_probe();
        }
        if new.scan_os_excluded && !old.scan_os_excluded {
            probed.excluded = run_excluded_probe();
        }

        let added_ports: Vec<u32> = new
            .excluded_ports
            .iter()
            .filter(|p| !old.excluded_ports.contains(p))
            .copied()
            .collect();

        {
            let mut inner = self.state.lock();
            if new.exclude_well_known && !old.exclude_well_known {
                mark_well_known(&mut inner.bitmap);
            }
            if !added_ports.is_empty() {
                mark_explicit(&mut inner.bitmap, &added_ports);
            }
            merge_probed(&mut inner, &probed);
        }

        if let Some(seed) = new.seed {
            if old.seed != Some(seed) {
                *self.rng.lock().unwrap() = StdRng::seed_from_u64(seed);
                tracing::info!(seed, "random source reseeded");
            }
        }
    }

    /// Current configuration snapshot
    pub fn config(&self) -> PortClaimConfig {
        self.config.lock().unwrap().clone()
    }

    /// Merge the enabled exclusion sources on first access
    ///
    /// Double-checked: the flag is read under the lock, the OS queries
    /// run outside it, and the merge re-checks before committing so a
    /// racing handle initializes at most once.
    fn ensure_initialized(&self) {
        {
            let inner = self.state.lock();
            if inner.initialized {
                return;
            }
        }

        let config = self.config.lock().unwrap().clone();

        let mut probed = ProbedExclusions::default();
        if config.scan_in_use {
            probed.in_use = run_in_use_probe();
        }
        if config.exclude_ephemeral {
            probed.ephemeral = run_ephemeral_probe();
        }
        if config.scan_os_excluded {
            probed.excluded = run_excluded_probe();
        }

        let mut inner = self.state.lock();
        if inner.initialized {
            return; // another handle won the race
        }

        if config.exclude_well_known {
            mark_well_known(&mut inner.bitmap);
        }
        if !config.excluded_ports.is_empty() {
            mark_explicit(&mut inner.bitmap, &config.excluded_ports);
        }
        merge_probed(&mut inner, &probed);

        inner.initialized = true;
        tracing::info!(
            unavailable = inner.bitmap.count_set(),
            "port allocation state initialized"
        );
    }
}

/// Validate a port argument in the allocatable domain 1-65535
fn validate_port(port: u32) -> Result<u16> {
    if port < 1 || port > u16::MAX as u32 {
        return Err(PortClaimError::InvalidPort(format!(
            "port {} outside 1-65535",
            port
        )));
    }
    Ok(port as u16)
}

/// Validate a boundary-tolerant index argument, 0-65535
fn validate_index(port: u32) -> Result<u16> {
    if port > u16::MAX as u32 {
        return Err(PortClaimError::InvalidPort(format!(
            "port {} outside 0-65535",
            port
        )));
    }
    Ok(port as u16)
}

/// Validate a [min,max] range, both bounds in 0-65535
fn validate_range(min: u32, max: u32) -> Result<(u16, u16)> {
    if min > u16::MAX as u32 {
        return Err(PortClaimError::InvalidRange(format!(
            "min {} outside 0-65535",
            min
        )));
    }
    if max > u16::MAX as u32 {
        return Err(PortClaimError::InvalidRange(format!(
            "max {} outside 0-65535",
            max
        )));
    }
    if max < min {
        return Err(PortClaimError::InvalidRange(format!(
            "max {} < min {}",
            max, min
        )));
    }
    Ok((min as u16, max as u16))
}

fn run_in_use_probe() -> Option<HashSet<u16>> {
    match probe::scan_in_use_ports() {
        Ok(ports) => Some(ports),
        Err(e) => {
            tracing::warn!(error = %e, "in-use port scan failed");
            None
        }
    }
}

fn run_ephemeral_probe() -> Option<(u16, u16)> {
    match probe::scan_ephemeral_range() {
        Ok(range) => range,
        Err(e) => {
            tracing::warn!(error = %e, "ephemeral range discovery failed");
            None
        }
    }
}

fn run_excluded_probe() -> Vec<(u16, u16)> {
    match probe::scan_excluded_ranges() {
        Ok(ranges) => ranges,
        Err(e) => {
            tracing::warn!(error = %e, "excluded range discovery failed");
            Vec::new()
        }
    }
}

/// Merge probed OS exclusions into the guarded state
fn merge_probed(inner: &mut PortStateInner, probed: &ProbedExclusions) {
    if let Some(ports) = &probed.in_use {
        for &port in ports {
            inner.bitmap.set(port);
        }
    }
    if let Some((start, end)) = probed.ephemeral {
        for port in start..=end {
            inner.bitmap.set(port);
        }
        tracing::debug!(start, end, "marked ephemeral range");
    }
    for &(start, end) in &probed.excluded {
        for port in start..=end {
            inner.bitmap.set(port);
        }
        tracing::debug!(start, end, "marked OS excluded range");
    }
}
