/**
 * snapshot.rs
 * Immutable allocator options (YAML format)
 *
 * Format:
 * ```yaml
 * seed: 42
 * excludedPorts: [8080, 9090]
 * excludeWellKnown: true
 * scanInUse: true
 * excludeEphemeral: true
 * scanOsExcluded: true
 * defaultMinPort: 1000
 * defaultMaxPort: 65535
 * ```
 *
 * The allocator only ever reads a snapshot; live reconfiguration hands
 * it a fresh one.
 */

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{PortClaimError, Result};

/// Default lower bound for unranged random allocation
pub const DEFAULT_MIN_PORT: u16 = 1000;

/// Default upper bound for unranged random allocation
pub const DEFAULT_MAX_PORT: u16 = 65535;

/// Allocator configuration snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PortClaimConfig {
    /// Seed for deterministic allocation order (OS entropy when absent)
    pub seed: Option<u64>,

    /// Explicitly excluded ports; raw values, validated externally
    pub excluded_ports: Vec<u32>,

    /// Mark the static well-known port table
    pub exclude_well_known: bool,

    /// Scan active OS connections/listeners at initialization
    pub scan_in_use: bool,

    /// Mark the OS ephemeral port range
    pub exclude_ephemeral: bool,

    /// Mark OS administered excluded ranges
    pub scan_os_excluded: bool,

    /// Default minimum port for unranged allocation
    pub default_min_port: u16,

    /// Default maximum port for unranged allocation
    pub default_max_port: u16,
}

impl Default for PortClaimConfig {
    fn default() -> Self {
        PortClaimConfig {
            seed: None,
            excluded_ports: Vec::new(),
            exclude_well_known: true,
            scan_in_use: true,
            exclude_ephemeral: true,
            scan_os_excluded: true,
            default_min_port: DEFAULT_MIN_PORT,
            default_max_port: DEFAULT_MAX_PORT,
        }
    }
}

impl PortClaimConfig {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML config file
    ///
    /// # Example
    /// ```ignore
    /// let config = PortClaimConfig::load(".portclaim.yaml")?;
    /// assert!(config.exclude_well_known);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: PortClaimConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate snapshot invariants
    ///
    /// # Errors
    /// Returns `ValidationError` when min > max, bounds leave 1-65535,
    /// or an excluded port lies outside 1-65535.
    pub fn validate(&self) -> Result<()> {
        if self.default_min_port < 1 {
            return Err(PortClaimError::ValidationError(
                "defaultMinPort must be at least 1".to_string(),
            ));
        }
        if self.default_min_port > self.default_max_port {
            return Err(PortClaimError::ValidationError(format!(
                "defaultMinPort {} > defaultMaxPort {}",
                self.default_min_port, self.default_max_port
            )));
        }
        for &port in &self.excluded_ports {
            if port < 1 || port > u16::MAX as u32 {
                return Err(PortClaimError::ValidationError(format!(
                    "excluded port {} outside 1-65535",
                    port
                )));
            }
        }
        Ok(())
    }
}
