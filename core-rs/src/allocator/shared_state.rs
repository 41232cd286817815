/**
 * shared_state.rs
 * Process-wide allocation state
 *
 * Allocation state is global by design: no two callers in one process
 * may receive the same port, no matter how many allocator handles
 * exist. The bit store therefore lives in one shared instance guarded
 * by one lock, created on first access and alive until process exit.
 *
 * The sharing is explicit: handles either use the process-wide
 * instance (`SharedPortState::global()`) or are injected with their
 * own (`SharedPortState::new()`, used by tests and embedders that
 * want isolation).
 */

use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::bitmap::PortBitmap;

static SHARED_STATE_INSTANCE: OnceCell<Arc<SharedPortState>> = OnceCell::new();

/// State guarded by the shared lock
pub struct PortStateInner {
    /// One bit per port, 1 = unavailable
    pub bitmap: PortBitmap,

    /// Whether the exclusion sources have been merged in
    pub initialized: bool,
}

/// Shared bit store plus its lock
pub struct SharedPortState {
    inner: Mutex<PortStateInner>,
}

impl SharedPortState {
    /// Create a fresh, uninitialized state instance
    pub fn new() -> Arc<Self> {
        Arc::new(SharedPortState {
            inner: Mutex::new(PortStateInner {
                bitmap: PortBitmap::new(),
                initialized: false,
            }),
        })
    }

    /// The process-wide instance, created on first access
    pub fn global() -> Arc<Self> {
        SHARED_STATE_INSTANCE.get_or_init(Self::new).clone()
    }

    /// Acquire the shared lock
    pub fn lock(&self) -> MutexGuard<'_, PortStateInner> {
        self.inner.lock().unwrap()
    }
}
