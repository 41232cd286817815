/**
 * config module
 * Allocator configuration snapshot and live-reload watcher
 */

pub mod snapshot;
pub mod watcher;

pub use snapshot::{PortClaimConfig, DEFAULT_MAX_PORT, DEFAULT_MIN_PORT};
pub use watcher::ConfigWatcher;
