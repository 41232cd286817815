/**
 * allocator module
 * Concurrent port-allocation state machine
 *
 * One process-wide bit store shared by every allocator handle, one
 * lock, seeded random free-port search.
 */

pub mod manager;
pub mod shared_state;

pub use manager::{PortAllocator, RECOMMENDED_MIN_PORT};
pub use shared_state::SharedPortState;
