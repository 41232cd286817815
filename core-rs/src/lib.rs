//! # Portclaim Core - In-Process TCP Port Reservation
//!
//! Portclaim hands out ephemeral TCP port numbers to test harnesses
//! and local development tooling. Within one process it never hands
//! out a port that is already reserved, on the well-known blacklist,
//! held by an active OS connection or listener, or inside the OS
//! ephemeral range.
//!
//! ## Core Principle
//!
//! **Allocation state is global**: one 65,536-bit store shared by
//! every allocator handle in the process, guarded by one lock, so no
//! two callers can ever receive the same port. The store is a logical
//! reservation ledger, not a bind test.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │       SharedPortState (one per process)   │
//! │   Mutex<PortBitmap + initialized flag>    │
//! └───────────────────────────────────────────┘
//!       ▲               ▲               ▲
//!       │               │               │
//! ┌─────┴──────┐  ┌─────┴──────┐  ┌─────┴──────┐
//! │ Allocator  │  │ Allocator  │  │ exclusion  │
//! │ handle A   │  │ handle B   │  │ sources    │
//! └────────────┘  └────────────┘  └────────────┘
//! ```
//!
//! Exclusion sources merged lazily on first access: the static
//! well-known table, configured exclusions, the OS in-use scan, and
//! the OS ephemeral/excluded ranges. Each OS source is independently
//! toggleable and independently fault-tolerant.

pub mod allocator;
pub mod bitmap;
pub mod config;
pub mod errors;
pub mod exclusions;
pub mod probe;

pub use allocator::{PortAllocator, SharedPortState, RECOMMENDED_MIN_PORT};
pub use bitmap::{PortBitmap, PORT_SPACE_SIZE};
pub use config::{ConfigWatcher, PortClaimConfig, DEFAULT_MAX_PORT, DEFAULT_MIN_PORT};
pub use errors::PortClaimError;
pub use exclusions::{is_well_known, WELL_KNOWN_PORTS};

/// Crate version
pub const VERSION: &str = "1.0.4";
