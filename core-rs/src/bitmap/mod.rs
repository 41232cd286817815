/**
 * bitmap module
 * Fixed-capacity bit store for the 65,536-port state space
 */

pub mod store;

pub use store::{PortBitmap, PORT_SPACE_SIZE};
