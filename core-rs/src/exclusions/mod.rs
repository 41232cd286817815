/**
 * exclusions module
 * Deterministic exclusion sources: the static well-known port table
 * and caller-supplied excluded ports
 */

pub mod explicit;
pub mod well_known;

pub use explicit::mark_explicit;
pub use well_known::{is_well_known, mark_well_known, WELL_KNOWN_PORTS};
