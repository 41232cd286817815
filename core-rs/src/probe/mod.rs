/**
 * probe module
 * Platform port reservation probes
 *
 * Three independent OS queries feed the allocator's exclusion merge:
 * - in_use: local ports of active TCP connections and listeners
 * - ephemeral: the OS dynamic/ephemeral port range
 * - excluded: OS administered excluded port ranges (Windows)
 *
 * Each probe is fallible but never fatal: the allocator logs failures
 * and treats the source as contributing zero exclusions. The text
 * parsers are plain functions over &str so every platform format is
 * testable with literal fixtures.
 */

pub mod ephemeral;
pub mod excluded;
pub mod in_use;

pub use ephemeral::scan_ephemeral_range;
pub use excluded::scan_excluded_ranges;
pub use in_use::scan_in_use_ports;
