/**
 * explicit.rs
 * Caller-supplied excluded ports
 *
 * The configured exclusion list is validated externally, but the raw
 * values can still be out of range when validation is bypassed. Values
 * representable in the port space (0-65535) are marked anyway; larger
 * values are warned about and skipped.
 */

use crate::bitmap::PortBitmap;

/// Mark every configured excluded port unavailable
///
/// # Arguments
/// * `bitmap` - Target bit store
/// * `ports` - Raw configured exclusion list
///
/// # Returns
/// Number of ports marked
pub fn mark_explicit(bitmap: &mut PortBitmap, ports: &[u32]) -> usize {
    let mut marked = 0;

    for &raw in ports {
        if raw > u16::MAX as u32 {
            tracing::warn!(port = raw, "excluded port outside 1-65535, skipping");
            continue;
        }
        if raw == 0 {
            tracing::warn!("excluded port 0 outside 1-65535, marking anyway");
        }
        bitmap.set(raw as u16);
        marked += 1;
    }

    if marked > 0 {
        tracing::debug!(count = marked, "marked explicitly excluded ports");
    }
    marked
}
