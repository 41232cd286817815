/**
 * ephemeral.rs
 * OS dynamic/ephemeral port range discovery
 *
 * - Linux: /proc/sys/net/ipv4/ip_local_port_range, one "start end" line
 * - macOS: sysctl net.inet.ip.portrange.first / .last
 * - Windows: `netsh int ipv4 show dynamicport tcp`, "Start Port" and
 *   "Number of Ports" integers; end = start + count - 1
 *
 * Ports in this range belong to the OS for transient outbound
 * connections and must not be handed out as fixed allocations.
 */

use regex::Regex;

use crate::errors::{PortClaimError, Result};

/// Discover the OS ephemeral port range, inclusive
///
/// # Returns
/// `Some((start, end))` on supported platforms, `None` where the
/// platform offers no query.
///
/// # Errors
/// Returns an error when the query or its parse fails; callers treat
/// that as "no additional exclusions this round".
pub fn scan_ephemeral_range() -> Result<Option<(u16, u16)>> {
    platform_scan()
}

#[cfg(target_os = "linux")]
fn platform_scan() -> Result<Option<(u16, u16)>> {
    let content = std::fs::read_to_string("/proc/sys/net/ipv4/ip_local_port_range")?;
    parse_port_range_line(&content).map(Some)
}

#[cfg(target_os = "macos")]
fn platform_scan() -> Result<Option<(u16, u16)>> {
    let first = sysctl_port("net.inet.ip.portrange.first")?;
    let last = sysctl_port("net.inet.ip.portrange.last")?;
    Ok(Some((first, last)))
}

#[cfg(target_os = "macos")]
fn sysctl_port(key: &str) -> Result<u16> {
    let output = std::process::Command::new("sysctl")
        .args(["-n", key])
        .output()?;
    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse::<u16>()
        .map_err(|e| PortClaimError::ParseError(format!("sysctl {}: {}", key, e)))
}

#[cfg(target_os = "windows")]
fn platform_scan() -> Result<Option<(u16, u16)>> {
    let output = std::process::Command::new("netsh")
        .args(["int", "ipv4", "show", "dynamicport", "tcp"])
        .output()?;
    parse_netsh_dynamicport(&String::from_utf8_lossy(&output.stdout)).map(Some)
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn platform_scan() -> Result<Option<(u16, u16)>> {
    tracing::warn!("ephemeral range discovery not supported on this platform");
    Ok(None)
}

/// Parse a plain-text "start end" two-integer line
pub fn parse_port_range_line(content: &str) -> Result<(u16, u16)> {
    let mut fields = content.split_whitespace();

    let start = fields
        .next()
        .ok_or_else(|| PortClaimError::ParseError("missing range start".to_string()))?
        .parse::<u16>()
        .map_err(|e| PortClaimError::ParseError(format!("bad range start: {}", e)))?;

    let end = fields
        .next()
        .ok_or_else(|| PortClaimError::ParseError("missing range end".to_string()))?
        .parse::<u16>()
        .map_err(|e| PortClaimError::ParseError(format!("bad range end: {}", e)))?;

    Ok((start, end))
}

/// Parse `netsh int ipv4 show dynamicport tcp` output
///
/// Locates the "Start Port" and "Number of Ports" integers anywhere in
/// the surrounding text and computes the inclusive end.
pub fn parse_netsh_dynamicport(output: &str) -> Result<(u16, u16)> {
    let start_re = Regex::new(r"Start Port\s*:\s*(\d+)")?;
    let count_re = Regex::new(r"Number of Ports\s*:\s*(\d+)")?;

    let start = start_re
        .captures(output)
        .and_then(|c| c[1].parse::<u32>().ok())
        .ok_or_else(|| PortClaimError::ParseError("netsh: no start port".to_string()))?;
    let count = count_re
        .captures(output)
        .and_then(|c| c[1].parse::<u32>().ok())
        .ok_or_else(|| PortClaimError::ParseError("netsh: no port count".to_string()))?;

    if start == 0 || start > u16::MAX as u32 || count == 0 {
        return Err(PortClaimError::ParseError(format!(
            "netsh: implausible dynamic range start={} count={}",
            start, count
        )));
    }

    let end = (start + count - 1).min(u16::MAX as u32);
    Ok((start as u16, end as u16))
}
