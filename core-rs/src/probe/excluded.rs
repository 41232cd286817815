/**
 * excluded.rs
 * OS administered excluded port ranges
 *
 * Windows reserves port ranges for Hyper-V and WinNAT; they are
 * reported by `netsh int ipv4 show excludedportrange protocol=tcp` as
 * repeated "start end" pairs, optionally trailed by an asterisk for
 * administered entries. Other platforms have no equivalent query.
 */

use regex::Regex;

use crate::errors::Result;

/// Discover OS excluded port ranges, inclusive
///
/// # Returns
/// All excluded ranges the platform reports; empty where the platform
/// offers no query.
///
/// # Errors
/// Returns an error when the query fails; callers treat that as "no
/// additional exclusions this round".
pub fn scan_excluded_ranges() -> Result<Vec<(u16, u16)>> {
    platform_scan()
}

#[cfg(target_os = "windows")]
fn platform_scan() -> Result<Vec<(u16, u16)>> {
    let output = std::process::Command::new("netsh")
        .args(["int", "ipv4", "show", "excludedportrange", "protocol=tcp"])
        .output()?;
    parse_netsh_excludedportrange(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(not(target_os = "windows"))]
fn platform_scan() -> Result<Vec<(u16, u16)>> {
    tracing::debug!("no OS excluded-range query on this platform");
    Ok(Vec::new())
}

/// Parse `netsh int ipv4 show excludedportrange` output
///
/// Collects every line carrying a "start end" integer pair. The
/// trailing `*` administered marker is ignored; the range counts
/// either way. Lines without a pair (headers, separators) are skipped.
pub fn parse_netsh_excludedportrange(output: &str) -> Result<Vec<(u16, u16)>> {
    let pair_re = Regex::new(r"^\s*(\d+)\s+(\d+)\s*\*?\s*$")?;
    let mut ranges = Vec::new();

    for line in output.lines() {
        let caps = match pair_re.captures(line) {
            Some(caps) => caps,
            None => continue,
        };
        let start = match caps[1].parse::<u16>() {
            Ok(start) => start,
            Err(_) => continue,
        };
        let end = match caps[2].parse::<u16>() {
            Ok(end) => end,
            Err(_) => continue,
        };
        if end < start {
            tracing::warn!(start, end, "skipping inverted excluded range");
            continue;
        }
        ranges.push((start, end));
    }

    Ok(ranges)
}
