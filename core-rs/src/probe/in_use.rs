/**
 * in_use.rs
 * Active TCP connection/listener scan
 *
 * Collects the local port of every active TCP endpoint the OS reports,
 * listeners and established connections alike:
 * - Linux: /proc/net/tcp and /proc/net/tcp6 (hex local-port column)
 * - macOS: one-shot `lsof -nP -iTCP`
 * - Windows: one-shot `netstat -ano -p TCP`
 */

use std::collections::HashSet;

use crate::errors::Result;

/// Scan the OS for local ports of active TCP connections and listeners
///
/// # Returns
/// Set of local port numbers currently in use
///
/// # Errors
/// Returns an error when the platform query itself fails; callers
/// treat that as "no additional exclusions this round".
pub fn scan_in_use_ports() -> Result<HashSet<u16>> {
    platform_scan()
}

#[cfg(target_os = "linux")]
fn platform_scan() -> Result<HashSet<u16>> {
    let mut ports = HashSet::new();

    for path in ["/proc/net/tcp", "/proc/net/tcp6"] {
        match std::fs::read_to_string(path) {
            Ok(content) => ports.extend(parse_proc_net_tcp(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(ports)
}

#[cfg(target_os = "macos")]
fn platform_scan() -> Result<HashSet<u16>> {
    let output = std::process::Command::new("lsof")
        .args(["-nP", "-iTCP"])
        .output()?;

    Ok(parse_lsof_output(&String::from_utf8_lossy(&output.stdout)))
}

#[cfg(target_os = "windows")]
fn platform_scan() -> Result<HashSet<u16>> {
    let output = std::process::Command::new("netstat")
        .args(["-ano", "-p", "TCP"])
        .output()?;

    Ok(parse_netstat_output(&String::from_utf8_lossy(&output.stdout)))
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn platform_scan() -> Result<HashSet<u16>> {
    tracing::warn!("in-use port scan not supported on this platform");
    Ok(HashSet::new())
}

/// Parse /proc/net/tcp{,6} content
///
/// Each entry line carries the local endpoint as `ADDR:PORT` with the
/// port in hex, e.g. `0: 0100007F:1F90 00000000:0000 0A ...`.
/// Malformed lines are skipped.
pub fn parse_proc_net_tcp(content: &str) -> HashSet<u16> {
    let mut ports = HashSet::new();

    for line in content.lines().skip(1) {
        let mut fields = line.split_whitespace();
        let local = match fields.nth(1) {
            Some(local) => local,
            None => continue,
        };
        let hex_port = match local.rsplit(':').next() {
            Some(hex) => hex,
            None => continue,
        };
        if let Ok(port) = u16::from_str_radix(hex_port, 16) {
            ports.insert(port);
        }
    }

    ports
}

/// Parse `lsof -nP -iTCP` output
///
/// Lines look like `sshd 500 root 3u IPv4 ... TCP 127.0.0.1:22 (LISTEN)`
/// or `... TCP 10.0.0.2:54321->1.2.3.4:443 (ESTABLISHED)`. The local
/// endpoint is the part before `->` when present.
pub fn parse_lsof_output(output: &str) -> HashSet<u16> {
    let mut ports = HashSet::new();

    for line in output.lines() {
        let name = match line.split_whitespace().nth(8) {
            Some(name) => name,
            None => continue,
        };
        let local = name.split("->").next().unwrap_or(name);
        if let Some(port_str) = local.rsplit(':').next() {
            if let Ok(port) = port_str.parse::<u16>() {
                ports.insert(port);
            }
        }
    }

    ports
}

/// Parse `netstat -ano -p TCP` output
///
/// Entry lines look like `  TCP    0.0.0.0:135    0.0.0.0:0    LISTENING    912`.
pub fn parse_netstat_output(output: &str) -> HashSet<u16> {
    let mut ports = HashSet::new();

    for line in output.lines() {
        let mut fields = line.split_whitespace();
        if fields.next() != Some("TCP") {
            continue;
        }
        let local = match fields.next() {
            Some(local) => local,
            None => continue,
        };
        if let Some(port_str) = local.rsplit(':').next() {
            if let Ok(port) = port_str.parse::<u16>() {
                ports.insert(port);
            }
        }
    }

    ports
}
