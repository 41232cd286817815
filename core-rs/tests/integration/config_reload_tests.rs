// Config reload integration tests
//
// Drive the notify-based watcher end to end: write a YAML snapshot,
// run the watch loop on a thread, rewrite the file, and verify the
// allocator picked up the additive changes.

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use portclaim_core::{ConfigWatcher, PortAllocator, PortClaimConfig, SharedPortState};
use tempfile::TempDir;

fn quiet_yaml(excluded: &str) -> String {
    format!(
        "excludedPorts: [{}]\n\
         excludeWellKnown: false\n\
         scanInUse: false\n\
         excludeEphemeral: false\n\
         scanOsExcluded: false\n",
        excluded
    )
}

fn quiet_config() -> PortClaimConfig {
    PortClaimConfig {
        exclude_well_known: false,
        scan_in_use: false,
        exclude_ephemeral: false,
        scan_os_excluded: false,
        ..Default::default()
    }
}

/// Poll until the condition holds or the deadline passes
fn wait_for(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    condition()
}

#[test]
fn test_reload_applies_added_exclusions() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("portclaim.yaml");
    fs::write(&config_path, quiet_yaml("")).unwrap();

    let allocator = Arc::new(PortAllocator::with_state(
        SharedPortState::new(),
        quiet_config(),
    ));

    let watcher = ConfigWatcher::new(&config_path, allocator.clone());

    fs::write(&config_path, quiet_yaml("61500, 61501")).unwrap();
    watcher.reload();

    assert!(allocator.mark_used(61500).is_err());
    assert!(allocator.mark_used(61501).is_err());
    assert_eq!(allocator.config().excluded_ports, vec![61500, 61501]);
}

#[test]
fn test_watch_loop_picks_up_file_change() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("portclaim.yaml");
    fs::write(&config_path, quiet_yaml("")).unwrap();

    let allocator = Arc::new(PortAllocator::with_state(
        SharedPortState::new(),
        quiet_config(),
    ));

    let shutdown = Arc::new(AtomicBool::new(false));
    let watcher_allocator = allocator.clone();
    let watcher_path = config_path.clone();
    let watcher_shutdown = shutdown.clone();
    let handle = thread::spawn(move || {
        let watcher = ConfigWatcher::new(&watcher_path, watcher_allocator);
        watcher.run(watcher_shutdown).unwrap();
    });

    // Give the watcher a moment to register, then rewrite the snapshot
    thread::sleep(Duration::from_millis(300));
    fs::write(&config_path, quiet_yaml("61600")).unwrap();

    let applied = wait_for(Duration::from_secs(5), || {
        allocator.config().excluded_ports == vec![61600]
    });

    shutdown.store(true, Ordering::SeqCst);
    handle.join().unwrap();

    assert!(applied, "watcher never applied the rewritten config");
    assert!(allocator.mark_used(61600).is_err());
}

#[test]
fn test_watch_loop_survives_bad_rewrite() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("portclaim.yaml");
    fs::write(&config_path, quiet_yaml("61700")).unwrap();

    let allocator = Arc::new(PortAllocator::with_state(
        SharedPortState::new(),
        quiet_config(),
    ));

    let watcher = ConfigWatcher::new(&config_path, allocator.clone());
    watcher.reload();
    assert_eq!(allocator.config().excluded_ports, vec![61700]);

    // Broken YAML keeps the previous snapshot
    fs::write(&config_path, "excludedPorts: [unclosed").unwrap();
    watcher.reload();
    assert_eq!(allocator.config().excluded_ports, vec![61700]);

    // And exclusions stay sticky either way
    assert!(allocator.mark_used(61700).is_err());
}
