/**
 * watcher.rs
 * Live configuration reload
 *
 * Watches the YAML config file and folds changed snapshots into a
 * running allocator via `apply_config`. Reload failures (unreadable
 * file, bad YAML, failed validation) keep the previous snapshot.
 */

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::allocator::PortAllocator;
use crate::errors::Result;

use super::snapshot::PortClaimConfig;

/// Watches one config file and reconfigures one allocator
pub struct ConfigWatcher {
    config_path: PathBuf,
    allocator: Arc<PortAllocator>,
}

impl ConfigWatcher {
    /// Create a watcher for a config file
    ///
    /// # Arguments
    /// * `config_path` - Path to the YAML config file
    /// * `allocator` - Allocator receiving updated snapshots
    pub fn new<P: AsRef<Path>>(config_path: P, allocator: Arc<PortAllocator>) -> Self {
        ConfigWatcher {
            config_path: config_path.as_ref().to_path_buf(),
            allocator,
        }
    }

    /// Run the watch loop until the shutdown flag is set
    ///
    /// Blocks the calling thread. Filesystem events for other paths
    /// are ignored; each relevant event triggers one reload attempt.
    pub fn run(&self, shutdown: Arc<AtomicBool>) -> Result<()> {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut watcher = RecommendedWatcher::new(tx, notify::Config::default())?;

        // Watch the parent directory: editors often replace the file
        let watch_root = self
            .config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        watcher.watch(&watch_root, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.config_path.display(), "watching config");

        loop {
            if shutdown.load(Ordering::SeqCst) {
                tracing::info!("config watcher shutting down");
                break;
            }

            match rx.recv_timeout(Duration::from_millis(1000)) {
                Ok(Ok(event)) => self.handle_event(event),
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "config watcher event error");
                }
                Err(_) => {
                    // Timeout - re-check the shutdown flag
                }
            }
        }

        Ok(())
    }

    fn handle_event(&self, event: Event) {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return;
        }
        if !event.paths.iter().any(|p| p.ends_with(
            self.config_path
                .file_name()
                .unwrap_or(self.config_path.as_os_str()),
        )) {
            return;
        }

        self.reload();
    }

    /// One reload attempt; the previous snapshot survives any failure
    pub fn reload(&self) {
        let config = match PortClaimConfig::load(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "config reload failed, keeping previous snapshot");
                return;
            }
        };
        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "config rejected, keeping previous snapshot");
            return;
        }

        tracing::info!(path = %self.config_path.display(), "applying updated config");
        self.allocator.apply_config(config);
    }
}
