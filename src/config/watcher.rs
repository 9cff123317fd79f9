//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself: editors that
//! save by writing a temporary file and renaming it over the original would
//! otherwise detach a file-level watch after the first save.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ConfigSnapshot;

/// Publishes a fresh [`ConfigSnapshot`] whenever the watched file changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ConfigSnapshot>,
}

impl ConfigWatcher {
    pub fn new(path: &Path, update_tx: mpsc::UnboundedSender<ConfigSnapshot>) -> Self {
        Self {
            path: path.to_path_buf(),
            update_tx,
        }
    }

    /// Start watching in notify's background thread.
    ///
    /// Dropping the returned watcher stops delivery.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, update_tx } = self;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let target = path.clone();
        // Last text seen, so saves without changes do not reload.
        let last_applied: Mutex<Option<String>> = Mutex::new(std::fs::read_to_string(&path).ok());

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Config watch error");
                        return;
                    }
                };
                if !touches(&event, &target) {
                    return;
                }

                let content = std::fs::read_to_string(&target).ok();
                {
                    let mut last = last_applied.lock().unwrap_or_else(|e| e.into_inner());
                    if content.is_some() && *last == content {
                        tracing::debug!(path = ?target, "Config file touched without changes");
                        return;
                    }
                    *last = content;
                }

                tracing::info!(path = ?target, "Config file changed, reloading");
                match load_config(&target) {
                    Ok(snapshot) => {
                        if update_tx.send(snapshot).is_err() {
                            tracing::warn!("Configuration update dropped: server is not running");
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            "Failed to reload config, keeping current configuration"
                        );
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

/// Whether `event` creates or modifies the file at `target`.
fn touches(event: &Event, target: &Path) -> bool {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return false;
    }
    let Some(name) = target.file_name() else {
        return false;
    };
    event.paths.iter().any(|p| p.file_name() == Some(name))
}
