use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::loader::ScriptLoader;
use super::ScriptError;
use crate::quest::ZoneQuestInterface;

/// Events from the hot-reload watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotReloadEvent {
    /// A script was (re)loaded; carries the script id
    Reloaded(String),
    /// A script file went away and its handlers were dropped
    Removed(String),
    /// A changed script failed to load; its old handlers are kept
    Error(String),
}

/// Watches a zone's script directory and swaps handlers as files change
pub struct ScriptWatcher {
    loader: Arc<ScriptLoader>,
    quests: Arc<ZoneQuestInterface>,
}

impl ScriptWatcher {
    pub fn new(loader: Arc<ScriptLoader>, quests: Arc<ZoneQuestInterface>) -> Self {
        Self { loader, quests }
    }

    /// Start watching on a background thread.
    /// Returns a channel receiver that signals when reloads occur.
    pub fn start(self) -> Result<mpsc::Receiver<HotReloadEvent>, ScriptError> {
        let scripts_dir = self.loader.scripts_dir().to_path_buf();
        if !scripts_dir.exists() {
            return Err(ScriptError::MissingDirectory(scripts_dir));
        }

        let (tx, rx) = mpsc::channel(32);
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    let _ = notify_tx.send(event);
                }
                Err(e) => error!("Script watcher error: {}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(1)),
        )?;
        watcher.watch(&scripts_dir, RecursiveMode::Recursive)?;

        info!("Script hot-reload watcher started for {:?}", scripts_dir);

        std::thread::spawn(move || {
            // Keep the watcher alive for as long as the thread runs
            let _watcher = watcher;

            while let Ok(event) = notify_rx.recv() {
                for path in &event.paths {
                    let Some(change) = self.apply_change(&event.kind, path) else {
                        continue;
                    };
                    if tx.blocking_send(change).is_err() {
                        // Receiver dropped, nobody is listening anymore
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    /// Apply one file system change. Only `.lua` files are considered; a
    /// path that still exists is (re)loaded, a missing one is unloaded.
    pub fn apply_change(&self, kind: &EventKind, path: &Path) -> Option<HotReloadEvent> {
        if !matches!(
            kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return None;
        }
        ScriptLoader::script_id(path)?;

        if path.exists() {
            info!("Detected change in {:?}, reloading", path);
            match self.loader.load_file(&self.quests, path) {
                Ok(script_id) => Some(HotReloadEvent::Reloaded(script_id)),
                Err(e) => {
                    warn!("Hot-reload of {:?} failed: {}", path, e);
                    Some(HotReloadEvent::Error(e.to_string()))
                }
            }
        } else {
            self.loader
                .unload_file(&self.quests, path)
                .map(HotReloadEvent::Removed)
        }
    }
}
