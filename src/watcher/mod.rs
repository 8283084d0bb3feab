pub mod event;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use tokio::sync::mpsc as tokio_mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::ToolConfig;
use crate::error::Result;
use crate::language::Language;
use crate::reserved::is_reserved_path;

use event::WatchEvent;

/// Upper bound on notify-debouncer-mini's batching tick. The quiet period
/// itself is enforced by [`spawn_settler`].
const BATCH_TICK: Duration = Duration::from_millis(50);

/// Handle to a running watcher. Keeps the debouncer alive (dropping stops watching).
pub struct WatcherHandle {
    /// Keep alive: dropping the debouncer stops the OS watcher.
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    /// The bridge task forwarding events from std channel to tokio channel.
    _bridge_task: JoinHandle<()>,
    /// Holds events until their path has been quiet for the debounce window.
    settler: JoinHandle<()>,
    roots: Vec<PathBuf>,
}

impl WatcherHandle {
    /// Roots the subscription actually covers.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl Drop for WatcherHandle {
    /// Pending events for the old roots are discarded, never delivered late.
    fn drop(&mut self) {
        self.settler.abort();
    }
}

/// Decides which raw filesystem paths become [`WatchEvent`]s.
#[derive(Debug, Clone)]
pub struct EventFilter {
    pub language: Language,
    /// Project root; reserved and excluded checks look at paths relative to it.
    pub root: PathBuf,
    pub config: ToolConfig,
}

/// Start a debounced recursive watcher over `roots`.
///
/// Classified events are sent on `tx`, which may be shared with other
/// watchers. Roots that do not exist are skipped with a warning.
///
/// The watcher:
/// - Emits a path only once it has gone `debounce` without a new event, so a
///   burst of writes to one path yields one event however long it lasts
/// - Filters out reserved paths and `exclude` patterns from the tool config
/// - Forwards only sources of the filter's language, plus removed directories
pub fn start_watcher(
    roots: &[PathBuf],
    filter: EventFilter,
    debounce: Duration,
    tx: tokio_mpsc::Sender<WatchEvent>,
) -> Result<WatcherHandle> {
    let (std_tx, std_rx) = std::sync::mpsc::channel::<DebounceEventResult>();

    let mut debouncer = new_debouncer(debounce.min(BATCH_TICK), move |res| {
        let _ = std_tx.send(res);
    })?;

    let mut watched = Vec::new();
    for root in roots {
        if !root.exists() {
            tracing::warn!("watch path {} does not exist, skipping", root.display());
            continue;
        }
        debouncer.watcher().watch(root, RecursiveMode::Recursive)?;
        watched.push(root.clone());
    }

    let (raw_tx, raw_rx) = tokio_mpsc::channel(256);
    let bridge_task = spawn_bridge(std_rx, raw_tx, move |path| classify_event(path, &filter));

    Ok(WatcherHandle {
        _debouncer: debouncer,
        _bridge_task: bridge_task,
        settler: spawn_settler(raw_rx, tx, debounce),
        roots: watched,
    })
}

/// Watch a single manifest file, emitting [`WatchEvent::ManifestChanged`]
/// whenever it is written, replaced, or removed.
///
/// The parent directory is watched instead of the file so editors that save
/// by rename keep triggering events.
pub fn watch_manifest(
    manifest: &Path,
    debounce: Duration,
    tx: tokio_mpsc::Sender<WatchEvent>,
) -> Result<WatcherHandle> {
    let (std_tx, std_rx) = std::sync::mpsc::channel::<DebounceEventResult>();

    let mut debouncer = new_debouncer(debounce.min(BATCH_TICK), move |res| {
        let _ = std_tx.send(res);
    })?;

    let dir = match manifest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    debouncer.watcher().watch(&dir, RecursiveMode::NonRecursive)?;

    let name = manifest.file_name().map(|n| n.to_os_string());
    let (raw_tx, raw_rx) = tokio_mpsc::channel(256);
    let bridge_task = spawn_bridge(std_rx, raw_tx, move |path| {
        (path.file_name().map(|n| n.to_os_string()) == name).then_some(WatchEvent::ManifestChanged)
    });

    Ok(WatcherHandle {
        _debouncer: debouncer,
        _bridge_task: bridge_task,
        settler: spawn_settler(raw_rx, tx, debounce),
        roots: vec![manifest.to_path_buf()],
    })
}

/// Trailing debounce: each event is held until its path has seen no newer
/// event for `quiet`, then forwarded. A newer event for the same path
/// replaces the held one and restarts its deadline.
fn spawn_settler(
    mut raw_rx: tokio_mpsc::Receiver<WatchEvent>,
    tx: tokio_mpsc::Sender<WatchEvent>,
    quiet: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // Keyed by path; manifest changes share the empty key.
        let mut pending: HashMap<PathBuf, (WatchEvent, Instant)> = HashMap::new();

        loop {
            let next = pending.values().map(|(_, deadline)| *deadline).min();

            tokio::select! {
                received = raw_rx.recv() => match received {
                    Some(event) => {
                        let key = event.path().map(Path::to_path_buf).unwrap_or_default();
                        pending.insert(key, (event, Instant::now() + quiet));
                    }
                    None => return,
                },
                _ = tokio::time::sleep_until(next.unwrap_or_else(Instant::now)), if next.is_some() => {
                    let now = Instant::now();
                    let mut due: Vec<(PathBuf, Instant)> = pending
                        .iter()
                        .filter(|(_, (_, deadline))| *deadline <= now)
                        .map(|(key, (_, deadline))| (key.clone(), *deadline))
                        .collect();
                    due.sort_by_key(|(_, deadline)| *deadline);

                    for (key, _) in due {
                        if let Some((event, _)) = pending.remove(&key)
                            && tx.send(event).await.is_err()
                        {
                            return; // receiver dropped, shutdown
                        }
                    }
                }
            }
        }
    })
}

/// Bridge: spawn_blocking to receive from std channel, classify, forward to tokio.
///
/// Ends when the debouncer is dropped (std sender gone) or the receiver is.
fn spawn_bridge<F>(
    std_rx: std::sync::mpsc::Receiver<DebounceEventResult>,
    tx: tokio_mpsc::Sender<WatchEvent>,
    classify: F,
) -> JoinHandle<()>
where
    F: Fn(&Path) -> Option<WatchEvent> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        while let Ok(result) = std_rx.recv() {
            match result {
                Ok(events) => {
                    for debounced_event in events {
                        if let Some(watch_event) = classify(&debounced_event.path)
                            && tx.blocking_send(watch_event).is_err()
                        {
                            return; // receiver dropped, shutdown
                        }
                    }
                }
                Err(err) => {
                    tracing::error!("[watcher] error: {err:?}");
                }
            }
        }
    })
}

/// Classify a filesystem event path into a WatchEvent, or None if it should be ignored.
///
/// Filtering order:
/// 1. Reserved segments (node_modules, vendor, .git, .venv, ...) relative to the root
/// 2. `exclude` patterns from the tool config
/// 3. Existing paths: only source files of the language (`Modified`)
/// 4. Missing paths: sources become `Removed`, extension-less paths
///    `DirectoryRemoved` (Go only, Python removals arrive per file)
pub fn classify_event(path: &Path, filter: &EventFilter) -> Option<WatchEvent> {
    let rel = path.strip_prefix(&filter.root).unwrap_or(path);

    if is_reserved_path(rel) {
        return None;
    }
    if filter.config.is_excluded(rel) {
        return None;
    }

    let is_source = filter.language.is_source(path);

    if path.exists() {
        // notify-debouncer-mini doesn't distinguish create from modify;
        // both regenerate the same mapping.
        return (is_source && path.is_file()).then(|| WatchEvent::Modified(path.to_path_buf()));
    }

    if is_source {
        Some(WatchEvent::Removed(path.to_path_buf()))
    } else if path.extension().is_none() && filter.language == Language::Go {
        Some(WatchEvent::DirectoryRemoved(path.to_path_buf()))
    } else {
        None
    }
}
