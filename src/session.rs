use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::config::watch_paths;
use crate::error::Result;
use crate::generator::{Generation, Generator};
use crate::language::Language;
use crate::output;
use crate::runner::CommandRunner;
use crate::tygo::TygoManifest;
use crate::watcher::event::WatchEvent;
use crate::watcher::{EventFilter, WatcherHandle, start_watcher, watch_manifest};

/// Lifecycle of the source subscription.
pub enum WatchState {
    /// No subscription: before the first start, or after a failed reload.
    Idle,
    Watching(WatcherHandle),
    /// The old subscription has been dropped; a new one is being opened.
    Reloading,
}

impl WatchState {
    pub fn is_watching(&self) -> bool {
        matches!(self, WatchState::Watching(_))
    }
}

/// Watch mode: owns the watcher handle and feeds change events to the generator.
///
/// All events, from the source roots and from the manifest, arrive on one
/// channel and are handled one at a time, so a reload can never overlap
/// another reload or a generation.
pub struct WatchSession<R> {
    generator: Generator<R>,
    state: WatchState,
    manifest_watch: Option<WatcherHandle>,
    tx: mpsc::Sender<WatchEvent>,
    rx: mpsc::Receiver<WatchEvent>,
}

impl<R: CommandRunner> WatchSession<R> {
    pub fn new(generator: Generator<R>) -> Self {
        let (tx, rx) = mpsc::channel(256);
        Self {
            generator,
            state: WatchState::Idle,
            manifest_watch: None,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    pub fn generator(&self) -> &Generator<R> {
        &self.generator
    }

    /// Resolve the roots to watch, as absolute paths under the project root.
    ///
    /// Go reads them from `tygo.yaml` (module prefix stripped), Python from
    /// the `py2ts` section of `package.json`.
    pub async fn resolve_roots(&self) -> Result<Vec<PathBuf>> {
        let root = self.generator.root();
        let language = self.generator.language();
        let dirs = match language {
            Language::Go => {
                let module = self.generator.module().get().await?;
                TygoManifest::load(root)?.package_dirs(module)?
            }
            Language::Python => watch_paths(root, language.tool_name())?,
        };
        Ok(dirs.into_iter().map(|d| root.join(d)).collect())
    }

    /// Idle → Watching. Also subscribes to the manifest on first call.
    pub async fn start(&mut self) -> Result<()> {
        let roots = self.resolve_roots().await?;
        let config = self.generator.config();
        let filter = EventFilter {
            language: self.generator.language(),
            root: self.generator.root().to_path_buf(),
            config: config.clone(),
        };
        let handle = start_watcher(&roots, filter, config.debounce(), self.tx.clone())?;

        if self.manifest_watch.is_none() {
            let manifest = self
                .generator
                .root()
                .join(self.generator.language().watch_manifest());
            self.manifest_watch = Some(watch_manifest(&manifest, config.debounce(), self.tx.clone())?);
        }

        for root in handle.roots() {
            tracing::debug!("watching {}", root.display());
        }
        let language = self.generator.language();
        if handle.roots().is_empty() {
            tracing::warn!(
                "none of the configured watch paths exist, no {language} model files are being watched"
            );
        } else {
            println!("Watching {language} model files for changes...");
        }
        self.state = WatchState::Watching(handle);
        Ok(())
    }

    /// Watching → Reloading → Watching.
    ///
    /// The old subscription is dropped before the roots are re-resolved. On
    /// failure the session stays Idle until the manifest changes again.
    pub async fn reload(&mut self) {
        println!(
            "{} changed, reloading watcher...",
            self.generator.language().watch_manifest()
        );
        drop(std::mem::replace(&mut self.state, WatchState::Reloading));

        if let Err(err) = self.start().await {
            tracing::error!("failed to reload watcher: {err}");
            self.state = WatchState::Idle;
        }
    }

    /// Handle one classified event. Returns the generation it triggered, if any.
    pub async fn handle_event(&mut self, event: WatchEvent) -> Option<Generation> {
        let path = match event {
            WatchEvent::ManifestChanged => {
                self.reload().await;
                return None;
            }
            WatchEvent::Modified(path)
            | WatchEvent::Removed(path)
            | WatchEvent::DirectoryRemoved(path) => path,
        };

        let language = self.generator.language();
        if self.generator.config().clear_screen {
            output::clear_screen();
        }
        let shown = path.strip_prefix(self.generator.root()).unwrap_or(&path);
        output::print_change_detected(shown, language);

        let generation = self.generator.regenerate(&path).await;
        output::print_generation(&generation, language);
        Some(generation)
    }

    /// Run until Ctrl-C. Errors only if the initial subscription fails.
    pub async fn run(mut self) -> Result<()> {
        self.start().await?;

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = self.rx.recv() => match event {
                    Some(event) => {
                        self.handle_event(event).await;
                    }
                    None => break,
                },
                _ = &mut shutdown => {
                    tracing::info!("stopping watcher");
                    break;
                }
            }
        }

        self.state = WatchState::Idle;
        self.manifest_watch = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolConfig;
    use crate::error::Error;
    use crate::runner::testing::RecordingRunner;
    use crate::watcher::classify_event;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn config() -> ToolConfig {
        ToolConfig {
            clear_screen: false,
            debounce_ms: 20,
            ..ToolConfig::default()
        }
    }

    fn python_session(root: &Path, runner: RecordingRunner) -> WatchSession<RecordingRunner> {
        WatchSession::new(Generator::new(
            Language::Python,
            root.to_path_buf(),
            config(),
            runner,
        ))
    }

    fn python_project() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"py2ts": {"paths": ["python/models"]}}"#,
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("python").join("models")).unwrap();
        dir
    }

    fn filter_for(session: &WatchSession<RecordingRunner>) -> EventFilter {
        EventFilter {
            language: session.generator().language(),
            root: session.generator().root().to_path_buf(),
            config: session.generator().config().clone(),
        }
    }

    #[tokio::test]
    async fn test_resolve_roots_python_from_package_json() {
        let dir = python_project();
        let session = python_session(dir.path(), RecordingRunner::succeeding());
        let roots = session.resolve_roots().await.unwrap();
        assert_eq!(roots, vec![dir.path().join("python/models")]);
    }

    #[tokio::test]
    async fn test_resolve_roots_go_from_tygo_yaml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("go.mod"), "module example.com/proj\n").unwrap();
        fs::write(
            dir.path().join("tygo.yaml"),
            "packages:\n  - path: example.com/proj/go/models\n",
        )
        .unwrap();

        let session = WatchSession::new(Generator::new(
            Language::Go,
            dir.path().to_path_buf(),
            config(),
            RecordingRunner::succeeding(),
        ));
        let roots = session.resolve_roots().await.unwrap();
        assert_eq!(roots, vec![dir.path().join("go/models")]);
    }

    #[tokio::test]
    async fn test_start_without_manifest_key_fails_and_stays_idle() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "x"}"#).unwrap();
        let mut session = python_session(dir.path(), RecordingRunner::succeeding());

        let err = session.start().await.unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err:?}");
        assert!(matches!(session.state(), WatchState::Idle));
    }

    #[tokio::test]
    async fn test_modified_event_invokes_generator_once() {
        let dir = python_project();
        let file = dir.path().join("python").join("models").join("Post.py");
        fs::write(&file, "").unwrap();
        let mut session = python_session(dir.path(), RecordingRunner::succeeding());

        let event = classify_event(&file, &filter_for(&session)).unwrap();
        let generation = session.handle_event(event).await.unwrap();

        assert!(generation.succeeded());
        assert_eq!(generation.destination, file.with_extension("ts"));
        assert_eq!(session.generator().runner().call_count(), 1);
    }

    #[tokio::test]
    async fn test_reserved_event_never_reaches_generator() {
        let dir = python_project();
        let venv = dir.path().join("python").join("models").join(".venv");
        fs::create_dir_all(&venv).unwrap();
        let file = venv.join("site.py");
        fs::write(&file, "").unwrap();
        let mut session = python_session(dir.path(), RecordingRunner::succeeding());

        if let Some(event) = classify_event(&file, &filter_for(&session)) {
            session.handle_event(event).await;
        }
        assert_eq!(session.generator().runner().call_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_generation_keeps_session_alive() {
        let dir = python_project();
        let file = dir.path().join("python").join("models").join("Post.py");
        fs::write(&file, "").unwrap();
        let mut session = python_session(dir.path(), RecordingRunner::failing("SyntaxError"));
        session.start().await.unwrap();

        let first = session
            .handle_event(WatchEvent::Modified(file.clone()))
            .await
            .unwrap();
        assert!(!first.succeeded());
        assert!(session.state().is_watching());

        session.handle_event(WatchEvent::Removed(file)).await.unwrap();
        assert_eq!(session.generator().runner().call_count(), 2);
    }

    #[tokio::test]
    async fn test_manifest_change_reloads_with_new_roots() {
        let dir = python_project();
        fs::create_dir_all(dir.path().join("api")).unwrap();
        let mut session = python_session(dir.path(), RecordingRunner::succeeding());
        session.start().await.unwrap();

        fs::write(
            dir.path().join("package.json"),
            r#"{"py2ts": {"paths": ["python/models", "api"]}}"#,
        )
        .unwrap();
        assert!(session.handle_event(WatchEvent::ManifestChanged).await.is_none());

        match session.state() {
            WatchState::Watching(handle) => {
                assert_eq!(handle.roots().len(), 2);
                assert!(handle.roots().contains(&dir.path().join("api")));
            }
            _ => panic!("expected Watching after reload"),
        }
        assert_eq!(session.generator().runner().call_count(), 0);
    }

    #[tokio::test]
    async fn test_broken_manifest_reload_goes_idle() {
        let dir = python_project();
        let mut session = python_session(dir.path(), RecordingRunner::succeeding());
        session.start().await.unwrap();

        fs::write(dir.path().join("package.json"), "{ not json").unwrap();
        session.handle_event(WatchEvent::ManifestChanged).await;
        assert!(matches!(session.state(), WatchState::Idle));

        fs::write(
            dir.path().join("package.json"),
            r#"{"py2ts": {"paths": ["python/models"]}}"#,
        )
        .unwrap();
        session.handle_event(WatchEvent::ManifestChanged).await;
        assert!(session.state().is_watching());
    }

    #[tokio::test]
    async fn test_start_with_only_missing_roots_watches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"py2ts": {"paths": ["python/missing"]}}"#,
        )
        .unwrap();
        let mut session = python_session(dir.path(), RecordingRunner::succeeding());

        session.start().await.unwrap();

        match session.state() {
            WatchState::Watching(handle) => assert!(handle.roots().is_empty()),
            _ => panic!("expected Watching with no roots"),
        }
    }
}
