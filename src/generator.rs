use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use crate::config::ToolConfig;
use crate::error::{Error, Result};
use crate::language::Language;
use crate::module_name::ModuleName;
use crate::output::{self, RunSummary};
use crate::runner::{CommandRunner, CommandSpec};
use crate::tygo::{self, TYGO_MANIFEST, TygoManifest, TygoPackage};
use crate::walker::collect_sources;

/// Outcome of one external generator invocation.
#[derive(Debug, Clone)]
pub struct Generation {
    pub source: PathBuf,
    /// Where the generator writes for `source`.
    pub destination: PathBuf,
    /// Exit code; `None` if the process was killed or never started.
    pub code: Option<i32>,
    pub stderr: String,
}

impl Generation {
    pub fn succeeded(&self) -> bool {
        self.code == Some(0)
    }

    /// The generation error to report, if the invocation failed.
    pub fn error(&self, language: Language) -> Option<Error> {
        if self.succeeded() {
            return None;
        }
        Some(Error::Generation {
            models: language.models_label(),
            source_path: self.source.clone(),
            stderr: self.stderr.trim_end().to_string(),
        })
    }
}

/// Invokes the external generator for one language.
///
/// `root` is the project root and the working directory of every spawned
/// generator; relative target paths are interpreted against it.
pub struct Generator<R> {
    language: Language,
    root: PathBuf,
    config: ToolConfig,
    module: ModuleName,
    runner: R,
}

impl<R: CommandRunner> Generator<R> {
    pub fn new(language: Language, root: PathBuf, config: ToolConfig, runner: R) -> Self {
        let module = ModuleName::new(&root);
        Self {
            language,
            root,
            config,
            module,
            runner,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Memoized Go module name of the project.
    pub fn module(&self) -> &ModuleName {
        &self.module
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// One-shot generation for a file or directory, reporting each result.
    ///
    /// A directory is walked for sources of the language. Python generates
    /// each module found; Go generates each distinct package directory that
    /// holds one. Targets run one after another and a failure is reported
    /// without stopping the walk. A file is generated on its own (Go: the
    /// package it belongs to).
    pub async fn generate_path(&self, path: &Path) -> Result<RunSummary> {
        let target = self.resolve(path);
        let meta = tokio::fs::metadata(&target)
            .await
            .map_err(|e| Error::filesystem(path, e))?;

        let targets: Vec<PathBuf> = if meta.is_dir() {
            let files = collect_sources(&target, self.language, &self.config);
            if files.is_empty() {
                tracing::info!(
                    "no .{} files found under {}",
                    self.language.extension(),
                    path.display()
                );
            }
            let files = files.into_iter().map(|f| match f.strip_prefix(&self.root) {
                Ok(rel) if path.is_relative() => rel.to_path_buf(),
                _ => f,
            });
            match self.language {
                Language::Go => files
                    .filter_map(|f| f.parent().map(Path::to_path_buf))
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect(),
                Language::Python => files.collect(),
            }
        } else {
            vec![path.to_path_buf()]
        };

        let mut summary = RunSummary::default();
        for target in targets {
            let generation = self.generate_target(&target).await?;
            output::print_generation(&generation, self.language);
            summary.record(&generation);
        }
        output::print_summary(&summary);

        Ok(summary)
    }

    /// Generate a single explicit target: a Python module, or the Go package
    /// containing (or being) `path`.
    pub async fn generate_target(&self, path: &Path) -> Result<Generation> {
        match self.language {
            Language::Go => self.generate_go_package(path).await,
            Language::Python => Ok(self.generate_python_module(path).await),
        }
    }

    /// Regenerate after a change at `path` reported by the watcher.
    ///
    /// Go reruns `tygo generate` over the project `tygo.yaml`; Python
    /// regenerates the changed module.
    pub async fn regenerate(&self, path: &Path) -> Generation {
        match self.language {
            Language::Go => {
                let dir = path.parent().unwrap_or_else(|| Path::new(""));
                let destination = match self.go_package(dir).await {
                    Ok((_, package)) => go_destination(&package, dir),
                    Err(err) => {
                        tracing::debug!("no tygo package for {}: {err}", dir.display());
                        self.language.destination_for(path)
                    }
                };
                self.execute(path, destination, vec!["generate".to_string()])
                    .await
            }
            Language::Python => self.generate_python_module(path).await,
        }
    }

    async fn generate_python_module(&self, source: &Path) -> Generation {
        let destination = Language::Python.destination_for(source);
        let args = vec![
            "--module".to_string(),
            source.to_string_lossy().into_owned(),
            "--output".to_string(),
            destination.to_string_lossy().into_owned(),
        ];
        self.execute(source, destination, args).await
    }

    /// Generate only the package at `path` through a temporary tygo config.
    ///
    /// The package's entry in `tygo.yaml` is reused when present so its
    /// options (output path, type mappings, ...) still apply.
    async fn generate_go_package(&self, path: &Path) -> Result<Generation> {
        let dir = if self.resolve(path).is_dir() {
            path
        } else {
            path.parent().unwrap_or_else(|| Path::new(""))
        };
        let (manifest, package) = self.go_package(dir).await?;
        let destination = go_destination(&package, dir);

        let config_file = manifest.single(package).write_temp()?;
        let args = vec![
            "generate".to_string(),
            "--config".to_string(),
            config_file.path().to_string_lossy().into_owned(),
        ];
        let generation = self.execute(path, destination, args).await;

        if let Err(err) = config_file.close() {
            tracing::warn!("failed to remove temporary tygo config: {err}");
        }
        Ok(generation)
    }

    /// The `tygo.yaml` entry for the package in `dir`, or a bare entry when
    /// the manifest is absent or does not list it.
    async fn go_package(&self, dir: &Path) -> Result<(TygoManifest, TygoPackage)> {
        let rel_dir = self.relative_to_root(dir)?;
        let module = self.module.get().await?;
        let import_path = tygo::import_path(module, &rel_dir);

        let manifest = if self.root.join(TYGO_MANIFEST).exists() {
            TygoManifest::load(&self.root)?
        } else {
            TygoManifest::default()
        };
        let package = manifest
            .find(&import_path)
            .cloned()
            .unwrap_or_else(|| TygoPackage::new(import_path));
        Ok((manifest, package))
    }

    async fn execute(&self, source: &Path, destination: PathBuf, args: Vec<String>) -> Generation {
        let prefix = self.config.command_for(self.language);
        let Some(spec) = CommandSpec::from_prefix(&prefix, args, self.root.clone()) else {
            return Generation {
                source: source.to_path_buf(),
                destination,
                code: None,
                stderr: "no generator command configured".to_string(),
            };
        };

        match self.runner.run(&spec).await {
            Ok(out) => Generation {
                source: source.to_path_buf(),
                destination,
                code: out.code,
                stderr: out.stderr,
            },
            Err(err) => Generation {
                source: source.to_path_buf(),
                destination,
                code: None,
                stderr: format!("failed to run {}: {err}", spec.program),
            },
        }
    }

    /// `path` as seen from the current process, i.e. joined onto the root
    /// when relative.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// `path` relative to the root, or a config error if it lies outside.
    ///
    /// `..` is resolved lexically first; the canonical form is only consulted
    /// when that does not land under the root.
    fn relative_to_root(&self, path: &Path) -> Result<PathBuf> {
        let absolute = normalize(&self.resolve(path));
        if let Ok(rel) = absolute.strip_prefix(&self.root) {
            return Ok(rel.to_path_buf());
        }
        let root = self.root.canonicalize()?;
        let canonical = absolute
            .canonicalize()
            .map_err(|e| Error::filesystem(path, e))?;
        canonical
            .strip_prefix(&root)
            .map(Path::to_path_buf)
            .map_err(|_| {
                Error::config(format!(
                    "{} is outside the project root {}",
                    path.display(),
                    self.root.display()
                ))
            })
    }
}

/// Where tygo writes the package in `dir`: its configured `output_path`, or
/// `index.ts` inside the package.
fn go_destination(package: &TygoPackage, dir: &Path) -> PathBuf {
    match &package.output_path {
        Some(out) => PathBuf::from(out),
        None => dir.join("index.ts"),
    }
}

/// Drop `.` and fold `..` into its parent without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
