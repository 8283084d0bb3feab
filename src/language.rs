use std::path::{Path, PathBuf};

/// Source language a watcher regenerates TypeScript from.
///
/// Uses a plain enum (not trait objects) so dispatch stays a `match` at the
/// few boundaries where the two generators differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Go,
    Python,
}

impl Language {
    /// File extension of model sources, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::Python => "py",
        }
    }

    /// Returns true if this language's sources carry `ext`.
    pub fn matches_extension(&self, ext: &str) -> bool {
        ext == self.extension()
    }

    /// Returns true if `path` is a source file of this language (lexically).
    pub fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.matches_extension(e))
    }

    /// Human-readable name for status output.
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Go => "Go",
            Language::Python => "Python",
        }
    }

    /// Binary name, also the key of this generator's section in `package.json`
    /// and `2ts.toml`.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Language::Go => "go2ts",
            Language::Python => "py2ts",
        }
    }

    /// Description of the models each generator consumes, used in messages.
    pub fn models_label(&self) -> &'static str {
        match self {
            Language::Go => "Go models",
            Language::Python => "Pydantic models",
        }
    }

    /// External command run when no override is configured.
    pub fn default_command(&self) -> &'static [&'static str] {
        match self {
            Language::Go => &["tygo"],
            Language::Python => &["uv", "run", "pydantic2ts"],
        }
    }

    /// Manifest whose change reloads the watch roots.
    pub fn watch_manifest(&self) -> &'static str {
        match self {
            Language::Go => crate::tygo::TYGO_MANIFEST,
            Language::Python => crate::config::PACKAGE_MANIFEST,
        }
    }

    /// Destination the generator writes for a change at `source`.
    ///
    /// Go packages are emitted as a sibling `index.ts`; Python modules as a
    /// same-basename `.ts` file next to the source.
    pub fn destination_for(&self, source: &Path) -> PathBuf {
        let dir = source.parent().unwrap_or_else(|| Path::new(""));
        match self {
            Language::Go => dir.join("index.ts"),
            Language::Python => source.with_extension("ts"),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
