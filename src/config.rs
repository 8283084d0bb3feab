use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::language::Language;

/// Project manifest holding a `{ "paths": [...] }` section per generator.
pub const PACKAGE_MANIFEST: &str = "package.json";

/// Optional tool configuration at the project root.
pub const TOOL_CONFIG: &str = "2ts.toml";

const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Per-generator section of `package.json`.
#[derive(Debug, Deserialize)]
struct LangSection {
    paths: Vec<String>,
}

/// Read the watch roots declared for `key` in `<root>/package.json`.
///
/// Paths are returned exactly as written, in order. A missing or unparsable
/// manifest, or a manifest without `key`, is a configuration error.
pub fn watch_paths(root: &Path, key: &str) -> Result<Vec<String>> {
    let manifest = root.join(PACKAGE_MANIFEST);
    let contents = std::fs::read_to_string(&manifest)
        .map_err(|e| Error::config(format!("Failed to read {PACKAGE_MANIFEST}: {e}")))?;

    let mut sections: HashMap<String, serde_json::Value> = serde_json::from_str(&contents)
        .map_err(|e| Error::config(format!("Failed to parse {PACKAGE_MANIFEST}: {e}")))?;

    let section = sections
        .remove(key)
        .ok_or_else(|| Error::config(format!("No {key} configuration found in {PACKAGE_MANIFEST}")))?;

    let section: LangSection = serde_json::from_value(section)
        .map_err(|e| Error::config(format!("Invalid {key} configuration in {PACKAGE_MANIFEST}: {e}")))?;

    Ok(section.paths)
}

/// Overrides for a single generator.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct GeneratorConfig {
    /// Program and leading arguments replacing the default command.
    pub command: Option<Vec<String>>,
}

/// Configuration loaded from `2ts.toml` at the project root.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Debounce window for the file watcher, in milliseconds.
    pub debounce_ms: u64,
    /// Clear the terminal before each change-triggered generation.
    pub clear_screen: bool,
    /// Additional path patterns to exclude (beyond the reserved directories).
    pub exclude: Option<Vec<String>>,
    pub go2ts: GeneratorConfig,
    pub py2ts: GeneratorConfig,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            clear_screen: true,
            exclude: None,
            go2ts: GeneratorConfig::default(),
            py2ts: GeneratorConfig::default(),
        }
    }
}

impl ToolConfig {
    /// Load configuration from `2ts.toml` in the given root directory.
    ///
    /// Returns a default configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(TOOL_CONFIG);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!("failed to parse {TOOL_CONFIG}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!("failed to read {TOOL_CONFIG}: {err}. Using defaults.");
                Self::default()
            }
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Command line prefix for `language`: the configured override when it is
    /// non-empty, otherwise the language default.
    pub fn command_for(&self, language: Language) -> Vec<String> {
        let section = match language {
            Language::Go => &self.go2ts,
            Language::Python => &self.py2ts,
        };
        match &section.command {
            Some(cmd) if !cmd.is_empty() => cmd.clone(),
            _ => language
                .default_command()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Returns true if `path` matches any exclusion pattern from config.
    ///
    /// A pattern matches either the whole path or any single component.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let patterns = match &self.exclude {
            Some(p) => p,
            None => return false,
        };

        let path_str = path.to_string_lossy();

        for pattern in patterns {
            let Ok(matcher) = glob::Pattern::new(pattern) else {
                continue;
            };
            if matcher.matches(&path_str) {
                return true;
            }
            for component in path.components() {
                if let Some(s) = component.as_os_str().to_str()
                    && matcher.matches(s)
                {
                    return true;
                }
            }
        }

        false
    }
}
