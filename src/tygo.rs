use std::io::Write;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use serde_yaml_ng::Mapping;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// tygo's configuration file at the project root.
pub const TYGO_MANIFEST: &str = "tygo.yaml";

/// One `packages` entry of `tygo.yaml`.
///
/// Only `path` and `output_path` are interpreted here; every other option is
/// carried through untouched so a single-package config behaves like the
/// project one.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TygoPackage {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(flatten)]
    pub options: Mapping,
}

impl TygoPackage {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            output_path: None,
            options: Mapping::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TygoManifest {
    #[serde(default)]
    pub packages: Vec<TygoPackage>,
    #[serde(flatten)]
    pub other: Mapping,
}

impl TygoManifest {
    /// Read and parse `<root>/tygo.yaml`.
    pub fn load(root: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(root.join(TYGO_MANIFEST))
            .map_err(|e| Error::config(format!("Failed to read {TYGO_MANIFEST}: {e}")))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        serde_yaml_ng::from_str(contents)
            .map_err(|e| Error::config(format!("Failed to parse {TYGO_MANIFEST}: {e}")))
    }

    pub fn find(&self, import_path: &str) -> Option<&TygoPackage> {
        self.packages.iter().find(|p| p.path == import_path)
    }

    /// Directories of every configured package, relative to the module root.
    pub fn package_dirs(&self, module: &str) -> Result<Vec<String>> {
        self.packages
            .iter()
            .map(|p| relative_package(module, &p.path))
            .collect()
    }

    /// Config listing only `package`, keeping the project-level options.
    pub fn single(&self, package: TygoPackage) -> Self {
        Self {
            packages: vec![package],
            other: self.other.clone(),
        }
    }

    /// Write this config to a fresh temporary `.yaml` file.
    ///
    /// The file is deleted when the returned handle is dropped.
    pub fn write_temp(&self) -> Result<NamedTempFile> {
        let yaml = serde_yaml_ng::to_string(self)
            .map_err(|e| Error::config(format!("Failed to serialize tygo config: {e}")))?;
        let mut file = tempfile::Builder::new()
            .prefix("tygo-")
            .suffix(".yaml")
            .tempfile()?;
        file.write_all(yaml.as_bytes())?;
        file.flush()?;
        Ok(file)
    }
}

/// Strip the module prefix from a package import path.
///
/// `example.com/proj/models` under module `example.com/proj` becomes `models`;
/// the module itself becomes `.`.
pub fn relative_package(module: &str, import_path: &str) -> Result<String> {
    if import_path == module {
        return Ok(".".to_string());
    }
    import_path
        .strip_prefix(module)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(str::to_string)
        .ok_or_else(|| {
            Error::config(format!(
                "package {import_path} is outside module {module}"
            ))
        })
}

/// Import path of the package in `dir` (relative to the module root).
pub fn import_path(module: &str, dir: &Path) -> String {
    let segments: Vec<String> = dir
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if segments.is_empty() {
        module.to_string()
    } else {
        format!("{module}/{}", segments.join("/"))
    }
}
