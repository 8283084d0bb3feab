use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tokio::sync::OnceCell;

use crate::error::{Error, Result};

/// Go module descriptor file name.
pub const GO_MOD: &str = "go.mod";

static MODULE_RE: OnceLock<Regex> = OnceLock::new();

fn module_re() -> &'static Regex {
    MODULE_RE.get_or_init(|| Regex::new(r"(?m)^module\s+(\S+)").expect("invalid module pattern"))
}

/// Extract the module path from the contents of a `go.mod` file.
pub fn parse_module_name(contents: &str) -> Option<&str> {
    module_re()
        .captures(contents)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Lazily resolved Go module name.
///
/// The descriptor is read on the first call to [`ModuleName::get`]; every
/// later call returns the cached value without touching the filesystem. One
/// instance lives for the whole process, so the name is never invalidated.
#[derive(Debug)]
pub struct ModuleName {
    descriptor: PathBuf,
    cell: OnceCell<String>,
}

impl ModuleName {
    /// Resolver for `<root>/go.mod`.
    pub fn new(root: &Path) -> Self {
        Self::from_descriptor(root.join(GO_MOD))
    }

    pub fn from_descriptor(descriptor: PathBuf) -> Self {
        Self {
            descriptor,
            cell: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<&str> {
        let name = self
            .cell
            .get_or_try_init(|| async {
                let contents = tokio::fs::read_to_string(&self.descriptor)
                    .await
                    .map_err(|e| {
                        Error::config(format!("Failed to read {}: {e}", self.descriptor.display()))
                    })?;
                parse_module_name(&contents)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        Error::config(format!(
                            "Could not find module name in {}",
                            self.descriptor.display()
                        ))
                    })
            })
            .await?;
        Ok(name.as_str())
    }
}
