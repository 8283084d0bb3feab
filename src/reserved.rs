use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// Directory names that never hold model sources: dependency caches, build
/// output, VCS metadata, virtual environments and bytecode caches.
pub const RESERVED_NAMES: &[&str] = &[
    "node_modules",
    "vendor",
    "dist",
    "build",
    ".git",
    ".venv",
    "venv",
    "__pycache__",
];

static RESERVED_RE: OnceLock<Regex> = OnceLock::new();

fn reserved_re() -> &'static Regex {
    RESERVED_RE.get_or_init(|| {
        let names = RESERVED_NAMES
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"(?:^|[\\/])(?:{names})(?:[\\/]|$)"))
            .expect("reserved-path pattern is valid")
    })
}

/// Returns true if any segment of `path` is a reserved name.
///
/// Purely lexical: the filesystem is never consulted, so this works for
/// removed paths as well as relative ones.
pub fn is_reserved_path(path: impl AsRef<Path>) -> bool {
    reserved_re().is_match(&path.as_ref().to_string_lossy())
}
