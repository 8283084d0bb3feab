use std::path::{Path, PathBuf};

use crate::config::ToolConfig;
use crate::language::Language;
use crate::reserved::is_reserved_path;

/// Recursively collect `language` sources under `root`, sorted by path.
///
/// Reserved directories (see [`is_reserved_path`]) are pruned during the walk
/// rather than filtered afterwards, and `config.exclude` patterns are applied
/// to each file. Both checks look at the path relative to `root`, so a walk
/// started inside e.g. `build/` still finds files.
pub fn collect_sources(root: &Path, language: Language, config: &ToolConfig) -> Vec<PathBuf> {
    let prune_root = root.to_path_buf();
    let walker = ignore::WalkBuilder::new(root)
        // Every model file counts, including gitignored or hidden ones.
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let rel = entry.path().strip_prefix(&prune_root).unwrap_or(entry.path());
            !is_reserved_path(rel)
        })
        .build();

    let mut out = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!("{err}");
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        if !language.is_source(path) {
            continue;
        }

        let rel = path.strip_prefix(root).unwrap_or(path);
        if config.is_excluded(rel) {
            continue;
        }

        out.push(path.to_path_buf());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("tempdir")
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| {
                f.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_collects_only_language_sources_sorted() {
        let dir = tmp();
        fs::write(dir.path().join("b.py"), "").unwrap();
        fs::write(dir.path().join("a.py"), "").unwrap();
        fs::write(dir.path().join("a.ts"), "").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg").join("c.py"), "").unwrap();

        let files = collect_sources(dir.path(), Language::Python, &ToolConfig::default());
        assert_eq!(names(dir.path(), &files), vec!["a.py", "b.py", "pkg/c.py"]);
    }

    #[test]
    fn test_prunes_reserved_directories() {
        let dir = tmp();
        for reserved in ["vendor", "node_modules", ".venv", "__pycache__"] {
            let sub = dir.path().join(reserved);
            fs::create_dir_all(&sub).unwrap();
            fs::write(sub.join("c.py"), "").unwrap();
        }
        fs::write(dir.path().join("a.py"), "").unwrap();

        let files = collect_sources(dir.path(), Language::Python, &ToolConfig::default());
        assert_eq!(names(dir.path(), &files), vec!["a.py"]);
    }

    #[test]
    fn test_walk_rooted_inside_reserved_name_still_collects() {
        let dir = tmp();
        let build = dir.path().join("build");
        fs::create_dir_all(&build).unwrap();
        fs::write(build.join("model.go"), "").unwrap();

        let files = collect_sources(&build, Language::Go, &ToolConfig::default());
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_respects_config_exclude_patterns() {
        let dir = tmp();
        fs::write(dir.path().join("user.go"), "").unwrap();
        fs::write(dir.path().join("user_test.go"), "").unwrap();

        let config = ToolConfig {
            exclude: Some(vec!["*_test.go".to_string()]),
            ..ToolConfig::default()
        };
        let files = collect_sources(dir.path(), Language::Go, &config);
        assert_eq!(names(dir.path(), &files), vec!["user.go"]);
    }
}
