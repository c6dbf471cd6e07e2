//! File discovery with .gitignore integration
//!
//! Uses the `ignore` crate (from ripgrep) for gitignore-style matching.
//! Batch parses walk through this filter so build artifacts and vendored
//! trees never reach the parsers.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// File filter configuration
#[derive(Debug, Clone)]
pub struct FileFilterConfig {
    /// Root directory for relative path resolution
    pub root: PathBuf,
    /// Use .gitignore files for filtering
    pub respect_gitignore: bool,
    /// Additional ignore patterns: directory/file names or `*.ext` globs
    pub ignore_patterns: Vec<String>,
}

impl Default for FileFilterConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            respect_gitignore: true,
            ignore_patterns: Vec::new(),
        }
    }
}

/// File filter with gitignore integration
pub struct FileFilter {
    config: FileFilterConfig,
    project_ignore: Option<Gitignore>,
}

impl FileFilter {
    pub fn new(config: FileFilterConfig) -> Self {
        let project_ignore = Self::load_project_ignore(&config.root);
        Self {
            config,
            project_ignore,
        }
    }

    /// Load `.recast/ignore` (gitignore syntax) if present
    fn load_project_ignore(root: &Path) -> Option<Gitignore> {
        let ignore_path = root.join(".recast").join("ignore");
        if !ignore_path.exists() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(root);
        if let Some(err) = builder.add(&ignore_path) {
            tracing::warn!("Failed to parse .recast/ignore: {}", err);
        }
        builder.build().ok()
    }

    /// Check if a path should be excluded from scans
    pub fn is_ignored(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.config.root).unwrap_or(path);

        for component in relative.components() {
            let std::path::Component::Normal(name) = component else {
                continue;
            };
            let Some(name) = name.to_str() else { continue };

            for pattern in &self.config.ignore_patterns {
                if let Some(suffix) = pattern.strip_prefix('*') {
                    if name.ends_with(suffix) {
                        return true;
                    }
                } else if name == pattern {
                    return true;
                }
            }

            // Hidden entries, except the project dir itself
            if name.starts_with('.') && name != ".recast" {
                return true;
            }
        }

        if let Some(ref ignore) = self.project_ignore {
            match ignore.matched(relative, path.is_dir()) {
                ignore::Match::Ignore(_) => return true,
                ignore::Match::Whitelist(_) => return false,
                ignore::Match::None => {}
            }
        }

        false
    }

    /// Discover files under root whose extension is in `extensions`
    pub fn discover_files(&self, extensions: &[&str]) -> Vec<PathBuf> {
        let walker = WalkBuilder::new(&self.config.root)
            .hidden(true)
            .git_ignore(self.config.respect_gitignore)
            .git_global(self.config.respect_gitignore)
            .git_exclude(self.config.respect_gitignore)
            .build();

        let mut files: Vec<PathBuf> = walker
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|ext| extensions.contains(&ext))
            })
            .filter(|path| !self.is_ignored(path))
            .collect();

        // Deterministic ordering for reproducible batch results
        files.sort();
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_with_patterns(root: &Path, patterns: &[&str]) -> FileFilter {
        FileFilter::new(FileFilterConfig {
            root: root.to_path_buf(),
            respect_gitignore: false,
            ignore_patterns: patterns.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn test_ignores_named_directories() {
        let filter = filter_with_patterns(Path::new("/repo"), &["node_modules", "target"]);
        assert!(filter.is_ignored(Path::new("/repo/node_modules/pkg/index.js")));
        assert!(filter.is_ignored(Path::new("/repo/target/debug/build.rs")));
        assert!(!filter.is_ignored(Path::new("/repo/src/main.rs")));
    }

    #[test]
    fn test_ignores_glob_patterns() {
        let filter = filter_with_patterns(Path::new("/repo"), &["*.min.js"]);
        assert!(filter.is_ignored(Path::new("/repo/static/app.min.js")));
        assert!(!filter.is_ignored(Path::new("/repo/static/app.js")));
    }

    #[test]
    fn test_ignores_hidden_but_not_project_dir() {
        let filter = filter_with_patterns(Path::new("/repo"), &[]);
        assert!(filter.is_ignored(Path::new("/repo/.git/config")));
        assert!(!filter.is_ignored(Path::new("/repo/.recast/config.toml")));
    }

    #[test]
    fn test_discover_files_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.go"), "package a\n").unwrap();
        std::fs::write(dir.path().join("src/b.py"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("README.md"), "# readme\n").unwrap();

        let filter = filter_with_patterns(dir.path(), &[]);
        let files = filter.discover_files(&["go"]);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("src/a.go"));
    }
}
