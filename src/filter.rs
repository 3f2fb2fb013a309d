//! File selection rules applied during the scan.

use crate::config::Config;
use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::Path;

/// Returns the lowercase extension of `path`, including the leading dot.
///
/// The extension is everything from the last `.` of the final component,
/// so `.bashrc` yields `.bashrc` and `Makefile` yields `None`.
#[must_use]
pub(crate) fn extension_of(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let dot = name.rfind('.')?;
    Some(name[dot..].to_lowercase())
}

/// Decides which walked files belong in the output.
#[derive(Debug, Clone)]
pub(crate) struct FileFilter {
    extensions: BTreeSet<String>,
    exclude: GlobSet,
}

impl FileFilter {
    /// Builds the filter from the run configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an exclude pattern is not a valid glob.
    pub(crate) fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            extensions: config.extensions.clone(),
            exclude: Self::build_globset(&config.exclude_patterns)?,
        })
    }

    fn build_globset(patterns: &[String]) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                Error::config(format!("Invalid glob pattern '{pattern}': {e}"))
            })?;
            builder.add(glob);
        }

        builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build glob set: {e}")))
    }

    /// True if the file's extension is accepted. An empty set accepts all.
    pub(crate) fn accepts_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }

        extension_of(path).is_some_and(|ext| self.extensions.contains(&ext))
    }

    /// True if the slash-separated relative path matches an exclude pattern.
    pub(crate) fn is_excluded(&self, relative_path: &str) -> bool {
        !self.exclude.is_empty() && self.exclude.is_match(relative_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(extensions: &[&str], excludes: &[&str]) -> FileFilter {
        let temp = assert_fs::TempDir::new().unwrap();
        let mut builder = Config::builder()
            .source_root(temp.path())
            .extensions(extensions.iter().copied());
        for pattern in excludes {
            builder = builder.exclude(*pattern);
        }
        FileFilter::new(&builder.build().unwrap()).unwrap()
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("a/b/file.RS")), Some(".rs".to_string()));
        assert_eq!(extension_of(Path::new("archive.tar.gz")), Some(".gz".to_string()));
        assert_eq!(extension_of(Path::new(".bashrc")), Some(".bashrc".to_string()));
        assert_eq!(extension_of(Path::new("Makefile")), None);
    }

    #[test]
    fn test_empty_set_accepts_everything() {
        let f = filter(&[], &[]);
        assert!(f.accepts_extension(Path::new("Makefile")));
        assert!(f.accepts_extension(Path::new("x.bin")));
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        let f = filter(&[".md"], &[]);
        assert!(f.accepts_extension(Path::new("a.md")));
        assert!(f.accepts_extension(Path::new("c.MD")));
        assert!(!f.accepts_extension(Path::new("b.txt")));
        assert!(!f.accepts_extension(Path::new("README")));
    }

    #[test]
    fn test_exclude_patterns() {
        let f = filter(&[], &["target/**", "*.lock"]);
        assert!(f.is_excluded("target/debug/build.rs"));
        assert!(f.is_excluded("Cargo.lock"));
        assert!(!f.is_excluded("src/main.rs"));
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder()
            .source_root(temp.path())
            .exclude("a[")
            .build()
            .unwrap();

        let err = FileFilter::new(&config).unwrap_err();
        assert!(err.is_config());
    }
}
