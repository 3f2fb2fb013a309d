use crate::{
    config::Config,
    error::{Error, Result},
    file::{to_slash, FileRecord},
    filter::FileFilter,
    layout::LayoutPlan,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::{DirEntry, WalkDir};

/// Statistics collected during scanning.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct ScanStats {
    /// Regular files seen
    pub total_files: usize,

    /// Files added to the plan
    pub accepted_files: usize,

    /// Files rejected by extension or exclude pattern
    pub skipped_files: usize,

    /// Entries skipped because of errors
    pub errors: usize,
}

/// Walks the source tree and builds the layout plan.
pub(crate) struct Scanner {
    root_dir: PathBuf,
    follow_links: bool,
    filter: FileFilter,
    skip_path: Option<PathBuf>,
}

impl Scanner {
    /// Creates a new scanner from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cannot be built.
    pub(crate) fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            root_dir: config.source_root.clone(),
            follow_links: config.follow_links,
            filter: FileFilter::new(config)?,
            skip_path: None,
        })
    }

    /// Never catalogue `path`, typically the output file.
    #[must_use]
    pub(crate) fn skipping(mut self, path: Option<PathBuf>) -> Self {
        self.skip_path = path;
        self
    }

    /// Walks the root directory, adding every accepted file to a plan
    /// seeded with `prompt`.
    ///
    /// Per-entry problems are logged and skipped. An empty plan is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the root itself cannot be walked.
    pub(crate) fn scan(&self, prompt: &str) -> Result<(LayoutPlan, ScanStats)> {
        let mut plan = LayoutPlan::new(prompt);
        let mut stats = ScanStats::default();

        debug!("Starting scan of {}", self.root_dir.display());

        let walker = WalkDir::new(&self.root_dir)
            .follow_links(self.follow_links)
            .sort_by_file_name();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(Error::walk(&self.root_dir, e.to_string()));
                }
                Err(e) => {
                    let path = e.path().map_or_else(String::new, |p| p.display().to_string());
                    warn!("Cannot access {}: {}", path, e);
                    stats.errors += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            stats.total_files += 1;

            match self.process_entry(&entry) {
                Ok(Some(record)) => {
                    trace!(
                        "Planned {} ({} bytes)",
                        record.relative_path(),
                        record.content_size()
                    );
                    plan.push(record);
                    stats.accepted_files += 1;
                }
                Ok(None) => stats.skipped_files += 1,
                Err(e) => {
                    warn!("Skipping {}: {}", entry.path().display(), e);
                    stats.errors += 1;
                }
            }
        }

        debug!(
            "Scan complete: {} files, {} accepted, {} skipped, {} errors",
            stats.total_files, stats.accepted_files, stats.skipped_files, stats.errors
        );

        Ok((plan, stats))
    }

    /// Turns a walked file into a record, or `None` if it is filtered out.
    fn process_entry(&self, entry: &DirEntry) -> Result<Option<FileRecord>> {
        let path = entry.path();

        if self.skip_path.as_deref() == Some(path) {
            debug!("Skipping output file {}", path.display());
            return Ok(None);
        }

        if !self.filter.accepts_extension(path) {
            return Ok(None);
        }

        let relative_path = self.relative_path(path)?;

        if self.filter.is_excluded(&relative_path) {
            trace!("Excluded by pattern: {}", relative_path);
            return Ok(None);
        }

        let metadata = entry.metadata().map_err(|e| {
            Error::io(
                path,
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("metadata unavailable")),
            )
        })?;

        Ok(Some(FileRecord::new(
            relative_path,
            path.to_path_buf(),
            metadata.len(),
        )))
    }

    fn relative_path(&self, path: &Path) -> Result<String> {
        let relative = pathdiff::diff_paths(path, &self.root_dir).ok_or_else(|| {
            Error::config(format!(
                "cannot resolve {} relative to {}",
                path.display(),
                self.root_dir.display()
            ))
        })?;

        Ok(to_slash(&relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn scanner_for(root: &Path, extensions: &[&str]) -> Scanner {
        let config = Config::builder()
            .source_root(root)
            .extensions(extensions.iter().copied())
            .build()
            .unwrap();
        Scanner::new(&config).unwrap()
    }

    fn names(plan: &LayoutPlan) -> Vec<&str> {
        plan.records().iter().map(FileRecord::relative_path).collect()
    }

    #[test]
    fn test_scanner_finds_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("file1.rs").write_str("fn main() {}").unwrap();
        temp.child("file2.rs").write_str("pub fn test() {}").unwrap();

        let (plan, stats) = scanner_for(temp.path(), &[]).scan("").unwrap();

        assert_eq!(names(&plan), vec!["file1.rs", "file2.rs"]);
        assert_eq!(stats.accepted_files, 2);
    }

    #[test]
    fn test_scanner_extension_filter() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.md").write_str("# a").unwrap();
        temp.child("b.txt").write_str("b").unwrap();
        temp.child("c.MD").write_str("# c").unwrap();

        let (plan, stats) = scanner_for(temp.path(), &[".md"]).scan("").unwrap();

        let mut found = names(&plan);
        found.sort_unstable();
        assert_eq!(found, vec!["a.md", "c.MD"]);
        assert_eq!(stats.skipped_files, 1);
    }

    #[test]
    fn test_scanner_empty_filter_accepts_all() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.md").write_str("# a").unwrap();
        temp.child("b.txt").write_str("b").unwrap();
        temp.child("Makefile").write_str("all:").unwrap();

        let (plan, _) = scanner_for(temp.path(), &[]).scan("").unwrap();

        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_scanner_nested_directories_use_slashes() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/main.rs").write_str("fn main() {}").unwrap();
        temp.child("src/util/lib.rs").write_str("pub fn test() {}").unwrap();
        temp.child("tests/test.rs").write_str("#[test]\nfn test() {}").unwrap();

        let (plan, _) = scanner_for(temp.path(), &["rs"]).scan("").unwrap();

        assert_eq!(
            names(&plan),
            vec!["src/main.rs", "src/util/lib.rs", "tests/test.rs"]
        );
    }

    #[test]
    fn test_scanner_sizes_from_metadata() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("x.go").write_str("package main\n").unwrap();

        let (plan, _) = scanner_for(temp.path(), &[]).scan("P\n").unwrap();
        let record = &plan.records()[0];

        assert_eq!(record.content_size(), 13);
        assert_eq!(plan.total_size(), 2 + record.block_size());
        assert!(record.full_path().is_absolute());
    }

    #[test]
    fn test_scanner_empty_directory_is_not_an_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("only/dirs/here").create_dir_all().unwrap();

        let (plan, stats) = scanner_for(temp.path(), &[]).scan("prompt").unwrap();

        assert!(plan.is_empty());
        assert_eq!(stats.total_files, 0);
        assert_eq!(plan.total_size(), 6);
    }

    #[test]
    fn test_scanner_skips_output_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.txt").write_str("a").unwrap();
        temp.child("output.txt").write_str("old output").unwrap();

        let root = temp.path().canonicalize().unwrap();
        let scanner = scanner_for(temp.path(), &[]).skipping(Some(root.join("output.txt")));
        let (plan, _) = scanner.scan("").unwrap();

        assert_eq!(names(&plan), vec!["a.txt"]);
    }

    #[test]
    fn test_scanner_exclude_patterns() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/lib.rs").write_str("").unwrap();
        temp.child("target/debug/out.rs").write_str("").unwrap();

        let config = Config::builder()
            .source_root(temp.path())
            .exclude("target/**")
            .build()
            .unwrap();
        let (plan, stats) = Scanner::new(&config).unwrap().scan("").unwrap();

        assert_eq!(names(&plan), vec!["src/lib.rs"]);
        assert_eq!(stats.skipped_files, 1);
    }

    #[cfg(unix)]
    fn tree_with_links() -> assert_fs::TempDir {
        use std::os::unix::fs::symlink;

        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.txt").write_str("alpha").unwrap();
        temp.child("z.txt").write_str("zulu").unwrap();
        symlink(temp.path().join("missing.txt"), temp.path().join("dangling")).unwrap();
        symlink(temp.path(), temp.path().join("loop")).unwrap();
        symlink(temp.path().join("a.txt"), temp.path().join("link.txt")).unwrap();
        temp
    }

    #[cfg(unix)]
    #[test]
    fn test_scanner_skips_symlinks_when_not_following() {
        let temp = tree_with_links();

        let (plan, stats) = scanner_for(temp.path(), &[]).scan("").unwrap();

        assert_eq!(names(&plan), vec!["a.txt", "z.txt"]);
        assert_eq!(stats.errors, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_scanner_bad_links_are_per_entry_errors() {
        let temp = tree_with_links();
        let config = Config::builder()
            .source_root(temp.path())
            .follow_links(true)
            .build()
            .unwrap();

        let (plan, stats) = Scanner::new(&config).unwrap().scan("").unwrap();

        assert_eq!(names(&plan), vec!["a.txt", "link.txt", "z.txt"]);
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.accepted_files, 3);
    }

    #[test]
    fn test_scanner_missing_root_is_fatal() {
        let temp = assert_fs::TempDir::new().unwrap();
        let root = temp.child("vanishing");
        root.create_dir_all().unwrap();

        let scanner = scanner_for(root.path(), &[]);
        std::fs::remove_dir(root.path()).unwrap();

        let err = scanner.scan("").unwrap_err();
        assert!(matches!(err, Error::Walk { .. }));
    }
}
