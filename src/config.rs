use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const DEFAULT_OUTPUT_PATH: &str = "output.txt";

/// Normalizes a user-supplied extension to lowercase with a leading dot.
///
/// ```
/// use mergefiles::normalize_extension;
///
/// assert_eq!(normalize_extension("MD"), ".md");
/// assert_eq!(normalize_extension(".Rs"), ".rs");
/// ```
#[must_use]
pub fn normalize_extension(ext: &str) -> String {
    let lower = ext.trim().to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}

/// Configuration for a merge run.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Absolute, canonical source directory
    pub source_root: PathBuf,

    /// Output file path
    pub output_path: PathBuf,

    /// Literal text written at the start of the output
    pub prompt: String,

    /// Accepted extensions, normalized; empty accepts every file
    pub extensions: BTreeSet<String>,

    /// Glob patterns matched against relative paths to skip files
    pub exclude_patterns: Vec<String>,

    /// Follow symbolic links while walking
    pub follow_links: bool,

    /// Worker threads for the parallel writer; `None` uses all logical CPUs
    pub threads: Option<usize>,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mergefiles::Config;
    ///
    /// let config = Config::builder()
    ///     .source_root("./src")
    ///     .output_path("bundle.txt")
    ///     .extension("rs")
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Source root doesn't exist or is not a directory
    /// - Output path is empty or names a directory
    /// - An extension filter is empty
    /// - Thread count is zero
    pub fn validate(&self) -> Result<()> {
        if self.source_root.as_os_str().is_empty() {
            return Err(Error::config("Source directory must not be empty"));
        }

        if !self.source_root.exists() {
            return Err(Error::config(format!(
                "Source directory does not exist: {}",
                self.source_root.display()
            )));
        }

        if !self.source_root.is_dir() {
            return Err(Error::config(format!(
                "Source path is not a directory: {}",
                self.source_root.display()
            )));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(Error::config("Output path must not be empty"));
        }

        if self.output_path.is_dir() {
            return Err(Error::config(format!(
                "Output path is a directory: {}",
                self.output_path.display()
            )));
        }

        if self.extensions.iter().any(|ext| ext == ".") {
            return Err(Error::config("Extension filter must not be empty"));
        }

        if self.threads == Some(0) {
            return Err(Error::config("threads must be greater than 0"));
        }

        Ok(())
    }

    /// Returns true when every regular file is accepted.
    #[must_use]
    pub fn accepts_all_extensions(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Number of worker threads the writer will use.
    #[must_use]
    pub fn worker_threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get)
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    source_root: Option<PathBuf>,
    output_path: Option<PathBuf>,
    prompt: Option<String>,
    extensions: Vec<String>,
    exclude_patterns: Vec<String>,
    follow_links: bool,
    threads: Option<usize>,
}

impl ConfigBuilder {
    /// Sets the directory to merge.
    #[must_use]
    pub fn source_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_root = Some(path.into());
        self
    }

    /// Sets the output file.
    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Sets the prompt text written before the first file.
    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Adds one accepted extension (`md`, `.md` and `.MD` are equivalent).
    #[must_use]
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.extensions.push(ext.into());
        self
    }

    /// Adds several accepted extensions.
    #[must_use]
    pub fn extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions.extend(exts.into_iter().map(Into::into));
        self
    }

    /// Adds a glob pattern; matching relative paths are skipped.
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Enables or disables following symbolic links.
    #[must_use]
    pub fn follow_links(mut self, enabled: bool) -> Self {
        self.follow_links = enabled;
        self
    }

    /// Sets the number of worker threads.
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Builds the configuration.
    ///
    /// The source root is resolved to an absolute canonical path so that
    /// relative paths in headers are computed against a stable base.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the source root cannot be
    /// resolved.
    pub fn build(self) -> Result<Config> {
        let source_root = self.source_root.unwrap_or_else(|| PathBuf::from("."));
        let source_root = resolve_root(&source_root)?;

        let config = Config {
            source_root,
            output_path: self
                .output_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH)),
            prompt: self.prompt.unwrap_or_default(),
            extensions: self
                .extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .collect(),
            exclude_patterns: self.exclude_patterns,
            follow_links: self.follow_links,
            threads: self.threads,
        };

        config.validate()?;
        Ok(config)
    }
}

fn resolve_root(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(Error::config("Source directory must not be empty"));
    }

    path.canonicalize().map_err(|e| {
        Error::config(format!(
            "Cannot access source directory {}: {e}",
            path.display()
        ))
    })
}
