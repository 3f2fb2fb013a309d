//! # mergefiles
//!
//! Merges a directory tree into a single text file: a prompt followed by
//! every accepted file wrapped in a delimiter header and footer.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mergefiles::{Config, Pipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .source_root("./src")
//!     .output_path("merged.txt")
//!     .prompt("Review the following files:\n")
//!     .extension("rs")
//!     .build()?;
//!
//! Pipeline::new(config)?.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Output format
//!
//! ````text
//! <prompt>--- START FILE: <relative path> ---
//! ```
//! <raw file bytes>
//! ```
//! --- END FILE ---
//!
//! ````
//!
//! ## Architecture
//!
//! 1. **Scanner**: walks the tree, filters by extension and sizes each file
//!    from its metadata
//! 2. **Layout**: sums prompt, headers, contents and footers into the exact
//!    output size
//! 3. **Writer**: sizes and maps the output file, then fills each file's
//!    byte range from its own task, with no locks

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod error;
mod file;
mod filter;
mod layout;
mod pipeline;
mod scanner;
mod writer;

pub mod prompts;
pub mod version;

pub use config::{normalize_extension, Config, ConfigBuilder};
pub use error::{Error, Result};
pub use file::{render_header, FileRecord, FOOTER, FOOTER_SIZE};
pub use layout::LayoutPlan;
pub use pipeline::{Pipeline, PipelineStats};
pub use prompts::PromptStore;

/// Runs the complete merge with the given configuration.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - Source directory cannot be walked
/// - Output file cannot be created, resized, mapped or flushed
///
/// # Examples
///
/// ```no_run
/// use mergefiles::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder()
///     .source_root(".")
///     .build()?;
///
/// run(config)?;
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<PipelineStats> {
    Pipeline::new(config)?.run()
}
