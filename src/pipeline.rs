use crate::{
    config::Config,
    error::Result,
    layout::LayoutPlan,
    scanner::{ScanStats, Scanner},
    writer::Writer,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    /// Regular files seen by the scanner
    pub total_files: usize,

    /// Files merged into the output
    pub merged_files: usize,

    /// Files rejected by the extension filter or exclude patterns
    pub skipped_files: usize,

    /// Entries skipped because of scan errors
    pub scan_errors: usize,

    /// Merged files whose content could not be fully read
    pub degraded_files: usize,

    /// Size of the output file in bytes
    pub total_bytes: u64,

    /// Total execution time
    pub duration: Duration,

    /// Time spent scanning and planning
    pub scan_duration: Duration,

    /// Time spent writing
    pub write_duration: Duration,

    /// Output file path
    pub output_path: String,

    /// False when no file matched and no output was created
    pub output_written: bool,
}

impl PipelineStats {
    fn new(config: &Config, scan: &ScanStats, plan: &LayoutPlan) -> Self {
        Self {
            total_files: scan.total_files,
            merged_files: plan.len(),
            skipped_files: scan.skipped_files,
            scan_errors: scan.errors,
            degraded_files: 0,
            total_bytes: 0,
            duration: Duration::ZERO,
            scan_duration: Duration::ZERO,
            write_duration: Duration::ZERO,
            output_path: config.output_path.display().to_string(),
            output_written: false,
        }
    }

    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║               Merge Summary                           ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!(
            "║ Files Scanned:        {:>8}                        ║",
            self.total_files
        );
        println!(
            "║   - Merged:           {:>8}                        ║",
            self.merged_files
        );
        println!(
            "║   - Skipped:          {:>8}                        ║",
            self.skipped_files
        );
        println!(
            "║   - Incomplete:       {:>8}                        ║",
            self.degraded_files
        );
        println!("║                                                       ║");
        println!(
            "║ Output Size:          {:>8} bytes                  ║",
            self.total_bytes
        );
        println!("║ Output File:                                          ║");
        println!("║   {}", self.output_path);
        println!("║                                                       ║");
        println!(
            "║   - Scanning:         {:>8.2}s                     ║",
            self.scan_duration.as_secs_f64()
        );
        println!(
            "║   - Writing:          {:>8.2}s                     ║",
            self.write_duration.as_secs_f64()
        );
        println!(
            "║   - Total:            {:>8.2}s                     ║",
            self.duration.as_secs_f64()
        );
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

/// Main orchestrator: scan and plan, then write in parallel.
pub struct Pipeline {
    config: Config,
    scanner: Scanner,
    writer: Writer,
}

impl Pipeline {
    /// Creates a new pipeline with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - An exclude pattern is invalid
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let scanner = Scanner::new(&config)?.skipping(resolve_output(&config.output_path));
        let writer = Writer::new(&config);

        Ok(Self {
            config,
            scanner,
            writer,
        })
    }

    /// Executes the pipeline and returns statistics.
    ///
    /// # Process
    ///
    /// 1. **Scan**: walks the source tree and plans the exact output layout
    /// 2. **Write**: fills the pre-sized output file with one task per file
    ///
    /// When no file matches, nothing is written and the returned stats have
    /// `output_written == false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the walk fails at the root or the output file
    /// cannot be created, mapped or flushed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mergefiles::{Config, Pipeline};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::builder()
    ///     .source_root("./src")
    ///     .output_path("merged.txt")
    ///     .extension("rs")
    ///     .build()?;
    ///
    /// let stats = Pipeline::new(config)?.run()?;
    /// stats.print_summary();
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), fields(source_root = %self.config.source_root.display()))]
    pub fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();

        self.log_filters();

        info!("Phase 1/2: Collecting files and computing output size...");
        let scan_start = Instant::now();
        let (plan, scan) = self.scanner.scan(&self.config.prompt)?;
        let scan_duration = scan_start.elapsed();

        let mut stats = PipelineStats::new(&self.config, &scan, &plan);
        stats.scan_duration = scan_duration;

        if plan.is_empty() {
            info!(
                "No matching files found in {}; output file not created",
                self.config.source_root.display()
            );
            stats.duration = start_time.elapsed();
            return Ok(stats);
        }

        info!(
            "✓ Found {} files, output size {} bytes ({:.2}s)",
            plan.len(),
            plan.total_size(),
            scan_duration.as_secs_f64()
        );

        info!("Phase 2/2: Writing output file in parallel...");
        let write_start = Instant::now();
        let report = self.writer.write(&plan)?;
        stats.write_duration = write_start.elapsed();

        stats.degraded_files = report.degraded();
        stats.total_bytes = plan.total_size();
        stats.output_written = true;
        stats.duration = start_time.elapsed();

        if stats.degraded_files > 0 {
            warn!(
                "{} file(s) changed or vanished after scanning; their content is incomplete",
                stats.degraded_files
            );
        }

        info!(
            "✓ Merged {} files into {} in {:.2}s",
            stats.merged_files,
            self.config.output_path.display(),
            stats.duration.as_secs_f64()
        );

        Ok(stats)
    }

    fn log_filters(&self) {
        if self.config.accepts_all_extensions() {
            info!("No extensions given, processing all files");
        } else {
            for ext in &self.config.extensions {
                info!("Filtering by extension: {}", ext);
            }
        }

        for pattern in &self.config.exclude_patterns {
            info!("Excluding: {}", pattern);
        }
    }
}

/// Absolute path of the output file as the walker would report it, if its
/// directory exists.
fn resolve_output(output: &Path) -> Option<PathBuf> {
    let absolute = if output.is_absolute() {
        output.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(output)
    };

    let name = absolute.file_name()?;
    let parent = absolute.parent()?.canonicalize().ok()?;
    Some(parent.join(name))
}
