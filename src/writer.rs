//! Parallel output writer.
//!
//! The output file is created at its final size, mapped into memory and cut
//! into one disjoint `&mut [u8]` region per record. Each region is moved into
//! its own task on a rayon pool, so no two tasks can reach the same byte and
//! no locking is needed.
//!
//! A file that grows between scan and write is clamped to its planned size.
//! A file that shrinks or disappears leaves the rest of its content region
//! zeroed; its header and footer are still written and later offsets never
//! move.

use crate::{
    config::Config,
    error::{Error, Result},
    file::{FileRecord, FOOTER},
    layout::LayoutPlan,
};
use memmap2::{MmapMut, MmapOptions};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::{
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Read},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Result of filling one record's content region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteOutcome {
    /// All planned content bytes were copied
    Complete,

    /// Fewer bytes than planned could be read
    Truncated {
        /// Bytes actually copied
        read: u64,
        /// Bytes reserved at scan time
        expected: u64,
    },

    /// The source file could not be opened
    Unreadable,
}

impl WriteOutcome {
    /// True if the content region is not fully populated.
    pub(crate) const fn is_degraded(self) -> bool {
        !matches!(self, Self::Complete)
    }
}

/// Per-record outcomes, in record order.
#[derive(Debug, Clone, Default)]
pub(crate) struct WriteReport {
    pub outcomes: Vec<WriteOutcome>,
}

impl WriteReport {
    /// Number of records whose content is incomplete.
    pub(crate) fn degraded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_degraded()).count()
    }
}

/// Output file mapped for writing.
///
/// Fields drop in declaration order, so the mapping is always released
/// before the file handle is closed.
struct OutputMap {
    map: MmapMut,
    file: File,
    path: PathBuf,
}

impl OutputMap {
    /// Creates or truncates `path`, sizes it to `size` bytes and maps it.
    fn create(path: &Path, size: u64) -> Result<Self> {
        let len = usize::try_from(size).map_err(|_| Error::TooLarge { size })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| Error::mapping(path, "create", e))?;

        file.set_len(size)
            .map_err(|e| Error::mapping(path, "resize", e))?;

        // SAFETY: the file was just created and sized by this process, and the
        // mapping lives only as long as this struct. External modification of
        // the output while it is being written is not supported.
        let map = unsafe { MmapOptions::new().len(len).map_mut(&file) }
            .map_err(|e| Error::mapping(path, "map", e))?;

        Ok(Self {
            map,
            file,
            path: path.to_path_buf(),
        })
    }

    /// Flushes the mapping to disk, then releases it and closes the file.
    fn finish(self) -> Result<()> {
        self.map
            .flush()
            .map_err(|e| Error::mapping(&self.path, "flush", e))?;

        let Self { map, file, .. } = self;
        drop(map);
        drop(file);
        Ok(())
    }
}

/// Writes a [`LayoutPlan`] to a single output file in parallel.
pub(crate) struct Writer {
    output_path: PathBuf,
    threads: usize,
}

impl Writer {
    /// Creates a new writer from configuration.
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            output_path: config.output_path.clone(),
            threads: config.worker_threads(),
        }
    }

    /// Writes the prompt and every record to the output file.
    ///
    /// Blocks until all records are written and the output is flushed.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker pool cannot start or the output file
    /// cannot be created, resized, mapped or flushed. Problems reading
    /// individual source files are reported in the returned [`WriteReport`].
    pub(crate) fn write(&self, plan: &LayoutPlan) -> Result<WriteReport> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(|i| format!("mergefiles-writer-{i}"))
            .build()?;

        info!(
            "Writing {} files ({} bytes) to {} with {} threads",
            plan.len(),
            plan.total_size(),
            self.output_path.display(),
            self.threads
        );

        let mut output = OutputMap::create(&self.output_path, plan.total_size())?;
        let report = fill(&mut output.map, plan, &pool);
        output.finish()?;

        debug!(
            "Wrote {} records, {} degraded",
            report.outcomes.len(),
            report.degraded()
        );
        Ok(report)
    }
}

/// Populates `buf`, which must be exactly `plan.total_size()` bytes long.
fn fill(buf: &mut [u8], plan: &LayoutPlan, pool: &ThreadPool) -> WriteReport {
    let (prompt_region, regions) = split_regions(buf, plan);
    prompt_region.copy_from_slice(plan.prompt().as_bytes());

    let outcomes = pool.install(|| {
        regions
            .into_par_iter()
            .with_max_len(1)
            .map(|(record, region)| fill_region(record, region))
            .collect::<Vec<_>>()
    });

    WriteReport { outcomes }
}

/// Cuts `buf` into the prompt region and one region per record.
///
/// Offsets advance by [`FileRecord::block_size`], the same quantity the
/// planner summed, so the final region ends exactly at the end of `buf`.
#[allow(clippy::cast_possible_truncation)] // every block fits: the total fits in usize
fn split_regions<'a>(
    buf: &'a mut [u8],
    plan: &'a LayoutPlan,
) -> (&'a mut [u8], Vec<(&'a FileRecord, &'a mut [u8])>) {
    let (prompt_region, mut rest) = buf.split_at_mut(plan.prompt().len());
    let mut regions = Vec::with_capacity(plan.len());

    for record in plan.records() {
        let (region, tail) = std::mem::take(&mut rest).split_at_mut(record.block_size() as usize);
        regions.push((record, region));
        rest = tail;
    }

    debug_assert!(rest.is_empty(), "layout plan does not cover the output");
    (prompt_region, regions)
}

/// Writes header, content and footer of one record into its own region.
#[allow(clippy::cast_possible_truncation)]
fn fill_region(record: &FileRecord, region: &mut [u8]) -> WriteOutcome {
    let (header, rest) = region.split_at_mut(record.header().len());
    let (content, footer) = rest.split_at_mut(record.content_size() as usize);

    header.copy_from_slice(record.header().as_bytes());
    footer.copy_from_slice(FOOTER.as_bytes());

    if content.is_empty() {
        return WriteOutcome::Complete;
    }

    read_content(record, content)
}

/// Reads the source file straight into `content`, never past its end.
fn read_content(record: &FileRecord, content: &mut [u8]) -> WriteOutcome {
    let mut file = match File::open(record.full_path()) {
        Ok(file) => file,
        Err(e) => {
            warn!(
                "Cannot open {}: {}; content left blank",
                record.full_path().display(),
                e
            );
            return WriteOutcome::Unreadable;
        }
    };

    let mut filled = 0;
    while filled < content.len() {
        match file.read(&mut content[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                warn!("Error reading {}: {}", record.full_path().display(), e);
                break;
            }
        }
    }

    if filled < content.len() {
        warn!(
            "Read {} of {} expected bytes from {}; remainder left blank",
            filled,
            content.len(),
            record.full_path().display()
        );
        return WriteOutcome::Truncated {
            read: filled as u64,
            expected: record.content_size(),
        };
    }

    WriteOutcome::Complete
}
