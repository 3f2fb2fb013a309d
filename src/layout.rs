//! Output layout planning.
//!
//! A [`LayoutPlan`] fixes, before any byte is written, where every record
//! lands in the output file: the prompt at offset 0, then each record's
//! header, content and footer back to back in record order.

use crate::file::FileRecord;

/// The prompt, the ordered records and the exact output size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPlan {
    prompt: String,
    records: Vec<FileRecord>,
    total_size: u64,
}

impl LayoutPlan {
    /// Creates an empty plan whose size is seeded with the prompt length.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        let total_size = prompt.len() as u64;
        Self {
            prompt,
            records: Vec::new(),
            total_size,
        }
    }

    /// Appends a record and grows the planned size by its block size.
    pub fn push(&mut self, record: FileRecord) {
        self.total_size += record.block_size();
        self.records.push(record);
    }

    /// Prompt written at offset 0.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Records in discovery order.
    #[must_use]
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// Exact byte length of the output file.
    #[must_use]
    pub const fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no file was accepted; callers must not produce output.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Start offset of every record, in record order.
    pub fn offsets(&self) -> impl Iterator<Item = u64> + '_ {
        self.records.iter().scan(self.prompt.len() as u64, |offset, record| {
            let start = *offset;
            *offset += record.block_size();
            Some(start)
        })
    }
}

impl Extend<FileRecord> for LayoutPlan {
    fn extend<I: IntoIterator<Item = FileRecord>>(&mut self, iter: I) {
        for record in iter {
            self.push(record);
        }
    }
}
