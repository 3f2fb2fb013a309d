use std::path::{Component, Path, PathBuf};

/// Opening delimiter before the relative path.
const HEADER_PREFIX: &str = "--- START FILE: ";

/// Closing delimiter after the relative path, followed by the code fence.
const HEADER_SUFFIX: &str = " ---\n```\n";

/// Fixed text written after every file's content.
pub const FOOTER: &str = "\n```\n--- END FILE ---\n\n";

/// Byte length of [`FOOTER`].
pub const FOOTER_SIZE: u64 = FOOTER.len() as u64;

/// Renders the header that introduces a file in the merged output.
#[must_use]
pub fn render_header(relative_path: &str) -> String {
    let mut header =
        String::with_capacity(HEADER_PREFIX.len() + relative_path.len() + HEADER_SUFFIX.len());
    header.push_str(HEADER_PREFIX);
    header.push_str(relative_path);
    header.push_str(HEADER_SUFFIX);
    header
}

/// Joins the normal components of `path` with `/`.
///
/// Headers must read the same on every platform, so the native separator
/// is never used. Non-UTF-8 name bytes are replaced with U+FFFD rather than
/// copied raw; header sizes are taken from the replaced text, so the layout
/// stays exact.
#[must_use]
pub(crate) fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            Component::ParentDir => Some("..".into()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Describes one source file and the bytes it occupies in the output.
///
/// Records are created once by the scanner and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    relative_path: String,
    full_path: PathBuf,
    header: String,
    content_size: u64,
}

impl FileRecord {
    /// Creates a record, rendering its header from `relative_path`.
    #[must_use]
    pub fn new(relative_path: String, full_path: PathBuf, content_size: u64) -> Self {
        let header = render_header(&relative_path);
        Self {
            relative_path,
            full_path,
            header,
            content_size,
        }
    }

    /// Slash-separated path relative to the source root.
    #[must_use]
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Absolute path used to read the content.
    #[must_use]
    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    /// Rendered header text.
    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Content size in bytes as reported by the filesystem at scan time.
    #[must_use]
    pub const fn content_size(&self) -> u64 {
        self.content_size
    }

    /// Header size in bytes.
    #[must_use]
    pub fn header_size(&self) -> u64 {
        self.header.len() as u64
    }

    /// Footer size in bytes; identical for every record.
    #[must_use]
    pub const fn footer_size(&self) -> u64 {
        FOOTER_SIZE
    }

    /// Total bytes this record occupies: header, content and footer.
    ///
    /// The planner and the writer both size records through this method.
    #[must_use]
    pub fn block_size(&self) -> u64 {
        self.header_size() + self.content_size + self.footer_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_header() {
        assert_eq!(
            render_header("src/main.rs"),
            "--- START FILE: src/main.rs ---\n```\n"
        );
    }

    #[test]
    fn test_footer_size_matches_template() {
        assert_eq!(FOOTER_SIZE, 23);
        assert_eq!(FOOTER_SIZE, FOOTER.len() as u64);
    }

    #[test]
    fn test_record_sizes() {
        let record = FileRecord::new("x.go".to_string(), PathBuf::from("/tmp/x.go"), 13);

        assert_eq!(record.header(), "--- START FILE: x.go ---\n```\n");
        assert_eq!(record.header_size(), record.header().len() as u64);
        assert_eq!(record.content_size(), 13);
        assert_eq!(record.footer_size(), FOOTER_SIZE);
        assert_eq!(
            record.block_size(),
            record.header_size() + 13 + record.footer_size()
        );
    }

    #[test]
    fn test_header_size_counts_bytes_not_chars() {
        let record = FileRecord::new("ä.txt".to_string(), PathBuf::from("/tmp/ä.txt"), 0);
        assert_eq!(record.header_size(), render_header("ä.txt").len() as u64);
        assert!(record.header_size() > render_header("ä.txt").chars().count() as u64);
    }

    #[test]
    fn test_to_slash() {
        let path: PathBuf = ["nested", "dir", "file.rs"].iter().collect();
        assert_eq!(to_slash(&path), "nested/dir/file.rs");
        assert_eq!(to_slash(Path::new("file.rs")), "file.rs");
    }

    #[cfg(unix)]
    #[test]
    fn test_to_slash_replaces_invalid_utf8() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new("dir").join(OsStr::from_bytes(b"bad\xffname.txt"));
        let slashed = to_slash(&path);
        let record = FileRecord::new(slashed.clone(), path, 0);

        assert_eq!(slashed, "dir/bad\u{fffd}name.txt");
        assert_eq!(record.header_size(), render_header(&slashed).len() as u64);
    }
}
