//! Build metadata reported by `--version`.

use once_cell::sync::Lazy;

/// Crate version from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commit the binary was built from, injected at build time.
pub const COMMIT: &str = match option_env!("MERGEFILES_COMMIT") {
    Some(commit) => commit,
    None => "HEAD",
};

/// Build date, injected at build time.
pub const BUILD_DATE: &str = match option_env!("MERGEFILES_BUILD_DATE") {
    Some(date) => date,
    None => "unknown",
};

static BUILD_VERSION: Lazy<String> = Lazy::new(|| {
    format!(
        "{VERSION}\ncommit: {COMMIT}\nbuilt at: {BUILD_DATE}\nos: {}\narch: {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    )
});

/// Multi-line version report: version, commit, build date, OS and arch.
#[must_use]
pub fn build_version() -> &'static str {
    BUILD_VERSION.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_version_lines() {
        let report = build_version();
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], VERSION);
        assert!(lines[1].starts_with("commit: "));
        assert!(lines[2].starts_with("built at: "));
        assert_eq!(lines[3], format!("os: {}", std::env::consts::OS));
        assert_eq!(lines[4], format!("arch: {}", std::env::consts::ARCH));
    }
}
