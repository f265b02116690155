//! Host Xcode toolchain version.
//!
//! Some simctl subcommands only exist from a certain Xcode release onward
//! (screenshot capture arrived in 8.2). The [`Simctl`](crate::simctl::Simctl)
//! gateway detects the version once at construction and consults it before
//! invoking gated commands, instead of parsing failures out of the utility.

use std::fmt;
use std::process::Command;

/// Version of the installed Xcode toolchain.
///
/// Ordered numerically, so capability gates read as plain comparisons:
/// `version >= XcodeVersion::new(8, 2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct XcodeVersion {
    /// Major release number.
    pub major: u32,
    /// Minor release number.
    pub minor: u32,
}

impl XcodeVersion {
    /// Creates a version from its components.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Detects the installed version by running `xcodebuild -version`.
    ///
    /// Returns `None` when the tool is missing, exits non-zero, or prints
    /// output this parser does not recognize. Gated commands then fail with
    /// [`Error::UnsupportedCommand`](crate::error::Error::UnsupportedCommand).
    pub fn detect() -> Option<Self> {
        let output = Command::new("xcodebuild").arg("-version").output().ok()?;
        if !output.status.success() {
            return None;
        }
        Self::parse(&String::from_utf8_lossy(&output.stdout))
    }

    /// Parses the first line of `xcodebuild -version` output, e.g.
    /// `"Xcode 15.2\nBuild version 15C500b"`.
    pub fn parse(output: &str) -> Option<Self> {
        let line = output.lines().next()?;
        let version = line.strip_prefix("Xcode ")?.trim();
        let mut parts = version.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().and_then(|m| m.parse().ok()).unwrap_or(0);
        Some(Self::new(major, minor))
    }
}

impl fmt::Display for XcodeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_output() {
        let parsed = XcodeVersion::parse("Xcode 15.2\nBuild version 15C500b");
        assert_eq!(parsed, Some(XcodeVersion::new(15, 2)));
    }

    #[test]
    fn parses_major_only_version() {
        let parsed = XcodeVersion::parse("Xcode 26\nBuild version 17A321");
        assert_eq!(parsed, Some(XcodeVersion::new(26, 0)));
    }

    #[test]
    fn parses_three_component_version() {
        // Patch component is ignored; ordering only needs major.minor.
        let parsed = XcodeVersion::parse("Xcode 14.3.1\nBuild version 14E300c");
        assert_eq!(parsed, Some(XcodeVersion::new(14, 3)));
    }

    #[test]
    fn rejects_unrecognized_output() {
        assert_eq!(XcodeVersion::parse("xcodebuild: command not found"), None);
        assert_eq!(XcodeVersion::parse(""), None);
        assert_eq!(XcodeVersion::parse("Xcode "), None);
    }

    #[test]
    fn orders_numerically() {
        assert!(XcodeVersion::new(8, 2) > XcodeVersion::new(8, 1));
        assert!(XcodeVersion::new(10, 0) > XcodeVersion::new(8, 2));
        assert!(XcodeVersion::new(8, 10) > XcodeVersion::new(8, 2));
        assert_eq!(XcodeVersion::new(8, 2), XcodeVersion::new(8, 2));
    }

    #[test]
    fn display_roundtrip() {
        assert_eq!(XcodeVersion::new(15, 2).to_string(), "15.2");
    }
}
