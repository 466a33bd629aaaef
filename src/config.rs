use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::scanner::{CandidateFilter, ScanOptions};

/// File-backed settings. Every field is optional in the file and falls back
/// to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Connect and exchange timeout per probe, in milliseconds.
    pub timeout_ms: u64,
    /// Probes in flight at once; 1 scans sequentially.
    pub concurrency: usize,
    pub process_marker: String,
    pub argument_marker: String,
    /// Listen address for the HTTP surface.
    pub bind: String,
}

impl Default for Settings {
    fn default() -> Self {
        let filter = CandidateFilter::default();
        Self {
            timeout_ms: 5_000,
            concurrency: 1,
            process_marker: filter.process_marker,
            argument_marker: filter.argument_marker,
            bind: "127.0.0.1:8080".into(),
        }
    }
}

impl Settings {
    /// Parse settings from JSON text.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("invalid settings JSON")
    }

    /// Load settings from a file. Errors if it cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("failed to parse settings file: {}", path.display()))
    }

    /// Load settings from a file, or defaults if the file does not exist.
    /// A file that exists but is invalid is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            filter: CandidateFilter {
                process_marker: self.process_marker.clone(),
                argument_marker: self.argument_marker.clone(),
            },
            timeout: self.timeout(),
            concurrency: self.concurrency.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_object_is_all_defaults() {
        assert_eq!(Settings::from_json_str("{}").unwrap(), Settings::default());
    }

    #[test]
    fn partial_file_overrides_some_fields() {
        let s = Settings::from_json_str(r#"{"timeout_ms": 1500, "argument_marker": "fabric"}"#)
            .unwrap();
        assert_eq!(s.timeout(), Duration::from_millis(1500));
        assert_eq!(s.argument_marker, "fabric");
        assert_eq!(s.process_marker, "java");
        assert_eq!(s.concurrency, 1);
    }

    #[test]
    fn zero_concurrency_scans_sequentially() {
        let s = Settings {
            concurrency: 0,
            ..Settings::default()
        };
        assert_eq!(s.scan_options().concurrency, 1);
    }

    #[test]
    fn load_reads_file_and_reports_bad_json() {
        let mut good = tempfile::NamedTempFile::new().unwrap();
        write!(good, r#"{{"concurrency": 4, "bind": "127.0.0.1:9000"}}"#).unwrap();
        let s = Settings::load(good.path()).unwrap();
        assert_eq!(s.concurrency, 4);
        assert_eq!(s.bind, "127.0.0.1:9000");

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "not json").unwrap();
        let err = Settings::load_or_default(bad.path()).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse settings file"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load_or_default(dir.path().join("absent.json")).unwrap();
        assert_eq!(s, Settings::default());
    }
}
