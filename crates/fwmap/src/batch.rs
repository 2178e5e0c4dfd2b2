//! Batch processing over many headers or documents

use crate::config::MappingConfig;
use crate::error::{MappingError, MappingResult};
use crate::pipeline::{FileSummary, MappingGenerator};
use crate::tables::MappingTables;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Successes and failures of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport<T> {
    pub successes: Vec<T>,
    /// Inputs that failed (path, error message)
    pub failures: Vec<(PathBuf, String)>,
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }
}

impl<T> BatchReport<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_success(&mut self, item: T) {
        self.successes.push(item);
    }

    pub fn add_failure(&mut self, path: PathBuf, error: impl ToString) {
        self.failures.push((path, error.to_string()));
    }

    /// Total number of inputs processed (success + failure)
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Success rate (0.0 to 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.successes.len() as f64 / self.total() as f64
        }
    }
}

mod duration_serde {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}

/// A header found in a `<scan_dir>/<firmware>/<version>/*.h` layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderJob {
    pub firmware: String,
    pub version: String,
    pub path: PathBuf,
}

/// Filters applied while scanning
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    pub firmware: Option<String>,
    pub version: Option<String>,
}

impl ScanFilter {
    fn accepts(&self, firmware: &str, version: &str) -> bool {
        self.firmware.as_deref().map_or(true, |f| f == firmware)
            && self.version.as_deref().map_or(true, |v| v == version)
    }
}

/// Find headers exactly two directories below `scan_dir`
///
/// Results are sorted by path. Unreadable directory entries are reported as
/// failures rather than aborting the scan.
pub fn discover_headers(
    scan_dir: &Path,
    filter: &ScanFilter,
) -> MappingResult<(Vec<HeaderJob>, Vec<(PathBuf, String)>)> {
    if !scan_dir.is_dir() {
        return Err(MappingError::MissingInput(scan_dir.to_path_buf()));
    }

    let mut jobs = Vec::new();
    let mut failures = Vec::new();

    for entry in WalkDir::new(scan_dir)
        .follow_links(false)
        .min_depth(3)
        .max_depth(3)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) => {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("h") {
                    continue;
                }

                let version_dir = path.parent();
                let firmware_dir = version_dir.and_then(Path::parent);
                let (Some(version), Some(firmware)) = (
                    version_dir.and_then(dir_name),
                    firmware_dir.and_then(dir_name),
                ) else {
                    continue;
                };

                if filter.accepts(&firmware, &version) {
                    jobs.push(HeaderJob {
                        firmware,
                        version,
                        path: path.to_path_buf(),
                    });
                }
            }
            Err(e) => {
                if let Some(path) = e.path() {
                    failures.push((path.to_path_buf(), e.to_string()));
                }
            }
        }
    }

    Ok((jobs, failures))
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

/// Generate mappings for every job; one failing header never stops the rest
pub fn generate_batch(
    jobs: &[HeaderJob],
    base: &MappingConfig,
    tables: &MappingTables,
) -> BatchReport<FileSummary> {
    let start = Instant::now();
    let mut report = BatchReport::new();

    info!(headers = jobs.len(), "Starting batch generation");

    for job in jobs {
        let config = MappingConfig {
            firmware: job.firmware.clone(),
            version: job.version.clone(),
            ..base.clone()
        };
        let generator = MappingGenerator::new(&config, tables);

        match generator.generate_file(&job.path) {
            Ok(summary) => report.add_success(summary),
            Err(e) => {
                warn!(file = %job.path.display(), error = %e, "Header failed");
                report.add_failure(job.path.clone(), e);
            }
        }
    }

    report.elapsed = start.elapsed();

    info!(
        succeeded = report.successes.len(),
        failed = report.failures.len(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Batch generation complete"
    );

    report
}
