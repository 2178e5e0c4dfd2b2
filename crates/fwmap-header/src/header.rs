use crate::error::HeaderResult;
use crate::scanner::{read_header, scan_header, ScanResult};
use crate::validation::{mine_validation, ValidationMap};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Default ceiling on header size, matching typical parser limits
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// A configuration header after both passes
#[derive(Debug, Clone)]
pub struct ParsedHeader {
    pub path: PathBuf,
    pub scan: ScanResult,
    pub validation: ValidationMap,
}

impl ParsedHeader {
    /// Run the declaration scan and the validation pass over the same text
    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            path: path.into(),
            scan: scan_header(text),
            validation: mine_validation(text),
        }
    }

    /// File name of the header, used as `configFile` in output documents
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File stem, used to derive the output name suffix
    pub fn file_stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Read and analyze a header from disk
#[instrument(skip(max_file_size), fields(file = %path.display()))]
pub fn parse_header_file(path: &Path, max_file_size: usize) -> HeaderResult<ParsedHeader> {
    let text = read_header(path, max_file_size)?;
    let parsed = ParsedHeader::from_text(path, &text);

    info!(
        defines = parsed.scan.macros.len(),
        active = parsed.scan.macros.active().count(),
        conditional = parsed.scan.macros.iter().filter(|m| m.is_conditional()).count(),
        validated = parsed.validation.len(),
        "Scanned header"
    );

    Ok(parsed)
}
