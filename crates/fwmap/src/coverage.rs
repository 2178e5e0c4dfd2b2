//! Coverage of header macros by mapping documents

use crate::categorize::Categorizer;
use crate::document::{collect_maps_from, ExistingDocument};
use crate::error::{MappingError, MappingResult};
use crate::tables::MappingTables;
use fwmap_header::{parse_header_file, ParsedHeader};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{info, instrument};

static RE_INDEX_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\d+\]").unwrap());

/// Unmapped macros of one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmappedGroup {
    pub category: String,
    pub names: Vec<String>,
}

/// Comparison of active header macros against mapped names
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub headers: Vec<PathBuf>,
    pub documents: Vec<PathBuf>,
    pub total_active: usize,
    pub mapped_active: usize,
    pub coverage_percent: f64,
    pub unmapped: Vec<UnmappedGroup>,
    pub missing_critical: Vec<String>,
}

/// Whether an active macro counts toward coverage
///
/// Internal names (leading `_`) and include guards (`..._H`) are ignored.
pub fn is_countable(name: &str) -> bool {
    !name.starts_with('_') && !name.ends_with("_H")
}

/// Strip array indexing such as `[0]` from a `mapsFrom` name
pub fn normalize_mapped_name(name: &str) -> String {
    RE_INDEX_SUFFIX.replace_all(name, "").into_owned()
}

/// Active, countable macro names across headers, first occurrence order
pub fn active_macro_names(headers: &[ParsedHeader]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for header in headers {
        for record in header.scan.macros.active() {
            if is_countable(&record.name) && seen.insert(record.name.clone()) {
                names.push(record.name.clone());
            }
        }
    }

    names
}

/// Every name referenced by `mapsFrom` in the given documents
///
/// A malformed document is an error: a coverage number computed without it
/// would be wrong.
pub fn load_mapped_names(documents: &[PathBuf]) -> MappingResult<HashSet<String>> {
    let mut mapped = HashSet::new();

    for path in documents {
        let document = ExistingDocument::load(path)?;
        let mut names = Vec::new();
        for value in document.root.values() {
            collect_maps_from(value, &mut names);
        }
        mapped.extend(names.iter().map(|name| normalize_mapped_name(name)));
    }

    Ok(mapped)
}

impl CoverageReport {
    /// Compare `active` names against `mapped`
    pub fn compute(active: &[String], mapped: &HashSet<String>, tables: &MappingTables) -> Self {
        let categorizer = Categorizer::new(tables);
        let mut unmapped: Vec<UnmappedGroup> = Vec::new();
        let mut mapped_active = 0;

        for name in active {
            if mapped.contains(name) {
                mapped_active += 1;
                continue;
            }

            let category = categorizer.categorize(name);
            match unmapped.iter_mut().find(|g| g.category == category) {
                Some(group) => group.names.push(name.clone()),
                None => unmapped.push(UnmappedGroup {
                    category: category.to_string(),
                    names: vec![name.clone()],
                }),
            }
        }

        let missing_critical = tables
            .critical
            .iter()
            .filter(|name| !mapped.contains(name.as_str()))
            .cloned()
            .collect();

        let coverage_percent = if active.is_empty() {
            0.0
        } else {
            mapped_active as f64 * 100.0 / active.len() as f64
        };

        Self {
            headers: Vec::new(),
            documents: Vec::new(),
            total_active: active.len(),
            mapped_active,
            coverage_percent,
            unmapped,
            missing_critical,
        }
    }

    pub fn unmapped_count(&self) -> usize {
        self.unmapped.iter().map(|g| g.names.len()).sum()
    }

    /// Human-readable report
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "Field mapping coverage");
        for header in &self.headers {
            let _ = writeln!(out, "  header:   {}", header.display());
        }
        let _ = writeln!(out, "  documents: {}", self.documents.len());
        let _ = writeln!(out);
        let _ = writeln!(out, "Active defines:   {}", self.total_active);
        let _ = writeln!(out, "Mapped:           {}", self.mapped_active);
        let _ = writeln!(out, "Unmapped:         {}", self.unmapped_count());
        let _ = writeln!(out, "Coverage:         {:.1}%", self.coverage_percent);

        if !self.missing_critical.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Missing critical defines:");
            for name in &self.missing_critical {
                let _ = writeln!(out, "  - {name}");
            }
        }

        for group in &self.unmapped {
            let _ = writeln!(out);
            let _ = writeln!(out, "{} ({}):", group.category, group.names.len());
            for name in &group.names {
                let _ = writeln!(out, "  - {name}");
            }
        }

        out
    }
}

/// Read headers and documents from disk and compare them
#[instrument(skip_all, fields(headers = headers.len(), documents = documents.len()))]
pub fn coverage_report(
    headers: &[PathBuf],
    documents: &[PathBuf],
    max_file_size: usize,
    tables: &MappingTables,
) -> MappingResult<CoverageReport> {
    let parsed = headers
        .iter()
        .map(|path| parse_header_file(path, max_file_size))
        .collect::<Result<Vec<_>, _>>()?;

    let active = active_macro_names(&parsed);
    let mapped = load_mapped_names(documents)?;

    let mut report = CoverageReport::compute(&active, &mapped, tables);
    report.headers = headers.to_vec();
    report.documents = documents.to_vec();

    info!(
        active = report.total_active,
        mapped = report.mapped_active,
        missing_critical = report.missing_critical.len(),
        "Computed coverage"
    );

    Ok(report)
}

/// Write a report as JSON when `path` ends in `.json`, as text otherwise
pub fn write_report(report: &CoverageReport, path: &Path) -> MappingResult<()> {
    let content = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        let mut json = serde_json::to_string_pretty(report)?;
        json.push('\n');
        json
    } else {
        report.render_text()
    };

    fs::write(path, content).map_err(|e| MappingError::io(path, e))
}
