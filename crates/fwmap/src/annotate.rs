//! Re-apply header-derived facts to existing mapping documents
//!
//! Documents may have been edited by hand since they were generated. Only
//! conditional fields, validation facts and UI ids are touched; every other
//! key is written back as it was read.

use crate::batch::BatchReport;
use crate::document::ExistingDocument;
use crate::entry::FieldMappingEntry;
use crate::error::{MappingError, MappingResult};
use crate::tables::MappingTables;
use crate::ui::bind_entry;
use fwmap_header::{resolve, ParsedHeader};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Outcome for one annotated document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotateSummary {
    pub document: PathBuf,
    pub fields_updated: usize,
}

/// Applies one header's facts to mapping entries
#[derive(Debug, Clone, Copy)]
pub struct Annotator<'a> {
    header: &'a ParsedHeader,
    tables: &'a MappingTables,
    bind_ui: bool,
}

impl<'a> Annotator<'a> {
    pub fn new(header: &'a ParsedHeader, tables: &'a MappingTables, bind_ui: bool) -> Self {
        Self {
            header,
            tables,
            bind_ui,
        }
    }

    /// Update one entry; returns true if anything changed
    ///
    /// Entries whose macro is not declared in the header keep their
    /// conditional fields.
    pub fn annotate_entry(&self, entry: &mut FieldMappingEntry) -> bool {
        let Some(name) = entry.source_macro().map(str::to_string) else {
            return false;
        };
        let before = entry.clone();

        if let Some(record) = self.header.scan.macros.get(&name) {
            entry.apply_conditions(&resolve(&record.conditional_chain));
        }
        if let Some(facts) = self.header.validation.get(&name) {
            entry.reapply_validation(facts);
        }
        if self.bind_ui {
            bind_entry(entry, self.tables);
        }

        *entry != before
    }

    /// Update every entry of a loaded document; returns the number changed
    pub fn annotate_document(&self, document: &mut ExistingDocument) -> MappingResult<usize> {
        document.update_entries(|_, entry| self.annotate_entry(entry))
    }

    /// Load, annotate and rewrite a document if it changed
    #[instrument(skip(self, path), fields(document = %path.display()))]
    pub fn annotate_file(&self, path: &Path) -> MappingResult<AnnotateSummary> {
        let mut document = ExistingDocument::load(path)?;
        let fields_updated = self.annotate_document(&mut document)?;

        if fields_updated > 0 {
            document.save()?;
        }
        debug!(updated = fields_updated, "Annotated document");

        Ok(AnnotateSummary {
            document: path.to_path_buf(),
            fields_updated,
        })
    }
}

/// Documents in `dir` matching a glob `pattern`, sorted
///
/// The pattern is relative to `dir` and may use `**`.
pub fn find_documents(dir: &Path, pattern: &str) -> MappingResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(MappingError::MissingInput(dir.to_path_buf()));
    }

    let full_pattern = dir.join(pattern);
    let full_pattern = full_pattern.to_string_lossy();
    let paths = glob::glob(&full_pattern).map_err(|e| MappingError::Pattern {
        pattern: pattern.to_string(),
        source: e,
    })?;

    let mut documents: Vec<PathBuf> = paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "Unreadable path while matching documents");
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    documents.sort();

    if documents.is_empty() {
        return Err(MappingError::NoMatches {
            dir: dir.to_path_buf(),
            pattern: pattern.to_string(),
        });
    }

    Ok(documents)
}

/// Annotate every matching document; a malformed document fails alone
pub fn annotate_documents(
    annotator: &Annotator<'_>,
    documents: &[PathBuf],
) -> BatchReport<AnnotateSummary> {
    let start = Instant::now();
    let mut report = BatchReport::new();

    for path in documents {
        match annotator.annotate_file(path) {
            Ok(summary) => report.add_success(summary),
            Err(e) => {
                warn!(document = %path.display(), error = %e, "Document failed");
                report.add_failure(path.clone(), e);
            }
        }
    }

    report.elapsed = start.elapsed();

    info!(
        documents = documents.len(),
        updated_fields = report.successes.iter().map(|s| s.fields_updated).sum::<usize>(),
        failed = report.failures.len(),
        "Annotation complete"
    );

    report
}
