//! Mapping generation for a single header

use crate::categorize::{field_key, CategorizedFields, Categorizer};
use crate::config::MappingConfig;
use crate::document::{build_document, write_document, DocumentMetadata, SetCount};
use crate::entry::FieldMappingEntry;
use crate::error::{MappingError, MappingResult};
use crate::parts::{pack_parts, Part, PartLimits};
use crate::split::{split_core_full, CoreFullSplit};
use crate::tables::MappingTables;
use crate::ui::bind_ui_fields;
use fwmap_header::{parse_header_file, ParsedHeader};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Output name suffix derived from a header's file stem
pub fn config_suffix(stem: &str) -> &'static str {
    if stem.contains("_adv") {
        "-adv"
    } else if stem.contains("_backend") {
        "-backend"
    } else if stem.contains("_speed") {
        "-speed"
    } else {
        ""
    }
}

/// File name for one part of one output set
pub fn output_file_name(
    firmware: &str,
    suffix: &str,
    set_name: &str,
    part: Option<usize>,
) -> String {
    match part {
        Some(n) => format!("{firmware}-config{suffix}-mapping-{set_name}-part{n}.json"),
        None => format!("{firmware}-config{suffix}-mapping-{set_name}.json"),
    }
}

/// Counts reported after processing one header
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileSummary {
    pub header: PathBuf,
    pub defines_found: usize,
    pub fields_categorized: usize,
    pub categories: usize,
    pub core_fields: usize,
    pub ui_bound: usize,
    pub outputs: Vec<PathBuf>,
}

/// In-memory result of the generation pipeline
#[derive(Debug, Clone)]
pub struct GeneratedMapping {
    pub metadata: DocumentMetadata,
    pub split: CoreFullSplit,
    pub ui_bound: usize,
    pub core_parts: Vec<Part>,
    pub full_parts: Vec<Part>,
    /// Output name suffix (`-adv`, `-backend`, `-speed` or empty)
    pub suffix: &'static str,
}

impl GeneratedMapping {
    /// Every document to write, as (file name, subdirectory, content)
    pub fn documents(&self) -> MappingResult<Vec<(String, &'static str, Map<String, Value>)>> {
        let mut documents = Vec::new();

        let sets = [
            (SetCount::Core(self.split.core_defines()), &self.core_parts),
            (SetCount::Full(self.split.full_defines()), &self.full_parts),
        ];

        for (count, parts) in sets {
            let numbered = parts.len() > 1;
            for part in parts {
                let name = output_file_name(
                    &self.metadata.firmware,
                    self.suffix,
                    count.set_name(),
                    numbered.then_some(part.number),
                );
                let root = build_document(&self.metadata, &part.categories, Some(count))?;
                documents.push((name, count.set_name(), root));
            }
        }

        Ok(documents)
    }
}

/// Runs categorization, splitting, UI binding and packing
#[derive(Debug, Clone, Copy)]
pub struct MappingGenerator<'a> {
    config: &'a MappingConfig,
    tables: &'a MappingTables,
}

impl<'a> MappingGenerator<'a> {
    pub fn new(config: &'a MappingConfig, tables: &'a MappingTables) -> Self {
        Self { config, tables }
    }

    pub fn config(&self) -> &MappingConfig {
        self.config
    }

    /// Categorize every macro of a header into field entries
    ///
    /// Conditional context and validation facts are applied here, so the
    /// result is complete before it is split.
    pub fn build_fields(&self, header: &ParsedHeader) -> CategorizedFields {
        let categorizer = Categorizer::new(self.tables);
        let file_location = header.file_name();
        let mut fields = CategorizedFields::new();

        for record in &header.scan.macros {
            let mut entry = FieldMappingEntry::from_record(record, &file_location);
            if let Some(facts) = header.validation.get(&record.name) {
                entry.apply_validation(facts);
            }

            let category = categorizer.categorize(&record.name);
            fields
                .bucket_mut(category)
                .insert(field_key(&record.name), entry);
        }

        fields
    }

    /// Full in-memory pipeline for one parsed header
    pub fn generate(&self, header: &ParsedHeader) -> MappingResult<GeneratedMapping> {
        self.config.validate().map_err(MappingError::InvalidConfig)?;

        let fields = self.build_fields(header);
        let mut split = split_core_full(&fields, self.tables);

        let ui_bound = if self.config.bind_ui {
            bind_ui_fields(&mut split.core, self.tables)
        } else {
            0
        };

        let limits = PartLimits::from(self.config);
        let core_parts = pack_parts(&split.core, &limits)?;
        let full_parts = pack_parts(&split.full, &limits)?;

        debug!(
            categories = fields.category_count(),
            core = split.core_defines(),
            full = split.full_defines(),
            core_parts = core_parts.len(),
            full_parts = full_parts.len(),
            "Built mapping sets"
        );

        Ok(GeneratedMapping {
            metadata: DocumentMetadata {
                schema: self.config.schema_title(),
                version: self.config.version.clone(),
                firmware: self.config.firmware.clone(),
                config_file: header.file_name(),
                generated_from: header.path.display().to_string(),
                total_defines: header.scan.macros.len(),
            },
            split,
            ui_bound,
            core_parts,
            full_parts,
            suffix: config_suffix(&header.file_stem()),
        })
    }

    /// Write a generated mapping under `<output_dir>/<firmware>/<version>/{core,full}/`
    pub fn write(&self, mapping: &GeneratedMapping) -> MappingResult<Vec<PathBuf>> {
        let base = self.config.version_dir();
        let mut written = Vec::new();

        for (name, set_dir, root) in mapping.documents()? {
            let dir = base.join(set_dir);
            fs::create_dir_all(&dir).map_err(|e| MappingError::io(&dir, e))?;

            let path = dir.join(name);
            write_document(&path, &root)?;
            debug!(path = %path.display(), "Wrote mapping document");
            written.push(path);
        }

        Ok(written)
    }

    /// Read, generate and write for one header file
    #[instrument(skip(self, path), fields(file = %path.display(), firmware = %self.config.firmware, version = %self.config.version))]
    pub fn generate_file(&self, path: &Path) -> MappingResult<FileSummary> {
        let header = parse_header_file(path, self.config.max_file_size)?;
        let mapping = self.generate(&header)?;
        let outputs = self.write(&mapping)?;

        let summary = FileSummary {
            header: path.to_path_buf(),
            defines_found: header.scan.macros.len(),
            fields_categorized: mapping.split.full_defines(),
            categories: mapping.split.full.category_count(),
            core_fields: mapping.split.core_defines(),
            ui_bound: mapping.ui_bound,
            outputs,
        };

        info!(
            defines = summary.defines_found,
            categorized = summary.fields_categorized,
            core = summary.core_fields,
            ui_bound = summary.ui_bound,
            files = summary.outputs.len(),
            "Generated mappings"
        );

        Ok(summary)
    }
}
