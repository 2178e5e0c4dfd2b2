//! # fwmap
//!
//! Field-mapping generator for firmware configuration headers.
//!
//! Builds on [`fwmap_header`] to turn every macro of a Marlin-style
//! `Configuration.h` into a categorized field entry, then writes "core" and
//! "full" JSON mapping documents, packed into parts of bounded size.
//!
//! ## Passes
//!
//! - [`MappingGenerator`]: categorize, attach conditional context and
//!   validation facts, split core/full, bind UI ids, pack and write
//! - [`Annotator`]: re-apply header facts to existing documents in place
//! - [`coverage_report`]: compare active macros with mapped names
//!
//! Static data (essential and critical names, category keywords, UI ids) lives
//! in [`MappingTables`], embedded by default and replaceable from a TOML file.
//!
//! ## Quick Start
//!
//! ```rust
//! use fwmap::{MappingConfig, MappingGenerator, MappingTables};
//! use fwmap_header::ParsedHeader;
//!
//! let tables = MappingTables::builtin().unwrap();
//! let config = MappingConfig::new("marlin", "2.1.x");
//! let generator = MappingGenerator::new(&config, &tables);
//!
//! let header = ParsedHeader::from_text("Configuration.h", "#define BAUDRATE 250000\n");
//! let mapping = generator.generate(&header).unwrap();
//! assert_eq!(mapping.split.full_defines(), 1);
//! ```

pub mod annotate;
pub mod batch;
pub mod categorize;
pub mod config;
pub mod coverage;
pub mod document;
pub mod entry;
pub mod error;
pub mod parts;
pub mod pipeline;
pub mod split;
pub mod tables;
pub mod ui;

pub use annotate::{annotate_documents, find_documents, AnnotateSummary, Annotator};
pub use batch::{discover_headers, generate_batch, BatchReport, HeaderJob, ScanFilter};
pub use categorize::{field_key, CategorizedFields, CategoryBucket, Categorizer, OTHER_CATEGORY};
pub use config::MappingConfig;
pub use coverage::{coverage_report, write_report, CoverageReport, UnmappedGroup};
pub use document::{build_document, DocumentMetadata, ExistingDocument, SetCount};
pub use entry::FieldMappingEntry;
pub use error::{MappingError, MappingResult};
pub use parts::{pack_parts, Part, PartLimits};
pub use pipeline::{output_file_name, FileSummary, GeneratedMapping, MappingGenerator};
pub use split::{split_core_full, CoreFullSplit};
pub use tables::{CategoryRule, MappingTables};
pub use ui::bind_ui_fields;
