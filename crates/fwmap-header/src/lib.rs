//! # fwmap-header
//!
//! Scanner for firmware configuration headers (Marlin-style `Configuration.h`).
//!
//! ## Features
//!
//! - Extract active and commented-out `#define` declarations with leading comments
//! - Track the enclosing `#if`/`#ifdef`/`#ifndef`/`#elif`/`#else` chain per macro
//! - Flatten chains into positive and negative identifier dependencies
//! - Mine trailing comments for ranges, units, allowed values and hints
//!
//! Nothing is evaluated: conditions are recorded as text plus the identifiers
//! they mention.
//!
//! ## Quick Start
//!
//! ```rust
//! use fwmap_header::{resolve, ParsedHeader};
//!
//! let source = "#ifndef DELTA\n#define X_BED_SIZE 220 // (mm)\n#endif\n";
//! let header = ParsedHeader::from_text("Configuration.h", source);
//!
//! let record = header.scan.macros.get("X_BED_SIZE").unwrap();
//! let conditions = resolve(&record.conditional_chain);
//! assert_eq!(conditions.conditional_on_not, vec!["DELTA"]);
//! assert_eq!(header.validation["X_BED_SIZE"].unit.as_deref(), Some("mm"));
//! ```

pub mod conditionals;
pub mod dependencies;
pub mod error;
mod header;
pub mod scanner;
pub mod types;
pub mod validation;

pub use conditionals::{ConditionalFrame, ConditionalStack, Directive, FrameKind};
pub use dependencies::{resolve, Dependency, ResolvedConditions, ELSE_EXPRESSION};
pub use error::{HeaderError, HeaderResult};
pub use header::{parse_header_file, ParsedHeader, DEFAULT_MAX_FILE_SIZE};
pub use scanner::{read_header, scan_header, MacroRecord, MacroTable, ScanResult};
pub use types::{infer_type, ValueType};
pub use validation::{describe, extract_validation, mine_validation, Literal, ValidationFacts, ValidationMap};
