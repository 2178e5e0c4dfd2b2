//! Static lookup tables
//!
//! Category keywords, the essential (core) macro set, critical macros and the
//! macro to UI-field table are data, not code. A default copy is compiled in;
//! a replacement can be loaded from a TOML file with the same shape.

use crate::error::{MappingError, MappingResult};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Tables format understood by this version
pub const TABLES_FORMAT_VERSION: u32 = 1;

const BUILTIN_TABLES: &str = include_str!("../tables/default.toml");
const BUILTIN_SOURCE: &str = "<builtin tables>";

/// One ordered category rule
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    /// Substrings of a macro name that select this category
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TablesFile {
    version: u32,
    #[serde(default)]
    essential: Vec<String>,
    #[serde(default)]
    critical: Vec<String>,
    categories: Vec<CategoryRule>,
    #[serde(default)]
    ui_fields: HashMap<String, String>,
}

/// Read-only lookup tables shared by every stage
#[derive(Debug, Clone)]
pub struct MappingTables {
    pub version: u32,
    pub categories: Vec<CategoryRule>,
    pub critical: Vec<String>,
    pub ui_fields: HashMap<String, String>,
    essential: HashSet<String>,
}

impl MappingTables {
    /// Tables compiled into the binary
    pub fn builtin() -> MappingResult<Self> {
        Self::from_toml_str(BUILTIN_TABLES, Path::new(BUILTIN_SOURCE))
    }

    /// Load tables from a TOML file
    pub fn load(path: &Path) -> MappingResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| MappingError::io(path, e))?;
        let tables = Self::from_toml_str(&text, path)?;
        debug!(
            path = %path.display(),
            categories = tables.categories.len(),
            essential = tables.essential.len(),
            "Loaded mapping tables"
        );
        Ok(tables)
    }

    /// Parse tables text; `source` only labels errors
    pub fn from_toml_str(text: &str, source: &Path) -> MappingResult<Self> {
        let file: TablesFile = toml::from_str(text).map_err(|e| MappingError::InvalidTables {
            path: source.to_path_buf(),
            source: e,
        })?;

        if file.version != TABLES_FORMAT_VERSION {
            return Err(MappingError::tables(
                source,
                format!(
                    "unsupported tables version {} (expected {})",
                    file.version, TABLES_FORMAT_VERSION
                ),
            ));
        }

        if file.categories.is_empty() {
            return Err(MappingError::tables(source, "no categories defined"));
        }

        if let Some(rule) = file.categories.iter().find(|r| r.name.trim().is_empty()) {
            return Err(MappingError::tables(
                source,
                format!("category with keywords {:?} has no name", rule.keywords),
            ));
        }

        Ok(Self {
            version: file.version,
            categories: file.categories,
            critical: file.critical,
            ui_fields: file.ui_fields,
            essential: file.essential.into_iter().collect(),
        })
    }

    /// Whether a macro belongs to the core set
    pub fn is_essential(&self, name: &str) -> bool {
        self.essential.contains(name)
    }

    pub fn essential_count(&self) -> usize {
        self.essential.len()
    }

    /// UI field identifier for a macro, if one is assigned
    pub fn ui_field(&self, name: &str) -> Option<&str> {
        self.ui_fields.get(name).map(String::as_str)
    }
}
