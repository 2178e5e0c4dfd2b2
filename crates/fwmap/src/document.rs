//! Mapping documents: metadata, category objects and a trailing count

use crate::categorize::CategorizedFields;
use crate::entry::FieldMappingEntry;
use crate::error::{MappingError, MappingResult};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level keys that are never categories
pub const METADATA_KEYS: [&str; 8] = [
    "$schema",
    "version",
    "firmware",
    "configFile",
    "generatedFrom",
    "totalDefines",
    "coreDefines",
    "fullDefines",
];

pub fn is_metadata_key(key: &str) -> bool {
    METADATA_KEYS.contains(&key)
}

/// Leading metadata shared by every part of an output set
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMetadata {
    pub schema: String,
    pub version: String,
    pub firmware: String,
    pub config_file: String,
    pub generated_from: String,
    pub total_defines: usize,
}

impl DocumentMetadata {
    fn write_into(&self, root: &mut Map<String, Value>) {
        root.insert("$schema".into(), Value::from(self.schema.clone()));
        root.insert("version".into(), Value::from(self.version.clone()));
        root.insert("firmware".into(), Value::from(self.firmware.clone()));
        root.insert("configFile".into(), Value::from(self.config_file.clone()));
        root.insert(
            "generatedFrom".into(),
            Value::from(self.generated_from.clone()),
        );
        root.insert("totalDefines".into(), Value::from(self.total_defines));
    }
}

/// Which output set a document belongs to, with its field count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetCount {
    Core(usize),
    Full(usize),
}

impl SetCount {
    pub fn key(&self) -> &'static str {
        match self {
            SetCount::Core(_) => "coreDefines",
            SetCount::Full(_) => "fullDefines",
        }
    }

    pub fn count(&self) -> usize {
        match self {
            SetCount::Core(n) | SetCount::Full(n) => *n,
        }
    }

    /// `core` or `full`, used for directory and file names
    pub fn set_name(&self) -> &'static str {
        match self {
            SetCount::Core(_) => "core",
            SetCount::Full(_) => "full",
        }
    }
}

/// Serialize one bucket's fields as a JSON object
pub fn fields_to_object(
    fields: &[(String, FieldMappingEntry)],
) -> MappingResult<Map<String, Value>> {
    let mut object = Map::new();
    for (key, entry) in fields {
        object.insert(key.clone(), serde_json::to_value(entry)?);
    }
    Ok(object)
}

/// Build a complete document: metadata, categories in order, then the count
pub fn build_document(
    metadata: &DocumentMetadata,
    categories: &CategorizedFields,
    count: Option<SetCount>,
) -> MappingResult<Map<String, Value>> {
    let mut root = Map::new();
    metadata.write_into(&mut root);

    for bucket in categories.buckets() {
        root.insert(
            bucket.name.clone(),
            Value::Object(fields_to_object(&bucket.fields)?),
        );
    }

    if let Some(count) = count {
        root.insert(count.key().into(), Value::from(count.count()));
    }

    Ok(root)
}

/// Pretty-print with two-space indentation and a trailing newline
pub fn render(root: &Map<String, Value>) -> MappingResult<String> {
    let mut text = serde_json::to_string_pretty(root)?;
    text.push('\n');
    Ok(text)
}

pub fn write_document(path: &Path, root: &Map<String, Value>) -> MappingResult<()> {
    let text = render(root)?;
    fs::write(path, text).map_err(|e| MappingError::io(path, e))
}

/// A mapping document read back from disk
#[derive(Debug, Clone)]
pub struct ExistingDocument {
    pub path: PathBuf,
    pub root: Map<String, Value>,
}

impl ExistingDocument {
    /// Read and parse; invalid JSON or a non-object root is an error
    pub fn load(path: &Path) -> MappingResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| MappingError::io(path, e))?;
        let value: Value =
            serde_json::from_str(&text).map_err(|e| MappingError::MalformedDocument {
                path: path.to_path_buf(),
                source: e,
            })?;

        match value {
            Value::Object(root) => Ok(Self {
                path: path.to_path_buf(),
                root,
            }),
            _ => Err(MappingError::NotAnObject(path.to_path_buf())),
        }
    }

    /// Visit every field entry of every category object
    ///
    /// The closure returns true when it changed the entry; changed entries are
    /// written back. Entries that do not parse as field mappings are skipped.
    /// Returns the number of changed entries.
    pub fn update_entries<F>(&mut self, mut update: F) -> MappingResult<usize>
    where
        F: FnMut(&str, &mut FieldMappingEntry) -> bool,
    {
        let mut changed = 0;

        for (category, value) in self.root.iter_mut() {
            if is_metadata_key(category) {
                continue;
            }
            let Value::Object(fields) = value else {
                continue;
            };

            for (field_key, field_value) in fields.iter_mut() {
                if !field_value.is_object() {
                    continue;
                }
                let mut entry: FieldMappingEntry =
                    match serde_json::from_value(field_value.clone()) {
                        Ok(entry) => entry,
                        Err(e) => {
                            debug!(category = %category, field = %field_key, error = %e, "Skipping unreadable entry");
                            continue;
                        }
                    };

                if update(category, &mut entry) {
                    *field_value = serde_json::to_value(&entry)?;
                    changed += 1;
                }
            }
        }

        Ok(changed)
    }

    pub fn save(&self) -> MappingResult<()> {
        write_document(&self.path, &self.root)
    }
}

/// Collect every string under any `mapsFrom` key, anywhere in the tree
pub fn collect_maps_from(value: &Value, into: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == "mapsFrom" {
                    if let Value::Array(names) = child {
                        into.extend(names.iter().filter_map(Value::as_str).map(str::to_string));
                        continue;
                    }
                }
                collect_maps_from(child, into);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_maps_from(item, into);
            }
        }
        _ => {}
    }
}
