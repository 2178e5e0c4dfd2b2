//! Packing of a field set into size-bounded parts
//!
//! Sizes are measured in lines of the pretty-printed JSON of each
//! `{category: fields}` object. Every part is charged a fixed overhead for the
//! metadata it repeats.

use crate::categorize::{CategorizedFields, CategoryBucket};
use crate::config::MappingConfig;
use crate::document::fields_to_object;
use crate::error::MappingResult;
use serde_json::{Map, Value};

/// Limits that drive packing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartLimits {
    pub max_lines: usize,
    pub header_overhead: usize,
    pub large_category_threshold: usize,
    pub chunk_size: usize,
}

impl Default for PartLimits {
    fn default() -> Self {
        Self::from(&MappingConfig::default())
    }
}

impl From<&MappingConfig> for PartLimits {
    fn from(config: &MappingConfig) -> Self {
        Self {
            max_lines: config.max_lines,
            header_overhead: config.header_overhead,
            large_category_threshold: config.large_category_threshold,
            chunk_size: config.chunk_size.max(1),
        }
    }
}

/// One packed part
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    /// 1-based part number
    pub number: usize,
    pub categories: CategorizedFields,
    /// Estimated lines, overhead included
    pub estimated_lines: usize,
}

/// Lines of `{name: fields}` pretty-printed
fn measure(bucket: &CategoryBucket) -> MappingResult<usize> {
    let mut wrapper = Map::new();
    wrapper.insert(
        bucket.name.clone(),
        Value::Object(fields_to_object(&bucket.fields)?),
    );
    let text = serde_json::to_string_pretty(&wrapper)?;
    Ok(text.lines().count())
}

/// Split oversized categories into `<name>_<n>` chunks
fn chunk_buckets(fields: &CategorizedFields, limits: &PartLimits) -> Vec<CategoryBucket> {
    let mut units = Vec::new();

    for bucket in fields.buckets() {
        if bucket.len() <= limits.large_category_threshold {
            units.push(bucket.clone());
            continue;
        }

        for (idx, chunk) in bucket.fields.chunks(limits.chunk_size).enumerate() {
            units.push(CategoryBucket {
                name: format!("{}_{}", bucket.name, idx + 1),
                fields: chunk.to_vec(),
            });
        }
    }

    units
}

/// Greedily pack categories into parts
///
/// A unit that would push the current part past `max_lines` starts a new
/// part, unless the current part is still empty. An empty field set yields a
/// single empty part so that a document is always produced.
pub fn pack_parts(fields: &CategorizedFields, limits: &PartLimits) -> MappingResult<Vec<Part>> {
    let mut parts = Vec::new();
    let mut current = CategorizedFields::new();
    let mut current_lines = limits.header_overhead;

    for unit in chunk_buckets(fields, limits) {
        let unit_lines = measure(&unit)?;

        if current_lines + unit_lines > limits.max_lines && !current.is_empty() {
            parts.push(Part {
                number: parts.len() + 1,
                categories: std::mem::take(&mut current),
                estimated_lines: current_lines,
            });
            current_lines = limits.header_overhead;
        }

        current.push_bucket(unit);
        current_lines += unit_lines;
    }

    if !current.is_empty() || parts.is_empty() {
        parts.push(Part {
            number: parts.len() + 1,
            categories: current,
            estimated_lines: current_lines,
        });
    }

    Ok(parts)
}
