//! Category assignment and field key derivation

use crate::entry::FieldMappingEntry;
use crate::tables::MappingTables;

/// Bucket for macros no rule matches
pub const OTHER_CATEGORY: &str = "other";

const KEY_PREFIXES: [&str; 4] = ["DEFAULT_", "ENABLE_", "USE_", "HAS_"];

/// Assigns macros to categories by ordered keyword rules
#[derive(Debug, Clone, Copy)]
pub struct Categorizer<'a> {
    tables: &'a MappingTables,
}

impl<'a> Categorizer<'a> {
    pub fn new(tables: &'a MappingTables) -> Self {
        Self { tables }
    }

    /// First category with a keyword contained in `name`, else [`OTHER_CATEGORY`]
    pub fn categorize(&self, name: &str) -> &'a str {
        self.tables
            .categories
            .iter()
            .find(|rule| rule.keywords.iter().any(|kw| name.contains(kw.as_str())))
            .map(|rule| rule.name.as_str())
            .unwrap_or(OTHER_CATEGORY)
    }
}

/// Derive a lower-camel-case field key from a macro name
///
/// At most one of `DEFAULT_`, `ENABLE_`, `USE_`, `HAS_` is stripped first.
pub fn field_key(name: &str) -> String {
    let stripped = KEY_PREFIXES
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .unwrap_or(name);

    let mut key = String::with_capacity(stripped.len());
    for (idx, segment) in stripped.split('_').enumerate() {
        if idx == 0 {
            key.push_str(&segment.to_lowercase());
        } else {
            key.push_str(&crate::config::capitalize(segment));
        }
    }
    key
}

/// Fields of one category, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryBucket {
    pub name: String,
    pub fields: Vec<(String, FieldMappingEntry)>,
}

impl CategoryBucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Insert a field; an existing key keeps its slot and takes the new entry
    pub fn insert(&mut self, key: String, entry: FieldMappingEntry) {
        match self.fields.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = entry,
            None => self.fields.push((key, entry)),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Category buckets ordered by first encounter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorizedFields {
    buckets: Vec<CategoryBucket>,
}

impl CategorizedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket for `category`, created at the end if new
    pub fn bucket_mut(&mut self, category: &str) -> &mut CategoryBucket {
        let idx = match self.buckets.iter().position(|b| b.name == category) {
            Some(idx) => idx,
            None => {
                self.buckets.push(CategoryBucket::new(category));
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[idx]
    }

    /// Append a complete bucket; empty buckets are dropped
    pub fn push_bucket(&mut self, bucket: CategoryBucket) {
        if !bucket.is_empty() {
            self.buckets.push(bucket);
        }
    }

    pub fn get(&self, category: &str) -> Option<&CategoryBucket> {
        self.buckets.iter().find(|b| b.name == category)
    }

    pub fn buckets(&self) -> &[CategoryBucket] {
        &self.buckets
    }

    pub fn buckets_mut(&mut self) -> impl Iterator<Item = &mut CategoryBucket> {
        self.buckets.iter_mut()
    }

    pub fn category_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total fields across all buckets
    pub fn field_count(&self) -> usize {
        self.buckets.iter().map(CategoryBucket::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Every entry, bucket by bucket
    pub fn entries(&self) -> impl Iterator<Item = &FieldMappingEntry> {
        self.buckets
            .iter()
            .flat_map(|b| b.fields.iter().map(|(_, entry)| entry))
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut FieldMappingEntry> {
        self.buckets
            .iter_mut()
            .flat_map(|b| b.fields.iter_mut().map(|(_, entry)| entry))
    }
}
