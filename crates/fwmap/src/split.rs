use crate::categorize::{CategorizedFields, CategoryBucket};
use crate::tables::MappingTables;

/// The two output sets for one header
#[derive(Debug, Clone, PartialEq)]
pub struct CoreFullSplit {
    /// Entries whose source macro is essential; empty categories are absent
    pub core: CategorizedFields,
    /// Every entry
    pub full: CategorizedFields,
}

impl CoreFullSplit {
    pub fn core_defines(&self) -> usize {
        self.core.field_count()
    }

    pub fn full_defines(&self) -> usize {
        self.full.field_count()
    }
}

/// Partition categorized fields into core and full sets
///
/// Both sets own independent clones, so binding UI ids onto the core set
/// never shows up in the full set.
pub fn split_core_full(fields: &CategorizedFields, tables: &MappingTables) -> CoreFullSplit {
    let mut core = CategorizedFields::new();

    for bucket in fields.buckets() {
        let mut core_bucket = CategoryBucket::new(bucket.name.clone());
        for (key, entry) in &bucket.fields {
            if entry.source_macro().is_some_and(|name| tables.is_essential(name)) {
                core_bucket.fields.push((key.clone(), entry.clone()));
            }
        }
        core.push_bucket(core_bucket);
    }

    CoreFullSplit {
        core,
        full: fields.clone(),
    }
}
