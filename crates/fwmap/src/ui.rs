use crate::categorize::CategorizedFields;
use crate::entry::FieldMappingEntry;
use crate::tables::MappingTables;

/// Set `uiFieldId` from the tables; returns true if the entry changed
///
/// Macros without a UI assignment are left alone.
pub fn bind_entry(entry: &mut FieldMappingEntry, tables: &MappingTables) -> bool {
    let Some(ui_id) = entry.source_macro().and_then(|name| tables.ui_field(name)) else {
        return false;
    };

    if entry.ui_field_id.as_deref() == Some(ui_id) {
        return false;
    }
    entry.ui_field_id = Some(ui_id.to_string());
    true
}

/// Bind UI identifiers across a field set; returns how many fields carry one
pub fn bind_ui_fields(fields: &mut CategorizedFields, tables: &MappingTables) -> usize {
    let mut bound = 0;
    for entry in fields.entries_mut() {
        bind_entry(entry, tables);
        if entry.ui_field_id.is_some() {
            bound += 1;
        }
    }
    bound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_known_and_ignore_unknown() {
        let tables = MappingTables::builtin().unwrap();
        let mut fields = CategorizedFields::new();
        fields.bucket_mut("temperature").insert(
            "xBedSize".into(),
            FieldMappingEntry {
                maps_from: vec!["X_BED_SIZE".into()],
                ..Default::default()
            },
        );
        fields.bucket_mut("other").insert(
            "ender5Plus".into(),
            FieldMappingEntry {
                maps_from: vec!["ENDER5_PLUS".into()],
                ..Default::default()
            },
        );

        assert_eq!(bind_ui_fields(&mut fields, &tables), 1);
        let bound = &fields.get("temperature").unwrap().fields[0].1;
        assert_eq!(bound.ui_field_id.as_deref(), Some("bedSizeX"));
        assert!(fields.get("other").unwrap().fields[0].1.ui_field_id.is_none());
    }

    #[test]
    fn test_rebinding_reports_no_change() {
        let tables = MappingTables::builtin().unwrap();
        let mut entry = FieldMappingEntry {
            maps_from: vec!["BLTOUCH".into()],
            ..Default::default()
        };
        assert!(bind_entry(&mut entry, &tables));
        assert!(!bind_entry(&mut entry, &tables));
        assert_eq!(entry.ui_field_id.as_deref(), Some("probeTypeBLTouch"));
    }
}
