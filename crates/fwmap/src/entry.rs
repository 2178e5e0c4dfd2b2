use fwmap_header::{
    describe, dependencies::push_unique, resolve, Literal, MacroRecord, ResolvedConditions,
    ValidationFacts, ValueType,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One field of a mapping document
///
/// Keys this crate does not know about are carried in `extra` so that
/// annotating a hand-edited document leaves them in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMappingEntry {
    #[serde(default)]
    pub maps_from: Vec<String>,
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub file_location: String,
    #[serde(default)]
    pub line_number: usize,
    #[serde(default)]
    pub is_conditional: bool,
    #[serde(default)]
    pub conditional_on: Vec<String>,
    #[serde(default)]
    pub conditional_on_not: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditional_expression: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_field_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldMappingEntry {
    /// Build an entry from a scanned macro
    ///
    /// The leading comment block becomes `notes` after description cleaning;
    /// a comment that cleans down to nothing is kept verbatim. Conditional
    /// context is resolved from the record's chain.
    pub fn from_record(record: &MacroRecord, file_location: &str) -> Self {
        let mut entry = Self {
            maps_from: vec![record.name.clone()],
            value_type: record.inferred_type,
            required: !record.disabled,
            file_location: file_location.to_string(),
            line_number: record.line_number,
            examples: record.raw_value.iter().cloned().collect(),
            notes: record
                .comment
                .as_deref()
                .map(|comment| describe(comment).unwrap_or_else(|| comment.to_string())),
            ..Default::default()
        };
        entry.apply_conditions(&resolve(&record.conditional_chain));
        entry
    }

    /// Macro this entry was generated from
    pub fn source_macro(&self) -> Option<&str> {
        self.maps_from.first().map(String::as_str)
    }

    /// Overwrite the conditional fields
    pub fn apply_conditions(&mut self, conditions: &ResolvedConditions) {
        self.is_conditional = conditions.is_conditional;
        self.conditional_on = conditions.conditional_on.clone();
        self.conditional_on_not = conditions.conditional_on_not.clone();
        self.conditional_expression = conditions.expressions.clone();
    }

    /// Merge validation facts into a freshly built entry
    ///
    /// Present facts overwrite and `requires` is unioned. The description is
    /// always prepended to existing notes, joined with `". "`.
    pub fn apply_validation(&mut self, facts: &ValidationFacts) {
        self.merge_validation(facts, false);
    }

    /// Merge validation facts into an entry that may already carry them
    ///
    /// Same as [`apply_validation`](Self::apply_validation), except that notes
    /// already starting with the description are left alone, so repeated
    /// annotation of a document is stable.
    pub fn reapply_validation(&mut self, facts: &ValidationFacts) {
        self.merge_validation(facts, true);
    }

    fn merge_validation(&mut self, facts: &ValidationFacts, idempotent: bool) {
        if !facts.allowed_values.is_empty() {
            self.allowed_values = facts.allowed_values.clone();
        }
        if facts.min.is_some() {
            self.min = facts.min.clone();
        }
        if facts.max.is_some() {
            self.max = facts.max.clone();
        }
        if facts.unit.is_some() {
            self.unit = facts.unit.clone();
        }
        if facts.deprecated {
            self.deprecated = true;
        }
        for requirement in &facts.requires {
            push_unique(&mut self.requires, requirement.clone());
        }
        if let Some(description) = &facts.description {
            self.notes = Some(match self.notes.take() {
                None => description.clone(),
                Some(notes) if idempotent && notes.starts_with(description.as_str()) => notes,
                Some(notes) => format!("{description}. {notes}"),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fwmap_header::scan_header;

    fn record(source: &str, name: &str) -> MacroRecord {
        scan_header(source).macros.get(name).cloned().unwrap()
    }

    #[test]
    fn test_from_record_basic_fields() {
        let rec = record("// Serial speed for host\n#define BAUDRATE 115200\n", "BAUDRATE");
        let entry = FieldMappingEntry::from_record(&rec, "Configuration.h");

        assert_eq!(entry.maps_from, vec!["BAUDRATE"]);
        assert_eq!(entry.value_type, ValueType::Integer);
        assert!(entry.required);
        assert_eq!(entry.line_number, 2);
        assert_eq!(entry.examples, vec!["115200"]);
        assert_eq!(entry.notes.as_deref(), Some("Serial speed for host"));
        assert!(!entry.is_conditional);
    }

    #[test]
    fn test_serialized_shape() {
        let rec = record("#ifndef DELTA\n#define X_BED_SIZE 220\n#endif\n", "X_BED_SIZE");
        let entry = FieldMappingEntry::from_record(&rec, "Configuration.h");
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["mapsFrom"], serde_json::json!(["X_BED_SIZE"]));
        assert_eq!(json["type"], "integer");
        assert_eq!(json["isConditional"], true);
        assert_eq!(json["conditionalOn"], serde_json::json!([]));
        assert_eq!(json["conditionalOnNot"], serde_json::json!(["DELTA"]));
        assert_eq!(json["conditionalExpression"], serde_json::json!(["DELTA"]));
        assert!(json.get("notes").is_none());
        assert!(json.get("deprecated").is_none());
        assert!(json.get("uiFieldId").is_none());
    }

    #[test]
    fn test_unconditional_omits_expression() {
        let rec = record("#define A 1\n", "A");
        let json = serde_json::to_value(FieldMappingEntry::from_record(&rec, "c.h")).unwrap();
        assert_eq!(json["isConditional"], false);
        assert!(json.get("conditionalExpression").is_none());
    }

    #[test]
    fn test_apply_validation_merges() {
        let mut entry = FieldMappingEntry {
            notes: Some("Original note".to_string()),
            requires: vec!["A".to_string()],
            ..Default::default()
        };
        let facts = ValidationFacts {
            requires: vec!["A".to_string(), "B".to_string()],
            description: Some("Bed width".to_string()),
            unit: Some("mm".to_string()),
            ..Default::default()
        };

        entry.apply_validation(&facts);
        assert_eq!(entry.requires, vec!["A", "B"]);
        assert_eq!(entry.notes.as_deref(), Some("Bed width. Original note"));
        assert_eq!(entry.unit.as_deref(), Some("mm"));

        let snapshot = entry.clone();
        entry.reapply_validation(&facts);
        assert_eq!(entry, snapshot);
    }

    #[test]
    fn test_generated_notes_always_get_description() {
        let rec = record(
            "// Bed width plus margin\n#define X_BED_SIZE 220 // Bed width (mm)\n",
            "X_BED_SIZE",
        );
        let mut entry = FieldMappingEntry::from_record(&rec, "Configuration.h");
        let facts = ValidationFacts {
            description: Some("Bed width".to_string()),
            ..Default::default()
        };

        entry.apply_validation(&facts);
        assert_eq!(
            entry.notes.as_deref(),
            Some("Bed width. Bed width plus margin")
        );
    }

    #[test]
    fn test_short_leading_comment_kept_verbatim() {
        let rec = record("// Z\n#define Z_MAX_POS 300\n", "Z_MAX_POS");
        let entry = FieldMappingEntry::from_record(&rec, "Configuration.h");
        assert_eq!(entry.notes.as_deref(), Some("Z"));

        let rec = record("// 0 - 300\n#define Z_MAX_POS 300\n", "Z_MAX_POS");
        let entry = FieldMappingEntry::from_record(&rec, "Configuration.h");
        assert_eq!(entry.notes.as_deref(), Some("0 - 300"));
    }

    #[test]
    fn test_leading_comment_unit_is_cleaned_from_notes() {
        let rec = record(
            "// Use this for BLTouch probes (mm)\n//#define BLTOUCH\n",
            "BLTOUCH",
        );
        let entry = FieldMappingEntry::from_record(&rec, "Configuration.h");
        assert_eq!(entry.notes.as_deref(), Some("Use this for BLTouch probes"));
        assert_eq!(entry.unit, None);
    }

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let json = serde_json::json!({
            "mapsFrom": ["BLTOUCH"],
            "type": "boolean",
            "required": false,
            "fileLocation": "Configuration.h",
            "lineNumber": 12,
            "customHint": {"widget": "toggle"}
        });
        let entry: FieldMappingEntry = serde_json::from_value(json).unwrap();
        assert_eq!(entry.extra["customHint"]["widget"], "toggle");
        assert!(!entry.is_conditional);

        let back = serde_json::to_value(&entry).unwrap();
        assert_eq!(back["customHint"]["widget"], "toggle");
    }
}
