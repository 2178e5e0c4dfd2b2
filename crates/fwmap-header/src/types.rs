//! Value type inference for macro declarations
//!
//! The type of a macro is read off the lexical shape of its value. Bare flags
//! (no value) fall back to name heuristics, since `#define SDSUPPORT` and
//! `#define GRID_MAX_POINTS` carry no value to look at.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Inferred type of a configuration macro
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Boolean,
    Integer,
    Float,
    String,
    Array,
    /// Opaque reference to another macro or expression
    Define,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Define => "define",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Name heuristics, checked in group order; the first matching group wins.
static NAME_PATTERNS: LazyLock<Vec<(ValueType, Regex)>> = LazyLock::new(|| {
    let groups: [(ValueType, &[&str]); 5] = [
        (
            ValueType::Boolean,
            &[
                r"(ENABLE|DISABLE|INVERT|REVERSE)",
                r"(USE_|HAS_|IS_)",
                r"(SHOW_|HIDE_)",
            ],
        ),
        (
            ValueType::Integer,
            &[
                r"(COUNT|SIZE|LENGTH|WIDTH|HEIGHT|DEPTH)",
                r"(TIMEOUT|DELAY|DURATION|TIME)",
                r"(MIN|MAX)$",
                r"(STEPS|POSITION)",
                r"_PORT$",
                r"SENSOR_\d+$",
            ],
        ),
        (
            ValueType::Float,
            &[
                r"(FACTOR|RATIO|COEFFICIENT)",
                r"(FEEDRATE|SPEED|ACCEL)",
                r"(OFFSET|DELTA)",
                r"DEFAULT_(K[pid])",
                r"JERK",
            ],
        ),
        (ValueType::String, &[r"(NAME|LABEL|TEXT)", r"(PIN)$"]),
        (
            ValueType::Array,
            &[r"DEFAULT_.*_UNIT", r"DEFAULT_MAX_", r"NOZZLE_TO_PROBE_OFFSET"],
        ),
    ];

    groups
        .into_iter()
        .flat_map(|(value_type, patterns)| {
            patterns.iter().map(move |pattern| {
                let regex = Regex::new(&format!("(?i){pattern}")).unwrap();
                (value_type, regex)
            })
        })
        .collect()
});

/// Infer a macro's type from its value, falling back to the name when the
/// value is absent or blank
pub fn infer_type(name: &str, value: Option<&str>) -> ValueType {
    let value = value.map(str::trim).unwrap_or("");

    if value.is_empty() {
        return infer_from_name(name);
    }

    if is_quoted(value) {
        return ValueType::String;
    }

    if value.starts_with('{') && value.ends_with('}') {
        return ValueType::Array;
    }

    if value.parse::<i64>().is_ok() {
        return ValueType::Integer;
    }

    if value.parse::<f64>().is_ok() {
        return ValueType::Float;
    }

    ValueType::Define
}

/// Name-only heuristics used for bare flags
pub fn infer_from_name(name: &str) -> ValueType {
    NAME_PATTERNS
        .iter()
        .find(|(_, regex)| regex.is_match(name))
        .map(|(value_type, _)| *value_type)
        .unwrap_or(ValueType::Boolean)
}

fn is_quoted(value: &str) -> bool {
    value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
}
