//! Validation facts mined from trailing comments
//!
//! Configuration headers document constraints informally, e.g.
//! `#define X_BED_SIZE 220 // (mm)` or `#define LCD_LANGUAGE en // :['en', 'de']`.
//! This pass picks those apart with a fixed set of patterns. A comment that
//! matches nothing simply yields no facts.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

static RE_DECLARATION_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?://\s*)?#define\s+(\w+)(?:\s+[^/]+)?\s*//\s*(.+)$").unwrap()
});

static RE_ALLOWED_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*\[([^\]]+)\]").unwrap());

static RE_ALLOWED_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'([^']*)'|"([^"]*)"|(-?\d+(?:\.\d*)?)"#).unwrap()
});

static RE_PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^)]+)\)").unwrap());

static RE_UNIT_SHAPES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^[a-zA-Z°µ]+(/[a-zA-Z]+)?[²³]?$",
        r"^\d+\s*[a-zA-Z]+$",
        r"^%$",
        r"^steps/mm$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static RE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?\d+(?:\.\d+)?)\s*(?:-|–|to)\s*(-?\d+(?:\.\d+)?)").unwrap()
});

static RE_MIN_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:minimum|min|at least|>=?)\s+(-?\d+(?:\.\d+)?)").unwrap()
});

static RE_MAX_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:maximum|max|up to|<=?)\s+(-?\d+(?:\.\d+)?)").unwrap()
});

static RE_DEPRECATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:deprecated|obsolete|legacy)\b").unwrap());

static RE_REQUIRES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:requires?|needs?)\s+(\w+)").unwrap());

static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Shortest description worth keeping, in characters
pub const MIN_DESCRIPTION_CHARS: usize = 6;

/// Scalar value found in a comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Literal {
    /// Parse a numeric token; a `.` anywhere makes it a float
    pub fn number(token: &str) -> Option<Self> {
        if token.contains('.') {
            token.parse::<f64>().ok().map(Literal::Float)
        } else {
            token.parse::<i64>().ok().map(Literal::Int)
        }
    }

    fn promote_to_float(self) -> Self {
        match self {
            Literal::Int(value) => Literal::Float(value as f64),
            other => other,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Float(value) => write!(f, "{value}"),
            Literal::Str(value) => f.write_str(value),
        }
    }
}

/// Everything one comment revealed about its macro
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFacts {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub allowed_values: Vec<Literal>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min: Option<Literal>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max: Option<Literal>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub requires: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
}

impl ValidationFacts {
    pub fn is_empty(&self) -> bool {
        self.allowed_values.is_empty()
            && self.min.is_none()
            && self.max.is_none()
            && self.unit.is_none()
            && !self.deprecated
            && self.requires.is_empty()
            && self.description.is_none()
    }
}

/// Validation facts keyed by macro name
pub type ValidationMap = HashMap<String, ValidationFacts>;

/// Extract facts from a single trailing comment
pub fn extract_validation(comment: &str) -> ValidationFacts {
    let (min, max) = extract_bounds(comment);

    ValidationFacts {
        allowed_values: extract_allowed_values(comment),
        min,
        max,
        unit: extract_unit(comment),
        deprecated: RE_DEPRECATED.is_match(comment),
        requires: RE_REQUIRES
            .captures(comment)
            .map(|caps| vec![caps[1].to_string()])
            .unwrap_or_default(),
        description: describe(comment),
    }
}

fn extract_allowed_values(comment: &str) -> Vec<Literal> {
    let Some(list) = RE_ALLOWED_LIST.captures(comment) else {
        return Vec::new();
    };

    RE_ALLOWED_ITEM
        .captures_iter(&list[1])
        .filter_map(|item| {
            if let Some(quoted) = item.get(1).or_else(|| item.get(2)) {
                let text = quoted.as_str();
                return (!text.is_empty()).then(|| Literal::Str(text.to_string()));
            }
            item.get(3).and_then(|number| Literal::number(number.as_str()))
        })
        .collect()
}

/// Only the first parenthesized group is considered
fn extract_unit(comment: &str) -> Option<String> {
    RE_PARENTHESIZED
        .captures(comment)
        .map(|caps| caps[1].trim().to_string())
        .filter(|candidate| RE_UNIT_SHAPES.iter().any(|shape| shape.is_match(candidate)))
}

fn extract_bounds(comment: &str) -> (Option<Literal>, Option<Literal>) {
    if let Some(caps) = RE_RANGE.captures(comment) {
        let low = &caps[1];
        let high = &caps[2];
        let (min, max) = (Literal::number(low), Literal::number(high));
        // A range is typed as a whole: one float end makes both floats
        if low.contains('.') || high.contains('.') {
            return (
                min.map(Literal::promote_to_float),
                max.map(Literal::promote_to_float),
            );
        }
        return (min, max);
    }

    let min = RE_MIN_PHRASE
        .captures(comment)
        .and_then(|caps| Literal::number(&caps[1]));
    let max = RE_MAX_PHRASE
        .captures(comment)
        .and_then(|caps| Literal::number(&caps[1]));
    (min, max)
}

/// Clean free comment text into a description
///
/// Removes allowed-value lists, parenthesized groups, numeric ranges and
/// deprecation words, then collapses whitespace. Returns `None` when fewer
/// than [`MIN_DESCRIPTION_CHARS`] characters remain.
pub fn describe(text: &str) -> Option<String> {
    let text = RE_ALLOWED_LIST.replace_all(text, "");
    let text = RE_PARENTHESIZED.replace_all(&text, "");
    let text = RE_RANGE.replace_all(&text, "");
    let text = RE_DEPRECATED.replace_all(&text, "");
    let text = RE_WHITESPACE.replace_all(text.trim(), " ");
    let text = text.trim();

    (text.chars().count() >= MIN_DESCRIPTION_CHARS).then(|| text.to_string())
}

/// Mine every declaration line (active or disabled) that carries a trailing comment
///
/// Later declarations of the same name overwrite earlier facts. Comments that
/// yield nothing are not recorded.
pub fn mine_validation(text: &str) -> ValidationMap {
    let mut map = ValidationMap::new();

    for line in text.lines() {
        let Some(caps) = RE_DECLARATION_COMMENT.captures(line) else {
            continue;
        };

        let facts = extract_validation(caps[2].trim());
        if !facts.is_empty() {
            map.insert(caps[1].to_string(), facts);
        }
    }

    map
}
