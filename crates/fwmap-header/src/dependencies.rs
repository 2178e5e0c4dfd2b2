//! Flattening of conditional chains into signed dependencies

use crate::conditionals::{ConditionalFrame, FrameKind};
use serde::{Deserialize, Serialize};

/// Expression text recorded for an `#else` frame
pub const ELSE_EXPRESSION: &str = "else block";

/// A single identifier a macro depends on, with polarity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub name: String,
    /// True when the macro is only active while `name` is NOT set
    pub negated: bool,
}

impl Dependency {
    pub fn positive(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            negated: false,
        }
    }

    pub fn negative(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            negated: true,
        }
    }
}

/// Signed contribution of one frame
///
/// `#else` negates its parent's dependencies whatever the parent's kind, so
/// the else branch of an `#ifndef A` still lands in `conditionalOnNot`.
pub fn frame_contribution(frame: &ConditionalFrame) -> Vec<Dependency> {
    match frame.kind {
        FrameKind::If | FrameKind::Ifdef => frame
            .dependencies
            .iter()
            .map(Dependency::positive)
            .collect(),
        FrameKind::Ifndef => frame
            .dependencies
            .iter()
            .map(Dependency::negative)
            .collect(),
        FrameKind::Else => frame
            .parent
            .as_deref()
            .map(|parent| {
                parent
                    .dependencies
                    .iter()
                    .map(Dependency::negative)
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// Conditional context of a macro, ready for serialization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConditions {
    pub is_conditional: bool,
    pub conditional_on: Vec<String>,
    pub conditional_on_not: Vec<String>,
    pub expressions: Vec<String>,
}

/// Flatten a chain (outermost first) into deduplicated dependency lists
///
/// A name may end up in both lists when the chain contradicts itself; no
/// attempt is made to reconcile that.
pub fn resolve(chain: &[ConditionalFrame]) -> ResolvedConditions {
    let mut resolved = ResolvedConditions {
        is_conditional: !chain.is_empty(),
        ..Default::default()
    };

    for frame in chain {
        for dependency in frame_contribution(frame) {
            let target = if dependency.negated {
                &mut resolved.conditional_on_not
            } else {
                &mut resolved.conditional_on
            };
            push_unique(target, dependency.name);
        }

        match (&frame.kind, &frame.expression) {
            (FrameKind::Else, _) => resolved.expressions.push(ELSE_EXPRESSION.to_string()),
            (_, Some(expression)) if !expression.is_empty() => {
                resolved.expressions.push(expression.clone())
            }
            _ => {}
        }
    }

    resolved
}

/// Append `value` unless already present
pub fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}
