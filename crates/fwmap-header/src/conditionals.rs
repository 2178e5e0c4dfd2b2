//! Conditional-compilation context tracking
//!
//! Tracks the chain of `#if`/`#ifdef`/`#ifndef`/`#elif`/`#else` blocks that
//! enclose each line of a header. Nothing here evaluates a condition: a frame
//! only records the directive's text and the identifiers it mentions.
//!
//! The stack is an explicit value owned by the scanning loop. Macros take a
//! deep snapshot of it at declaration time, so later pushes and pops never
//! alter chains that were already recorded.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Tokens that look like identifiers in a condition but are not dependencies
pub const RESERVED_TOKENS: [&str; 6] = ["defined", "ENABLED", "DISABLED", "ANY", "ALL", "NONE"];

static RE_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z_][A-Z0-9_]*\b").unwrap());

/// Conditional directive recognized on a single line
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    If(String),
    Ifdef(String),
    Ifndef(String),
    Elif(String),
    Else,
    Endif,
}

/// Recognize a conditional directive on an already-trimmed line
///
/// Whitespace between `#` and the keyword is allowed. Any other directive
/// (`#define`, `#include`, `#pragma`, ...) is not a conditional and yields `None`.
pub fn parse_directive(trimmed: &str) -> Option<Directive> {
    let rest = trimmed.strip_prefix('#')?.trim_start();

    let keyword_len = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    let (keyword, argument) = rest.split_at(keyword_len);

    // `#ifdefined` is not `#ifdef` followed by an argument
    let separated = argument.is_empty()
        || argument.starts_with(char::is_whitespace)
        || argument.starts_with('/')
        || argument.starts_with('(')
        || argument.starts_with('!');

    if !separated {
        return None;
    }

    match keyword {
        "if" => Some(Directive::If(normalize_expression(argument))),
        "ifdef" => Some(Directive::Ifdef(normalize_expression(argument))),
        "ifndef" => Some(Directive::Ifndef(normalize_expression(argument))),
        "elif" => Some(Directive::Elif(normalize_expression(argument))),
        "else" => Some(Directive::Else),
        "endif" => Some(Directive::Endif),
        _ => None,
    }
}

/// Strip trailing comments and surrounding whitespace from a directive condition
pub fn normalize_expression(text: &str) -> String {
    let mut text = text;
    if let Some(idx) = text.find("//") {
        text = &text[..idx];
    }
    if let Some(idx) = text.find("/*") {
        text = &text[..idx];
    }
    text.trim().to_string()
}

/// Upper-case identifiers referenced by a condition, minus reserved tokens
///
/// Order of first appearance is kept; repeats are dropped.
pub fn extract_dependencies(expression: &str) -> Vec<String> {
    let mut dependencies: Vec<String> = Vec::new();
    for found in RE_IDENTIFIER.find_iter(expression) {
        let ident = found.as_str();
        if RESERVED_TOKENS.contains(&ident) {
            continue;
        }
        if !dependencies.iter().any(|d| d == ident) {
            dependencies.push(ident.to_string());
        }
    }
    dependencies
}

/// Kind of an open conditional block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    If,
    Ifdef,
    Ifndef,
    Else,
}

/// One level of an open conditional block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalFrame {
    pub kind: FrameKind,
    /// Normalized condition text; `None` for `#else`
    pub expression: Option<String>,
    /// Identifiers referenced by `expression`
    pub dependencies: Vec<String>,
    /// For `#else`: the frame this branch replaced
    pub parent: Option<Box<ConditionalFrame>>,
}

impl ConditionalFrame {
    /// Open a frame for an `#if`, `#ifdef` or `#ifndef` condition
    pub fn open(kind: FrameKind, expression: impl Into<String>) -> Self {
        let expression = expression.into();
        let dependencies = extract_dependencies(&expression);
        Self {
            kind,
            expression: Some(expression),
            dependencies,
            parent: None,
        }
    }

    /// Build the `#else` branch of `parent`
    pub fn else_of(parent: ConditionalFrame) -> Self {
        Self {
            kind: FrameKind::Else,
            expression: None,
            dependencies: Vec::new(),
            parent: Some(Box::new(parent)),
        }
    }

    pub fn is_else(&self) -> bool {
        self.kind == FrameKind::Else
    }
}

/// Stack of currently open conditional frames
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionalStack {
    frames: Vec<ConditionalFrame>,
    /// `#endif`/`#else`/`#elif` seen with nothing open
    unmatched: usize,
}

impl ConditionalStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one directive to the stack
    pub fn apply(&mut self, directive: Directive) {
        match directive {
            Directive::If(expr) => self.frames.push(ConditionalFrame::open(FrameKind::If, expr)),
            Directive::Ifdef(expr) => self
                .frames
                .push(ConditionalFrame::open(FrameKind::Ifdef, expr)),
            Directive::Ifndef(expr) => self
                .frames
                .push(ConditionalFrame::open(FrameKind::Ifndef, expr)),
            Directive::Elif(expr) => {
                // Replacement, not nesting: depth is unchanged when a frame was open
                self.pop();
                self.frames.push(ConditionalFrame::open(FrameKind::If, expr));
            }
            Directive::Else => {
                if let Some(parent) = self.frames.pop() {
                    self.frames.push(ConditionalFrame::else_of(parent));
                } else {
                    self.unmatched += 1;
                }
            }
            Directive::Endif => {
                self.pop();
            }
        }
    }

    fn pop(&mut self) -> Option<ConditionalFrame> {
        let popped = self.frames.pop();
        if popped.is_none() {
            self.unmatched += 1;
        }
        popped
    }

    /// Deep copy of the open frames, outermost first
    pub fn snapshot(&self) -> Vec<ConditionalFrame> {
        self.frames.clone()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[ConditionalFrame] {
        &self.frames
    }

    /// Number of closing/branching directives that found no open frame
    pub fn unmatched(&self) -> usize {
        self.unmatched
    }
}
