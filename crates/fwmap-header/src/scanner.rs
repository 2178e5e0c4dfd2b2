//! Line scanner for configuration headers
//!
//! One pass over the header collects every macro declaration (active or
//! commented out) together with its leading comment block and the chain of
//! conditional frames that encloses it.

use crate::conditionals::{parse_directive, ConditionalFrame, ConditionalStack};
use crate::error::{HeaderError, HeaderResult};
use crate::types::{infer_type, ValueType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, instrument};

static RE_ACTIVE_DEFINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#define\s+(?P<name>\w+)(?:\s+(?P<value>.*?))?\s*(?://(?P<comment>.*))?$")
        .unwrap()
});

static RE_DISABLED_DEFINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*//\s*#define\s+(?P<name>\w+)(?:\s+(?P<value>.*?))?\s*(?://(?P<comment>.*))?$",
    )
    .unwrap()
});

/// A single `#define`, active or commented out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroRecord {
    pub name: String,
    /// Value text with the trailing comment removed; `None` for bare flags
    pub raw_value: Option<String>,
    /// Declared as `//#define` / `// #define`
    pub disabled: bool,
    /// 1-based
    pub line_number: usize,
    /// Leading `//` comment block, joined with single spaces
    pub comment: Option<String>,
    /// Open conditional frames at the declaration, outermost first
    pub conditional_chain: Vec<ConditionalFrame>,
    pub inferred_type: ValueType,
}

impl MacroRecord {
    pub fn is_conditional(&self) -> bool {
        !self.conditional_chain.is_empty()
    }
}

/// Declared macros in order of first declaration
///
/// Declaring a name again replaces its record but keeps the original slot.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    records: Vec<MacroRecord>,
    index: HashMap<String, usize>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns true if the name was new
    pub fn insert(&mut self, record: MacroRecord) -> bool {
        match self.index.get(&record.name) {
            Some(&slot) => {
                self.records[slot] = record;
                false
            }
            None => {
                self.index.insert(record.name.clone(), self.records.len());
                self.records.push(record);
                true
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&MacroRecord> {
        self.index.get(name).map(|&slot| &self.records[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MacroRecord> {
        self.records.iter()
    }

    /// Records whose declaration is not commented out
    pub fn active(&self) -> impl Iterator<Item = &MacroRecord> {
        self.records.iter().filter(|r| !r.disabled)
    }
}

impl<'a> IntoIterator for &'a MacroTable {
    type Item = &'a MacroRecord;
    type IntoIter = std::slice::Iter<'a, MacroRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Outcome of scanning one header
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub macros: MacroTable,
    /// Declarations seen, counting re-declarations
    pub declarations: usize,
    /// Frames still open at end of input
    pub residual_frames: usize,
    /// Closing or branching directives with nothing open
    pub unmatched_directives: usize,
}

struct Declaration<'a> {
    name: &'a str,
    value: Option<&'a str>,
    disabled: bool,
}

fn match_declaration(line: &str) -> Option<Declaration<'_>> {
    let (caps, disabled) = match RE_ACTIVE_DEFINE.captures(line) {
        Some(caps) => (caps, false),
        None => (RE_DISABLED_DEFINE.captures(line)?, true),
    };

    let name = caps.name("name")?.as_str();
    let value = caps
        .name("value")
        .map(|m| m.as_str().trim())
        .filter(|v| !v.is_empty());

    Some(Declaration {
        name,
        value,
        disabled,
    })
}

/// Scan header text
///
/// Never fails: unbalanced conditionals are tolerated and residual frames at
/// end of input are dropped.
pub fn scan_header(text: &str) -> ScanResult {
    let mut result = ScanResult::default();
    let mut stack = ConditionalStack::new();
    let mut comment_buffer: Vec<String> = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_number = idx + 1;
        let line = line.trim_end();
        let trimmed = line.trim_start();

        if trimmed.is_empty() {
            continue;
        }

        if let Some(directive) = parse_directive(trimmed) {
            stack.apply(directive);
            continue;
        }

        if let Some(decl) = match_declaration(line) {
            let comment = if comment_buffer.is_empty() {
                None
            } else {
                Some(comment_buffer.join(" "))
            };
            comment_buffer.clear();

            result.declarations += 1;
            result.macros.insert(MacroRecord {
                name: decl.name.to_string(),
                raw_value: decl.value.map(str::to_string),
                disabled: decl.disabled,
                line_number,
                comment,
                conditional_chain: stack.snapshot(),
                inferred_type: infer_type(decl.name, decl.value),
            });
            continue;
        }

        if let Some(comment) = trimmed.strip_prefix("//") {
            let comment = comment.trim();
            if !comment.is_empty() {
                comment_buffer.push(comment.to_string());
            }
            continue;
        }

        comment_buffer.clear();
    }

    result.residual_frames = stack.depth();
    result.unmatched_directives = stack.unmatched();

    if result.residual_frames > 0 || result.unmatched_directives > 0 {
        debug!(
            residual_frames = result.residual_frames,
            unmatched = result.unmatched_directives,
            "Unbalanced conditional directives"
        );
    }

    result
}

/// Read a header from disk, decoding invalid UTF-8 lossily
#[instrument(fields(file = %path.display()))]
pub fn read_header(path: &Path, max_file_size: usize) -> HeaderResult<String> {
    if !path.exists() {
        return Err(HeaderError::NotFound(path.to_path_buf()));
    }

    let metadata = fs::metadata(path).map_err(|e| HeaderError::io(path, e))?;
    let actual_size = metadata.len() as usize;
    if actual_size > max_file_size {
        return Err(HeaderError::FileTooLarge {
            path: path.to_path_buf(),
            max_size: max_file_size,
            actual_size,
        });
    }

    let bytes = fs::read(path).map_err(|e| HeaderError::io(path, e))?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            debug!("Header is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    };

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditionals::FrameKind;

    #[test]
    fn test_active_and_disabled_declarations() {
        let source = "#define BAUDRATE 115200 // serial speed\n//#define BLTOUCH\n// #define EZABL_ENABLE\n";
        let result = scan_header(source);

        assert_eq!(result.macros.len(), 3);

        let baud = result.macros.get("BAUDRATE").unwrap();
        assert_eq!(baud.raw_value.as_deref(), Some("115200"));
        assert!(!baud.disabled);
        assert_eq!(baud.line_number, 1);
        assert_eq!(baud.inferred_type, ValueType::Integer);

        let bltouch = result.macros.get("BLTOUCH").unwrap();
        assert!(bltouch.disabled);
        assert_eq!(bltouch.raw_value, None);
        assert_eq!(bltouch.inferred_type, ValueType::Boolean);

        assert!(result.macros.get("EZABL_ENABLE").unwrap().disabled);
    }

    #[test]
    fn test_redeclaration_replaces_in_place() {
        let source = "#define A 1\n#define B 2\n#define A 3\n";
        let result = scan_header(source);

        assert_eq!(result.declarations, 3);
        let names: Vec<_> = result.macros.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);

        let a = result.macros.get("A").unwrap();
        assert_eq!(a.raw_value.as_deref(), Some("3"));
        assert_eq!(a.line_number, 3);
    }

    #[test]
    fn test_leading_comment_block() {
        let source = "// Probe type\n//\n// Use this for BLTouch probes\n\n//#define BLTOUCH\n#define NEXT 1\n";
        let result = scan_header(source);

        let bltouch = result.macros.get("BLTOUCH").unwrap();
        assert_eq!(
            bltouch.comment.as_deref(),
            Some("Probe type Use this for BLTouch probes")
        );
        // Buffer is consumed by the declaration it attaches to
        assert_eq!(result.macros.get("NEXT").unwrap().comment, None);
    }

    #[test]
    fn test_code_line_resets_comment_buffer() {
        let source = "// orphaned\nstatic int x;\n#define A\n";
        let result = scan_header(source);
        assert_eq!(result.macros.get("A").unwrap().comment, None);
    }

    #[test]
    fn test_directive_keeps_comment_buffer() {
        let source = "// Extra probing\n#ifdef BLTOUCH\n#define MULTIPLE_PROBING 2\n#endif\n";
        let result = scan_header(source);
        let record = result.macros.get("MULTIPLE_PROBING").unwrap();
        assert_eq!(record.comment.as_deref(), Some("Extra probing"));
    }

    #[test]
    fn test_chain_snapshot_per_declaration() {
        let source = "\
#ifdef A
#define IN_A
#ifndef B
#define IN_A_NOT_B
#endif
#else
#define IN_ELSE
#endif
#define OUTSIDE
";
        let result = scan_header(source);

        let in_a = result.macros.get("IN_A").unwrap();
        assert_eq!(in_a.conditional_chain.len(), 1);
        assert_eq!(in_a.conditional_chain[0].kind, FrameKind::Ifdef);

        let nested = result.macros.get("IN_A_NOT_B").unwrap();
        assert_eq!(nested.conditional_chain.len(), 2);
        assert_eq!(nested.conditional_chain[1].kind, FrameKind::Ifndef);

        let in_else = result.macros.get("IN_ELSE").unwrap();
        assert_eq!(in_else.conditional_chain[0].kind, FrameKind::Else);

        assert!(!result.macros.get("OUTSIDE").unwrap().is_conditional());
        assert_eq!(result.residual_frames, 0);
        assert_eq!(result.unmatched_directives, 0);
    }

    #[test]
    fn test_unbalanced_input_is_tolerated() {
        let source = "#endif\n#define A\n#ifdef X\n#define B\n";
        let result = scan_header(source);
        assert_eq!(result.macros.len(), 2);
        assert_eq!(result.unmatched_directives, 1);
        assert_eq!(result.residual_frames, 1);
        assert!(!result.macros.get("A").unwrap().is_conditional());
    }

    #[test]
    fn test_value_excludes_trailing_comment() {
        let result = scan_header("#define X_BED_SIZE 220   // (mm) bed width\n");
        let record = result.macros.get("X_BED_SIZE").unwrap();
        assert_eq!(record.raw_value.as_deref(), Some("220"));
    }

    #[test]
    fn test_read_header_missing() {
        let err = read_header(Path::new("/nonexistent/Configuration.h"), 1024).unwrap_err();
        assert!(matches!(err, HeaderError::NotFound(_)));
    }
}
