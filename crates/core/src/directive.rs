//! SEARCH/REPLACE edit directive recognition.
//!
//! Two layouts are accepted. The fenced form opens with a bare ``` line,
//! puts the file name on the next line and the `<<<<<<< SEARCH` marker right
//! after it. The bare form starts at the SEARCH marker and takes the file
//! name from the nearest preceding line that is neither blank nor a fence,
//! at most three lines up. Both continue with the old
//! text, a `=======` divider, the new text and `>>>>>>> REPLACE`.

use crate::error::DirectiveError;
use crate::metrics::LineMetrics;
use crate::segment::{ParseResult, Segment};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static SEARCH_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^<{5,9} SEARCH\W*$").unwrap());
static DIVIDER_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^={5,9}\s*$").unwrap());
static REPLACE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^>{5,9} REPLACE\W*$").unwrap());

/// How far back to look for the file name of a bare directive
const FILENAME_LOOKBACK: usize = 3;

const FENCE: &str = "```";

/// Lifecycle of a proposed edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveStatus {
    /// Proposed but not yet acted on
    #[default]
    Pending,
    /// Applied to the working tree
    Applied,
    /// Application was attempted and failed
    Failed,
}

impl DirectiveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveStatus::Pending => "pending",
            DirectiveStatus::Applied => "applied",
            DirectiveStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DirectiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A proposed change to one file
#[derive(Debug, Clone, PartialEq)]
pub struct EditDirective {
    pub filename: String,
    pub before_text: String,
    pub after_text: String,
    pub metrics: LineMetrics,
    pub status: DirectiveStatus,
}

impl EditDirective {
    pub fn new(filename: impl Into<String>, before_text: impl Into<String>, after_text: impl Into<String>) -> Self {
        let before_text = before_text.into();
        let after_text = after_text.into();
        let metrics = LineMetrics::between(&before_text, &after_text);
        Self { filename: filename.into(), before_text, after_text, metrics, status: DirectiveStatus::Pending }
    }

    pub fn added_lines(&self) -> usize {
        self.metrics.added
    }

    pub fn deleted_lines(&self) -> usize {
        self.metrics.deleted
    }

    pub fn changed_lines(&self) -> usize {
        self.metrics.changed
    }

    /// True when the directive creates a file (empty SEARCH section)
    pub fn is_creation(&self) -> bool {
        self.before_text.is_empty()
    }

    /// Reconstruct the directive as it appeared in the message
    pub fn source_text(&self) -> String {
        format!(
            "{}\n<<<<<<< SEARCH\n{}=======\n{}>>>>>>> REPLACE",
            self.filename, self.before_text, self.after_text
        )
    }
}

/// One block produced by the directive parser
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveBlock {
    Prose(String),
    Directive(EditDirective),
}

/// Blocks found in a message plus the first structural error, if any
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DirectiveParse {
    pub blocks: Vec<DirectiveBlock>,
    pub parse_error: Option<DirectiveError>,
}

impl DirectiveParse {
    pub fn has_directives(&self) -> bool {
        self.blocks.iter().any(|b| matches!(b, DirectiveBlock::Directive(_)))
    }

    pub fn directives(&self) -> impl Iterator<Item = &EditDirective> {
        self.blocks.iter().filter_map(|b| match b {
            DirectiveBlock::Directive(directive) => Some(directive),
            DirectiveBlock::Prose(_) => None,
        })
    }

    /// Prose found between and around the directives
    pub fn interstitial_prose(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| match b {
            DirectiveBlock::Prose(text) => Some(text.as_str()),
            DirectiveBlock::Directive(_) => None,
        })
    }

    /// Convert into segments for `text`.
    ///
    /// Returns `None` when the message holds no directives and no error, so
    /// the caller can fall back to plain segmentation.
    pub fn into_parse_result(self, text: &str) -> Option<ParseResult> {
        if let Some(error) = self.parse_error {
            return Some(ParseResult::literal(text, error));
        }
        if !self.has_directives() {
            return None;
        }
        let segments = self
            .blocks
            .into_iter()
            .map(|block| match block {
                DirectiveBlock::Prose(markdown) => Segment::Prose { markdown },
                DirectiveBlock::Directive(directive) => Segment::EditDirective(directive),
            })
            .collect();
        Some(ParseResult::new(segments))
    }
}

/// Scanner for SEARCH/REPLACE directives
#[derive(Debug, Clone, Copy, Default)]
pub struct EditDirectiveParser;

impl EditDirectiveParser {
    /// Cheap pre-check: false when no marker prefix occurs anywhere
    pub fn might_contain_directive(text: &str) -> bool {
        text.contains("<<<<<") || text.contains("=====") || text.contains(">>>>>")
    }

    /// Scan `text` into prose blocks and directives.
    ///
    /// On the first malformed directive the blocks are discarded and only
    /// the error is returned.
    pub fn parse(text: &str) -> DirectiveParse {
        match Self::scan(text) {
            Ok(blocks) => DirectiveParse { blocks, parse_error: None },
            Err(error) => DirectiveParse { blocks: Vec::new(), parse_error: Some(error) },
        }
    }

    fn scan(text: &str) -> Result<Vec<DirectiveBlock>, DirectiveError> {
        let lines: Vec<&str> = text.split('\n').collect();
        let mut blocks = Vec::new();
        let mut plain: Vec<&str> = Vec::new();
        let mut last_filename: Option<String> = None;
        let mut i = 0;

        while i < lines.len() {
            let trimmed = lines[i].trim();

            if trimmed == FENCE && i + 2 < lines.len() && SEARCH_MARKER.is_match(lines[i + 2].trim()) {
                let start_line = i + 1;
                let filename = clean_filename(lines[i + 1])
                    .or_else(|| take_nearby_filename(&mut plain))
                    .or_else(|| last_filename.clone())
                    .ok_or(DirectiveError::MissingFilename { line: start_line })?;
                flush_plain(&mut plain, &mut blocks);

                last_filename = Some(filename.clone());
                let (directive, next) = read_sections(&lines, i + 3, start_line, filename)?;
                i = skip_closing_fence(&lines, next);
                blocks.push(DirectiveBlock::Directive(directive));
                continue;
            }

            if SEARCH_MARKER.is_match(trimmed) {
                let start_line = i + 1;
                let filename = take_nearby_filename(&mut plain)
                    .or_else(|| last_filename.clone())
                    .ok_or(DirectiveError::MissingFilename { line: start_line })?;
                flush_plain(&mut plain, &mut blocks);
                last_filename = Some(filename.clone());

                let (directive, next) = read_sections(&lines, i + 1, start_line, filename)?;
                i = skip_closing_fence(&lines, next);
                blocks.push(DirectiveBlock::Directive(directive));
                continue;
            }

            plain.push(lines[i]);
            i += 1;
        }

        flush_plain(&mut plain, &mut blocks);
        Ok(blocks)
    }
}

/// Read the SEARCH and REPLACE bodies starting at `start`, the first line
/// after the SEARCH marker. Returns the directive and the index after the
/// REPLACE marker.
fn read_sections(
    lines: &[&str], start: usize, start_line: usize, filename: String,
) -> Result<(EditDirective, usize), DirectiveError> {
    let mut i = start;

    let mut before = Vec::new();
    while i < lines.len() && !DIVIDER_MARKER.is_match(lines[i].trim()) {
        before.push(lines[i]);
        i += 1;
    }
    if i >= lines.len() {
        return Err(DirectiveError::MissingDivider { line: start_line });
    }
    i += 1;

    let mut after = Vec::new();
    while i < lines.len() && !REPLACE_MARKER.is_match(lines[i].trim()) {
        after.push(lines[i]);
        i += 1;
    }
    if i >= lines.len() {
        return Err(DirectiveError::MissingReplace { line: start_line });
    }

    Ok((EditDirective::new(filename, join_section(&before), join_section(&after)), i + 1))
}

fn join_section(lines: &[&str]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut joined = lines.join("\n");
    joined.push('\n');
    joined
}

fn flush_plain(plain: &mut Vec<&str>, blocks: &mut Vec<DirectiveBlock>) {
    let joined = plain.join("\n");
    plain.clear();
    let trimmed = joined.trim_matches(|c| c == '\n' || c == '\r');
    if !trimmed.trim().is_empty() {
        blocks.push(DirectiveBlock::Prose(trimmed.to_string()));
    }
}

/// Step over an optional bare ``` line that closes a directive
fn skip_closing_fence(lines: &[&str], idx: usize) -> usize {
    if lines.get(idx).is_some_and(|line| line.trim() == FENCE) { idx + 1 } else { idx }
}

fn is_fence_line(line: &str) -> bool {
    line.trim_start().starts_with(FENCE)
}

/// Pop the file name line for a bare directive off the pending prose.
///
/// Blank and fence lines between the name and the SEARCH marker are skipped
/// within the lookback window; an opening fence right above the name is
/// dropped with it.
fn take_nearby_filename(plain: &mut Vec<&str>) -> Option<String> {
    let window_start = plain.len().saturating_sub(FILENAME_LOOKBACK);
    let idx = (window_start..plain.len())
        .rev()
        .find(|&idx| !plain[idx].trim().is_empty() && !is_fence_line(plain[idx]))?;

    let candidate = clean_filename(plain[idx])?;
    if !looks_like_path(&candidate) {
        return None;
    }

    let cut = if idx > 0 && is_fence_line(plain[idx - 1]) { idx - 1 } else { idx };
    plain.truncate(cut);
    Some(candidate)
}

/// Strip markdown decoration from a file name line
fn clean_filename(line: &str) -> Option<String> {
    let mut name = line.trim().trim_start_matches('#').trim();
    name = name.trim_end_matches(':');
    name = name.trim_matches(|c| matches!(c, '`' | '*' | '"' | '\''));
    name = name.trim_end_matches(':').trim();
    if name.is_empty() || name.starts_with("```") {
        return None;
    }
    Some(name.to_string())
}

fn looks_like_path(candidate: &str) -> bool {
    !candidate.contains(char::is_whitespace) && (candidate.contains('.') || candidate.contains('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(parse: &DirectiveParse, idx: usize) -> &EditDirective {
        match &parse.blocks[idx] {
            DirectiveBlock::Directive(directive) => directive,
            other => panic!("expected edit block, got {other:?}"),
        }
    }

    #[test]
    fn test_precheck() {
        assert!(EditDirectiveParser::might_contain_directive("<<<<<<< SEARCH\n=======\n>>>>>>> REPLACE"));
        assert!(!EditDirectiveParser::might_contain_directive("just prose"));
        assert!(EditDirectiveParser::might_contain_directive("<<<<<<< SEARCH only"));
    }

    #[test]
    fn test_fenced_directive() {
        let text = "```\nsrc/lib.rs\n<<<<<<< SEARCH\na\nb\n=======\na\nc\nd\n>>>>>>> REPLACE\n```\n";
        let parse = EditDirectiveParser::parse(text);
        assert!(parse.parse_error.is_none());
        assert_eq!(parse.blocks.len(), 1);

        let directive = edit(&parse, 0);
        assert_eq!(directive.filename, "src/lib.rs");
        assert_eq!(directive.before_text, "a\nb\n");
        assert_eq!(directive.after_text, "a\nc\nd\n");
        assert_eq!(directive.metrics, LineMetrics { added: 2, deleted: 1, changed: 1 });
        assert_eq!(directive.status, DirectiveStatus::Pending);
    }

    #[test]
    fn test_fenced_directive_with_language() {
        let text = "```rust\nmain.rs\n<<<<<<< SEARCH\n=======\nfn main() {}\n>>>>>>> REPLACE\n```";
        let parse = EditDirectiveParser::parse(text);
        let directive = edit(&parse, 0);
        assert_eq!(directive.filename, "main.rs");
        assert!(directive.is_creation());
        assert_eq!(directive.metrics.added, 1);
    }

    #[test]
    fn test_bare_directive_takes_nearby_filename() {
        let text = "Update the config:\n\nconfig/app.toml\n<<<<<<< SEARCH\nport = 80\n=======\nport = 8080\n>>>>>>> REPLACE\nDone.";
        let parse = EditDirectiveParser::parse(text);
        assert!(parse.parse_error.is_none());
        assert_eq!(parse.blocks.len(), 3);
        assert_eq!(parse.blocks[0], DirectiveBlock::Prose("Update the config:".to_string()));
        assert_eq!(edit(&parse, 1).filename, "config/app.toml");
        assert_eq!(parse.blocks[2], DirectiveBlock::Prose("Done.".to_string()));
    }

    #[test]
    fn test_filename_above_language_fence() {
        let text = "Foo.java\n```java\n<<<<<<< SEARCH\nint a;\n=======\nint b;\n>>>>>>> REPLACE\n```\n";
        let parse = EditDirectiveParser::parse(text);
        assert!(parse.parse_error.is_none());
        assert_eq!(parse.blocks.len(), 1);
        let directive = edit(&parse, 0);
        assert_eq!(directive.filename, "Foo.java");
        assert_eq!(directive.before_text, "int a;\n");
        assert_eq!(directive.after_text, "int b;\n");
    }

    #[test]
    fn test_bare_directive_consumes_closing_fence() {
        let text = "```java\nFoo.java\n<<<<<<< SEARCH\nold\n=======\nnew\n>>>>>>> REPLACE\n```\nAfter.";
        let parse = EditDirectiveParser::parse(text);
        assert!(parse.parse_error.is_none());
        assert_eq!(edit(&parse, 0).filename, "Foo.java");
        assert_eq!(parse.interstitial_prose().collect::<Vec<_>>(), vec!["After."]);
    }

    #[test]
    fn test_filename_outside_lookback() {
        let text = "Foo.java\n\n\n\n<<<<<<< SEARCH\nold\n=======\nnew\n>>>>>>> REPLACE";
        let parse = EditDirectiveParser::parse(text);
        assert_eq!(parse.parse_error, Some(DirectiveError::MissingFilename { line: 5 }));
    }

    #[test]
    fn test_filename_decorations_stripped() {
        let text = "### `src/main.rs`:\n<<<<<<< SEARCH\nx\n=======\ny\n>>>>>>> REPLACE";
        let parse = EditDirectiveParser::parse(text);
        assert_eq!(edit(&parse, 0).filename, "src/main.rs");
    }

    #[test]
    fn test_missing_divider() {
        let text = "```\nfile.txt\n<<<<<<< SEARCH\nold\n>>>>>>> REPLACE\n```";
        let parse = EditDirectiveParser::parse(text);
        assert!(parse.blocks.is_empty());
        assert_eq!(parse.parse_error, Some(DirectiveError::MissingDivider { line: 1 }));
    }

    #[test]
    fn test_missing_replace() {
        let text = "file.txt\n<<<<<<< SEARCH\nold\n=======\nnew\n";
        let parse = EditDirectiveParser::parse(text);
        assert_eq!(parse.parse_error, Some(DirectiveError::MissingReplace { line: 2 }));
    }

    #[test]
    fn test_missing_filename() {
        let text = "Here goes:\n<<<<<<< SEARCH\nold\n=======\nnew\n>>>>>>> REPLACE";
        let parse = EditDirectiveParser::parse(text);
        assert_eq!(parse.parse_error, Some(DirectiveError::MissingFilename { line: 2 }));
    }

    #[test]
    fn test_multiple_directives() {
        let text = "a.rs\n<<<<<<< SEARCH\n1\n=======\n2\n>>>>>>> REPLACE\nb.rs\n<<<<<<< SEARCH\n3\n=======\n4\n>>>>>>> REPLACE\n";
        let parse = EditDirectiveParser::parse(text);
        assert_eq!(parse.blocks.len(), 2);
        assert_eq!(edit(&parse, 0).filename, "a.rs");
        assert_eq!(edit(&parse, 1).filename, "b.rs");
    }

    #[test]
    fn test_repeated_filename_reused() {
        let text = "a.rs\n<<<<<<< SEARCH\n1\n=======\n2\n>>>>>>> REPLACE\n\nAnd also:\n<<<<<<< SEARCH\n3\n=======\n4\n>>>>>>> REPLACE";
        let parse = EditDirectiveParser::parse(text);
        assert!(parse.parse_error.is_none());
        let names: Vec<&str> = parse.directives().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["a.rs", "a.rs"]);
        assert_eq!(parse.interstitial_prose().collect::<Vec<_>>(), vec!["And also:"]);
    }

    #[test]
    fn test_longer_markers_accepted() {
        let text = "x.py\n<<<<<<<<< SEARCH\nold\n=========\nnew\n>>>>>>>>> REPLACE";
        let parse = EditDirectiveParser::parse(text);
        assert!(parse.has_directives());
    }

    #[test]
    fn test_into_parse_result() {
        let text = "intro\n\nlib.rs\n<<<<<<< SEARCH\na\n=======\nb\n>>>>>>> REPLACE";
        let result = EditDirectiveParser::parse(text).into_parse_result(text).unwrap();
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[0], Segment::prose("intro"));
        assert!(result.segments[1].is_directive());
        assert_eq!(result.directive_count(), 1);
    }

    #[test]
    fn test_error_becomes_literal() {
        let text = "lib.rs\n<<<<<<< SEARCH\na\n";
        let result = EditDirectiveParser::parse(text).into_parse_result(text).unwrap();
        assert!(result.has_error());
        assert_eq!(result.segments, vec![Segment::Literal { text: text.to_string() }]);
    }

    #[test]
    fn test_no_directive_defers() {
        let text = "===== just a rule <<<<< and >>>>> arrows";
        assert!(EditDirectiveParser::parse(text).into_parse_result(text).is_none());
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&DirectiveStatus::Applied).unwrap();
        assert_eq!(json, "\"applied\"");
        let status: DirectiveStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(status, DirectiveStatus::Failed);
        assert_eq!(DirectiveStatus::default().to_string(), "pending");
    }
}
