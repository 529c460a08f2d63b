//! Prose / fenced-code segmentation of a single message.
//!
//! The lexer is a two-state machine (`Prose`, `InFence`) that walks the
//! message line by line and records byte ranges into the message text. A
//! fence is only recognized once its closing line has arrived; an
//! unterminated trailing fence stays prose until then.

use crate::directive::EditDirective;
use crate::error::DirectiveError;

use std::ops::Range;

const FENCE: &str = "```";

/// One contiguous parsed unit of a message
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Markdown prose
    Prose { markdown: String },
    /// Fenced code with an optional (lower-cased) language tag
    Code { language: Option<String>, content: String },
    /// A SEARCH/REPLACE edit directive
    EditDirective(EditDirective),
    /// Unparsed, unstyled text shown when a directive is malformed
    Literal { text: String },
}

impl Segment {
    pub fn prose(markdown: impl Into<String>) -> Self {
        Segment::Prose { markdown: markdown.into() }
    }

    pub fn code(language: Option<String>, content: impl Into<String>) -> Self {
        Segment::Code { language, content: content.into() }
    }

    pub fn is_prose(&self) -> bool {
        matches!(self, Segment::Prose { .. })
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Segment::Code { .. })
    }

    pub fn is_directive(&self) -> bool {
        matches!(self, Segment::EditDirective(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Segment::Literal { .. })
    }

    /// The raw text this segment was built from
    pub fn source_text(&self) -> String {
        match self {
            Segment::Prose { markdown } => markdown.clone(),
            Segment::Code { content, .. } => content.clone(),
            Segment::EditDirective(directive) => directive.source_text(),
            Segment::Literal { text } => text.clone(),
        }
    }
}

/// Ordered segments of one message plus the directive error that forced a
/// literal fallback, if any
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseResult {
    pub segments: Vec<Segment>,
    pub parse_error: Option<DirectiveError>,
}

impl ParseResult {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments, parse_error: None }
    }

    /// Whole-message literal fallback
    pub fn literal(text: &str, error: DirectiveError) -> Self {
        let segments = if text.is_empty() { Vec::new() } else { vec![Segment::Literal { text: text.to_string() }] };
        Self { segments, parse_error: Some(error) }
    }

    pub fn has_error(&self) -> bool {
        self.parse_error.is_some()
    }

    pub fn directive_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_directive()).count()
    }
}

/// Resume point for incremental segmentation.
///
/// `offset` sits just past a newline-terminated closing fence; everything in
/// `segments` was produced from bytes before it, which appends never change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SegmentCheckpoint {
    offset: usize,
    segments: Vec<Segment>,
}

impl SegmentCheckpoint {
    pub fn offset(&self) -> usize {
        self.offset
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ScanState {
    Prose,
    InFence { open_start: usize, body_start: usize, language: Option<String> },
}

#[derive(Debug)]
enum Span {
    Prose(Range<usize>),
    Code { language: Option<String>, body: Range<usize> },
}

/// Splits message text into prose and fenced-code segments
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentParser;

impl SegmentParser {
    /// Parse `text` from the beginning
    pub fn parse(text: &str) -> ParseResult {
        Self::parse_from(text, None).0
    }

    /// Parse `text`, resuming at `checkpoint` when it still applies.
    ///
    /// Returns the full result and the checkpoint to use for the next call.
    pub fn parse_from(text: &str, checkpoint: Option<SegmentCheckpoint>) -> (ParseResult, SegmentCheckpoint) {
        let (mut segments, start) = match checkpoint {
            Some(cp) if cp.offset <= text.len() && text.is_char_boundary(cp.offset) => (cp.segments, cp.offset),
            _ => (Vec::new(), 0),
        };

        let (spans, committed) = Self::scan(text, start);
        let mut committed_len = segments.len();
        let mut committed_offset = start;

        for (idx, span) in spans.into_iter().enumerate() {
            match span {
                Span::Prose(range) => {
                    if let Some(markdown) = trimmed_prose(&text[range]) {
                        segments.push(Segment::prose(markdown));
                    }
                }
                Span::Code { language, body } => {
                    let content = strip_final_newline(&text[body]);
                    segments.push(Segment::code(language, content));
                }
            }

            if let Some((span_count, offset)) = committed
                && idx + 1 == span_count
            {
                committed_len = segments.len();
                committed_offset = offset;
            }
        }

        let checkpoint = SegmentCheckpoint { offset: committed_offset, segments: segments[..committed_len].to_vec() };
        (ParseResult::new(segments), checkpoint)
    }

    /// Walk lines starting at `start`, returning spans and, when a
    /// newline-terminated closing fence was seen, the number of spans up to
    /// and including it together with the offset after it.
    fn scan(text: &str, start: usize) -> (Vec<Span>, Option<(usize, usize)>) {
        let mut spans = Vec::new();
        let mut committed = None;
        let mut state = ScanState::Prose;
        let mut prose_start = start;
        let mut line_start = start;

        for line in text[start..].split_inclusive('\n') {
            let line_end = line_start + line.len();
            let trimmed = line.trim();

            state = match state {
                ScanState::Prose => match fence_open(trimmed) {
                    Some(language) => ScanState::InFence { open_start: line_start, body_start: line_end, language },
                    None => ScanState::Prose,
                },
                ScanState::InFence { open_start, body_start, language } => {
                    if trimmed == FENCE {
                        if open_start > prose_start {
                            spans.push(Span::Prose(prose_start..open_start));
                        }
                        spans.push(Span::Code { language, body: body_start..line_start });
                        prose_start = line_end;
                        if line.ends_with('\n') {
                            committed = Some((spans.len(), line_end));
                        }
                        ScanState::Prose
                    } else {
                        ScanState::InFence { open_start, body_start, language }
                    }
                }
            };

            line_start = line_end;
        }

        if prose_start < text.len() {
            spans.push(Span::Prose(prose_start..text.len()));
        }

        (spans, committed)
    }
}

/// `Some(language)` when the trimmed line opens a fence
fn fence_open(trimmed: &str) -> Option<Option<String>> {
    let rest = trimmed.strip_prefix(FENCE)?;
    if rest.contains('`') {
        return None;
    }
    Some(rest.split_whitespace().next().map(|tag| tag.to_lowercase()))
}

fn trimmed_prose(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        return None;
    }
    Some(raw.trim_matches(|c| c == '\n' || c == '\r').to_string())
}

fn strip_final_newline(body: &str) -> String {
    let body = body.strip_suffix('\n').unwrap_or(body);
    body.strip_suffix('\r').unwrap_or(body).to_string()
}
