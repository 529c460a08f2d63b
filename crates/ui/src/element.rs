use quill_core::{DirectiveStatus, LineMetrics, MessageKind};
use ratatui::text::Line;

/// What a display element was built from
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Prose,
    Code { language: Option<String> },
    Directive { filename: String, metrics: LineMetrics, status: DirectiveStatus },
    Literal,
    Busy,
}

/// One rendered unit of the transcript.
///
/// Lines are fully styled but not wrapped; the view wraps them to the
/// available width.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayElement {
    /// Kind of the owning message, `None` for the busy indicator
    pub message_kind: Option<MessageKind>,
    pub kind: ElementKind,
    /// Raw text the element was built from
    pub source: String,
    pub lines: Vec<Line<'static>>,
}

impl DisplayElement {
    pub fn new(message_kind: MessageKind, kind: ElementKind, source: impl Into<String>, lines: Vec<Line<'static>>) -> Self {
        Self { message_kind: Some(message_kind), kind, source: source.into(), lines }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.kind, ElementKind::Busy)
    }

    pub fn is_directive(&self) -> bool {
        matches!(self.kind, ElementKind::Directive { .. })
    }

    pub fn metrics(&self) -> Option<LineMetrics> {
        match &self.kind {
            ElementKind::Directive { metrics, .. } => Some(*metrics),
            _ => None,
        }
    }

    /// Unstyled text of the rendered lines
    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
