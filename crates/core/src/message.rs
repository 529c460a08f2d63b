use crate::directive::{DirectiveStatus, EditDirectiveParser};
use crate::segment::{ParseResult, Segment, SegmentCheckpoint, SegmentParser};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    #[serde(alias = "assistant")]
    Ai,
    System,
    Custom,
}

impl MessageKind {
    pub const VALUES: &'static [&'static str] = &["user", "ai", "system", "custom"];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::User => "user",
            MessageKind::Ai => "ai",
            MessageKind::System => "system",
            MessageKind::Custom => "custom",
        }
    }

    /// Edit directives are only recognized in assistant output
    pub fn parses_directives(&self) -> bool {
        matches!(self, MessageKind::Ai)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageKind::User),
            "ai" | "assistant" => Ok(MessageKind::Ai),
            "system" => Ok(MessageKind::System),
            "custom" => Ok(MessageKind::Custom),
            _ => Err(format!("unknown message kind '{}', expected one of: {}", s, Self::VALUES.join(", "))),
        }
    }
}

/// Persisted `{kind, text}` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl ChatMessage {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }
}

/// One message of the document with its cached parse.
///
/// Text only grows. Any change to the text or to a directive status drops
/// the cached parse; the segment checkpoint survives text growth since the
/// prefix it covers never changes.
#[derive(Debug, Clone)]
pub struct Message {
    kind: MessageKind,
    text: String,
    statuses: BTreeMap<usize, DirectiveStatus>,
    checkpoint: Option<SegmentCheckpoint>,
    cached: Option<ParseResult>,
}

impl Message {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into(), statuses: BTreeMap::new(), checkpoint: None, cached: None }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
        self.cached = None;
    }

    /// Record the apply result for the `directive`-th directive of this message
    pub fn set_directive_status(&mut self, directive: usize, status: DirectiveStatus) -> bool {
        if self.statuses.get(&directive) == Some(&status) {
            return false;
        }
        self.statuses.insert(directive, status);
        self.cached = None;
        true
    }

    pub fn directive_status(&self, directive: usize) -> DirectiveStatus {
        self.statuses.get(&directive).copied().unwrap_or_default()
    }

    /// Whether a parse is cached
    pub fn is_parsed(&self) -> bool {
        self.cached.is_some()
    }

    pub fn cached_parse(&self) -> Option<&ParseResult> {
        self.cached.as_ref()
    }

    /// Parse result for the current text, computed on first use
    pub fn parse(&mut self) -> &ParseResult {
        let Message { kind, text, statuses, checkpoint, cached } = self;
        cached.get_or_insert_with(|| compute_parse(*kind, text, statuses, checkpoint))
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage::new(self.kind, self.text.clone())
    }
}

impl From<ChatMessage> for Message {
    fn from(message: ChatMessage) -> Self {
        Message::new(message.kind, message.text)
    }
}

fn compute_parse(
    kind: MessageKind, text: &str, statuses: &BTreeMap<usize, DirectiveStatus>, checkpoint: &mut Option<SegmentCheckpoint>,
) -> ParseResult {
    if kind.parses_directives() && EditDirectiveParser::might_contain_directive(text) {
        let parsed = EditDirectiveParser::parse(text);
        if let Some(error) = &parsed.parse_error {
            tracing::warn!(kind = %kind, error = %error, "malformed edit directive, rendering message as literal text");
        }
        if let Some(mut result) = parsed.into_parse_result(text) {
            apply_statuses(&mut result, statuses);
            return result;
        }
    }

    let (result, next) = SegmentParser::parse_from(text, checkpoint.take());
    *checkpoint = Some(next);
    result
}

fn apply_statuses(result: &mut ParseResult, statuses: &BTreeMap<usize, DirectiveStatus>) {
    let directives = result.segments.iter_mut().filter_map(|segment| match segment {
        Segment::EditDirective(directive) => Some(directive),
        _ => None,
    });
    for (idx, directive) in directives.enumerate() {
        if let Some(status) = statuses.get(&idx) {
            directive.status = *status;
        }
    }
}
