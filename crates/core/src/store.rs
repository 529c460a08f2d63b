//! Append-only conversation document.

use crate::directive::DirectiveStatus;
use crate::message::{ChatMessage, Message, MessageKind};

/// Which message an append touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    pub index: usize,
    pub created: bool,
}

/// Ordered messages of one conversation.
///
/// Grows by extending the last message or pushing a new one; only
/// [`ConversationStore::set_all`] and [`ConversationStore::clear`] replace
/// the contents.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` as `kind`; `None` when `text` is empty
    pub fn append(&mut self, text: &str, kind: MessageKind) -> Option<AppendOutcome> {
        if text.is_empty() {
            return None;
        }

        if let Some(last) = self.messages.last_mut()
            && last.kind() == kind
        {
            last.push_text(text);
            return Some(AppendOutcome { index: self.messages.len() - 1, created: false });
        }

        self.messages.push(Message::new(kind, text));
        Some(AppendOutcome { index: self.messages.len() - 1, created: true })
    }

    /// Replace the whole document
    pub fn set_all(&mut self, messages: impl IntoIterator<Item = ChatMessage>) {
        self.messages = messages.into_iter().map(Message::from).collect();
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message_mut(&mut self, index: usize) -> Option<&mut Message> {
        self.messages.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Persistable copy of the document
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(Message::to_chat_message).collect()
    }

    /// Concatenated text of every message in order
    pub fn text(&self) -> String {
        self.messages.iter().map(Message::text).collect()
    }

    /// Message texts separated by blank lines, as copied out of the panel
    pub fn displayed_text(&self) -> String {
        self.messages.iter().map(Message::text).collect::<Vec<_>>().join("\n\n")
    }

    /// Record an external apply result; false when nothing changed
    pub fn set_directive_status(&mut self, message: usize, directive: usize, status: DirectiveStatus) -> bool {
        self.messages.get_mut(message).is_some_and(|m| m.set_directive_status(directive, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_displayed_text_separates_messages() {
        let mut store = ConversationStore::new();
        assert_eq!(store.displayed_text(), "");
        store.append("question", MessageKind::User);
        store.append("ans", MessageKind::Ai);
        store.append("wer", MessageKind::Ai);
        assert_eq!(store.displayed_text(), "question\n\nanswer");
        assert_eq!(store.text(), "questionanswer");
    }

    #[test]
    fn test_append_merges_same_kind() {
        let mut store = ConversationStore::new();
        assert_eq!(store.append("Hel", MessageKind::Ai), Some(AppendOutcome { index: 0, created: true }));
        assert_eq!(store.append("lo", MessageKind::Ai), Some(AppendOutcome { index: 0, created: false }));
        assert_eq!(store.len(), 1);
        assert_eq!(store.messages()[0].text(), "Hello");
    }

    #[test]
    fn test_append_kind_change_starts_new_message() {
        let mut store = ConversationStore::new();
        store.append("question", MessageKind::User);
        store.append("answer", MessageKind::Ai);
        store.append("follow-up", MessageKind::User);

        let kinds: Vec<MessageKind> = store.messages().iter().map(Message::kind).collect();
        assert_eq!(kinds, vec![MessageKind::User, MessageKind::Ai, MessageKind::User]);
        assert_eq!(store.text(), "questionanswerfollow-up");
    }

    #[test]
    fn test_empty_append_is_noop() {
        let mut store = ConversationStore::new();
        assert_eq!(store.append("", MessageKind::User), None);
        assert!(store.is_empty());

        store.append("x", MessageKind::User);
        store.messages_parse_all();
        assert_eq!(store.append("", MessageKind::User), None);
        assert!(store.messages()[0].is_parsed());
    }

    #[test]
    fn test_append_invalidates_cache() {
        let mut store = ConversationStore::new();
        store.append("a", MessageKind::System);
        store.messages_parse_all();
        store.append("b", MessageKind::System);
        assert!(!store.messages()[0].is_parsed());
    }

    #[test]
    fn test_set_all_and_snapshot_round_trip() {
        let input = vec![
            ChatMessage::new(MessageKind::User, "hi"),
            ChatMessage::new(MessageKind::Ai, "hello"),
            ChatMessage::new(MessageKind::Custom, "note"),
        ];
        let mut store = ConversationStore::new();
        store.append("stale", MessageKind::System);
        store.set_all(input.clone());
        assert_eq!(store.snapshot(), input);
    }

    #[test]
    fn test_clear() {
        let mut store = ConversationStore::new();
        store.append("a", MessageKind::User);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.text(), "");
    }

    #[test]
    fn test_set_directive_status() {
        let mut store = ConversationStore::new();
        store.append("lib.rs\n<<<<<<< SEARCH\na\n=======\nb\n>>>>>>> REPLACE\n", MessageKind::Ai);
        assert!(store.set_directive_status(0, 0, DirectiveStatus::Failed));
        assert!(!store.set_directive_status(0, 0, DirectiveStatus::Failed));
        assert!(!store.set_directive_status(5, 0, DirectiveStatus::Applied));
        assert_eq!(store.messages()[0].directive_status(0), DirectiveStatus::Failed);
    }

    impl ConversationStore {
        fn messages_parse_all(&mut self) {
            for message in &mut self.messages {
                message.parse();
            }
        }
    }
}
