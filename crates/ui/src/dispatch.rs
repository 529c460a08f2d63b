//! Hand-off from producer threads to the panel owner.
//!
//! Producers hold a cloneable [`Dispatcher`]; the thread that owns the
//! [`OutputPanel`](crate::OutputPanel) drains the receiving end with
//! [`OutputPanel::drain`](crate::OutputPanel::drain) or applies commands one
//! at a time from an async loop.

use quill_core::{ChatMessage, DirectiveStatus, MessageKind};
use tokio::sync::mpsc;

/// One mutation requested by a producer
#[derive(Debug, Clone, PartialEq)]
pub enum PanelCommand {
    Append { text: String, kind: MessageKind },
    Clear,
    SetConversation(Vec<ChatMessage>),
    SetTheme { is_dark: bool },
    ShowSpinner(String),
    HideSpinner,
    SetDirectiveStatus { message: usize, directive: usize, status: DirectiveStatus },
    SetBlocking(bool),
}

/// Sending half, safe to clone across threads.
///
/// Every method returns false once the panel side has been dropped.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<PanelCommand>,
}

impl Dispatcher {
    /// Create a dispatcher and the receiver the panel owner polls
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PanelCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, command: PanelCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn append(&self, text: impl Into<String>, kind: MessageKind) -> bool {
        self.send(PanelCommand::Append { text: text.into(), kind })
    }

    pub fn clear(&self) -> bool {
        self.send(PanelCommand::Clear)
    }

    pub fn set_conversation(&self, messages: Vec<ChatMessage>) -> bool {
        self.send(PanelCommand::SetConversation(messages))
    }

    pub fn set_theme(&self, is_dark: bool) -> bool {
        self.send(PanelCommand::SetTheme { is_dark })
    }

    pub fn show_spinner(&self, message: impl Into<String>) -> bool {
        self.send(PanelCommand::ShowSpinner(message.into()))
    }

    pub fn hide_spinner(&self) -> bool {
        self.send(PanelCommand::HideSpinner)
    }

    pub fn set_directive_status(&self, message: usize, directive: usize, status: DirectiveStatus) -> bool {
        self.send(PanelCommand::SetDirectiveStatus { message, directive, status })
    }

    pub fn set_blocking(&self, blocked: bool) -> bool {
        self.send(PanelCommand::SetBlocking(blocked))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_arrive_in_order() {
        let (dispatcher, mut rx) = Dispatcher::channel();
        assert!(dispatcher.append("Hel", MessageKind::Ai));
        assert!(dispatcher.show_spinner("Thinking"));
        assert!(dispatcher.set_theme(false));

        assert_eq!(rx.try_recv().unwrap(), PanelCommand::Append { text: "Hel".to_string(), kind: MessageKind::Ai });
        assert_eq!(rx.try_recv().unwrap(), PanelCommand::ShowSpinner("Thinking".to_string()));
        assert_eq!(rx.try_recv().unwrap(), PanelCommand::SetTheme { is_dark: false });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_from_other_thread() {
        let (dispatcher, mut rx) = Dispatcher::channel();
        let producer = dispatcher.clone();
        std::thread::spawn(move || {
            for chunk in ["a", "b", "c"] {
                producer.append(chunk, MessageKind::Ai);
            }
        })
        .join()
        .unwrap();

        let mut received = Vec::new();
        while let Ok(PanelCommand::Append { text, .. }) = rx.try_recv() {
            received.push(text);
        }
        assert_eq!(received, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_closed_receiver() {
        let (dispatcher, rx) = Dispatcher::channel();
        drop(rx);
        assert!(dispatcher.is_closed());
        assert!(!dispatcher.clear());
    }
}
