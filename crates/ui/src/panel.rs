//! The output panel: store, materializer, theme and scheduling in one owner.

use crate::dispatch::PanelCommand;
use crate::element::DisplayElement;
use crate::materializer::{Materialize, RenderMaterializer, fallback_elements};
use crate::scheduler::{UpdatePolicy, UpdateScheduler};
use crate::spinner::BusyIndicator;
use crate::theme::{ThemeController, ThemePalette, ThemeSnapshot};

use quill_core::{ChatMessage, ConversationStore, DirectiveStatus, Message, MessageKind, RenderConfig, preview_for_log};
use quill_core::logging::LOG_PREVIEW_CHARS;
use std::cell::Cell;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tokio::sync::{mpsc, watch};

/// Incrementally rendered conversation transcript.
///
/// Single-owner and `!Sync`; other threads talk to it through a
/// [`Dispatcher`](crate::Dispatcher). Observers subscribe to the render
/// generation and re-query state when it changes.
pub struct OutputPanel<M: Materialize = RenderMaterializer> {
    store: ConversationStore,
    rendered: Vec<Vec<DisplayElement>>,
    theme: ThemeController,
    materializer: M,
    scheduler: UpdateScheduler,
    spinner: BusyIndicator,
    busy_element: Option<DisplayElement>,
    blocked: bool,
    generation: watch::Sender<u64>,
    _not_sync: PhantomData<Cell<()>>,
}

impl OutputPanel<RenderMaterializer> {
    pub fn new(config: &RenderConfig) -> Self {
        Self::with_materializer(config, RenderMaterializer)
    }
}

impl Default for OutputPanel<RenderMaterializer> {
    fn default() -> Self {
        Self::new(&RenderConfig::default())
    }
}

impl<M: Materialize> OutputPanel<M> {
    pub fn with_materializer(config: &RenderConfig, materializer: M) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            store: ConversationStore::new(),
            rendered: Vec::new(),
            theme: ThemeController::new(config),
            materializer,
            scheduler: UpdateScheduler::new(UpdatePolicy::from_config(config)),
            spinner: BusyIndicator::new(),
            busy_element: None,
            blocked: false,
            generation,
            _not_sync: PhantomData,
        }
    }

    /// Override the update policy from configuration
    pub fn with_policy(mut self, policy: UpdatePolicy) -> Self {
        self.scheduler = UpdateScheduler::new(policy);
        self
    }

    /// Append streamed text; empty text is ignored
    pub fn append(&mut self, text: &str, kind: MessageKind) {
        let Some(outcome) = self.store.append(text, kind) else {
            return;
        };
        if outcome.created {
            self.rendered.push(Vec::new());
        }
        tracing::trace!(
            index = outcome.index,
            created = outcome.created,
            text = %preview_for_log(text, LOG_PREVIEW_CHARS),
            "append"
        );
        self.schedule(outcome.index);
    }

    /// While blocked, `clear` and `set_conversation` are ignored so an
    /// in-flight response cannot be wiped. Appends still go through.
    pub fn set_blocking(&mut self, blocked: bool) {
        if self.blocked != blocked {
            tracing::debug!(blocked, "blocking changed");
        }
        self.blocked = blocked;
    }

    pub fn is_blocking(&self) -> bool {
        self.blocked
    }

    /// Empty the transcript, drop the busy indicator and cancel pending renders
    pub fn clear(&mut self) {
        if self.blocked {
            tracing::debug!("ignoring clear while blocking");
            return;
        }
        self.scheduler.cancel();
        self.store.clear();
        self.rendered.clear();
        self.spinner.hide();
        self.busy_element = None;
        self.notify();
    }

    /// Replace the transcript and render it in full
    pub fn set_conversation(&mut self, messages: Vec<ChatMessage>) {
        if self.blocked {
            tracing::debug!(messages = messages.len(), "ignoring set_conversation while blocking");
            return;
        }
        self.scheduler.cancel();
        self.store.set_all(messages);
        self.rendered = vec![Vec::new(); self.store.len()];
        self.render_all();
    }

    /// Switch between dark and light; false when already active
    pub fn set_theme(&mut self, is_dark: bool) -> bool {
        if !self.theme.set_theme(is_dark) {
            return false;
        }
        tracing::debug!(variant = self.theme.variant().as_str(), "theme changed");
        self.refresh_busy_element();
        self.render_all();
        true
    }

    pub fn show_spinner(&mut self, message: &str) {
        if self.spinner.show(message) {
            self.refresh_busy_element();
            self.notify();
        }
    }

    pub fn hide_spinner(&mut self) {
        if self.spinner.hide() {
            self.refresh_busy_element();
            self.notify();
        }
    }

    /// Advance the busy indicator animation
    pub fn advance_spinner(&mut self) {
        if self.spinner.advance() {
            self.refresh_busy_element();
            self.notify();
        }
    }

    /// Record the apply result of a directive and re-render its message
    pub fn set_directive_status(&mut self, message: usize, directive: usize, status: DirectiveStatus) -> bool {
        if !self.store.set_directive_status(message, directive, status) {
            return false;
        }
        self.schedule(message);
        true
    }

    /// Concatenated text of the whole transcript
    pub fn get_text(&self) -> String {
        self.store.text()
    }

    /// Message texts separated by blank lines, for copying out
    pub fn get_displayed_text(&self) -> String {
        self.store.displayed_text()
    }

    pub fn get_messages(&self) -> Vec<ChatMessage> {
        self.store.snapshot()
    }

    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    /// Render messages whose coalescing window has elapsed
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(dirty) = self.scheduler.due(now) else {
            return false;
        };
        let rendered = dirty.into_iter().filter(|idx| self.render_message(*idx)).count();
        if rendered > 0 {
            tracing::debug!(rendered, "coalesced render pass");
            self.notify();
        }
        rendered > 0
    }

    /// Apply every queued command; returns how many were applied
    pub fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<PanelCommand>) -> usize {
        let mut applied = 0;
        while let Ok(command) = rx.try_recv() {
            self.apply(command);
            applied += 1;
        }
        applied
    }

    pub fn apply(&mut self, command: PanelCommand) {
        match command {
            PanelCommand::Append { text, kind } => self.append(&text, kind),
            PanelCommand::Clear => self.clear(),
            PanelCommand::SetConversation(messages) => self.set_conversation(messages),
            PanelCommand::SetTheme { is_dark } => {
                self.set_theme(is_dark);
            }
            PanelCommand::ShowSpinner(message) => self.show_spinner(&message),
            PanelCommand::HideSpinner => self.hide_spinner(),
            PanelCommand::SetDirectiveStatus { message, directive, status } => {
                self.set_directive_status(message, directive, status);
            }
            PanelCommand::SetBlocking(blocked) => self.set_blocking(blocked),
        }
    }

    /// Every element in display order, busy indicator last
    pub fn elements(&self) -> impl Iterator<Item = &DisplayElement> {
        self.rendered.iter().flatten().chain(self.busy_element.iter())
    }

    /// Elements grouped by message
    pub fn rendered_messages(&self) -> &[Vec<DisplayElement>] {
        &self.rendered
    }

    pub fn busy_element(&self) -> Option<&DisplayElement> {
        self.busy_element.as_ref()
    }

    pub fn spinner(&self) -> &BusyIndicator {
        &self.spinner
    }

    pub fn palette(&self) -> ThemePalette {
        self.theme.palette()
    }

    pub fn theme(&self) -> ThemeSnapshot {
        self.theme.snapshot()
    }

    pub fn policy(&self) -> UpdatePolicy {
        self.scheduler.policy()
    }

    pub fn has_pending_updates(&self) -> bool {
        self.scheduler.has_pending()
    }

    /// Receiver that changes after every render pass
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    fn schedule(&mut self, index: usize) {
        if self.scheduler.mark_dirty(index, Instant::now()) && self.render_message(index) {
            self.notify();
        }
    }

    fn render_all(&mut self) {
        let count = (0..self.store.len()).filter(|idx| self.render_message(*idx)).count();
        tracing::debug!(messages = count, "full render pass");
        self.notify();
    }

    /// Rebuild the elements of one message.
    ///
    /// Errors and panics are contained here: the message keeps its previous
    /// elements, or a literal rendering when it has none.
    fn render_message(&mut self, index: usize) -> bool {
        let snapshot = self.theme.snapshot();
        let Some(message) = self.store.message_mut(index) else {
            return false;
        };

        let materializer = &self.materializer;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| materializer.materialize(message, &snapshot)));
        let failure = match outcome {
            Ok(Ok(elements)) => {
                self.store_elements(index, elements);
                return true;
            }
            Ok(Err(err)) => err.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };

        tracing::error!(index, error = %failure, "failed to render message, keeping previous output");
        let previous_empty = self.rendered.get(index).is_none_or(Vec::is_empty);
        if previous_empty && let Some(message) = self.store.messages().get(index) {
            let fallback = fallback_elements(message.kind(), message.text(), &snapshot.palette);
            self.store_elements(index, fallback);
        }
        true
    }

    fn store_elements(&mut self, index: usize, elements: Vec<DisplayElement>) {
        if self.rendered.len() <= index {
            self.rendered.resize_with(index + 1, Vec::new);
        }
        self.rendered[index] = elements;
    }

    fn refresh_busy_element(&mut self) {
        self.busy_element = self.spinner.element(&self.theme.palette());
    }

    fn notify(&self) {
        self.generation.send_modify(|generation| *generation += 1);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "panic during materialization".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementKind;
    use quill_core::Error;
    use std::time::Duration;

    struct FailingMaterializer {
        fail_on: &'static str,
        panic: bool,
    }

    impl Materialize for FailingMaterializer {
        fn materialize(&self, message: &mut Message, theme: &ThemeSnapshot) -> quill_core::Result<Vec<DisplayElement>> {
            if message.text().contains(self.fail_on) {
                if self.panic {
                    panic!("materializer blew up");
                }
                return Err(Error::Render("bad input".to_string()));
            }
            RenderMaterializer.materialize(message, theme)
        }
    }

    #[test]
    fn test_append_renders_immediately() {
        let mut panel = OutputPanel::default();
        let generation = panel.generation();
        panel.append("Hello", MessageKind::User);
        assert_eq!(panel.elements().count(), 1);
        assert!(panel.generation() > generation);
    }

    #[test]
    fn test_empty_append_changes_nothing() {
        let mut panel = OutputPanel::default();
        panel.append("Hi", MessageKind::Ai);
        let generation = panel.generation();
        panel.append("", MessageKind::Ai);
        panel.append("", MessageKind::User);
        assert_eq!(panel.generation(), generation);
        assert_eq!(panel.get_messages().len(), 1);
    }

    #[test]
    fn test_only_touched_message_rerenders() {
        let mut panel = OutputPanel::default();
        panel.append("question", MessageKind::User);
        panel.append("answer", MessageKind::Ai);
        let first = panel.rendered_messages()[0].clone();

        panel.append(" continues", MessageKind::Ai);
        assert_eq!(panel.rendered_messages()[0], first);
        assert!(panel.rendered_messages()[1][0].plain_text().contains("answer continues"));
    }

    #[test]
    fn test_spinner_stays_last() {
        let mut panel = OutputPanel::default();
        panel.append("first", MessageKind::User);
        panel.show_spinner("Thinking");
        panel.append("reply", MessageKind::Ai);
        let last = panel.elements().last().unwrap();
        assert!(last.is_busy());
        assert_eq!(panel.elements().filter(|e| e.is_busy()).count(), 1);

        panel.hide_spinner();
        assert!(panel.elements().all(|e| !e.is_busy()));
    }

    #[test]
    fn test_clear_drops_busy_indicator() {
        let mut panel = OutputPanel::default();
        panel.append("hi", MessageKind::Ai);
        panel.show_spinner("Thinking...");
        panel.clear();

        assert!(!panel.spinner().is_showing());
        assert!(panel.busy_element().is_none());
        assert_eq!(panel.elements().count(), 0);

        panel.append("next", MessageKind::Ai);
        assert!(panel.elements().all(|e| !e.is_busy()));
    }

    #[test]
    fn test_blocking_ignores_clear_and_replace() {
        let mut panel = OutputPanel::default();
        panel.append("keep me", MessageKind::Ai);
        panel.set_blocking(true);
        assert!(panel.is_blocking());

        panel.clear();
        panel.set_conversation(vec![ChatMessage::new(MessageKind::User, "other")]);
        assert_eq!(panel.get_text(), "keep me");
        assert_eq!(panel.elements().count(), 1);

        panel.append(" still", MessageKind::Ai);
        assert_eq!(panel.get_text(), "keep me still");

        panel.set_blocking(false);
        panel.clear();
        assert!(panel.get_messages().is_empty());
    }

    #[test]
    fn test_spinner_message_update() {
        let mut panel = OutputPanel::default();
        panel.show_spinner("Thinking");
        panel.show_spinner("Applying");
        assert_eq!(panel.spinner().message(), Some("Applying"));
        assert!(panel.busy_element().unwrap().plain_text().contains("Applying"));
    }

    #[test]
    fn test_set_theme_idempotent() {
        let mut panel = OutputPanel::default();
        panel.append("```rust\nfn a() {}\n```\n", MessageKind::Ai);
        panel.show_spinner("busy");

        assert!(panel.set_theme(false));
        let generation = panel.generation();
        let elements: Vec<DisplayElement> = panel.elements().cloned().collect();

        assert!(!panel.set_theme(false));
        assert_eq!(panel.generation(), generation);
        assert_eq!(panel.elements().cloned().collect::<Vec<_>>(), elements);
        let palette = panel.palette();
        assert_eq!(panel.busy_element().unwrap().lines[0].spans[1].style.bg, Some(palette.panel_bg));
    }

    #[test]
    fn test_round_trip() {
        let mut panel = OutputPanel::default();
        panel.append("hi", MessageKind::User);
        panel.append("intro\n```py\nx = 1\n```\n", MessageKind::Ai);
        panel.append("done", MessageKind::System);

        let mut restored = OutputPanel::default();
        restored.set_conversation(panel.get_messages());
        assert_eq!(restored.get_messages(), panel.get_messages());
        assert_eq!(restored.get_text(), panel.get_text());
        assert_eq!(restored.rendered_messages(), panel.rendered_messages());
    }

    #[test]
    fn test_clear_cancels_pending() {
        let mut panel = OutputPanel::default().with_policy(UpdatePolicy::Coalesce(Duration::from_millis(100)));
        panel.append("pending", MessageKind::Ai);
        assert!(panel.has_pending_updates());
        panel.clear();
        assert!(!panel.has_pending_updates());
        assert!(!panel.tick(Instant::now() + Duration::from_secs(1)));
        assert_eq!(panel.elements().count(), 0);
        assert_eq!(panel.get_text(), "");
    }

    #[test]
    fn test_coalesced_updates_render_on_tick() {
        let mut panel = OutputPanel::default().with_policy(UpdatePolicy::Coalesce(Duration::from_millis(50)));
        panel.append("a", MessageKind::User);
        panel.append("b", MessageKind::Ai);
        panel.append("c", MessageKind::Ai);
        assert!(panel.rendered_messages().iter().all(Vec::is_empty));

        assert!(!panel.tick(Instant::now()));
        assert!(panel.tick(Instant::now() + Duration::from_millis(60)));
        assert_eq!(panel.rendered_messages()[1][0].plain_text(), "bc");
    }

    #[test]
    fn test_render_error_keeps_previous_elements() {
        let materializer = FailingMaterializer { fail_on: "BOOM", panic: false };
        let mut panel = OutputPanel::with_materializer(&RenderConfig::default(), materializer);
        panel.append("safe", MessageKind::User);
        panel.append("good start", MessageKind::Ai);
        let before = panel.rendered_messages()[1].clone();

        panel.append(" BOOM", MessageKind::Ai);
        assert_eq!(panel.rendered_messages()[1], before);
        assert_eq!(panel.rendered_messages()[0][0].plain_text(), "safe");
    }

    #[test]
    fn test_render_panic_is_contained() {
        let materializer = FailingMaterializer { fail_on: "BOOM", panic: true };
        let mut panel = OutputPanel::with_materializer(&RenderConfig::default(), materializer);
        panel.append("BOOM right away", MessageKind::Ai);
        let elements = &panel.rendered_messages()[0];
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].kind, ElementKind::Literal);

        panel.append("next", MessageKind::User);
        assert_eq!(panel.rendered_messages()[1][0].plain_text(), "next");
    }

    #[test]
    fn test_directive_status_rerenders() {
        let mut panel = OutputPanel::default();
        panel.append("a.rs\n<<<<<<< SEARCH\nx\n=======\ny\n>>>>>>> REPLACE", MessageKind::Ai);
        assert!(panel.set_directive_status(0, 0, DirectiveStatus::Applied));
        assert!(panel.rendered_messages()[0][0].plain_text().contains("[applied]"));
        assert!(!panel.set_directive_status(0, 0, DirectiveStatus::Applied));
    }

    #[test]
    fn test_drain_applies_commands() {
        let (dispatcher, mut rx) = crate::Dispatcher::channel();
        dispatcher.append("Hel", MessageKind::Ai);
        dispatcher.append("lo", MessageKind::Ai);
        dispatcher.show_spinner("typing");

        let mut panel = OutputPanel::default();
        assert_eq!(panel.drain(&mut rx), 3);
        assert_eq!(panel.get_text(), "Hello");
        assert!(panel.spinner().is_showing());
    }

    #[test]
    fn test_subscribe_sees_generation() {
        let mut panel = OutputPanel::default();
        let mut rx = panel.subscribe();
        assert!(!rx.has_changed().unwrap());
        panel.append("x", MessageKind::User);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), panel.generation());
    }
}
