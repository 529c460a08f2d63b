use crate::element::{DisplayElement, ElementKind};
use crate::theme::ThemePalette;

use ratatui::style::Style;
use ratatui::text::{Line, Span};

const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Busy indicator shown after the last message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusyIndicator {
    message: Option<String>,
    frame: usize,
}

impl BusyIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show or update the indicator; false when nothing changed
    pub fn show(&mut self, message: &str) -> bool {
        if self.message.as_deref() == Some(message) {
            return false;
        }
        self.message = Some(message.to_string());
        true
    }

    /// Remove the indicator; false when it was not showing
    pub fn hide(&mut self) -> bool {
        self.frame = 0;
        self.message.take().is_some()
    }

    pub fn is_showing(&self) -> bool {
        self.message.is_some()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Step the animation
    pub fn advance(&mut self) -> bool {
        if !self.is_showing() {
            return false;
        }
        self.frame = (self.frame + 1) % FRAMES.len();
        true
    }

    pub fn element(&self, palette: &ThemePalette) -> Option<DisplayElement> {
        let message = self.message.as_ref()?;
        let style = Style::default().fg(palette.muted).bg(palette.panel_bg);
        let line = Line::from(vec![
            Span::styled(format!(" {} ", FRAMES[self.frame]), Style::default().fg(palette.cyan).bg(palette.panel_bg)),
            Span::styled(format!("{message} "), style),
        ]);
        Some(DisplayElement { message_kind: None, kind: ElementKind::Busy, source: message.clone(), lines: vec![line] })
    }
}
