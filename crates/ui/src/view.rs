use crate::element::DisplayElement;
use crate::materializer::Materialize;
use crate::panel::OutputPanel;
use crate::theme::ThemePalette;

use quill_core::MessageKind;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

/// Header text per message kind
fn header(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::User => "● You",
        MessageKind::Ai => "◆ Assistant",
        MessageKind::System => "• System",
        MessageKind::Custom => "▪ Note",
    }
}

/// Draws an [`OutputPanel`] into a ratatui buffer
pub struct TranscriptView<'a, M: Materialize> {
    panel: &'a OutputPanel<M>,
    scroll: u16,
    follow: bool,
}

impl<'a, M: Materialize> TranscriptView<'a, M> {
    pub fn new(panel: &'a OutputPanel<M>) -> Self {
        Self { panel, scroll: 0, follow: false }
    }

    /// Scroll offset from the top
    pub fn scroll(mut self, scroll: u16) -> Self {
        self.scroll = scroll;
        self
    }

    /// Keep the last line in view
    pub fn follow_tail(mut self) -> Self {
        self.follow = true;
        self
    }

    /// Unwrapped lines: per message a header, its elements, then a blank
    /// separator; the busy indicator last
    pub fn lines(&self) -> Vec<Line<'static>> {
        let palette = self.panel.palette();
        let mut lines = Vec::new();

        for (message, elements) in self.panel.messages().iter().zip(self.panel.rendered_messages()) {
            if elements.is_empty() {
                continue;
            }
            if !lines.is_empty() {
                lines.push(Line::default());
            }
            let accent = Style::default().fg(palette.accent(message.kind())).add_modifier(Modifier::BOLD);
            lines.push(Line::from(Span::styled(header(message.kind()), accent)));
            for element in elements {
                push_element(element, &mut lines);
            }
        }

        if let Some(busy) = self.panel.busy_element() {
            if !lines.is_empty() {
                lines.push(Line::default());
            }
            push_element(busy, &mut lines);
        }

        lines
    }

    /// Lines wrapped to `width` columns
    pub fn wrapped_lines(&self, width: usize) -> Vec<Line<'static>> {
        let mut wrapped = Vec::new();
        for line in self.lines() {
            wrap_line(line, width, &mut wrapped);
        }
        wrapped
    }

    /// Number of rows the transcript occupies at `width`
    pub fn content_height(&self, width: usize) -> usize {
        self.wrapped_lines(width).len()
    }

    fn palette(&self) -> ThemePalette {
        self.panel.palette()
    }
}

impl<M: Materialize> Widget for TranscriptView<'_, M> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let palette = self.palette();
        let lines = self.wrapped_lines(area.width as usize);
        let scroll = if self.follow {
            lines.len().saturating_sub(area.height as usize).min(u16::MAX as usize) as u16
        } else {
            self.scroll
        };

        Paragraph::new(Text::from(lines))
            .block(Block::default().style(palette.base()))
            .scroll((scroll, 0))
            .render(area, buf);
    }
}

fn push_element(element: &DisplayElement, lines: &mut Vec<Line<'static>>) {
    lines.extend(element.lines.iter().cloned());
}

/// Break `line` into rows of at most `max_width` columns, keeping span styles
pub fn wrap_line(line: Line<'static>, max_width: usize, out: &mut Vec<Line<'static>>) {
    if max_width == 0 || line.width() <= max_width {
        out.push(line);
        return;
    }

    let mut row: Vec<Span<'static>> = Vec::new();
    let mut row_width = 0;

    for span in line.spans {
        let style = span.style;
        let mut chunk = String::new();

        for ch in span.content.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if row_width + ch_width > max_width && row_width > 0 {
                if !chunk.is_empty() {
                    row.push(Span::styled(std::mem::take(&mut chunk), style));
                }
                out.push(Line::from(std::mem::take(&mut row)));
                row_width = 0;
            }
            chunk.push(ch);
            row_width += ch_width;
        }

        if !chunk.is_empty() {
            row.push(Span::styled(chunk, style));
        }
    }

    if !row.is_empty() {
        out.push(Line::from(row));
    }
}

/// Plain text of a line, for tests and logs
pub fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Color;

    #[test]
    fn test_wrap_line_short() {
        let mut out = Vec::new();
        wrap_line(Line::from("short"), 10, &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_wrap_line_preserves_styles() {
        let style = Style::default().fg(Color::Red);
        let line = Line::from(vec![Span::raw("abc"), Span::styled("defgh", style)]);
        let mut out = Vec::new();
        wrap_line(line, 4, &mut out);

        let texts: Vec<String> = out.iter().map(line_text).collect();
        assert_eq!(texts, vec!["abcd", "efgh"]);
        assert_eq!(out[0].spans[1].style, style);
        assert_eq!(out[1].spans[0].style, style);
    }

    #[test]
    fn test_wrap_wide_chars() {
        let mut out = Vec::new();
        wrap_line(Line::from("日本語テキスト"), 6, &mut out);
        assert!(out.iter().all(|l| l.width() <= 6));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_lines_have_headers() {
        let mut panel = OutputPanel::default();
        panel.append("question", MessageKind::User);
        panel.append("answer", MessageKind::Ai);
        let texts: Vec<String> = TranscriptView::new(&panel).lines().iter().map(line_text).collect();
        assert_eq!(texts, vec!["● You", "question", "", "◆ Assistant", "answer"]);
    }

    #[test]
    fn test_busy_indicator_after_messages() {
        let mut panel = OutputPanel::default();
        panel.append("question", MessageKind::User);
        panel.show_spinner("Thinking");
        let lines = TranscriptView::new(&panel).lines();
        assert!(line_text(lines.last().unwrap()).contains("Thinking"));
    }
}
