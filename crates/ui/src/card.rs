use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

const PADDING: usize = 1;
const MIN_WIDTH: usize = 20;

/// Draw `content` inside a titled box sized to its widest line
pub fn render_card(title: &str, border_color: Color, bg: Color, content: Vec<Line<'static>>) -> Vec<Line<'static>> {
    let border_style = Style::default().fg(border_color).bg(bg);
    let content_bg = Style::default().bg(bg);
    let prefix = "┌─ ";

    let content_width = content.iter().map(|line| line.width()).max().unwrap_or(0);
    let title_width = prefix.width() + title.width() + 2;
    let card_width = (content_width + PADDING * 2 + 2).max(title_width + 1).max(MIN_WIDTH);
    let inner_width = card_width - 2 - PADDING * 2;

    let mut lines = Vec::with_capacity(content.len() + 2);
    lines.push(Line::from(vec![
        Span::styled(prefix, border_style),
        Span::styled(title.to_string(), border_style),
        Span::styled(" ", border_style),
        Span::styled("─".repeat(card_width.saturating_sub(title_width)), border_style),
        Span::styled("┐", border_style),
    ]));

    for line in content {
        let padding_needed = inner_width.saturating_sub(line.width());
        let mut spans = Vec::with_capacity(line.spans.len() + 3);
        spans.push(Span::styled(format!("│{}", " ".repeat(PADDING)), border_style));
        spans.extend(line.spans.into_iter().map(|span| {
            let style = span.style;
            let style = if style.bg.is_none() { style.bg(bg) } else { style };
            Span::styled(span.content, style)
        }));
        spans.push(Span::styled(" ".repeat(padding_needed), content_bg));
        spans.push(Span::styled(format!("{}│", " ".repeat(PADDING)), border_style));
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(vec![
        Span::styled("└", border_style),
        Span::styled("─".repeat(card_width - 2), border_style),
        Span::styled("┘", border_style),
    ]));
    lines
}
