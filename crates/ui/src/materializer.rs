//! Parse results to display elements.

use crate::card::render_card;
use crate::element::{DisplayElement, ElementKind};
use crate::markdown::render_markdown;
use crate::theme::{ThemePalette, ThemeSnapshot};

use quill_core::{DirectiveStatus, EditDirective, Message, MessageKind, Result, Segment};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use similar::{ChangeTag, TextDiff};

/// Builds the element list of one message
pub trait Materialize {
    fn materialize(&self, message: &mut Message, theme: &ThemeSnapshot) -> Result<Vec<DisplayElement>>;
}

/// Default materializer: markdown prose, highlighted code, directive cards
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderMaterializer;

impl Materialize for RenderMaterializer {
    fn materialize(&self, message: &mut Message, theme: &ThemeSnapshot) -> Result<Vec<DisplayElement>> {
        let kind = message.kind();
        let parsed = message.parse();

        let elements = parsed
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Prose { markdown } => prose_element(kind, markdown, theme),
                Segment::Code { language, content } => code_element(kind, language.as_deref(), content, theme),
                Segment::EditDirective(directive) => directive_element(kind, directive, &theme.palette),
                Segment::Literal { text } => literal_element(kind, text, &theme.palette),
            })
            .collect();

        Ok(elements)
    }
}

fn prose_element(kind: MessageKind, markdown: &str, theme: &ThemeSnapshot) -> DisplayElement {
    let lines = render_markdown(markdown, &theme.palette);
    DisplayElement::new(kind, ElementKind::Prose, markdown, lines)
}

fn code_element(kind: MessageKind, language: Option<&str>, content: &str, theme: &ThemeSnapshot) -> DisplayElement {
    let palette = &theme.palette;
    let code_lines = theme.highlighter.highlight_code(content, language);
    let title = match language {
        Some(lang) => format!(" {} ", lang.to_uppercase()),
        None => " Code ".to_string(),
    };
    let lines = render_card(&title, palette.code_border, palette.code_bg, code_lines);
    DisplayElement::new(kind, ElementKind::Code { language: language.map(str::to_string) }, content, lines)
}

fn directive_element(kind: MessageKind, directive: &EditDirective, palette: &ThemePalette) -> DisplayElement {
    let metrics = directive.metrics;
    let (badge, badge_color) = match directive.status {
        DirectiveStatus::Pending => ("pending", palette.yellow),
        DirectiveStatus::Applied => ("applied", palette.green),
        DirectiveStatus::Failed => ("failed", palette.error),
    };

    let mut content = vec![Line::from(vec![
        Span::styled(format!("+{}", metrics.added), Style::default().fg(palette.diff_added)),
        Span::raw(" "),
        Span::styled(format!("-{}", metrics.deleted), Style::default().fg(palette.diff_deleted)),
        Span::raw(" "),
        Span::styled(format!("~{}", metrics.changed), Style::default().fg(palette.diff_changed)),
        Span::raw("  "),
        Span::styled(format!("[{badge}]"), Style::default().fg(badge_color).add_modifier(Modifier::BOLD)),
    ])];
    content.push(Line::default());

    let diff = TextDiff::from_lines(&directive.before_text, &directive.after_text);
    for change in diff.iter_all_changes() {
        let (sign, style) = match change.tag() {
            ChangeTag::Delete => ("-", Style::default().fg(palette.diff_deleted)),
            ChangeTag::Insert => ("+", Style::default().fg(palette.diff_added)),
            ChangeTag::Equal => (" ", palette.muted()),
        };
        let value = change.value().trim_end_matches(['\n', '\r']);
        content.push(Line::from(Span::styled(format!("{sign} {value}"), style)));
    }

    let title = format!(" {} ", directive.filename);
    let lines = render_card(&title, palette.accent(kind), palette.panel_bg, content);
    let element_kind =
        ElementKind::Directive { filename: directive.filename.clone(), metrics, status: directive.status };
    DisplayElement::new(kind, element_kind, directive.source_text(), lines)
}

/// Raw text in the base text style only; no markdown or highlighting
fn literal_element(kind: MessageKind, text: &str, palette: &ThemePalette) -> DisplayElement {
    let style = palette.text();
    let lines = text.split('\n').map(|line| Line::from(Span::styled(line.to_string(), style))).collect();
    DisplayElement::new(kind, ElementKind::Literal, text, lines)
}

/// Elements shown when materialization of a new message fails
pub fn fallback_elements(kind: MessageKind, text: &str, palette: &ThemePalette) -> Vec<DisplayElement> {
    if text.is_empty() {
        return Vec::new();
    }
    vec![literal_element(kind, text, palette)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::ThemeController;

    fn snapshot() -> ThemeSnapshot {
        ThemeController::default().snapshot()
    }

    fn materialize(kind: MessageKind, text: &str) -> Vec<DisplayElement> {
        let mut message = Message::new(kind, text);
        RenderMaterializer.materialize(&mut message, &snapshot()).unwrap()
    }

    #[test]
    fn test_prose_only() {
        let elements = materialize(MessageKind::User, "Hello **there**");
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].kind, ElementKind::Prose);
        assert_eq!(elements[0].plain_text(), "Hello there");
        assert_eq!(elements[0].message_kind, Some(MessageKind::User));
    }

    #[test]
    fn test_prose_and_code() {
        let elements = materialize(MessageKind::Ai, "intro\n```python\nprint(1)\n```\n");
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].kind, ElementKind::Prose);
        assert_eq!(elements[1].kind, ElementKind::Code { language: Some("python".to_string()) });
        assert_eq!(elements[1].source, "print(1)");
        assert!(elements[1].plain_text().contains("PYTHON"));
        assert!(elements[1].plain_text().contains("print(1)"));
    }

    #[test]
    fn test_directive_card() {
        let text = "```\nsrc/lib.rs\n<<<<<<< SEARCH\na\nb\n=======\na\nc\nd\n>>>>>>> REPLACE\n```\n";
        let elements = materialize(MessageKind::Ai, text);
        assert_eq!(elements.len(), 1);
        match &elements[0].kind {
            ElementKind::Directive { filename, metrics, status } => {
                assert_eq!(filename, "src/lib.rs");
                assert_eq!((metrics.added, metrics.deleted, metrics.changed), (2, 1, 1));
                assert_eq!(*status, DirectiveStatus::Pending);
            }
            other => panic!("expected directive, got {other:?}"),
        }
        let rendered = elements[0].plain_text();
        assert!(rendered.contains("+2 -1 ~1"));
        assert!(rendered.contains("[pending]"));
        assert!(rendered.contains("- b"));
        assert!(rendered.contains("+ c"));
    }

    #[test]
    fn test_directive_interleaved_with_prose() {
        let text = "Change this:\n\na.rs\n<<<<<<< SEARCH\nx\n=======\ny\n>>>>>>> REPLACE\nThat is all.";
        let elements = materialize(MessageKind::Ai, text);
        let kinds: Vec<bool> = elements.iter().map(DisplayElement::is_directive).collect();
        assert_eq!(kinds, vec![false, true, false]);
    }

    #[test]
    fn test_user_directive_text_stays_prose() {
        let text = "a.rs\n<<<<<<< SEARCH\nx\n=======\ny\n>>>>>>> REPLACE";
        let elements = materialize(MessageKind::User, text);
        assert!(elements.iter().all(|e| e.kind == ElementKind::Prose));
    }

    #[test]
    fn test_malformed_directive_literal() {
        let text = "a.rs\n<<<<<<< SEARCH\nx\n>>>>>>> REPLACE";
        let elements = materialize(MessageKind::Ai, text);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].kind, ElementKind::Literal);
        assert_eq!(elements[0].plain_text(), text);
    }

    #[test]
    fn test_applied_status_badge() {
        let mut message = Message::new(MessageKind::Ai, "a.rs\n<<<<<<< SEARCH\nx\n=======\ny\n>>>>>>> REPLACE");
        message.set_directive_status(0, DirectiveStatus::Applied);
        let elements = RenderMaterializer.materialize(&mut message, &snapshot()).unwrap();
        assert!(elements[0].plain_text().contains("[applied]"));
    }

    #[test]
    fn test_fallback_elements() {
        let palette = snapshot().palette;
        assert!(fallback_elements(MessageKind::Ai, "", &palette).is_empty());
        let elements = fallback_elements(MessageKind::Ai, "raw", &palette);
        assert_eq!(elements[0].kind, ElementKind::Literal);
    }
}
