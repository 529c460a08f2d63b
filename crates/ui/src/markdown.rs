//! Markdown prose to styled ratatui lines.
//!
//! Fenced code that reaches this renderer was not closed when the message
//! was segmented, so it is shown as the literal source text, fences
//! included, rather than as a code block running to the end of the message.

use crate::theme::ThemePalette;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

const RULE: &str = "────────────────────────";

/// Render markdown prose into width-independent lines
pub fn render_markdown(markdown: &str, palette: &ThemePalette) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(markdown, options);

    let mut writer = Writer::new(palette);
    for (event, range) in parser.into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(_))) => writer.literal_fence(&markdown[range]),
            event => writer.handle_event(event),
        }
    }
    writer.finish()
}

struct Writer<'p> {
    palette: &'p ThemePalette,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    inline_styles: Vec<Style>,
    list_indices: Vec<Option<u64>>,
    quote_depth: usize,
    link: Option<String>,
    link_text: String,
    needs_blank: bool,
    pending_marker: bool,
    line_has_marker: bool,
    in_code_block: bool,
    in_literal_fence: bool,
}

impl<'p> Writer<'p> {
    fn new(palette: &'p ThemePalette) -> Self {
        Self {
            palette,
            lines: Vec::new(),
            current: Vec::new(),
            inline_styles: vec![palette.text()],
            list_indices: Vec::new(),
            quote_depth: 0,
            link: None,
            link_text: String::new(),
            needs_blank: false,
            pending_marker: false,
            line_has_marker: false,
            in_code_block: false,
            in_literal_fence: false,
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush_line(false);
        self.lines
    }

    fn handle_event(&mut self, event: Event<'_>) {
        if self.in_literal_fence {
            if matches!(event, Event::End(TagEnd::CodeBlock)) {
                self.in_literal_fence = false;
                self.end_block();
            }
            return;
        }
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(text),
            Event::Code(code) => self.inline_code(code),
            Event::SoftBreak | Event::HardBreak => self.flush_line(true),
            Event::Rule => {
                self.start_block();
                self.current.push(Span::styled(RULE, self.palette.muted()));
                self.end_block();
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                let style = self.palette.muted();
                for (i, line) in html.lines().enumerate() {
                    if i > 0 {
                        self.flush_line(true);
                    }
                    self.current.push(Span::styled(line.to_string(), style));
                }
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.current.push(Span::styled(marker, self.palette.muted()));
            }
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.start_block(),
            Tag::Heading { level, .. } => {
                self.start_block();
                let style = self.heading_style(level);
                self.current.push(Span::styled(format!("{} ", "#".repeat(level as usize)), style));
                self.push_inline_style(style);
            }
            Tag::BlockQuote => {
                self.start_block();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(_) => {
                self.start_block();
                self.in_code_block = true;
            }
            Tag::List(start) => {
                if self.list_indices.is_empty() {
                    self.start_block();
                } else {
                    self.flush_line(false);
                }
                self.list_indices.push(start);
            }
            Tag::Item => self.start_item(),
            Tag::Emphasis => self.push_inline_style(Style::new().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_inline_style(Style::new().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => self.push_inline_style(Style::new().add_modifier(Modifier::CROSSED_OUT)),
            Tag::Link { dest_url, .. } => {
                self.push_inline_style(Style::new().fg(self.palette.link).add_modifier(Modifier::UNDERLINED));
                self.link = Some(dest_url.to_string());
                self.link_text.clear();
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.end_block(),
            TagEnd::Heading(_) => {
                self.pop_inline_style();
                self.end_block();
            }
            TagEnd::BlockQuote => {
                self.flush_line(false);
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.needs_blank = true;
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.end_block();
            }
            TagEnd::List(_) => {
                self.flush_line(false);
                self.list_indices.pop();
                if self.list_indices.is_empty() {
                    self.needs_blank = true;
                }
            }
            TagEnd::Item => {
                self.flush_line(false);
                self.pending_marker = false;
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_inline_style(),
            TagEnd::Link => {
                self.pop_inline_style();
                if let Some(dest) = self.link.take()
                    && dest != self.link_text
                {
                    self.current.push(Span::styled(format!(" ({dest})"), self.palette.muted()));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: CowStr<'_>) {
        self.pending_marker = false;

        if self.in_code_block {
            let style = Style::default().fg(self.palette.cyan);
            for line in text.split_inclusive('\n') {
                let content = line.trim_end_matches('\n');
                if !content.is_empty() {
                    self.current.push(Span::styled(format!("    {content}"), style));
                }
                if line.ends_with('\n') {
                    self.flush_line(true);
                }
            }
            return;
        }

        if self.link.is_some() {
            self.link_text.push_str(&text);
        }
        let style = self.current_style();
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.flush_line(true);
            }
            if !line.is_empty() {
                self.current.push(Span::styled(line.to_string(), style));
            }
        }
    }

    /// Emit a fenced block verbatim from its source and skip its events
    fn literal_fence(&mut self, source: &str) {
        self.start_block();
        self.pending_marker = false;
        let style = self.current_style();
        for (i, line) in source.trim_end_matches(['\n', '\r']).split('\n').enumerate() {
            if i > 0 {
                self.flush_line(true);
            }
            let line = line.trim_end_matches('\r');
            if !line.is_empty() {
                self.current.push(Span::styled(line.to_string(), style));
            }
        }
        self.in_literal_fence = true;
    }

    fn inline_code(&mut self, code: CowStr<'_>) {
        self.pending_marker = false;
        if self.link.is_some() {
            self.link_text.push_str(&code);
        }
        let style = Style::default().fg(self.palette.cyan).bg(self.palette.code_bg);
        self.current.push(Span::styled(code.into_string(), style));
    }

    fn start_item(&mut self) {
        self.flush_line(false);
        let depth = self.list_indices.len();
        let indent = "  ".repeat(depth.saturating_sub(1));
        let marker = match self.list_indices.last_mut() {
            Some(Some(index)) => {
                let marker = format!("{indent}{index}. ");
                *index += 1;
                Span::styled(marker, Style::default().fg(self.palette.blue))
            }
            _ => Span::styled(format!("{indent}• "), self.palette.muted()),
        };
        self.current.push(marker);
        self.pending_marker = true;
        self.line_has_marker = true;
    }

    /// Begin a block-level element, separating it from the previous one
    fn start_block(&mut self) {
        if self.pending_marker {
            return;
        }
        self.flush_line(false);
        if self.needs_blank && !self.lines.is_empty() {
            let prefix = self.quote_prefix();
            self.lines.push(Line::from(prefix));
        }
        self.needs_blank = false;
    }

    fn end_block(&mut self) {
        self.flush_line(false);
        self.needs_blank = true;
    }

    /// Emit the current line; `force` emits it even when empty
    fn flush_line(&mut self, force: bool) {
        if self.current.is_empty() && !force {
            return;
        }
        let mut spans = self.quote_prefix();
        if !self.list_indices.is_empty() && !self.line_has_marker {
            spans.push(Span::raw("  ".repeat(self.list_indices.len())));
        }
        spans.append(&mut self.current);
        self.lines.push(Line::from(spans));
        self.line_has_marker = false;
    }

    fn quote_prefix(&self) -> Vec<Span<'static>> {
        if self.quote_depth == 0 {
            return Vec::new();
        }
        vec![Span::styled("│ ".repeat(self.quote_depth), self.palette.muted())]
    }

    fn heading_style(&self, level: HeadingLevel) -> Style {
        let base = Style::default().fg(self.palette.blue).add_modifier(Modifier::BOLD);
        match level {
            HeadingLevel::H1 => base.add_modifier(Modifier::UNDERLINED),
            HeadingLevel::H2 => base,
            _ => base.add_modifier(Modifier::ITALIC),
        }
    }

    fn current_style(&self) -> Style {
        let style = self.inline_styles.last().copied().unwrap_or_default();
        if self.quote_depth > 0 { style.add_modifier(Modifier::ITALIC) } else { style }
    }

    fn push_inline_style(&mut self, style: Style) {
        let merged = self.current_style().patch(style);
        self.inline_styles.push(merged);
    }

    fn pop_inline_style(&mut self) {
        if self.inline_styles.len() > 1 {
            self.inline_styles.pop();
        }
    }
}
