use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use std::sync::Arc;
use syntect::easy::HighlightLines;
use syntect::highlighting::Theme;
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

/// Syntax highlighter for code segments
pub struct SyntaxHighlighter {
    syntax_set: Arc<SyntaxSet>,
    theme: Theme,
}

impl SyntaxHighlighter {
    pub fn new(syntax_set: Arc<SyntaxSet>, theme: Theme) -> Self {
        Self { syntax_set, theme }
    }

    /// Whether `lang` maps to a known syntax
    pub fn supports(&self, lang: &str) -> bool {
        self.find_syntax(lang).is_some()
    }

    fn find_syntax(&self, lang: &str) -> Option<&SyntaxReference> {
        self.syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_name(lang))
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
    }

    /// Highlight `code` into one line per source line.
    ///
    /// Unknown or missing languages use the plain-text syntax.
    pub fn highlight_code(&self, code: &str, lang: Option<&str>) -> Vec<Line<'static>> {
        let syntax = match lang {
            Some(lang) => self.find_syntax(lang).unwrap_or_else(|| {
                tracing::debug!(language = lang, "unsupported code language, highlighting as plain text");
                self.syntax_set.find_syntax_plain_text()
            }),
            None => self.syntax_set.find_syntax_plain_text(),
        };

        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        let fallback = Style::default().fg(self.text_color());
        let mut lines = Vec::new();

        for line in LinesWithEndings::from(code) {
            let content = line.trim_end_matches(['\n', '\r']);
            let spans = match highlighter.highlight_line(line, &self.syntax_set) {
                Ok(ranges) => ranges
                    .into_iter()
                    .filter_map(|(style, text)| {
                        let text = text.trim_end_matches(['\n', '\r']);
                        if text.is_empty() {
                            return None;
                        }
                        Some(Span::styled(text.to_string(), Style::default().fg(to_ratatui_color(&style.foreground))))
                    })
                    .collect(),
                Err(e) => {
                    tracing::debug!(error = %e, "highlighting failed for line, using plain text");
                    vec![Span::styled(content.to_string(), fallback)]
                }
            };
            lines.push(Line::from(spans));
        }

        if lines.is_empty() {
            lines.push(Line::default());
        }
        lines
    }

    /// Default text color from theme
    fn text_color(&self) -> Color {
        let fg = self.theme.settings.foreground.unwrap_or(syntect::highlighting::Color { r: 198, g: 200, b: 209, a: 255 });
        to_ratatui_color(&fg)
    }

    /// Background declared by the code theme, if any
    pub fn background(&self) -> Option<Color> {
        self.theme.settings.background.as_ref().map(to_ratatui_color)
    }
}

fn to_ratatui_color(color: &syntect::highlighting::Color) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}
