use crate::syntax::SyntaxHighlighter;

use quill_core::{MessageKind, RenderConfig};
use ratatui::style::{Color, Style};
use std::sync::Arc;
use syntect::highlighting::{Theme as CodeTheme, ThemeSet};
use syntect::parsing::SyntaxSet;

/// Built-in code themes used when a configured one is unavailable
const BASELINE_DARK_CODE_THEME: &str = "base16-ocean.dark";
const BASELINE_LIGHT_CODE_THEME: &str = "InspiredGitHub";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThemeVariant {
    /// Iceberg dark
    #[default]
    Dark,
    /// Iceberg light
    Light,
}

impl ThemeVariant {
    pub fn from_is_dark(is_dark: bool) -> Self {
        if is_dark { ThemeVariant::Dark } else { ThemeVariant::Light }
    }

    pub fn is_dark(&self) -> bool {
        matches!(self, ThemeVariant::Dark)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeVariant::Dark => "dark",
            ThemeVariant::Light => "light",
        }
    }
}

/// Resolved colors for one variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePalette {
    pub bg: Color,
    pub fg: Color,
    pub panel_bg: Color,
    pub code_bg: Color,
    pub code_border: Color,
    pub border: Color,
    pub muted: Color,
    pub link: Color,
    pub blue: Color,
    pub cyan: Color,
    pub purple: Color,
    pub green: Color,
    pub yellow: Color,
    pub red: Color,
    pub user_accent: Color,
    pub ai_accent: Color,
    pub custom_accent: Color,
    pub diff_added: Color,
    pub diff_changed: Color,
    pub diff_deleted: Color,
    pub error: Color,
}

impl ThemePalette {
    /// Accent used for a message's header and borders
    pub fn accent(&self, kind: MessageKind) -> Color {
        match kind {
            MessageKind::User => self.user_accent,
            MessageKind::Ai => self.ai_accent,
            MessageKind::System => self.muted,
            MessageKind::Custom => self.custom_accent,
        }
    }

    pub fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn text(&self) -> Style {
        Style::default().fg(self.fg)
    }

    pub fn muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn panel(&self) -> Style {
        Style::default().fg(self.fg).bg(self.panel_bg)
    }
}

/// Iceberg color theme
///
/// Based on iceberg.vim (https://github.com/cocopon/iceberg.vim), dark and
/// light variants.
#[derive(Debug, Clone, Copy)]
pub struct Theme;

impl Theme {
    pub const BG: Color = Color::Rgb(22, 24, 33);
    pub const FG: Color = Color::Rgb(198, 200, 209);
    pub const PANEL_BG: Color = Color::Rgb(30, 33, 50);
    pub const COMMENT: Color = Color::Rgb(107, 112, 137);
    pub const BLUE: Color = Color::Rgb(132, 160, 198);
    pub const CYAN: Color = Color::Rgb(137, 184, 194);
    pub const PURPLE: Color = Color::Rgb(160, 147, 199);
    pub const GREEN: Color = Color::Rgb(180, 190, 130);
    pub const YELLOW: Color = Color::Rgb(226, 164, 120);
    pub const RED: Color = Color::Rgb(226, 120, 120);
    pub const BORDER: Color = Color::Rgb(60, 65, 90);

    pub const LIGHT_BG: Color = Color::Rgb(232, 233, 236);
    pub const LIGHT_FG: Color = Color::Rgb(51, 55, 76);
    pub const LIGHT_PANEL_BG: Color = Color::Rgb(220, 223, 231);
    pub const LIGHT_COMMENT: Color = Color::Rgb(133, 137, 161);
    pub const LIGHT_BLUE: Color = Color::Rgb(45, 83, 158);
    pub const LIGHT_CYAN: Color = Color::Rgb(63, 131, 166);
    pub const LIGHT_PURPLE: Color = Color::Rgb(119, 89, 180);
    pub const LIGHT_GREEN: Color = Color::Rgb(102, 130, 32);
    pub const LIGHT_YELLOW: Color = Color::Rgb(197, 115, 57);
    pub const LIGHT_RED: Color = Color::Rgb(204, 81, 122);
    pub const LIGHT_BORDER: Color = Color::Rgb(182, 187, 205);

    pub fn palette(variant: ThemeVariant) -> ThemePalette {
        match variant {
            ThemeVariant::Dark => ThemePalette {
                bg: Self::BG,
                fg: Self::FG,
                panel_bg: Self::PANEL_BG,
                code_bg: Color::Rgb(26, 29, 42),
                code_border: Self::BORDER,
                border: Self::BORDER,
                muted: Self::COMMENT,
                link: Self::CYAN,
                blue: Self::BLUE,
                cyan: Self::CYAN,
                purple: Self::PURPLE,
                green: Self::GREEN,
                yellow: Self::YELLOW,
                red: Self::RED,
                user_accent: Self::BLUE,
                ai_accent: Self::PURPLE,
                custom_accent: Self::CYAN,
                diff_added: Self::GREEN,
                diff_changed: Self::YELLOW,
                diff_deleted: Self::RED,
                error: Self::RED,
            },
            ThemeVariant::Light => ThemePalette {
                bg: Self::LIGHT_BG,
                fg: Self::LIGHT_FG,
                panel_bg: Self::LIGHT_PANEL_BG,
                code_bg: Color::Rgb(241, 242, 245),
                code_border: Self::LIGHT_BORDER,
                border: Self::LIGHT_BORDER,
                muted: Self::LIGHT_COMMENT,
                link: Self::LIGHT_BLUE,
                blue: Self::LIGHT_BLUE,
                cyan: Self::LIGHT_CYAN,
                purple: Self::LIGHT_PURPLE,
                green: Self::LIGHT_GREEN,
                yellow: Self::LIGHT_YELLOW,
                red: Self::LIGHT_RED,
                user_accent: Self::LIGHT_BLUE,
                ai_accent: Self::LIGHT_PURPLE,
                custom_accent: Self::LIGHT_CYAN,
                diff_added: Self::LIGHT_GREEN,
                diff_changed: Self::LIGHT_YELLOW,
                diff_deleted: Self::LIGHT_RED,
                error: Self::LIGHT_RED,
            },
        }
    }
}

/// Immutable theme state handed to the materializer for one render pass
#[derive(Clone)]
pub struct ThemeSnapshot {
    pub variant: ThemeVariant,
    pub palette: ThemePalette,
    pub highlighter: Arc<SyntaxHighlighter>,
}

impl std::fmt::Debug for ThemeSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeSnapshot").field("variant", &self.variant).field("palette", &self.palette).finish()
    }
}

/// Owns the active variant and one highlighter per variant
pub struct ThemeController {
    variant: ThemeVariant,
    dark: Arc<SyntaxHighlighter>,
    light: Arc<SyntaxHighlighter>,
}

impl ThemeController {
    pub fn new(config: &RenderConfig) -> Self {
        let syntax_set = Arc::new(SyntaxSet::load_defaults_newlines());
        let themes = ThemeSet::load_defaults();

        let override_theme = config.code_theme_file.as_ref().and_then(|path| match ThemeSet::get_theme(path) {
            Ok(theme) => Some(theme),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "code theme file unavailable, using built-in themes");
                None
            }
        });

        let dark_theme = override_theme
            .clone()
            .unwrap_or_else(|| named_theme(&themes, &config.dark_code_theme, BASELINE_DARK_CODE_THEME));
        let light_theme =
            override_theme.unwrap_or_else(|| named_theme(&themes, &config.light_code_theme, BASELINE_LIGHT_CODE_THEME));

        Self {
            variant: ThemeVariant::from_is_dark(config.theme.is_dark()),
            dark: Arc::new(SyntaxHighlighter::new(Arc::clone(&syntax_set), dark_theme)),
            light: Arc::new(SyntaxHighlighter::new(syntax_set, light_theme)),
        }
    }

    pub fn variant(&self) -> ThemeVariant {
        self.variant
    }

    pub fn palette(&self) -> ThemePalette {
        Theme::palette(self.variant)
    }

    /// Switch variant; false when already active
    pub fn set_theme(&mut self, is_dark: bool) -> bool {
        let variant = ThemeVariant::from_is_dark(is_dark);
        if variant == self.variant {
            return false;
        }
        self.variant = variant;
        true
    }

    pub fn snapshot(&self) -> ThemeSnapshot {
        let highlighter = match self.variant {
            ThemeVariant::Dark => Arc::clone(&self.dark),
            ThemeVariant::Light => Arc::clone(&self.light),
        };
        ThemeSnapshot { variant: self.variant, palette: self.palette(), highlighter }
    }
}

impl Default for ThemeController {
    fn default() -> Self {
        Self::new(&RenderConfig::default())
    }
}

fn named_theme(themes: &ThemeSet, name: &str, baseline: &str) -> CodeTheme {
    if let Some(theme) = themes.themes.get(name) {
        return theme.clone();
    }
    tracing::warn!(theme = name, fallback = baseline, "code theme not found, using baseline");
    themes.themes.get(baseline).cloned().unwrap_or_default()
}
