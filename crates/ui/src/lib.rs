pub mod card;
pub mod dispatch;
pub mod element;
pub mod markdown;
pub mod materializer;
pub mod panel;
pub mod scheduler;
pub mod spinner;
pub mod syntax;
pub mod theme;
pub mod view;

pub use dispatch::{Dispatcher, PanelCommand};
pub use element::{DisplayElement, ElementKind};
pub use materializer::{Materialize, RenderMaterializer};
pub use panel::OutputPanel;
pub use scheduler::{UpdatePolicy, UpdateScheduler};
pub use spinner::BusyIndicator;
pub use syntax::SyntaxHighlighter;
pub use theme::{Theme, ThemeController, ThemePalette, ThemeSnapshot, ThemeVariant};
pub use view::TranscriptView;
