pub mod config;
pub mod directive;
pub mod error;
pub mod logging;
pub mod message;
pub mod metrics;
pub mod segment;
pub mod store;

pub use config::{Config, LoggingSection, RenderConfig, ThemeChoice, UpdateMode};
pub use directive::{DirectiveBlock, DirectiveParse, DirectiveStatus, EditDirective, EditDirectiveParser};
pub use error::{ConfigError, DirectiveError, Error, Result};
pub use logging::{LogFormat, LoggingConfig, init_logging, preview_for_log};
pub use message::{ChatMessage, Message, MessageKind};
pub use metrics::LineMetrics;
pub use segment::{ParseResult, Segment, SegmentCheckpoint, SegmentParser};
pub use store::{AppendOutcome, ConversationStore};
