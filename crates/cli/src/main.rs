use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use quill_core::logging::sanitize_path;
use quill_core::{ChatMessage, Config, LoggingConfig, init_logging};
use quill_ui::{Dispatcher, OutputPanel, TranscriptView, UpdatePolicy};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const DEFAULT_CONFIG: &str = "quill.toml";
const FALLBACK_WIDTH: u16 = 100;
const SPINNER_TICK_MS: u64 = 80;

/// Quill - render streamed chat transcripts in the terminal
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(about = "Incremental markdown, code and edit-directive renderer for chat transcripts", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to quill.toml (default: ./quill.toml when present)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a saved transcript
    Render {
        /// JSON array of {"kind", "text"} messages
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Stream a saved transcript through the panel chunk by chunk
    Replay {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Characters per streamed chunk
        #[arg(long, default_value_t = 16)]
        chunk: usize,

        /// Pause between chunks in milliseconds
        #[arg(long, default_value_t = 5)]
        delay_ms: u64,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print an example quill.toml
    ExampleConfig,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct OutputArgs {
    /// Use the light theme regardless of configuration
    #[arg(long)]
    light: bool,

    /// Wrap width (default: terminal width)
    #[arg(short, long, value_name = "COLS")]
    width: Option<u16>,

    /// Print without colors
    #[arg(long)]
    plain: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::ExampleConfig = cli.command {
        print!("{}", Config::example());
        return Ok(());
    }

    let (config, config_path) = load_config(cli.config.as_deref())?;
    let mut logging = LoggingConfig::from(config.logging.clone());
    if cli.verbose {
        logging = logging.with_level("debug");
    }
    let _guard = init_logging(Some(logging)).context("Failed to initialize logging")?;

    if let Some(path) = &config_path {
        tracing::debug!(path = %sanitize_path(path), "loaded configuration");
    }
    if cli.verbose {
        let source = config_path.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| "defaults".into());
        eprintln!("{} Using config: {}", "Info:".blue().bold(), source);
    }

    match cli.command {
        Commands::Render { file, output } => cmd_render(&config, &file, output),
        Commands::Replay { file, chunk, delay_ms, output } => {
            cmd_replay(&config, &file, chunk, Duration::from_millis(delay_ms), output, cli.verbose)
        }
        Commands::ExampleConfig => Ok(()),
    }
}

/// Load the explicit config, else ./quill.toml when present, else defaults
fn load_config(path: Option<&Path>) -> Result<(Config, Option<PathBuf>)> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            if !default.exists() {
                return Ok((Config::default(), None));
            }
            default
        }
    };

    let config = Config::from_file(&path).with_context(|| format!("Failed to load config from {}", path.display()))?;
    Ok((config, Some(path)))
}

fn load_transcript(path: &Path) -> Result<Vec<ChatMessage>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read transcript {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid transcript {}", path.display()))
}

fn build_panel(config: &Config, output: OutputArgs) -> OutputPanel {
    let mut panel = OutputPanel::new(&config.render);
    if output.light {
        panel.set_theme(false);
    }
    panel
}

fn output_width(output: OutputArgs) -> usize {
    let width = output
        .width
        .unwrap_or_else(|| crossterm::terminal::size().map(|(cols, _)| cols).unwrap_or(FALLBACK_WIDTH));
    width.max(1) as usize
}

/// Render a saved transcript in one pass
fn cmd_render(config: &Config, file: &Path, output: OutputArgs) -> Result<()> {
    let messages = load_transcript(file)?;
    tracing::info!(path = %sanitize_path(file), messages = messages.len(), "rendering transcript");

    let mut panel = build_panel(config, output);
    panel.set_conversation(messages);
    print_panel(&panel, output);
    Ok(())
}

/// Stream a transcript from a producer thread and render it as it arrives
fn cmd_replay(config: &Config, file: &Path, chunk: usize, delay: Duration, output: OutputArgs, verbose: bool) -> Result<()> {
    let messages = load_transcript(file)?;
    let chunks = split_chunks(&messages, chunk);
    tracing::info!(path = %sanitize_path(file), chunks = chunks.len(), "replaying transcript");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start runtime")?;

    let panel = build_panel(config, output);
    let chunk_count = chunks.len();
    let (panel, passes) = runtime.block_on(replay(panel, chunks, delay));

    if verbose {
        eprintln!(
            "{} Replayed {} chunks in {} render passes",
            "Info:".blue().bold(),
            chunk_count.cyan(),
            passes.cyan()
        );
    }
    print_panel(&panel, output);
    Ok(())
}

/// Drive the panel from a dispatcher until the producer finishes.
///
/// Returns the panel and how many render passes observers saw.
async fn replay(mut panel: OutputPanel, chunks: Vec<ChatMessage>, delay: Duration) -> (OutputPanel, u64) {
    let (dispatcher, mut rx) = Dispatcher::channel();
    let mut generations = panel.subscribe();
    let mut passes = 0u64;

    let producer = std::thread::spawn(move || produce(dispatcher, chunks, delay));

    let mut spinner = tokio::time::interval(Duration::from_millis(SPINNER_TICK_MS));
    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(command) => {
                    panel.apply(command);
                    panel.drain(&mut rx);
                }
                None => break,
            },
            _ = spinner.tick() => {
                panel.advance_spinner();
                panel.tick(Instant::now());
            }
        }

        if generations.has_changed().unwrap_or(false) {
            generations.borrow_and_update();
            passes += 1;
        }
    }

    if producer.join().is_err() {
        tracing::error!("transcript producer panicked");
    }

    if let UpdatePolicy::Coalesce(window) = panel.policy() {
        panel.tick(Instant::now() + window);
    }
    if generations.has_changed().unwrap_or(false) {
        passes += 1;
    }

    (panel, passes)
}

fn produce(dispatcher: Dispatcher, chunks: Vec<ChatMessage>, delay: Duration) {
    dispatcher.show_spinner("Streaming...");
    for chunk in chunks {
        if !dispatcher.append(chunk.text, chunk.kind) {
            tracing::warn!("panel closed during replay");
            return;
        }
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
    dispatcher.hide_spinner();
}

/// Split each message into chunks of at most `size` characters
fn split_chunks(messages: &[ChatMessage], size: usize) -> Vec<ChatMessage> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    for message in messages {
        let chars: Vec<char> = message.text.chars().collect();
        for piece in chars.chunks(size) {
            chunks.push(ChatMessage::new(message.kind, piece.iter().collect::<String>()));
        }
    }
    chunks
}

fn print_panel(panel: &OutputPanel, output: OutputArgs) {
    let width = output_width(output);
    for line in TranscriptView::new(panel).wrapped_lines(width) {
        println!("{}", ansi_line(&line, output.plain));
    }
}

/// Convert a styled line to terminal escape sequences
fn ansi_line(line: &Line<'_>, plain: bool) -> String {
    let mut out = String::new();
    for span in &line.spans {
        if plain {
            out.push_str(&span.content);
        } else {
            let style = owo_style(line.style.patch(span.style));
            out.push_str(&span.content.as_ref().style(style).to_string());
        }
    }
    out
}

fn owo_style(style: Style) -> owo_colors::Style {
    let mut out = owo_colors::Style::new();
    if let Some(Color::Rgb(r, g, b)) = style.fg {
        out = out.truecolor(r, g, b);
    }
    if let Some(Color::Rgb(r, g, b)) = style.bg {
        out = out.on_truecolor(r, g, b);
    }

    let modifiers = style.add_modifier;
    if modifiers.contains(Modifier::BOLD) {
        out = out.bold();
    }
    if modifiers.contains(Modifier::DIM) {
        out = out.dimmed();
    }
    if modifiers.contains(Modifier::ITALIC) {
        out = out.italic();
    }
    if modifiers.contains(Modifier::UNDERLINED) {
        out = out.underline();
    }
    if modifiers.contains(Modifier::CROSSED_OUT) {
        out = out.strikethrough();
    }
    out
}
