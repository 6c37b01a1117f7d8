//! Command-line interface parsing and handling
//!
//! This module parses arguments, loads configuration, and hands off to the
//! interactive chat loop or the headless `say` command.

pub mod say;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::core::config::{path_display, Config};
use crate::core::media::{CaptureDevice, CommandCamera, CommandDictation, SpeechRecognizer};
use crate::core::render::Renderers;
use crate::core::session::{ConversationSession, SessionParams};
use crate::logging;
use crate::ui::chat_loop::{run_chat, CaptureDevices, ChatApp};
use crate::ui::markdown::TerminalMarkdown;
use crate::ui::theme::Theme;
use crate::utils::syntax::SyntectHighlighter;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const BASE_URL_ENV: &str = "GEMINI_BASE_URL";

#[derive(Parser, Debug)]
#[command(name = "cardchat", version)]
#[command(about = "A terminal chat client that renders model output as live cards")]
#[command(
    long_about = "cardchat streams a conversation with a Gemini model and shows each part of \
the reply as its own card: prose, running tool calls, code, execution results and errors.\n\n\
Environment Variables:\n\
  GEMINI_API_KEY    Your API key (required)\n\
  GEMINI_BASE_URL   Custom API root (optional)\n\n\
Controls:\n\
  Enter             Send the message\n\
  Alt+Enter         Insert a new line\n\
  Esc               Stop generation, cancel a capture, or dismiss an alert\n\
  Ctrl+Y            Copy the latest code card\n\
  Ctrl+O            Capture an image from the camera\n\
  Ctrl+L            Dictate (when dictation_command is configured)\n\
  Ctrl+X            Remove the attached image\n\
  PgUp/PgDn         Scroll the transcript\n\
  Ctrl+C            Quit\n\n\
Commands:\n\
  /image <path>     Attach an image file or data: URI (pasting one works too)\n\
  /new              Start a new chat\n\
  /help             Show a short command reminder"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use instead of the configured one
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Write debug-level diagnostics to the log file
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Send one prompt without the TUI and print the resulting cards
    Say {
        /// Prompt text (multiple words are joined with spaces)
        prompt: Vec<String>,
        /// Attach an image file to the prompt
        #[arg(short = 'i', long, value_name = "PATH")]
        image: Option<PathBuf>,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = Config::load()?;

    if let Some(log_dir) = Config::data_dir() {
        match logging::init(&log_dir, args.debug) {
            Ok(path) => info!(log = %path_display(&path), "logging started"),
            Err(err) => eprintln!("⚠️  Logging disabled: {err}"),
        }
    }

    let api_key = match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            eprintln!("❌ Error: {API_KEY_ENV} environment variable not set");
            eprintln!();
            eprintln!("Set your API key:");
            eprintln!("  export {API_KEY_ENV}=\"your-api-key-here\"");
            std::process::exit(1);
        }
    };

    let params = session_params(&config, args.model.as_deref(), api_key)?;
    let theme = Theme::from_name(config.theme.as_deref().unwrap_or("dark"));
    let renderers = build_renderers(&theme, config.syntax_theme.as_deref());
    let session = ConversationSession::new(params);

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let devices = capture_devices(&config);
            let model = session.model().to_string();
            let app = ChatApp::new(
                Box::new(session),
                renderers,
                theme,
                model,
                devices.dictation.is_some(),
            );
            run_chat(app, devices).await
        }
        Commands::Say { prompt, image } => {
            say::run_say(Box::new(session), renderers, &theme, prompt, image).await
        }
    }
}

fn session_params(
    config: &Config,
    cli_model: Option<&str>,
    api_key: String,
) -> Result<SessionParams, reqwest::Error> {
    let env_base_url = std::env::var(BASE_URL_ENV).ok();
    Ok(SessionParams {
        client: reqwest::Client::builder().build()?,
        base_url: config.resolve_base_url(env_base_url.as_deref()),
        api_key,
        model: config.resolve_model(cli_model),
    })
}

pub fn build_renderers(theme: &Theme, syntax_theme: Option<&str>) -> Renderers {
    let highlighter = Arc::new(SyntectHighlighter::new(theme, syntax_theme));
    let markdown = TerminalMarkdown::new(theme.clone()).with_highlighter(highlighter.clone());
    Renderers::new(Arc::new(markdown), highlighter)
}

fn capture_devices(config: &Config) -> CaptureDevices {
    CaptureDevices {
        camera: CommandCamera::new(config.camera_command.clone())
            .map(|camera| Arc::new(camera) as Arc<dyn CaptureDevice>),
        dictation: CommandDictation::new(config.dictation_command.clone())
            .map(|dictation| Arc::new(dictation) as Arc<dyn SpeechRecognizer>),
    }
}
