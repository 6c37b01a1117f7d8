//! Camera and dictation capture through external commands.
//!
//! Both devices run a configured program and read its stdout. The child is
//! spawned with `kill_on_drop`, so abandoning a capture (user cancel,
//! timeout, error) always releases the device.

use std::error::Error as StdError;
use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::core::image::{ImageData, ImageError};

pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub enum CaptureError {
    /// The command could not be started (missing binary, permissions).
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// The command ran but reported failure, e.g. the device was busy or
    /// access was denied.
    Failed { program: String, detail: String },

    TimedOut { program: String },

    /// The command produced nothing usable.
    Image(ImageError),

    NoSpeech,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Spawn { program, source } => {
                write!(f, "Could not start `{program}`: {source}")
            }
            CaptureError::Failed { program, detail } => {
                if detail.is_empty() {
                    write!(f, "`{program}` failed")
                } else {
                    write!(f, "`{program}` failed: {detail}")
                }
            }
            CaptureError::TimedOut { program } => write!(f, "`{program}` timed out"),
            CaptureError::Image(err) => write!(f, "Captured image is unusable: {err}"),
            CaptureError::NoSpeech => write!(f, "No speech was recognized"),
        }
    }
}

impl StdError for CaptureError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            CaptureError::Spawn { source, .. } => Some(source),
            CaptureError::Image(err) => Some(err),
            _ => None,
        }
    }
}

#[async_trait]
pub trait CaptureDevice: Send + Sync {
    async fn capture_image(&self) -> Result<ImageData, CaptureError>;
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn listen(&self) -> Result<String, CaptureError>;
}

fn program_name(argv: &[String]) -> String {
    argv.first().cloned().unwrap_or_default()
}

async fn run_capture(argv: &[String], timeout: Duration) -> Result<Vec<u8>, CaptureError> {
    let program = program_name(argv);
    let mut command = Command::new(&program);
    command
        .args(argv.iter().skip(1))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(%program, "starting capture");
    let child = command.spawn().map_err(|source| CaptureError::Spawn {
        program: program.clone(),
        source,
    })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| CaptureError::Spawn {
            program: program.clone(),
            source,
        })?,
        Err(_) => return Err(CaptureError::TimedOut { program }),
    };

    if !output.status.success() {
        let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(CaptureError::Failed { program, detail });
    }
    Ok(output.stdout)
}

/// Identify common image formats by their leading bytes.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// Camera backed by a program that writes one still image to stdout.
pub struct CommandCamera {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandCamera {
    pub fn new(argv: Vec<String>) -> Option<Self> {
        (!argv.is_empty()).then_some(Self {
            argv,
            timeout: CAPTURE_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl CaptureDevice for CommandCamera {
    async fn capture_image(&self) -> Result<ImageData, CaptureError> {
        let bytes = run_capture(&self.argv, self.timeout).await?;
        if bytes.is_empty() {
            return Err(CaptureError::Image(ImageError::Empty));
        }
        let mime = sniff_image_mime(&bytes).ok_or_else(|| CaptureError::Failed {
            program: program_name(&self.argv),
            detail: "output is not a PNG, JPEG, GIF or WebP image".to_string(),
        })?;
        ImageData::from_bytes(mime, &bytes).map_err(CaptureError::Image)
    }
}

/// Speech-to-text backed by a program that prints the recognized text.
pub struct CommandDictation {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandDictation {
    pub fn new(argv: Vec<String>) -> Option<Self> {
        (!argv.is_empty()).then_some(Self {
            argv,
            timeout: CAPTURE_TIMEOUT,
        })
    }
}

#[async_trait]
impl SpeechRecognizer for CommandDictation {
    async fn listen(&self) -> Result<String, CaptureError> {
        let bytes = run_capture(&self.argv, self.timeout).await?;
        let text = String::from_utf8_lossy(&bytes).trim().to_string();
        if text.is_empty() {
            Err(CaptureError::NoSpeech)
        } else {
            Ok(text)
        }
    }
}
