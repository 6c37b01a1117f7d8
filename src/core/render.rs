//! Seams between the stream interpreter and the components that turn text
//! into styled terminal lines.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use ratatui::text::Line;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderError {
    pub message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to render response: {}", self.message)
    }
}

impl StdError for RenderError {}

/// Converts accumulated prose into sanitized, styled lines.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, source: &str) -> Result<Vec<Line<'static>>, RenderError>;
}

/// Applies language-aware styling to a block of code. Returns `None` when
/// the language is unknown or highlighting failed; callers fall back to
/// plain text.
pub trait CodeHighlighter: Send + Sync {
    fn highlight(&self, language: &str, code: &str) -> Option<Vec<Line<'static>>>;
}

#[derive(Clone)]
pub struct Renderers {
    pub markdown: Arc<dyn MarkdownRenderer>,
    pub highlighter: Arc<dyn CodeHighlighter>,
}

impl Renderers {
    pub fn new(markdown: Arc<dyn MarkdownRenderer>, highlighter: Arc<dyn CodeHighlighter>) -> Self {
        Self {
            markdown,
            highlighter,
        }
    }
}

/// Flatten styled lines back to plain text, one line per `\n`.
pub fn lines_to_plain(lines: &[Line<'_>]) -> String {
    lines
        .iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|span| span.content.as_ref())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Renders each source line verbatim so tests can compare exact text.
    pub struct PlainMarkdown;

    impl MarkdownRenderer for PlainMarkdown {
        fn render(&self, source: &str) -> Result<Vec<Line<'static>>, RenderError> {
            Ok(source
                .trim_end()
                .lines()
                .map(|line| Line::from(line.to_string()))
                .collect())
        }
    }

    /// Fails on any source containing `!boom`.
    pub struct FailingMarkdown;

    impl MarkdownRenderer for FailingMarkdown {
        fn render(&self, source: &str) -> Result<Vec<Line<'static>>, RenderError> {
            if source.contains("!boom") {
                Err(RenderError::new("boom"))
            } else {
                PlainMarkdown.render(source)
            }
        }
    }

    /// Records every highlight request.
    #[derive(Default)]
    pub struct RecordingHighlighter {
        pub calls: Mutex<Vec<(String, String)>>,
    }

    impl RecordingHighlighter {
        pub fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    impl CodeHighlighter for RecordingHighlighter {
        fn highlight(&self, language: &str, code: &str) -> Option<Vec<Line<'static>>> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((language.to_string(), code.to_string()));
            }
            Some(
                code.lines()
                    .map(|line| Line::from(format!("hl:{line}")))
                    .collect(),
            )
        }
    }

    pub fn renderers() -> (Renderers, Arc<RecordingHighlighter>) {
        let highlighter = Arc::new(RecordingHighlighter::default());
        (
            Renderers::new(Arc::new(PlainMarkdown), highlighter.clone()),
            highlighter,
        )
    }
}
