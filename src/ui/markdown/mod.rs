//! Markdown rendering for text cards.

mod code;
mod render;
mod table;

#[cfg(test)]
mod tests;

use std::sync::{Arc, LazyLock};

use ratatui::text::Line;
use regex_lite::Regex;

use crate::core::render::{CodeHighlighter, MarkdownRenderer, RenderError};
use crate::ui::theme::Theme;

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b(?:\[[0-9;?]*[ -/]*[@-~]|\][^\x07\x1b]*(?:\x07|\x1b\\)?|[@-_])")
        .expect("valid escape pattern")
});

/// Make model text safe to draw: terminal escape sequences and other control
/// characters are removed, tabs become four spaces.
pub fn sanitize(text: &str) -> String {
    let stripped = ANSI_ESCAPE.replace_all(text, "");
    let mut out = String::with_capacity(stripped.len());
    for ch in stripped.chars() {
        match ch {
            '\n' => out.push('\n'),
            '\t' => out.push_str("    "),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Renders markdown into styled terminal lines.
pub struct TerminalMarkdown {
    theme: Theme,
    highlighter: Option<Arc<dyn CodeHighlighter>>,
}

impl TerminalMarkdown {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            highlighter: None,
        }
    }

    /// Highlight fenced code blocks inside text with `highlighter`.
    pub fn with_highlighter(mut self, highlighter: Arc<dyn CodeHighlighter>) -> Self {
        self.highlighter = Some(highlighter);
        self
    }
}

impl MarkdownRenderer for TerminalMarkdown {
    fn render(&self, source: &str) -> Result<Vec<Line<'static>>, RenderError> {
        let clean = sanitize(source);
        Ok(render::MarkdownWriter::new(&self.theme, self.highlighter.as_deref()).render(&clean))
    }
}
