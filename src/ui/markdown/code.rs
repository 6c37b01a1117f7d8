use pulldown_cmark::CodeBlockKind;
use ratatui::text::{Line, Span};

use crate::core::render::CodeHighlighter;
use crate::ui::theme::Theme;

pub(super) fn language_hint_from_codeblock_kind(kind: &CodeBlockKind<'_>) -> String {
    match kind {
        CodeBlockKind::Indented => String::new(),
        CodeBlockKind::Fenced(info) => info.split_ascii_whitespace().next().unwrap_or("").into(),
    }
}

fn plain_codeblock_lines(code: &str, theme: &Theme) -> Vec<Line<'static>> {
    let mut style = theme.code_text_style;
    if let Some(bg) = theme.code_block_bg {
        style = style.bg(bg);
    }
    code.lines()
        .map(|line| Line::from(vec![Span::styled(line.to_string(), style)]))
        .collect()
}

/// Lines for a fenced block, highlighted when a highlighter is available
/// and knows what to do with it.
pub(super) fn codeblock_lines(
    code: &str,
    language_hint: &str,
    theme: &Theme,
    highlighter: Option<&dyn CodeHighlighter>,
) -> Vec<Line<'static>> {
    let code = code.strip_suffix('\n').unwrap_or(code);
    if code.is_empty() {
        return Vec::new();
    }
    highlighter
        .and_then(|h| h.highlight(language_hint, code))
        .unwrap_or_else(|| plain_codeblock_lines(code, theme))
}
