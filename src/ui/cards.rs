//! Turns transcript cards into terminal lines.

use ratatui::style::Style;
use ratatui::text::{Line, Span};

use crate::core::cards::{Card, CardBody, CardDeck};
use crate::ui::markdown::sanitize;
use crate::ui::theme::Theme;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub const NO_OUTPUT_TEXT: &str = "The model returned no output.";

/// Per-frame inputs that are not part of the cards themselves.
#[derive(Clone, Copy, Debug)]
pub struct CardView<'a> {
    pub spinner_tick: usize,
    /// Label for the copy control on the most recent code card.
    pub copy_label: &'a str,
}

fn title_line(title: String, style: Style) -> Line<'static> {
    Line::from(Span::styled(title, style))
}

fn plain_lines(text: &str, style: Style) -> Vec<Line<'static>> {
    sanitize(text)
        .split('\n')
        .map(|line| Line::from(Span::styled(line.to_string(), style)))
        .collect()
}

fn code_lines(code: &str, theme: &Theme) -> Vec<Line<'static>> {
    let mut style = theme.code_text_style;
    if let Some(bg) = theme.code_block_bg {
        style = style.bg(bg);
    }
    plain_lines(code.strip_suffix('\n').unwrap_or(code), style)
}

pub fn card_lines(
    card: &Card,
    is_latest_code: bool,
    theme: &Theme,
    view: CardView<'_>,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match &card.body {
        CardBody::User { text, image_mime } => {
            lines.push(title_line("You".to_string(), theme.user_title_style));
            if let Some(mime) = image_mime {
                lines.push(Line::from(Span::styled(
                    format!("[image attached: {mime}]"),
                    theme.notice_style,
                )));
            }
            if !text.is_empty() {
                lines.extend(plain_lines(text, theme.user_text_style));
            }
        }
        CardBody::Thinking => {
            let frame = SPINNER_FRAMES[view.spinner_tick % SPINNER_FRAMES.len()];
            lines.push(Line::from(Span::styled(
                format!("{frame} Thinking…"),
                theme.thinking_style,
            )));
        }
        CardBody::Text { markup, .. } => {
            lines.extend(markup.iter().cloned());
        }
        CardBody::ToolCall { language, preview } => {
            let frame = SPINNER_FRAMES[view.spinner_tick % SPINNER_FRAMES.len()];
            lines.push(title_line(
                format!("{frame} Running {language}"),
                theme.tool_call_title_style,
            ));
            if !preview.is_empty() {
                lines.extend(plain_lines(
                    preview.strip_suffix('\n').unwrap_or(preview),
                    theme.tool_call_text_style,
                ));
            }
        }
        CardBody::Code {
            language,
            code,
            highlighted,
        } => {
            let mut title = vec![Span::styled(
                format!("Code · {language}"),
                theme.code_title_style,
            )];
            if is_latest_code {
                title.push(Span::styled(
                    format!("  [Ctrl+Y {}]", view.copy_label),
                    theme.hint_style,
                ));
            }
            lines.push(Line::from(title));
            match highlighted {
                Some(rendered) => lines.extend(rendered.iter().cloned()),
                None => lines.extend(code_lines(code, theme)),
            }
        }
        CardBody::Result { output } => {
            lines.push(title_line("Result".to_string(), theme.result_title_style));
            if !output.is_empty() {
                lines.extend(plain_lines(
                    output.strip_suffix('\n').unwrap_or(output),
                    theme.result_text_style,
                ));
            }
        }
        CardBody::NoOutput => {
            lines.push(Line::from(Span::styled(NO_OUTPUT_TEXT, theme.notice_style)));
        }
        CardBody::Error { message } => {
            lines.push(title_line("Error".to_string(), theme.error_title_style));
            lines.extend(plain_lines(message, theme.error_text_style));
        }
    }
    lines
}

/// All cards in order, separated by blank lines.
pub fn deck_lines(deck: &CardDeck, theme: &Theme, view: CardView<'_>) -> Vec<Line<'static>> {
    let latest_code = deck
        .cards()
        .iter()
        .rev()
        .find(|card| matches!(card.body, CardBody::Code { .. }))
        .map(|card| card.id);

    let mut lines = Vec::new();
    for card in deck.cards() {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.extend(card_lines(
            card,
            Some(card.id) == latest_code,
            theme,
            view,
        ));
    }
    lines
}
