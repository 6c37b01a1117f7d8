use std::time::Instant;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::core::controller::CaptureKind;
use crate::ui::cards::{deck_lines, CardView};
use crate::ui::chat_loop::ChatApp;
use crate::ui::layout::prewrap_lines;

const ALERT_WIDTH: u16 = 60;

pub fn ui(f: &mut Frame, app: &mut ChatApp, now: Instant) {
    let area = f.area();
    f.render_widget(
        Block::default().style(Style::default().bg(app.theme.background_color)),
        area,
    );

    let input_rows = app.composer.input_height(area.width.saturating_sub(2));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(input_rows + 2), // +2 for borders
            Constraint::Length(1),
        ])
        .split(area);

    let title = format!("cardchat v{} · {}", env!("CARGO_PKG_VERSION"), app.model);
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(title, app.theme.title_style))),
        chunks[0],
    );

    let view = CardView {
        spinner_tick: app.spinner_tick,
        copy_label: app.composer.copy_label(now),
    };
    let lines = prewrap_lines(&deck_lines(&app.deck, &app.theme, view), chunks[1].width);
    let height = usize::from(chunks[1].height);
    let top = app.scroll.top_row(lines.len(), height);
    let visible: Vec<Line<'static>> = lines.into_iter().skip(top).take(height).collect();
    f.render_widget(Paragraph::new(visible), chunks[1]);

    render_input(f, app, chunks[2]);
    f.render_widget(Paragraph::new(hint_line(app)), chunks[3]);

    if let Some(message) = app.composer.alert() {
        render_alert(f, app, message, area);
    }
}

fn render_input(f: &mut Frame, app: &mut ChatApp, area: Rect) {
    let title = match (app.composer.capturing(), app.composer.pending_image()) {
        (Some(CaptureKind::Camera), _) => "Capturing image… (Esc to cancel)".to_string(),
        (Some(CaptureKind::Dictation), _) => "Listening… (Esc to cancel)".to_string(),
        (None, Some(image)) => format!("Message · image attached ({})", image.mime_type),
        (None, None) => "Message".to_string(),
    };
    let theme = &app.theme;
    let textarea = app.composer.textarea_mut();
    textarea.set_block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.input_border_style)
            .title(Span::styled(title, theme.input_title_style)),
    );
    textarea.set_style(theme.input_text_style);
    textarea.set_cursor_style(theme.input_cursor_style);
    textarea.set_cursor_line_style(Style::default());
    f.render_widget(&*textarea, area);
}

fn hint_line(app: &ChatApp) -> Line<'static> {
    let style = app.theme.hint_style;
    if let Some(status) = &app.status {
        return Line::from(Span::styled(status.clone(), style));
    }
    let mut hints = Vec::new();
    if app.composer.is_generating() {
        hints.push("Esc stop");
    } else {
        hints.push("Enter send");
        hints.push("Alt+Enter newline");
    }
    hints.push("Ctrl+O camera");
    if app.composer.dictation_available() {
        hints.push("Ctrl+L dictate");
    }
    if app.composer.pending_image().is_some() {
        hints.push("Ctrl+X drop image");
    }
    hints.push("PgUp/PgDn scroll");
    hints.push("Ctrl+C quit");
    Line::from(Span::styled(hints.join(" · "), style))
}

fn render_alert(f: &mut Frame, app: &ChatApp, message: &str, area: Rect) {
    let width = ALERT_WIDTH.min(area.width);
    let inner_width = usize::from(width.saturating_sub(2)).max(1);
    let text_rows = message
        .lines()
        .map(|line| unicode_width::UnicodeWidthStr::width(line).div_ceil(inner_width).max(1))
        .sum::<usize>()
        .max(1);
    let height = (u16::try_from(text_rows).unwrap_or(u16::MAX).saturating_add(3)).min(area.height);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    let mut body: Vec<Line<'static>> = message
        .lines()
        .map(|line| Line::from(Span::styled(line.to_string(), app.theme.alert_text_style)))
        .collect();
    body.push(Line::from(Span::styled("Esc to dismiss", app.theme.hint_style)));

    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(body)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(app.theme.alert_border_style)
                    .title("Alert"),
            ),
        popup,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cards::CardBody;
    use crate::core::render::testing::renderers;
    use crate::core::session::{ConversationBackend, FragmentStream, UserTurn};
    use crate::ui::theme::Theme;
    use futures_util::stream::{self, StreamExt};
    use ratatui::{backend::TestBackend, Terminal};

    struct Idle;

    impl ConversationBackend for Idle {
        fn submit_turn(&mut self, _turn: UserTurn) -> FragmentStream {
            stream::empty().boxed()
        }

        fn fresh(&self) -> Box<dyn ConversationBackend> {
            Box::new(Idle)
        }
    }

    fn app() -> ChatApp {
        let (renderers, _) = renderers();
        ChatApp::new(
            Box::new(Idle),
            renderers,
            Theme::dark_default(),
            "gemini-test".into(),
            false,
        )
    }

    fn screen(app: &mut ChatApp, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
        terminal
            .draw(|f| ui(f, app, Instant::now()))
            .expect("draw");
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn draws_title_cards_and_hints() {
        let mut app = app();
        app.deck.push(CardBody::Result {
            output: "42".into(),
        });
        let text = screen(&mut app, 60, 12);
        assert!(text.contains("gemini-test"));
        assert!(text.contains("Result"));
        assert!(text.contains("42"));
        assert!(text.contains("Enter send"));
        assert!(!text.contains("Ctrl+L dictate"));
    }

    #[test]
    fn alert_is_drawn_over_the_transcript() {
        let mut app = app();
        app.composer.raise_alert("Camera unavailable");
        let text = screen(&mut app, 70, 14);
        assert!(text.contains("Camera unavailable"));
        assert!(text.contains("Esc to dismiss"));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let mut app = app();
        app.composer.raise_alert("x");
        screen(&mut app, 3, 2);
    }
}
