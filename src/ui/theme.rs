use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct Theme {
    // Overall background color to paint the full frame
    pub background_color: Color,

    // Card chrome
    pub user_title_style: Style,
    pub user_text_style: Style,
    pub assistant_text_style: Style,
    pub thinking_style: Style,
    pub tool_call_title_style: Style,
    pub tool_call_text_style: Style,
    pub code_title_style: Style,
    pub code_text_style: Style,
    pub code_block_bg: Option<Color>,
    pub result_title_style: Style,
    pub result_text_style: Style,
    pub notice_style: Style,
    pub error_title_style: Style,
    pub error_text_style: Style,

    // Markdown
    pub md_heading_style: Style,
    pub md_emphasis_style: Style,
    pub md_strong_style: Style,
    pub md_inline_code_style: Style,
    pub md_link_style: Style,
    pub md_quote_style: Style,
    pub md_rule_style: Style,

    // Chrome
    pub title_style: Style,
    pub hint_style: Style,
    pub input_border_style: Style,
    pub input_title_style: Style,
    pub input_text_style: Style,
    pub input_cursor_style: Style,
    pub alert_border_style: Style,
    pub alert_text_style: Style,
}

impl Theme {
    pub fn dark_default() -> Self {
        Theme {
            background_color: Color::Black,

            user_title_style: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Cyan),
            assistant_text_style: Style::default().fg(Color::White),
            thinking_style: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            tool_call_title_style: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            tool_call_text_style: Style::default().fg(Color::Gray),
            code_title_style: Style::default()
                .fg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
            code_text_style: Style::default().fg(Color::White),
            code_block_bg: Some(Color::Rgb(30, 30, 30)),
            result_title_style: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
            result_text_style: Style::default().fg(Color::Gray),
            notice_style: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            error_title_style: Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
            error_text_style: Style::default().fg(Color::LightRed),

            md_heading_style: Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
            md_emphasis_style: Style::default().add_modifier(Modifier::ITALIC),
            md_strong_style: Style::default().add_modifier(Modifier::BOLD),
            md_inline_code_style: Style::default().fg(Color::LightYellow),
            md_link_style: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::UNDERLINED),
            md_quote_style: Style::default().fg(Color::Gray),
            md_rule_style: Style::default().fg(Color::DarkGray),

            title_style: Style::default().fg(Color::Gray),
            hint_style: Style::default().fg(Color::DarkGray),
            input_border_style: Style::default().fg(Color::Gray),
            input_title_style: Style::default().fg(Color::Gray),
            input_text_style: Style::default().fg(Color::White),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
            alert_border_style: Style::default().fg(Color::LightRed),
            alert_text_style: Style::default().fg(Color::White),
        }
    }

    pub fn light() -> Self {
        Theme {
            background_color: Color::White,

            user_title_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Blue),
            assistant_text_style: Style::default().fg(Color::Black),
            thinking_style: Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
            tool_call_title_style: Style::default()
                .fg(Color::Rgb(150, 100, 0))
                .add_modifier(Modifier::BOLD),
            tool_call_text_style: Style::default().fg(Color::DarkGray),
            code_title_style: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            code_text_style: Style::default().fg(Color::Black),
            code_block_bg: Some(Color::Rgb(235, 235, 235)),
            result_title_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            result_text_style: Style::default().fg(Color::DarkGray),
            notice_style: Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
            error_title_style: Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            error_text_style: Style::default().fg(Color::Red),

            md_heading_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            md_emphasis_style: Style::default().add_modifier(Modifier::ITALIC),
            md_strong_style: Style::default().add_modifier(Modifier::BOLD),
            md_inline_code_style: Style::default().fg(Color::Magenta),
            md_link_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            md_quote_style: Style::default().fg(Color::DarkGray),
            md_rule_style: Style::default().fg(Color::Gray),

            title_style: Style::default().fg(Color::DarkGray),
            hint_style: Style::default().fg(Color::Gray),
            input_border_style: Style::default().fg(Color::Black),
            input_title_style: Style::default().fg(Color::DarkGray),
            input_text_style: Style::default().fg(Color::Black),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
            alert_border_style: Style::default().fg(Color::Red),
            alert_text_style: Style::default().fg(Color::Black),
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "light" => Self::light(),
            // Fallback
            _ => Self::dark_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_fall_back_to_dark() {
        assert_eq!(Theme::from_name("LIGHT").background_color, Color::White);
        assert_eq!(Theme::from_name("dracula").background_color, Color::Black);
    }
}
