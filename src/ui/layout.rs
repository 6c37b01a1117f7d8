use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthChar;

/// Split styled lines so none is wider than `width` columns. Styles carry
/// over to the continuation rows.
pub fn prewrap_lines(lines: &[Line<'static>], width: u16) -> Vec<Line<'static>> {
    let width = usize::from(width.max(1));
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        wrap_line_into(line, width, &mut out);
    }
    out
}

fn wrap_line_into(line: &Line<'static>, width: usize, out: &mut Vec<Line<'static>>) {
    let mut row: Vec<Span<'static>> = Vec::new();
    let mut row_width = 0usize;
    for span in &line.spans {
        let mut piece = String::new();
        for ch in span.content.chars() {
            let w = ch.width().unwrap_or(0);
            if row_width + w > width && row_width > 0 {
                if !piece.is_empty() {
                    row.push(Span::styled(std::mem::take(&mut piece), span.style));
                }
                out.push(Line::from(std::mem::take(&mut row)).style(line.style));
                row_width = 0;
            }
            piece.push(ch);
            row_width += w;
        }
        if !piece.is_empty() {
            row.push(Span::styled(piece, span.style));
        }
    }
    out.push(Line::from(row).style(line.style));
}

/// Transcript scroll position, counted from the bottom so new output stays
/// in view until the user scrolls up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollState {
    from_bottom: usize,
}

impl ScrollState {
    pub fn is_following(&self) -> bool {
        self.from_bottom == 0
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.from_bottom = self.from_bottom.saturating_add(rows);
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.from_bottom = self.from_bottom.saturating_sub(rows);
    }

    pub fn follow(&mut self) {
        self.from_bottom = 0;
    }

    /// First visible row for `total` rows in a viewport of `height` rows.
    /// Clamps the stored position so scrolling past the top is undone.
    pub fn top_row(&mut self, total: usize, height: usize) -> usize {
        let max_offset = total.saturating_sub(height);
        self.from_bottom = self.from_bottom.min(max_offset);
        max_offset - self.from_bottom
    }
}
