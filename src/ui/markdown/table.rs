use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

/// Collects table cells as plain text and lays them out in aligned columns.
#[derive(Default)]
pub(super) struct TableBuffer {
    rows: Vec<Vec<String>>,
    current_row: Vec<String>,
    current_cell: String,
    header_rows: usize,
}

impl TableBuffer {
    pub(super) fn push_text(&mut self, text: &str) {
        self.current_cell.push_str(text);
    }

    pub(super) fn end_cell(&mut self) {
        let cell = std::mem::take(&mut self.current_cell);
        self.current_row.push(cell.trim().to_string());
    }

    pub(super) fn end_row(&mut self, header: bool) {
        if !self.current_row.is_empty() {
            self.rows.push(std::mem::take(&mut self.current_row));
            if header {
                self.header_rows = self.rows.len();
            }
        }
    }

    pub(super) fn into_lines(
        self,
        text_style: Style,
        header_style: Style,
        rule_style: Style,
    ) -> Vec<Line<'static>> {
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0usize; columns];
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.width());
            }
        }

        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        for (index, row) in self.rows.iter().enumerate() {
            let style = if index < self.header_rows {
                header_style
            } else {
                text_style
            };
            let mut spans = Vec::with_capacity(columns * 2);
            for (i, width) in widths.iter().enumerate() {
                if i > 0 {
                    spans.push(Span::styled(" │ ", rule_style));
                }
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                let pad = width.saturating_sub(cell.width());
                spans.push(Span::styled(format!("{cell}{}", " ".repeat(pad)), style));
            }
            lines.push(Line::from(spans));

            if index + 1 == self.header_rows {
                let rule = widths
                    .iter()
                    .map(|w| "─".repeat(*w))
                    .collect::<Vec<_>>()
                    .join("─┼─");
                lines.push(Line::from(Span::styled(rule, rule_style)));
            }
        }
        lines
    }
}
