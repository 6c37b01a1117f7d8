use super::code::{codeblock_lines, language_hint_from_codeblock_kind};
use super::table::TableBuffer;
use crate::core::render::CodeHighlighter;
use crate::ui::theme::Theme;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

const RULE_WIDTH: usize = 40;
const QUOTE_BAR: &str = "▎ ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered(u64),
}

/// Single-use event walker turning one markdown document into lines.
pub(super) struct MarkdownWriter<'a> {
    theme: &'a Theme,
    highlighter: Option<&'a dyn CodeHighlighter>,
    lines: Vec<Line<'static>>,
    current_spans: Vec<Span<'static>>,
    style_stack: Vec<Style>,
    list_stack: Vec<ListKind>,
    /// Marker width of each open list level.
    list_indent_stack: Vec<usize>,
    /// Set between an item's marker being due and it being written.
    pending_marker: Option<String>,
    quote_depth: usize,
    code_block: Option<(String, String)>,
    table: Option<TableBuffer>,
    in_table_head: bool,
    needs_gap: bool,
    after_task_marker: bool,
}

impl<'a> MarkdownWriter<'a> {
    pub(super) fn new(theme: &'a Theme, highlighter: Option<&'a dyn CodeHighlighter>) -> Self {
        Self {
            theme,
            highlighter,
            lines: Vec::new(),
            current_spans: Vec::new(),
            style_stack: vec![theme.assistant_text_style],
            list_stack: Vec::new(),
            list_indent_stack: Vec::new(),
            pending_marker: None,
            quote_depth: 0,
            code_block: None,
            table: None,
            in_table_head: false,
            needs_gap: false,
            after_task_marker: false,
        }
    }

    pub(super) fn render(mut self, content: &str) -> Vec<Line<'static>> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);

        for event in Parser::new_ext(content, options) {
            match event {
                Event::Start(tag) => self.start_tag(tag),
                Event::End(tag) => self.end_tag(tag),
                Event::Text(text) => self.text(&text),
                Event::Code(code) => {
                    if let Some(table) = self.table.as_mut() {
                        table.push_text(&code);
                    } else {
                        let style = self.current_style().patch(self.theme.md_inline_code_style);
                        self.push_span(Span::styled(code.into_string(), style));
                    }
                }
                Event::SoftBreak | Event::HardBreak => {
                    if let Some(table) = self.table.as_mut() {
                        table.push_text(" ");
                    } else {
                        self.flush_current_spans();
                    }
                }
                Event::Rule => {
                    self.start_block();
                    self.push_span(Span::styled("─".repeat(RULE_WIDTH), self.theme.md_rule_style));
                    self.end_block();
                }
                Event::TaskListMarker(checked) => {
                    let marker = if checked { "[x] " } else { "[ ] " };
                    self.push_span(Span::styled(marker, self.current_style()));
                    self.after_task_marker = true;
                }
                // Raw HTML is shown as typed, never interpreted.
                Event::Html(html) | Event::InlineHtml(html) => self.text(&html),
                _ => {}
            }
        }

        self.flush_current_spans();
        while self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.list_stack.is_empty() || self.needs_gap {
                    self.start_block();
                }
            }
            Tag::Heading { .. } => {
                self.start_block();
                self.style_stack.push(self.theme.md_heading_style);
            }
            Tag::BlockQuote(_) => {
                self.start_block();
                self.quote_depth += 1;
                self.style_stack.push(self.theme.md_quote_style);
            }
            Tag::CodeBlock(kind) => {
                self.start_block();
                self.code_block = Some((language_hint_from_codeblock_kind(&kind), String::new()));
            }
            Tag::List(start) => {
                if self.list_stack.is_empty() {
                    self.start_block();
                } else {
                    self.flush_current_spans();
                }
                self.list_stack.push(match start {
                    Some(n) => ListKind::Ordered(n),
                    None => ListKind::Unordered,
                });
                self.list_indent_stack.push(0);
            }
            Tag::Item => {
                self.flush_current_spans();
                let marker = match self.list_stack.last_mut() {
                    Some(ListKind::Ordered(next)) => {
                        let marker = format!("{next}. ");
                        *next += 1;
                        marker
                    }
                    _ => "- ".to_string(),
                };
                if let Some(indent) = self.list_indent_stack.last_mut() {
                    *indent = marker.width();
                }
                self.pending_marker = Some(marker);
                self.needs_gap = false;
            }
            Tag::Emphasis => self.push_modifier(self.theme.md_emphasis_style),
            Tag::Strong => self.push_modifier(self.theme.md_strong_style),
            Tag::Strikethrough => {
                self.push_modifier(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Superscript | Tag::Subscript => self.push_modifier(Style::default()),
            Tag::Link { .. } | Tag::Image { .. } => {
                self.push_modifier(self.theme.md_link_style)
            }
            Tag::Table(_) => {
                self.start_block();
                self.table = Some(TableBuffer::default());
            }
            Tag::TableHead => self.in_table_head = true,
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_current_spans();
                self.needs_gap = true;
            }
            TagEnd::Heading(_) => {
                self.style_stack.pop();
                self.end_block();
            }
            TagEnd::BlockQuote(_) => {
                self.flush_current_spans();
                self.style_stack.pop();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.needs_gap = true;
            }
            TagEnd::CodeBlock => {
                if let Some((lang, code)) = self.code_block.take() {
                    for line in codeblock_lines(&code, &lang, self.theme, self.highlighter) {
                        let mut spans = self.line_prefix();
                        spans.extend(line.spans);
                        self.lines.push(Line::from(spans));
                    }
                }
                self.needs_gap = true;
            }
            TagEnd::List(_) => {
                self.flush_current_spans();
                self.list_stack.pop();
                self.list_indent_stack.pop();
                self.needs_gap = self.list_stack.is_empty();
            }
            TagEnd::Item => {
                self.flush_current_spans();
                self.pending_marker = None;
            }
            TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Superscript
            | TagEnd::Subscript
            | TagEnd::Link
            | TagEnd::Image => {
                self.style_stack.pop();
            }
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.end_cell();
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.end_row(true);
                }
                self.in_table_head = false;
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.end_row(self.in_table_head);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    let text_style = self.current_style();
                    let header_style = text_style.patch(self.theme.md_strong_style);
                    for line in table.into_lines(text_style, header_style, self.theme.md_rule_style)
                    {
                        let mut spans = self.line_prefix();
                        spans.extend(line.spans);
                        self.lines.push(Line::from(spans));
                    }
                }
                self.needs_gap = true;
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some((_, code)) = self.code_block.as_mut() {
            code.push_str(text);
            return;
        }
        if let Some(table) = self.table.as_mut() {
            table.push_text(text);
            return;
        }
        let text = if std::mem::take(&mut self.after_task_marker) {
            text.trim_start()
        } else {
            text
        };
        let style = self.current_style();
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                self.flush_current_spans();
            }
            if !part.is_empty() {
                self.push_span(Span::styled(part.to_string(), style));
            }
        }
    }

    fn current_style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or_default()
    }

    fn push_modifier(&mut self, style: Style) {
        let patched = self.current_style().patch(style);
        self.style_stack.push(patched);
    }

    /// Quote bars and list indentation that open every line.
    fn line_prefix(&mut self) -> Vec<Span<'static>> {
        let mut spans = Vec::new();
        for _ in 0..self.quote_depth {
            spans.push(Span::styled(QUOTE_BAR, self.theme.md_quote_style));
        }
        let levels = self.list_indent_stack.len();
        let (parent, own) = if levels == 0 {
            (0, 0)
        } else {
            (
                self.list_indent_stack[..levels - 1].iter().sum::<usize>(),
                self.list_indent_stack[levels - 1],
            )
        };
        match self.pending_marker.take() {
            Some(marker) => {
                if parent > 0 {
                    spans.push(Span::raw(" ".repeat(parent)));
                }
                spans.push(Span::styled(marker, self.theme.md_strong_style));
            }
            None if parent + own > 0 => spans.push(Span::raw(" ".repeat(parent + own))),
            None => {}
        }
        spans
    }

    fn push_span(&mut self, span: Span<'static>) {
        if self.current_spans.is_empty() {
            self.current_spans = self.line_prefix();
        }
        self.current_spans.push(span);
    }

    fn flush_current_spans(&mut self) {
        if self.current_spans.is_empty() && self.pending_marker.is_none() {
            return;
        }
        if self.current_spans.is_empty() {
            // an item with no text of its own still shows its marker
            self.current_spans = self.line_prefix();
        }
        let spans = std::mem::take(&mut self.current_spans);
        self.lines.push(Line::from(spans));
    }

    /// Separate a new block from whatever came before it.
    fn start_block(&mut self) {
        self.flush_current_spans();
        if self.needs_gap && !self.lines.is_empty() {
            self.lines.push(Line::default());
        }
        self.needs_gap = false;
    }

    fn end_block(&mut self) {
        self.flush_current_spans();
        self.needs_gap = true;
    }
}
