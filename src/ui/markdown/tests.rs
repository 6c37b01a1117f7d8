use super::*;
use crate::core::render::lines_to_plain;
use crate::core::render::testing::RecordingHighlighter;
use ratatui::style::Modifier;

fn render(source: &str) -> String {
    let lines = TerminalMarkdown::new(Theme::dark_default())
        .render(source)
        .expect("render");
    lines_to_plain(&lines)
}

#[test]
fn paragraphs_and_headings_are_separated_by_blank_lines() {
    assert_eq!(
        render("# Title\nFirst paragraph.\n\nSecond paragraph."),
        "Title\n\nFirst paragraph.\n\nSecond paragraph."
    );
}

#[test]
fn soft_breaks_keep_the_model_line_structure() {
    assert_eq!(render("one\ntwo"), "one\ntwo");
}

#[test]
fn lists_get_markers_and_nested_indentation() {
    let out = render("- apples\n- pears\n  - green\n\n1. first\n2. second");
    assert_eq!(
        out,
        "- apples\n- pears\n  - green\n\n1. first\n2. second"
    );
}

#[test]
fn task_items_show_their_state() {
    assert_eq!(render("- [x] done\n- [ ] todo"), "- [x] done\n- [ ] todo");
}

#[test]
fn block_quotes_get_a_bar() {
    assert_eq!(render("> quoted\n\nafter"), "▎ quoted\n\nafter");
}

#[test]
fn fenced_code_without_highlighter_is_plain_with_background() {
    let theme = Theme::dark_default();
    let lines = TerminalMarkdown::new(theme.clone())
        .render("Intro\n\n```rust\nfn main() {}\n```")
        .expect("render");
    assert_eq!(lines_to_plain(&lines), "Intro\n\nfn main() {}");
    assert_eq!(lines[2].spans[0].style.bg, theme.code_block_bg);
}

#[test]
fn fenced_code_uses_the_highlighter_with_the_fence_language() {
    let highlighter = Arc::new(RecordingHighlighter::default());
    let lines = TerminalMarkdown::new(Theme::dark_default())
        .with_highlighter(highlighter.clone())
        .render("```js\nconsole.log(1)\n```")
        .expect("render");
    assert_eq!(lines_to_plain(&lines), "hl:console.log(1)");
    assert_eq!(
        highlighter.calls(),
        vec![("js".to_string(), "console.log(1)".to_string())]
    );
}

#[test]
fn inline_styles_are_applied() {
    let lines = TerminalMarkdown::new(Theme::dark_default())
        .render("plain **bold** *it* `code`")
        .expect("render");
    let spans = &lines[0].spans;
    let bold = spans.iter().find(|s| s.content == "bold").expect("bold span");
    assert!(bold.style.add_modifier.contains(Modifier::BOLD));
    let it = spans.iter().find(|s| s.content == "it").expect("italic span");
    assert!(it.style.add_modifier.contains(Modifier::ITALIC));
    let code = spans.iter().find(|s| s.content == "code").expect("code span");
    assert_eq!(code.style.fg, Theme::dark_default().md_inline_code_style.fg);
}

#[test]
fn tables_are_aligned_in_columns() {
    let out = render("| a | long header |\n|---|---|\n| wide cell | b |");
    assert_eq!(
        out,
        "a         │ long header\n──────────┼────────────\nwide cell │ b          "
    );
}

#[test]
fn html_is_shown_literally() {
    assert_eq!(render("<b>hi</b>"), "<b>hi</b>");
}

#[test]
fn sanitize_strips_escapes_and_controls() {
    assert_eq!(sanitize("\x1b[31mred\x1b[0m"), "red");
    assert_eq!(sanitize("a\tb\r\n\x07c"), "a    b\nc");
    assert_eq!(sanitize("\x1b]0;title\x07text"), "text");
}

#[test]
fn empty_source_renders_nothing() {
    assert!(TerminalMarkdown::new(Theme::light())
        .render("")
        .expect("render")
        .is_empty());
}
