//! Pattern extraction over free text: the `Language: <name>` hint the model
//! places before code, and the bracketed code prefix providers put on error
//! messages.

use std::ops::Range;
use std::sync::LazyLock;

use regex_lite::Regex;

/// Marker followed by a line break. Used while the text is still streaming,
/// so a language name split across two deltas is never read half-way.
static LANGUAGE_MARKER_TERMINATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[ \t]*Language:[ \t]*([A-Za-z][A-Za-z0-9_+#.-]*)[ \t]*(\r?\n)")
        .expect("valid language marker pattern")
});

/// Marker that may also end the text. Used once the stream is complete.
static LANGUAGE_MARKER_AT_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[ \t]*Language:[ \t]*([A-Za-z][A-Za-z0-9_+#.-]*)[ \t]*(\r?\n|$)")
        .expect("valid language marker pattern")
});

static ERROR_CODE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[[^\]]*\]:?\s*").expect("valid error prefix pattern")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LanguageMarker {
    pub language: String,
    /// Byte range to remove from the scanned text. A marker with a line to
    /// itself takes its line break along; one that ends a prose line leaves
    /// the break in place so the surrounding lines stay apart.
    pub span: Range<usize>,
}

/// Find the first `Language: <name>` marker in `text`.
///
/// With `complete == false` the marker only counts once its line has
/// ended; with `complete == true` a marker at the very end of the text is
/// accepted as well.
pub fn find_language_marker(text: &str, complete: bool) -> Option<LanguageMarker> {
    let pattern = if complete {
        &*LANGUAGE_MARKER_AT_END
    } else {
        &*LANGUAGE_MARKER_TERMINATED
    };
    let captures = pattern.captures(text)?;
    let whole = captures.get(0)?;
    let name = captures.get(1)?;
    let line_break = captures.get(2)?;
    let before = &text[..whole.start()];
    let own_line = before.is_empty() || before.ends_with('\n');
    let end = if own_line {
        whole.end()
    } else {
        line_break.start()
    };
    Some(LanguageMarker {
        language: name.as_str().to_string(),
        span: whole.start()..end,
    })
}

/// Return `text` with `span` removed.
pub fn without_span(text: &str, span: &Range<usize>) -> String {
    let mut out = String::with_capacity(text.len().saturating_sub(span.len()));
    out.push_str(&text[..span.start]);
    out.push_str(&text[span.end..]);
    out
}

/// Drop a leading `[...]` token (for example `[400 Bad Request]`) from an
/// error message.
pub fn strip_error_code_prefix(message: &str) -> String {
    ERROR_CODE_PREFIX.replace(message, "").into_owned()
}
