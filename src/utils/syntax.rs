use crate::core::render::CodeHighlighter;
use crate::ui::theme::Theme;
use ratatui::style::Color as TuiColor;
use ratatui::text::{Line, Span};
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, OnceLock, PoisonError};
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;

const CACHE_CAPACITY: usize = 64;

fn hash_code(lang: &str, code: &str, theme_sig: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    lang.hash(&mut hasher);
    code.hash(&mut hasher);
    theme_sig.hash(&mut hasher);
    hasher.finish()
}

// Bounded FIFO cache of highlighted blocks, keyed by (lang_norm, hash)
struct SimpleCache {
    map: HashMap<(String, u64), Vec<Line<'static>>>,
    order: VecDeque<(String, u64)>,
    cap: usize,
}

impl SimpleCache {
    fn new(cap: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            cap,
        }
    }

    fn get(&self, k: &(String, u64)) -> Option<Vec<Line<'static>>> {
        self.map.get(k).cloned()
    }

    fn put(&mut self, k: (String, u64), v: Vec<Line<'static>>) {
        if !self.map.contains_key(&k) {
            self.order.push_back(k.clone());
        }
        self.map.insert(k, v);
        while self.map.len() > self.cap {
            if let Some(old) = self.order.pop_front() {
                self.map.remove(&old);
            } else {
                break;
            }
        }
    }
}

fn syntax_set() -> &'static SyntaxSet {
    static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme_set() -> &'static ThemeSet {
    static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();
    THEME_SET.get_or_init(ThemeSet::load_defaults)
}

fn is_dark_background(c: &TuiColor) -> bool {
    match c {
        TuiColor::Rgb(r, g, b) => {
            let br = 0.2126 * (*r as f32) + 0.7152 * (*g as f32) + 0.0722 * (*b as f32);
            br < 128.0
        }
        TuiColor::White => false,
        _ => true,
    }
}

fn normalize_lang_hint(s: &str) -> String {
    let t = s.trim().to_ascii_lowercase();
    match t.as_str() {
        "py" | "python" | "python3" => "python".into(),
        "bash" | "sh" | "zsh" | "shell" => "bash".into(),
        "js" | "javascript" | "jsx" | "node" => "javascript".into(),
        "ts" | "tsx" | "typescript" => "typescript".into(),
        "yaml" | "yml" => "yaml".into(),
        "rust" | "rs" => "rust".into(),
        "c" | "h" => "c".into(),
        "cpp" | "c++" | "cc" | "cxx" | "hpp" | "hxx" => "cpp".into(),
        "c#" | "csharp" | "cs" => "cs".into(),
        "kotlin" | "kt" => "kotlin".into(),
        "golang" => "go".into(),
        other => other.into(),
    }
}

// Choose a syntect theme name based on background brightness.
pub(crate) fn pick_syntect_theme_name_for_theme(theme: &Theme) -> &'static str {
    if is_dark_background(&theme.background_color) {
        "base16-ocean.dark"
    } else {
        "InspiredGitHub"
    }
}

/// Highlights code card contents with syntect, once per distinct block.
pub struct SyntectHighlighter {
    theme_name: String,
    code_bg: Option<TuiColor>,
    cache: Mutex<SimpleCache>,
}

impl SyntectHighlighter {
    /// `syntax_theme` overrides the brightness-based choice when it names a
    /// bundled syntect theme.
    pub fn new(theme: &Theme, syntax_theme: Option<&str>) -> Self {
        let theme_name = syntax_theme
            .filter(|name| theme_set().themes.contains_key(*name))
            .unwrap_or_else(|| pick_syntect_theme_name_for_theme(theme))
            .to_string();
        Self {
            theme_name,
            code_bg: theme.code_block_bg,
            cache: Mutex::new(SimpleCache::new(CACHE_CAPACITY)),
        }
    }

    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }

    fn theme_signature(&self) -> String {
        format!("{}|{:?}", self.theme_name, self.code_bg)
    }
}

impl CodeHighlighter for SyntectHighlighter {
    fn highlight(&self, language: &str, code: &str) -> Option<Vec<Line<'static>>> {
        let lang_norm = normalize_lang_hint(language);
        let key = (
            lang_norm.clone(),
            hash_code(&lang_norm, code, &self.theme_signature()),
        );
        if let Some(lines) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Some(lines);
        }

        let ps = syntax_set();
        let syn_theme = theme_set().themes.get(&self.theme_name)?;
        let syntax = ps
            .find_syntax_by_token(&lang_norm)
            .unwrap_or_else(|| ps.find_syntax_plain_text());

        let mut h = syntect::easy::HighlightLines::new(syntax, syn_theme);
        let mut out: Vec<Line<'static>> = Vec::new();
        for line in syntect::util::LinesWithEndings::from(code) {
            let ranges = h.highlight_line(line, ps).ok()?;
            let mut spans: Vec<Span<'static>> = Vec::new();
            for (style, text) in ranges {
                let frag = text.strip_suffix('\n').unwrap_or(text);
                let frag = frag.strip_suffix('\r').unwrap_or(frag);
                let fg = style.foreground;
                let mut st = ratatui::style::Style::default().fg(TuiColor::Rgb(fg.r, fg.g, fg.b));
                if let Some(bgcol) = self.code_bg {
                    st = st.bg(bgcol);
                }
                spans.push(Span::styled(frag.to_string(), st));
            }
            out.push(Line::from(spans));
        }

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key, out.clone());
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::render::lines_to_plain;
    use ratatui::style::Color;

    #[test]
    fn normalize_lang_hint_maps_common_aliases() {
        assert_eq!(normalize_lang_hint("py"), "python");
        assert_eq!(normalize_lang_hint("JS"), "javascript");
        assert_eq!(normalize_lang_hint("TsX"), "typescript");
        assert_eq!(normalize_lang_hint("yml"), "yaml");
        assert_eq!(normalize_lang_hint("C++"), "cpp");
        assert_eq!(normalize_lang_hint("rs"), "rust");
    }

    #[test]
    fn dark_background_heuristic_basic() {
        assert!(is_dark_background(&Color::Black));
        assert!(!is_dark_background(&Color::White));
        assert!(is_dark_background(&Color::Rgb(10, 10, 10)));
        assert!(!is_dark_background(&Color::Rgb(240, 240, 240)));
    }

    #[test]
    fn theme_selection_matches_brightness() {
        assert_eq!(
            pick_syntect_theme_name_for_theme(&Theme::dark_default()),
            "base16-ocean.dark"
        );
        assert_eq!(
            pick_syntect_theme_name_for_theme(&Theme::light()),
            "InspiredGitHub"
        );
    }

    #[test]
    fn configured_theme_wins_only_when_bundled() {
        let theme = Theme::dark_default();
        let chosen = SyntectHighlighter::new(&theme, Some("Solarized (dark)"));
        assert_eq!(chosen.theme_name(), "Solarized (dark)");
        let unknown = SyntectHighlighter::new(&theme, Some("no-such-theme"));
        assert_eq!(unknown.theme_name(), "base16-ocean.dark");
    }

    #[test]
    fn highlighting_keeps_text_and_line_count() {
        let highlighter = SyntectHighlighter::new(&Theme::dark_default(), None);
        let code = "def f(x):\n    return x + 1\n";
        let lines = highlighter.highlight("python", code).expect("highlight");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines_to_plain(&lines), "def f(x):\n    return x + 1");
        assert!(lines[0].spans.iter().all(|s| s.style.fg.is_some()));

        // cached result is identical
        assert_eq!(highlighter.highlight("py", code), Some(lines));
    }

    #[test]
    fn unknown_language_falls_back_to_plain_text() {
        let highlighter = SyntectHighlighter::new(&Theme::light(), None);
        let lines = highlighter
            .highlight("brainfudge", "+++.")
            .expect("highlight");
        assert_eq!(lines_to_plain(&lines), "+++.");
    }
}
