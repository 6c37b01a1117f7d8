//! Composer state behind the chat screen: what the user is typing, the
//! pending image, and whether a turn is in flight.

use std::time::{Duration, Instant};

use tui_textarea::TextArea;
use unicode_width::UnicodeWidthStr;

use crate::core::image::ImageData;
use crate::core::session::UserTurn;

/// The input grows with its content up to this many rows, then scrolls.
pub const MAX_INPUT_LINES: u16 = 6;

/// How long the copy control reads "Copied!" before reverting.
pub const COPY_FEEDBACK: Duration = Duration::from_secs(2);

pub const COPY_LABEL: &str = "Copy";
pub const COPIED_LABEL: &str = "Copied!";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureKind {
    Camera,
    Dictation,
}

/// Submission is allowed when there is something to send and no turn is
/// generating.
pub fn can_submit(text: &str, has_image: bool, generating: bool) -> bool {
    (!text.trim().is_empty() || has_image) && !generating
}

fn wrapped_rows(line: &str, width: usize) -> usize {
    let cols = UnicodeWidthStr::width(line);
    if cols == 0 || width == 0 {
        1
    } else {
        cols.div_ceil(width)
    }
}

pub struct Composer {
    textarea: TextArea<'static>,
    pending_image: Option<ImageData>,
    generating: bool,
    capturing: Option<CaptureKind>,
    copied_at: Option<Instant>,
    alert: Option<String>,
    dictation_available: bool,
}

impl Composer {
    pub fn new(dictation_available: bool) -> Self {
        Self {
            textarea: TextArea::default(),
            pending_image: None,
            generating: false,
            capturing: None,
            copied_at: None,
            alert: None,
            dictation_available,
        }
    }

    pub fn textarea_mut(&mut self) -> &mut TextArea<'static> {
        &mut self.textarea
    }

    pub fn text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn set_text(&mut self, text: &str) {
        self.textarea = TextArea::default();
        self.textarea.insert_str(text);
    }

    pub fn can_submit(&self) -> bool {
        can_submit(
            &self.text(),
            self.pending_image.is_some(),
            self.generating,
        )
    }

    /// Rows the input box needs for its current content at `width` columns,
    /// between one and [`MAX_INPUT_LINES`].
    pub fn input_height(&self, width: u16) -> u16 {
        let width = usize::from(width.max(1));
        let rows: usize = self
            .textarea
            .lines()
            .iter()
            .map(|line| wrapped_rows(line, width))
            .sum();
        u16::try_from(rows)
            .unwrap_or(u16::MAX)
            .clamp(1, MAX_INPUT_LINES)
    }

    /// Attach an image, replacing any pending one. Returns the image that
    /// was replaced.
    pub fn attach_image(&mut self, image: ImageData) -> Option<ImageData> {
        self.pending_image.replace(image)
    }

    pub fn clear_image(&mut self) -> Option<ImageData> {
        self.pending_image.take()
    }

    pub fn pending_image(&self) -> Option<&ImageData> {
        self.pending_image.as_ref()
    }

    /// Take the composed turn and enter the generating state. Returns `None`
    /// (and changes nothing) when submission is not allowed.
    pub fn take_submission(&mut self) -> Option<UserTurn> {
        if !self.can_submit() {
            return None;
        }
        let text = self.text().trim().to_string();
        self.textarea = TextArea::default();
        self.generating = true;
        Some(UserTurn {
            text: (!text.is_empty()).then_some(text),
            image: self.pending_image.take(),
        })
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Reset after a turn ends, whatever the outcome.
    pub fn end_generation(&mut self) {
        self.generating = false;
    }

    /// Returns false if another capture is already running.
    pub fn begin_capture(&mut self, kind: CaptureKind) -> bool {
        if self.capturing.is_some() {
            return false;
        }
        if kind == CaptureKind::Dictation && !self.dictation_available {
            return false;
        }
        self.capturing = Some(kind);
        true
    }

    pub fn end_capture(&mut self) {
        self.capturing = None;
    }

    pub fn capturing(&self) -> Option<CaptureKind> {
        self.capturing
    }

    pub fn dictation_available(&self) -> bool {
        self.dictation_available
    }

    /// Append recognized speech to the input, separated from existing text.
    pub fn insert_dictation(&mut self, text: &str) {
        let current = self.text();
        if !current.is_empty() && !current.ends_with(char::is_whitespace) {
            self.textarea.insert_char(' ');
        }
        self.textarea.insert_str(text);
    }

    pub fn note_copied(&mut self, now: Instant) {
        self.copied_at = Some(now);
    }

    pub fn copy_label(&self, now: Instant) -> &'static str {
        match self.copied_at {
            Some(at) if now.saturating_duration_since(at) < COPY_FEEDBACK => COPIED_LABEL,
            _ => COPY_LABEL,
        }
    }

    pub fn raise_alert(&mut self, message: impl Into<String>) {
        self.alert = Some(message.into());
    }

    pub fn dismiss_alert(&mut self) -> bool {
        self.alert.take().is_some()
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }
}
