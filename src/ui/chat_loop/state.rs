//! Chat screen state and the synchronous half of input handling.
//!
//! The event loop owns the in-flight [`ActiveTurn`] and any running capture;
//! everything here is plain state transitions so it can be tested without a
//! terminal.

use std::path::Path;
use std::time::Instant;

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::cards::{CardBody, CardDeck};
use crate::core::controller::{CaptureKind, Composer};
use crate::core::image::ImageData;
use crate::core::media::CaptureError;
use crate::core::render::Renderers;
use crate::core::session::ConversationBackend;
use crate::core::turn::{ActiveTurn, TurnEnd, TurnStep};
use crate::core::error::TurnError;
use crate::core::fragment::ResponseFragment;
use crate::ui::layout::ScrollState;
use crate::ui::theme::Theme;
use crate::utils::clipboard::copy_to_clipboard;

const SCROLL_PAGE: usize = 10;

pub const HELP_TEXT: &str =
    "/image <path or data URI> attaches a picture, /new starts over, /help shows this";

/// What the loop must do after a key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Nothing,
    Quit,
    Submit,
    Stop,
    CopyCode,
    Capture(CaptureKind),
    CancelCapture,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatCommand<'a> {
    NewChat,
    AttachImage(&'a str),
    Help,
    Unknown(&'a str),
}

/// Recognize a slash command. Text that does not start with `/` is a prompt.
pub fn parse_command(input: &str) -> Option<ChatCommand<'_>> {
    let trimmed = input.trim();
    let rest = trimmed.strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    Some(match name {
        "new" => ChatCommand::NewChat,
        "image" if !arg.is_empty() => ChatCommand::AttachImage(arg),
        "help" => ChatCommand::Help,
        _ => ChatCommand::Unknown(trimmed),
    })
}

pub struct ChatApp {
    pub deck: CardDeck,
    pub composer: Composer,
    pub scroll: ScrollState,
    pub theme: Theme,
    pub model: String,
    pub status: Option<String>,
    pub spinner_tick: usize,
    backend: Box<dyn ConversationBackend>,
    renderers: Renderers,
}

impl ChatApp {
    pub fn new(
        backend: Box<dyn ConversationBackend>,
        renderers: Renderers,
        theme: Theme,
        model: String,
        dictation_available: bool,
    ) -> Self {
        Self {
            deck: CardDeck::new(),
            composer: Composer::new(dictation_available),
            scroll: ScrollState::default(),
            theme,
            model,
            status: None,
            spinner_tick: 0,
            backend,
            renderers,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> KeyAction {
        if key.kind != KeyEventKind::Press {
            return KeyAction::Nothing;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && key.code == KeyCode::Char('c') {
            return KeyAction::Quit;
        }

        // An alert blocks everything until acknowledged.
        if self.composer.alert().is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.composer.dismiss_alert();
            }
            return KeyAction::Nothing;
        }

        match key.code {
            KeyCode::Esc => {
                if self.composer.capturing().is_some() {
                    KeyAction::CancelCapture
                } else if self.composer.is_generating() {
                    KeyAction::Stop
                } else {
                    KeyAction::Nothing
                }
            }
            KeyCode::Enter
                if key
                    .modifiers
                    .intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) =>
            {
                self.composer.textarea_mut().insert_newline();
                KeyAction::Nothing
            }
            KeyCode::Enter => KeyAction::Submit,
            KeyCode::Char('y') if ctrl => KeyAction::CopyCode,
            KeyCode::Char('o') if ctrl => KeyAction::Capture(CaptureKind::Camera),
            KeyCode::Char('l') if ctrl => {
                if self.composer.dictation_available() {
                    KeyAction::Capture(CaptureKind::Dictation)
                } else {
                    KeyAction::Nothing
                }
            }
            KeyCode::Char('x') if ctrl => {
                if self.composer.clear_image().is_some() {
                    self.status = Some("Image removed".to_string());
                }
                KeyAction::Nothing
            }
            KeyCode::PageUp => {
                self.scroll.scroll_up(SCROLL_PAGE);
                KeyAction::Nothing
            }
            KeyCode::PageDown => {
                self.scroll.scroll_down(SCROLL_PAGE);
                KeyAction::Nothing
            }
            _ => {
                self.composer.textarea_mut().input(key);
                KeyAction::Nothing
            }
        }
    }

    /// Pasted `data:image/...` URIs become the pending image; anything else
    /// is typed into the composer.
    pub fn handle_paste(&mut self, text: &str) {
        if self.composer.alert().is_some() {
            return;
        }
        let trimmed = text.trim();
        if trimmed.starts_with("data:image/") {
            self.attach_image_source(trimmed);
        } else {
            self.composer.textarea_mut().insert_str(text);
        }
    }

    /// Act on the composed input: run a slash command, or start a turn.
    pub fn submit(&mut self) -> Option<ActiveTurn> {
        if self.composer.is_generating() {
            return None;
        }
        let text = self.composer.text();
        if let Some(command) = parse_command(&text) {
            match command {
                ChatCommand::NewChat => self.new_chat(),
                ChatCommand::AttachImage(source) => self.attach_image_source(source),
                ChatCommand::Help => self.status = Some(HELP_TEXT.to_string()),
                ChatCommand::Unknown(input) => {
                    self.status = Some(format!("Unknown command: {input}"));
                    return None;
                }
            }
            self.composer.set_text("");
            return None;
        }

        let turn = self.composer.take_submission()?;
        self.deck.push(CardBody::User {
            text: turn.text.clone().unwrap_or_default(),
            image_mime: turn.image.as_ref().map(|image| image.mime_type.clone()),
        });
        self.status = None;
        self.scroll.follow();

        let stream = self.backend.submit_turn(turn);
        Some(ActiveTurn::start(
            stream,
            self.renderers.clone(),
            CancellationToken::new(),
            &mut self.deck,
        ))
    }

    /// Feed one stream item to the turn, returning it if still running.
    pub fn advance_turn(
        &mut self,
        turn: ActiveTurn,
        item: Option<Result<ResponseFragment, TurnError>>,
    ) -> Option<ActiveTurn> {
        match turn.handle(item, &mut self.deck) {
            TurnStep::Continue(turn) => Some(turn),
            TurnStep::Ended(end) => {
                self.finish_turn(end);
                None
            }
        }
    }

    pub fn stop_turn(&mut self, turn: ActiveTurn) {
        info!("stop requested");
        let end = turn.stop(&mut self.deck);
        self.finish_turn(end);
    }

    fn finish_turn(&mut self, end: TurnEnd) {
        self.composer.end_generation();
        self.status = match end {
            TurnEnd::Stopped(_) => Some("Stopped".to_string()),
            TurnEnd::Completed(_) | TurnEnd::Failed { .. } => None,
        };
    }

    pub fn copy_latest_code(&mut self, now: Instant) {
        let Some(code) = self.deck.latest_code() else {
            self.status = Some("No code to copy".to_string());
            return;
        };
        match copy_to_clipboard(code) {
            Ok(()) => self.composer.note_copied(now),
            Err(err) => {
                warn!(error = %err, "clipboard copy failed");
                self.status = Some(err);
            }
        }
    }

    pub fn new_chat(&mut self) {
        if self.composer.is_generating() {
            return;
        }
        self.backend = self.backend.fresh();
        self.deck.clear();
        self.composer.clear_image();
        self.scroll.follow();
        self.status = Some("New chat".to_string());
        debug!("conversation reset");
    }

    /// Attach an image given either as a `data:` URI or as a file path.
    pub fn attach_image_source(&mut self, source: &str) {
        let loaded = if source.starts_with("data:") {
            ImageData::from_data_uri(source)
        } else {
            ImageData::from_path(Path::new(source))
        };
        match loaded {
            Ok(image) => self.attach_image(image),
            Err(err) => self.composer.raise_alert(err.to_string()),
        }
    }

    fn attach_image(&mut self, image: ImageData) {
        let kib = image.approx_bytes().div_ceil(1024);
        let replaced = self.composer.attach_image(image).is_some();
        self.status = Some(if replaced {
            format!("Image replaced ({kib} KiB)")
        } else {
            format!("Image attached ({kib} KiB)")
        });
    }

    /// Camera frames arrive as data URIs.
    pub fn on_camera_result(&mut self, result: Result<String, CaptureError>) {
        self.composer.end_capture();
        let image = result
            .and_then(|uri| ImageData::from_data_uri(&uri).map_err(CaptureError::Image));
        match image {
            Ok(image) => self.attach_image(image),
            Err(err) => {
                warn!(error = %err, "camera capture failed");
                self.status = None;
                self.composer.raise_alert(format!("Camera unavailable: {err}"));
            }
        }
    }

    /// Recognition problems never reach the user as alerts; the control
    /// simply resets.
    pub fn on_dictation_result(&mut self, result: Result<String, CaptureError>) {
        self.composer.end_capture();
        self.status = None;
        match result {
            Ok(text) => self.composer.insert_dictation(&text),
            Err(err) => warn!(error = %err, "dictation failed"),
        }
    }

    pub fn cancel_capture(&mut self) {
        self.composer.end_capture();
        self.status = Some("Capture cancelled".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cards::CardKind;
    use crate::core::image::ImageError;
    use crate::core::render::testing::renderers;
    use crate::core::session::{FragmentStream, UserTurn};
    use futures_util::stream::{self, StreamExt};
    use std::sync::{Arc, Mutex};

    /// Replays canned fragments and records what was submitted.
    struct ScriptedBackend {
        replies: Vec<ResponseFragment>,
        submitted: Arc<Mutex<Vec<UserTurn>>>,
    }

    impl ConversationBackend for ScriptedBackend {
        fn submit_turn(&mut self, turn: UserTurn) -> FragmentStream {
            self.submitted.lock().expect("lock").push(turn);
            stream::iter(self.replies.clone().into_iter().map(Ok)).boxed()
        }

        fn fresh(&self) -> Box<dyn ConversationBackend> {
            Box::new(ScriptedBackend {
                replies: self.replies.clone(),
                submitted: self.submitted.clone(),
            })
        }
    }

    fn app(replies: Vec<ResponseFragment>) -> (ChatApp, Arc<Mutex<Vec<UserTurn>>>) {
        let submitted = Arc::new(Mutex::new(Vec::new()));
        let backend = ScriptedBackend {
            replies,
            submitted: submitted.clone(),
        };
        let (renderers, _) = renderers();
        (
            ChatApp::new(
                Box::new(backend),
                renderers,
                Theme::dark_default(),
                "test-model".into(),
                false,
            ),
            submitted,
        )
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    async fn drive(app: &mut ChatApp, mut turn: ActiveTurn) {
        loop {
            let item = turn.next_item().await;
            match app.advance_turn(turn, item) {
                Some(next) => turn = next,
                None => break,
            }
        }
    }

    #[test]
    fn parses_slash_commands() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command(" /new "), Some(ChatCommand::NewChat));
        assert_eq!(
            parse_command("/image ~/cat.png"),
            Some(ChatCommand::AttachImage("~/cat.png"))
        );
        assert_eq!(parse_command("/image"), Some(ChatCommand::Unknown("/image")));
        assert_eq!(parse_command("/help"), Some(ChatCommand::Help));
    }

    #[tokio::test]
    async fn submitting_runs_a_turn_and_resets_generation() {
        let (mut app, submitted) = app(vec![
            ResponseFragment::text("Sure. Language: python\n"),
            ResponseFragment::executable_code("print(2)"),
            ResponseFragment::execution_result("2\n"),
        ]);
        app.composer.set_text("add one and one");
        assert_eq!(app.handle_key(key(KeyCode::Enter)), KeyAction::Submit);

        let turn = app.submit().expect("turn");
        assert!(app.composer.is_generating());
        assert_eq!(app.deck.count(CardKind::Thinking), 1);
        // a second submit while generating does nothing
        assert!(app.submit().is_none());

        drive(&mut app, turn).await;
        assert!(!app.composer.is_generating());
        let kinds: Vec<_> = app.deck.cards().iter().map(|c| c.body.kind()).collect();
        assert_eq!(
            kinds,
            vec![CardKind::User, CardKind::Text, CardKind::Code, CardKind::Result]
        );
        assert_eq!(
            submitted.lock().expect("lock")[0].text.as_deref(),
            Some("add one and one")
        );
    }

    #[tokio::test]
    async fn escape_stops_a_running_turn() {
        let (mut app, _) = app(vec![ResponseFragment::text("partial")]);
        app.composer.set_text("go");
        let turn = app.submit().expect("turn");
        assert_eq!(app.handle_key(key(KeyCode::Esc)), KeyAction::Stop);
        app.stop_turn(turn);
        assert!(!app.composer.is_generating());
        assert_eq!(app.status.as_deref(), Some("Stopped"));
        assert_eq!(app.deck.count(CardKind::NoOutput), 1);
    }

    #[test]
    fn alert_blocks_input_until_dismissed() {
        let (mut app, _) = app(Vec::new());
        app.on_camera_result(Err(CaptureError::TimedOut {
            program: "cam".into(),
        }));
        assert!(app.composer.alert().is_some());
        assert_eq!(app.handle_key(key(KeyCode::Char('a'))), KeyAction::Nothing);
        assert_eq!(app.composer.text(), "");
        app.handle_key(key(KeyCode::Esc));
        assert!(app.composer.alert().is_none());
        app.handle_key(key(KeyCode::Char('a')));
        assert_eq!(app.composer.text(), "a");
    }

    #[test]
    fn dictation_failures_are_swallowed() {
        let (mut app, _) = app(Vec::new());
        app.on_dictation_result(Err(CaptureError::NoSpeech));
        assert!(app.composer.alert().is_none());
        assert_eq!(app.composer.capturing(), None);
    }

    #[test]
    fn dictation_key_is_inert_when_unavailable() {
        let (mut app, _) = app(Vec::new());
        assert_eq!(app.handle_key(ctrl('l')), KeyAction::Nothing);
        assert_eq!(
            app.handle_key(ctrl('o')),
            KeyAction::Capture(CaptureKind::Camera)
        );
    }

    #[test]
    fn alt_enter_inserts_a_newline() {
        let (mut app, _) = app(Vec::new());
        app.handle_key(key(KeyCode::Char('a')));
        app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT));
        app.handle_key(key(KeyCode::Char('b')));
        assert_eq!(app.composer.text(), "a\nb");
    }

    #[test]
    fn new_chat_command_clears_the_deck() {
        let (mut app, _) = app(Vec::new());
        app.deck.push(CardBody::NoOutput);
        app.composer.set_text("/new");
        assert!(app.submit().is_none());
        assert!(app.deck.is_empty());
        assert_eq!(app.composer.text(), "");
    }

    #[test]
    fn image_command_attaches_and_replaces() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("shot.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\n").expect("write");

        let (mut app, _) = app(Vec::new());
        app.composer.set_text(&format!("/image {}", path.display()));
        assert!(app.submit().is_none());
        assert_eq!(
            app.composer.pending_image().map(|i| i.mime_type.as_str()),
            Some("image/png")
        );
        app.attach_image_source(&path.display().to_string());
        assert!(app
            .status
            .as_deref()
            .is_some_and(|s| s.starts_with("Image replaced")));
    }

    #[test]
    fn missing_image_file_raises_an_alert() {
        let (mut app, _) = app(Vec::new());
        app.attach_image_source("/definitely/not/here.png");
        assert!(app.composer.alert().is_some());
        assert!(app.composer.pending_image().is_none());
    }

    #[test]
    fn image_command_accepts_a_data_uri() {
        let (mut app, _) = app(Vec::new());
        app.composer.set_text("/image data:image/jpeg;base64,/9j/");
        assert!(app.submit().is_none());
        let image = app.composer.pending_image().expect("attached");
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.base64, "/9j/");
        assert_eq!(app.composer.text(), "");
    }

    #[test]
    fn pasted_data_uri_becomes_the_pending_image() {
        let (mut app, _) = app(Vec::new());
        app.handle_paste("  data:image/png;base64,iVBORw0KGgo=\n");
        assert_eq!(
            app.composer.pending_image().map(|i| i.base64.as_str()),
            Some("iVBORw0KGgo=")
        );
        assert_eq!(app.composer.text(), "");

        app.handle_paste("plain words");
        assert_eq!(app.composer.text(), "plain words");
    }

    #[test]
    fn malformed_data_uri_raises_an_alert() {
        let (mut app, _) = app(Vec::new());
        app.handle_paste("data:image/png,not-base64");
        assert_eq!(
            app.composer.alert(),
            Some(ImageError::MalformedDataUri.to_string().as_str())
        );
        assert!(app.composer.pending_image().is_none());
        assert_eq!(app.composer.text(), "");
    }

    #[test]
    fn camera_frame_is_decoded_from_its_data_uri() {
        let (mut app, _) = app(Vec::new());
        assert!(app.composer.begin_capture(CaptureKind::Camera));
        app.on_camera_result(Ok("data:image/png;base64,iVBORw0KGgo=".into()));
        assert_eq!(app.composer.capturing(), None);
        assert_eq!(
            app.composer.pending_image().map(|i| i.mime_type.as_str()),
            Some("image/png")
        );

        app.on_camera_result(Ok("garbage".into()));
        assert!(app
            .composer
            .alert()
            .is_some_and(|msg| msg.starts_with("Camera unavailable")));
    }
}
