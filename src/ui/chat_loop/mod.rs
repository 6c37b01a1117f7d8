//! Main chat event loop.
//!
//! Terminal input, the streaming turn, capture tasks and a redraw tick are
//! multiplexed with `tokio::select!`. Each wake-up is turned into a
//! [`LoopEvent`] first and handled afterwards, so the handlers are free to
//! replace the turn or capture slots.

mod lifecycle;
mod state;

pub use self::state::{ChatApp, KeyAction};

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::crossterm::event::{self, Event};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

use self::lifecycle::{restore_terminal, setup_terminal};
use crate::core::controller::CaptureKind;
use crate::core::error::TurnError;
use crate::core::fragment::ResponseFragment;
use crate::core::media::{CaptureDevice, CaptureError, SpeechRecognizer};
use crate::core::turn::ActiveTurn;
use crate::ui::renderer::ui;

const TICK: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub enum UiEvent {
    Crossterm(Event),
}

/// External programs behind the camera and dictation controls.
#[derive(Clone, Default)]
pub struct CaptureDevices {
    pub camera: Option<Arc<dyn CaptureDevice>>,
    pub dictation: Option<Arc<dyn SpeechRecognizer>>,
}

#[derive(Debug)]
enum CaptureOutcome {
    /// Camera frame as a `data:` URI.
    Image(Result<String, CaptureError>),
    Speech(Result<String, CaptureError>),
}

enum LoopEvent {
    Terminal(Event),
    Turn(Option<Result<ResponseFragment, TurnError>>),
    Capture(Result<CaptureOutcome, JoinError>),
    Tick,
    InputClosed,
}

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<UiEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(UiEvent::Crossterm(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        continue;
                    }
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

async fn next_turn_item(
    turn: &mut Option<ActiveTurn>,
) -> Option<Result<ResponseFragment, TurnError>> {
    match turn {
        Some(turn) => turn.next_item().await,
        None => std::future::pending().await,
    }
}

async fn capture_finished(
    task: &mut Option<JoinHandle<CaptureOutcome>>,
) -> Result<CaptureOutcome, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

/// Start a capture for `kind`, or explain why it cannot run.
fn start_capture(
    app: &mut ChatApp,
    devices: &CaptureDevices,
    kind: CaptureKind,
) -> Option<JoinHandle<CaptureOutcome>> {
    match kind {
        CaptureKind::Camera => {
            let Some(camera) = devices.camera.clone() else {
                app.composer
                    .raise_alert("No camera is configured. Set camera_command in config.toml.");
                return None;
            };
            if !app.composer.begin_capture(kind) {
                return None;
            }
            debug!("camera capture started");
            Some(tokio::spawn(async move {
                let frame = camera.capture_image().await;
                CaptureOutcome::Image(frame.map(|image| image.to_data_uri()))
            }))
        }
        CaptureKind::Dictation => {
            let dictation = devices.dictation.clone()?;
            if !app.composer.begin_capture(kind) {
                return None;
            }
            debug!("dictation started");
            Some(tokio::spawn(async move {
                CaptureOutcome::Speech(dictation.listen().await)
            }))
        }
    }
}

fn finish_capture(app: &mut ChatApp, done: Result<CaptureOutcome, JoinError>) {
    match done {
        Ok(CaptureOutcome::Image(result)) => app.on_camera_result(result),
        Ok(CaptureOutcome::Speech(result)) => app.on_dictation_result(result),
        Err(err) => {
            if !err.is_cancelled() {
                warn!(error = %err, "capture task failed");
            }
            app.composer.end_capture();
        }
    }
}

pub async fn run_chat(mut app: ChatApp, devices: CaptureDevices) -> Result<(), Box<dyn Error>> {
    let mut terminal = setup_terminal()?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let event_reader_handle = spawn_event_reader(event_tx);

    let mut turn: Option<ActiveTurn> = None;
    let mut capture: Option<JoinHandle<CaptureOutcome>> = None;
    let mut ticker = tokio::time::interval(TICK);

    let result: Result<(), Box<dyn Error>> = 'main_loop: loop {
        if let Err(err) = terminal.draw(|f| ui(f, &mut app, Instant::now())) {
            break 'main_loop Err(err.into());
        }

        let loop_event = tokio::select! {
            ev = event_rx.recv() => match ev {
                Some(UiEvent::Crossterm(ev)) => LoopEvent::Terminal(ev),
                None => LoopEvent::InputClosed,
            },
            item = next_turn_item(&mut turn) => LoopEvent::Turn(item),
            done = capture_finished(&mut capture) => LoopEvent::Capture(done),
            _ = ticker.tick() => LoopEvent::Tick,
        };

        match loop_event {
            LoopEvent::Terminal(Event::Key(key)) => match app.handle_key(key) {
                KeyAction::Nothing => {}
                KeyAction::Quit => break 'main_loop Ok(()),
                KeyAction::Submit => {
                    if turn.is_none() {
                        turn = app.submit();
                    }
                }
                KeyAction::Stop => {
                    if let Some(active) = turn.take() {
                        app.stop_turn(active);
                    }
                }
                KeyAction::CopyCode => app.copy_latest_code(Instant::now()),
                KeyAction::Capture(kind) => {
                    if capture.is_none() {
                        capture = start_capture(&mut app, &devices, kind);
                    }
                }
                KeyAction::CancelCapture => {
                    if let Some(handle) = capture.take() {
                        handle.abort();
                    }
                    app.cancel_capture();
                }
            },
            LoopEvent::Terminal(Event::Paste(text)) => app.handle_paste(&text),
            LoopEvent::Terminal(_) => {}
            LoopEvent::Turn(item) => {
                if let Some(active) = turn.take() {
                    turn = app.advance_turn(active, item);
                }
            }
            LoopEvent::Capture(done) => {
                capture = None;
                finish_capture(&mut app, done);
            }
            LoopEvent::Tick => {
                if turn.is_some() || app.composer.capturing().is_some() {
                    app.spinner_tick = app.spinner_tick.wrapping_add(1);
                }
            }
            LoopEvent::InputClosed => break 'main_loop Ok(()),
        }
    };

    if let Some(handle) = capture.take() {
        handle.abort();
    }
    drop(turn);
    event_reader_handle.abort();
    restore_terminal(&mut terminal)?;
    result
}
