//! Multi-turn conversation context and the streaming backend call.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{Content, ErrorEnvelope, GenerateContentRequest, GenerateContentResponse, Part, Tool};
use crate::core::error::TurnError;
use crate::core::fragment::ResponseFragment;
use crate::core::image::ImageData;
use crate::core::sse::{SseDecoder, SseLine};

/// Standing instructions sent with every request of a session.
pub const SYSTEM_DIRECTIVE: &str = "\
You are a helpful assistant in a chat client that renders prose, code and \
execution results as separate cards.
- Explain what you are going to do before writing any code.
- Run Python only through the code execution tool. Show code in any other \
language as a plain fenced code block; never send it to the tool.
- Always put a line of the form `Language: <name>` immediately before a code \
block, naming the language of that block.
- When code was executed, report what the execution produced.";

pub type FragmentStream = BoxStream<'static, Result<ResponseFragment, TurnError>>;

/// A user submission. The caller guarantees at least one of the two is set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserTurn {
    pub text: Option<String>,
    pub image: Option<ImageData>,
}

impl UserTurn {
    /// Request parts in transmission order: image first, then text.
    pub fn into_parts(self) -> Vec<Part> {
        let mut parts = Vec::with_capacity(2);
        if let Some(image) = self.image {
            parts.push(Part::inline_data(image.mime_type, image.base64));
        }
        if let Some(text) = self.text {
            parts.push(Part::text(text));
        }
        parts
    }
}

/// Something that can carry a conversation turn to a model.
pub trait ConversationBackend: Send {
    /// Submit a turn and return its fragments. The stream is lazy: nothing
    /// is sent until it is first polled, and it can be consumed only once.
    fn submit_turn(&mut self, turn: UserTurn) -> FragmentStream;

    /// A new session with the same settings and no prior context.
    fn fresh(&self) -> Box<dyn ConversationBackend>;
}

#[derive(Clone, Debug)]
pub struct SessionParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl SessionParams {
    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

type History = Arc<Mutex<Vec<Content>>>;

pub struct ConversationSession {
    params: SessionParams,
    history: History,
}

impl ConversationSession {
    pub fn new(params: SessionParams) -> Self {
        Self {
            params,
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn history(&self) -> Vec<Content> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn model(&self) -> &str {
        &self.params.model
    }
}

impl ConversationBackend for ConversationSession {
    fn submit_turn(&mut self, turn: UserTurn) -> FragmentStream {
        let (pending, contents) = PendingTurn::begin(self.history.clone(), Content::user(turn.into_parts()));
        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::text(SYSTEM_DIRECTIVE)],
            }),
            tools: vec![Tool::code_execution()],
        };

        debug!(model = %self.params.model, turns = request.contents.len(), "submitting turn");
        let http_request = self
            .params
            .client
            .post(self.params.endpoint())
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.params.api_key)
            .json(&request);

        stream::unfold(
            StreamState::Connecting {
                request: http_request,
                pending,
            },
            advance,
        )
        .boxed()
    }

    fn fresh(&self) -> Box<dyn ConversationBackend> {
        Box::new(ConversationSession::new(self.params.clone()))
    }
}

/// The user's entry in the shared history while its reply is streaming.
///
/// The reply is recorded only when the stream completes. If the stream is
/// dropped first (stop, error), the user entry is removed again so the
/// history never holds a question without its answer.
struct PendingTurn {
    history: History,
    user_index: usize,
    model_parts: Vec<Part>,
    committed: bool,
}

impl PendingTurn {
    fn begin(history: History, user: Content) -> (Self, Vec<Content>) {
        let (user_index, contents) = {
            let mut guard = history.lock().unwrap_or_else(PoisonError::into_inner);
            let index = guard.len();
            guard.push(user);
            (index, guard.clone())
        };
        (
            Self {
                history,
                user_index,
                model_parts: Vec::new(),
                committed: false,
            },
            contents,
        )
    }

    fn record(&mut self, parts: &[Part]) {
        for part in parts {
            match (&part.text, self.model_parts.last_mut()) {
                (Some(text), Some(Part { text: Some(prev), .. })) => prev.push_str(text),
                _ => self.model_parts.push(part.clone()),
            }
        }
    }

    fn commit(&mut self) {
        if self.model_parts.is_empty() {
            return;
        }
        let parts = std::mem::take(&mut self.model_parts);
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Content::model(parts));
        self.committed = true;
    }
}

impl Drop for PendingTurn {
    fn drop(&mut self) {
        if !self.committed {
            self.history
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .truncate(self.user_index);
        }
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>;
type FragmentItem = Result<ResponseFragment, TurnError>;

enum StreamState {
    Connecting {
        request: reqwest::RequestBuilder,
        pending: PendingTurn,
    },
    Streaming {
        body: ByteStream,
        decoder: SseDecoder,
        queued: VecDeque<FragmentItem>,
        pending: PendingTurn,
        ended: bool,
    },
    Done,
}

fn api_error(status: u16, body: &str) -> TurnError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "<empty response>".to_string()
            } else {
                trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
            }
        });
    TurnError::Api { status, message }
}

/// Decode one `data:` payload into a fragment, an error, or nothing.
fn decode_payload(payload: &str, pending: &mut PendingTurn) -> Option<FragmentItem> {
    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(err) => return Some(Err(TurnError::Decode(err))),
    };

    if value.get("error").is_some() {
        let envelope: ErrorEnvelope = match serde_json::from_value(value) {
            Ok(envelope) => envelope,
            Err(err) => return Some(Err(TurnError::Decode(err))),
        };
        return Some(Err(TurnError::Api {
            status: envelope.error.code.unwrap_or(500),
            message: envelope.error.message,
        }));
    }

    let response: GenerateContentResponse = match serde_json::from_value(value) {
        Ok(response) => response,
        Err(err) => return Some(Err(TurnError::Decode(err))),
    };
    pending.record(response.parts());

    let fragment = ResponseFragment::from(&response);
    (!fragment.is_empty()).then_some(Ok(fragment))
}

fn queue_line(line: SseLine, pending: &mut PendingTurn, queued: &mut VecDeque<FragmentItem>) {
    match line {
        SseLine::Data(payload) => {
            if let Some(item) = decode_payload(&payload, pending) {
                queued.push_back(item);
            }
        }
        SseLine::InvalidUtf8 => warn!("skipping stream line with invalid UTF-8"),
    }
}

async fn advance(mut state: StreamState) -> Option<(FragmentItem, StreamState)> {
    loop {
        state = match state {
            StreamState::Done => return None,
            StreamState::Connecting { request, pending } => {
                let response = match request.send().await {
                    Ok(response) => response,
                    Err(err) => return Some((Err(err.into()), StreamState::Done)),
                };
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Some((Err(api_error(status.as_u16(), &body)), StreamState::Done));
                }
                StreamState::Streaming {
                    body: response
                        .bytes_stream()
                        .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                        .boxed(),
                    decoder: SseDecoder::new(),
                    queued: VecDeque::new(),
                    pending,
                    ended: false,
                }
            }
            StreamState::Streaming {
                mut body,
                mut decoder,
                mut queued,
                mut pending,
                ended,
            } => {
                if let Some(item) = queued.pop_front() {
                    let next = if item.is_err() {
                        StreamState::Done
                    } else {
                        StreamState::Streaming {
                            body,
                            decoder,
                            queued,
                            pending,
                            ended,
                        }
                    };
                    return Some((item, next));
                }

                if ended {
                    pending.commit();
                    debug!("turn stream completed");
                    return None;
                }

                match body.next().await {
                    Some(Ok(chunk)) => {
                        for line in decoder.push(&chunk) {
                            queue_line(line, &mut pending, &mut queued);
                        }
                        StreamState::Streaming {
                            body,
                            decoder,
                            queued,
                            pending,
                            ended: false,
                        }
                    }
                    Some(Err(err)) => return Some((Err(err.into()), StreamState::Done)),
                    None => {
                        if let Some(line) = decoder.finish() {
                            queue_line(line, &mut pending, &mut queued);
                        }
                        StreamState::Streaming {
                            body,
                            decoder,
                            queued,
                            pending,
                            ended: true,
                        }
                    }
                }
            }
        };
    }
}
