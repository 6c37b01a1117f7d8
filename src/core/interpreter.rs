//! Turns the fragment feed of one assistant turn into cards.
//!
//! Each fragment is split into four channels (prose, tool invocations,
//! committed code, execution result). Every channel upserts at most one card
//! per turn, so fragments can arrive in any mix and order without producing
//! duplicate cards.

use std::ops::Range;

use tracing::debug;

use crate::core::cards::{CardBody, CardDeck, CardId};
use crate::core::fragment::{ResponseFragment, ToolInvocation};
use crate::core::markers::{find_language_marker, without_span};
use crate::core::render::{RenderError, Renderers};

/// Label used for code when the model never announced a language. The
/// execution channel only runs Python.
pub const FALLBACK_LANGUAGE: &str = "python";

/// Tool calls are always previewed as Python: the system directive routes
/// nothing else through the execution channel.
pub const TOOL_CALL_LANGUAGE: &str = "python";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TurnCards {
    pub text: Option<CardId>,
    pub tool_call: Option<CardId>,
    pub code: Option<CardId>,
    pub result: Option<CardId>,
}

/// Per-turn state. Created when the turn starts and dropped with it.
#[derive(Debug, Clone)]
pub struct InterpreterState {
    accumulated_text: String,
    language_marker: Option<Range<usize>>,
    detected_language: String,
    cards: TurnCards,
    highlight_queue: Vec<CardId>,
    cards_created: usize,
}

impl Default for InterpreterState {
    fn default() -> Self {
        Self {
            accumulated_text: String::new(),
            language_marker: None,
            detected_language: FALLBACK_LANGUAGE.to_string(),
            cards: TurnCards::default(),
            highlight_queue: Vec::new(),
            cards_created: 0,
        }
    }
}

impl InterpreterState {
    /// Every text delta seen so far, marker included.
    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    /// The prose as displayed: accumulated text minus the consumed marker.
    pub fn display_text(&self) -> String {
        match &self.language_marker {
            Some(span) => without_span(&self.accumulated_text, span),
            None => self.accumulated_text.clone(),
        }
    }

    pub fn detected_language(&self) -> &str {
        &self.detected_language
    }

    pub fn cards(&self) -> &TurnCards {
        &self.cards
    }

    pub fn highlight_queue(&self) -> &[CardId] {
        &self.highlight_queue
    }

    /// Consume the first marker, if one is present. Returns whether a
    /// marker was consumed by this call.
    fn detect_language(&mut self, complete: bool) -> bool {
        if self.language_marker.is_some() {
            return false;
        }
        match find_language_marker(&self.accumulated_text, complete) {
            Some(marker) => {
                debug!(language = %marker.language, "language marker detected");
                self.detected_language = marker.language;
                self.language_marker = Some(marker.span);
                true
            }
            None => false,
        }
    }
}

/// Summary of a finished turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub cards_created: usize,
    pub language: String,
    pub highlighted: usize,
    pub no_output: bool,
}

pub struct StreamInterpreter {
    renderers: Renderers,
    state: InterpreterState,
}

/// Return the body behind `slot`, creating the card first if the slot is
/// empty or its card has gone away.
fn upsert<'d>(
    deck: &'d mut CardDeck,
    slot: &mut Option<CardId>,
    created: &mut usize,
    make: impl FnOnce() -> CardBody,
) -> Option<&'d mut CardBody> {
    let id = match *slot {
        Some(id) if deck.get(id).is_some() => id,
        _ => {
            let id = deck.push(make());
            *slot = Some(id);
            *created += 1;
            id
        }
    };
    deck.body_mut(id)
}

impl StreamInterpreter {
    pub fn new(renderers: Renderers) -> Self {
        Self {
            renderers,
            state: InterpreterState::default(),
        }
    }

    pub fn state(&self) -> &InterpreterState {
        &self.state
    }

    /// Apply one fragment. Render failures propagate to the caller, which
    /// ends the turn.
    pub fn apply(
        &mut self,
        fragment: &ResponseFragment,
        deck: &mut CardDeck,
    ) -> Result<(), RenderError> {
        if let Some(delta) = &fragment.text_delta {
            self.apply_text(delta, deck)?;
        }
        if let Some(invocations) = fragment
            .tool_invocations
            .as_deref()
            .filter(|invocations| !invocations.is_empty())
        {
            self.apply_tool_invocations(invocations, deck);
        }
        if let Some(code) = &fragment.executable_code {
            self.apply_executable_code(code, deck);
        }
        if let Some(output) = &fragment.execution_result {
            self.apply_result(output, deck);
        }
        Ok(())
    }

    fn apply_text(&mut self, delta: &str, deck: &mut CardDeck) -> Result<(), RenderError> {
        self.state.accumulated_text.push_str(delta);
        self.state.detect_language(false);
        self.render_text(deck)
    }

    fn render_text(&mut self, deck: &mut CardDeck) -> Result<(), RenderError> {
        let source = self.state.display_text();
        let rendered = self.renderers.markdown.render(&source)?;

        let state = &mut self.state;
        if let Some(CardBody::Text { source: s, markup }) = upsert(
            deck,
            &mut state.cards.text,
            &mut state.cards_created,
            || CardBody::Text {
                source: String::new(),
                markup: Vec::new(),
            },
        ) {
            *s = source;
            *markup = rendered;
        }
        Ok(())
    }

    fn apply_tool_invocations(&mut self, invocations: &[ToolInvocation], deck: &mut CardDeck) {
        let code: String = invocations
            .iter()
            .map(|invocation| invocation.code.as_deref().unwrap_or(""))
            .collect();

        let state = &mut self.state;
        if let Some(CardBody::ToolCall { preview, .. }) = upsert(
            deck,
            &mut state.cards.tool_call,
            &mut state.cards_created,
            || CardBody::ToolCall {
                language: TOOL_CALL_LANGUAGE.to_string(),
                preview: String::new(),
            },
        ) {
            preview.push_str(&code);
        }
    }

    fn apply_executable_code(&mut self, code: &str, deck: &mut CardDeck) {
        let state = &mut self.state;
        if let Some(id) = state.cards.tool_call.take() {
            deck.remove(id);
        }

        let language = state.detected_language.clone();
        if let Some(CardBody::Code {
            language: label,
            code: current,
            highlighted,
        }) = upsert(
            deck,
            &mut state.cards.code,
            &mut state.cards_created,
            || CardBody::Code {
                language: language.clone(),
                code: String::new(),
                highlighted: None,
            },
        ) {
            *label = language;
            if current != code {
                *current = code.to_string();
                *highlighted = None;
            }
        }

        if let Some(id) = state.cards.code {
            if !state.highlight_queue.contains(&id) {
                state.highlight_queue.push(id);
            }
        }
    }

    fn apply_result(&mut self, output: &str, deck: &mut CardDeck) {
        let state = &mut self.state;
        if let Some(CardBody::Result { output: current }) = upsert(
            deck,
            &mut state.cards.result,
            &mut state.cards_created,
            || CardBody::Result {
                output: String::new(),
            },
        ) {
            *current = output.to_string();
        }
    }

    /// Close the turn: consume a marker that ended the text, run the
    /// highlight pass once over every registered code card, and leave a
    /// placeholder when the model produced nothing.
    pub fn finish(mut self, deck: &mut CardDeck) -> Result<TurnOutcome, RenderError> {
        if self.state.detect_language(true) {
            if self.state.cards.text.is_some() {
                self.render_text(deck)?;
            }
            if let Some(CardBody::Code { language, .. }) =
                self.state.cards.code.and_then(|id| deck.body_mut(id))
            {
                *language = self.state.detected_language.clone();
            }
        }

        let mut highlighted = 0;
        for id in std::mem::take(&mut self.state.highlight_queue) {
            if let Some(CardBody::Code {
                language,
                code,
                highlighted: slot,
            }) = deck.body_mut(id)
            {
                *slot = self.renderers.highlighter.highlight(language, code);
                highlighted += 1;
            }
        }

        let no_output = self.state.cards_created == 0;
        if no_output {
            deck.push(CardBody::NoOutput);
        }

        Ok(TurnOutcome {
            cards_created: self.state.cards_created,
            language: self.state.detected_language,
            highlighted,
            no_output,
        })
    }
}
