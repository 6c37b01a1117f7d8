//! Lifecycle of one assistant turn around the stream interpreter.

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::cards::{CardBody, CardDeck, CardId, DeckMark};
use crate::core::error::TurnError;
use crate::core::fragment::ResponseFragment;
use crate::core::interpreter::{StreamInterpreter, TurnOutcome};
use crate::core::markers::strip_error_code_prefix;
use crate::core::render::Renderers;
use crate::core::session::FragmentStream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEnd {
    Completed(TurnOutcome),
    Stopped(TurnOutcome),
    Failed { message: String },
}

pub enum TurnStep {
    Continue(ActiveTurn),
    Ended(TurnEnd),
}

/// A turn whose response is still streaming.
///
/// The turn shows a thinking placeholder until the first fragment arrives,
/// feeds fragments to its interpreter, and on failure replaces everything it
/// added to the deck with a single error card.
pub struct ActiveTurn {
    stream: FragmentStream,
    interpreter: StreamInterpreter,
    cancel: CancellationToken,
    thinking: Option<CardId>,
    mark: DeckMark,
    fragments: usize,
}

impl ActiveTurn {
    pub fn start(
        stream: FragmentStream,
        renderers: Renderers,
        cancel: CancellationToken,
        deck: &mut CardDeck,
    ) -> Self {
        let mark = deck.mark();
        let thinking = Some(deck.push(CardBody::Thinking));
        debug!("turn started");
        Self {
            stream,
            interpreter: StreamInterpreter::new(renderers),
            cancel,
            thinking,
            mark,
            fragments: 0,
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the next stream item. Safe to drop mid-wait, so it can sit
    /// in a `select!` next to terminal input.
    pub async fn next_item(&mut self) -> Option<Result<ResponseFragment, TurnError>> {
        self.stream.next().await
    }

    pub fn handle(
        mut self,
        item: Option<Result<ResponseFragment, TurnError>>,
        deck: &mut CardDeck,
    ) -> TurnStep {
        match item {
            Some(Ok(fragment)) => {
                self.fragments += 1;
                if let Some(id) = self.thinking.take() {
                    deck.remove(id);
                }
                match self.interpreter.apply(&fragment, deck) {
                    Ok(()) => TurnStep::Continue(self),
                    Err(err) => TurnStep::Ended(self.fail(TurnError::Render(err), deck)),
                }
            }
            Some(Err(err)) => TurnStep::Ended(self.fail(err, deck)),
            None => TurnStep::Ended(self.conclude(false, deck)),
        }
    }

    /// End the turn now, keeping whatever was already applied.
    pub fn stop(self, deck: &mut CardDeck) -> TurnEnd {
        self.cancel.cancel();
        self.conclude(true, deck)
    }

    /// Drive the turn to its end. The stop flag is checked before every
    /// read, so once it is set no further fragment is applied.
    pub async fn run(mut self, deck: &mut CardDeck) -> TurnEnd {
        loop {
            if self.is_stopped() {
                return self.conclude(true, deck);
            }
            let item = self.next_item().await;
            match self.handle(item, deck) {
                TurnStep::Continue(turn) => self = turn,
                TurnStep::Ended(end) => return end,
            }
        }
    }

    fn conclude(mut self, stopped: bool, deck: &mut CardDeck) -> TurnEnd {
        if let Some(id) = self.thinking.take() {
            deck.remove(id);
        }
        let fragments = self.fragments;
        let mark = self.mark;
        match self.interpreter.finish(deck) {
            Ok(outcome) => {
                info!(
                    fragments,
                    cards = outcome.cards_created,
                    stopped,
                    "turn finished"
                );
                if stopped {
                    TurnEnd::Stopped(outcome)
                } else {
                    TurnEnd::Completed(outcome)
                }
            }
            Err(err) => fail_at(mark, TurnError::Render(err), deck),
        }
    }

    fn fail(self, err: TurnError, deck: &mut CardDeck) -> TurnEnd {
        fail_at(self.mark, err, deck)
    }
}

fn fail_at(mark: DeckMark, err: TurnError, deck: &mut CardDeck) -> TurnEnd {
    warn!(error = %err, "turn failed");
    let message = strip_error_code_prefix(&err.to_string());
    deck.truncate(mark);
    deck.push(CardBody::Error {
        message: message.clone(),
    });
    TurnEnd::Failed { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cards::CardKind;
    use crate::core::render::testing::{renderers, FailingMarkdown, RecordingHighlighter};
    use futures_util::stream;
    use std::sync::Arc;

    fn user_deck() -> CardDeck {
        let mut deck = CardDeck::new();
        deck.push(CardBody::User {
            text: "question".into(),
            image_mime: None,
        });
        deck
    }

    fn boxed(items: Vec<Result<ResponseFragment, TurnError>>) -> FragmentStream {
        stream::iter(items).boxed()
    }

    #[test]
    fn thinking_placeholder_shows_until_first_fragment() {
        let mut deck = user_deck();
        let (renderers, _) = renderers();
        let turn = ActiveTurn::start(
            boxed(Vec::new()),
            renderers,
            CancellationToken::new(),
            &mut deck,
        );
        assert_eq!(deck.count(CardKind::Thinking), 1);

        let turn = match turn.handle(Some(Ok(ResponseFragment::text("hi"))), &mut deck) {
            TurnStep::Continue(turn) => turn,
            TurnStep::Ended(end) => panic!("unexpected end {end:?}"),
        };
        assert_eq!(deck.count(CardKind::Thinking), 0);

        let turn = match turn.handle(Some(Ok(ResponseFragment::text(" there"))), &mut deck) {
            TurnStep::Continue(turn) => turn,
            TurnStep::Ended(end) => panic!("unexpected end {end:?}"),
        };
        assert_eq!(deck.count(CardKind::Text), 1);
        drop(turn);
    }

    #[tokio::test]
    async fn empty_stream_leaves_exactly_one_no_output_card() {
        let mut deck = user_deck();
        let mark = deck.mark();
        let (renderers, _) = renderers();
        let turn = ActiveTurn::start(
            boxed(Vec::new()),
            renderers,
            CancellationToken::new(),
            &mut deck,
        );
        let end = turn.run(&mut deck).await;

        assert!(matches!(end, TurnEnd::Completed(ref o) if o.no_output));
        let cards = deck.since(mark);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].body, CardBody::NoOutput);
    }

    #[tokio::test]
    async fn mid_stream_failure_leaves_one_error_card_without_prefix() {
        let mut deck = user_deck();
        let mark = deck.mark();
        let (renderers, _) = renderers();
        let turn = ActiveTurn::start(
            boxed(vec![
                Ok(ResponseFragment::text("partial answer")),
                Ok(ResponseFragment::executable_code("print(1)")),
                Err(TurnError::Api {
                    status: 503,
                    message: "The model is overloaded.".into(),
                }),
            ]),
            renderers,
            CancellationToken::new(),
            &mut deck,
        );
        let end = turn.run(&mut deck).await;

        assert_eq!(
            end,
            TurnEnd::Failed {
                message: "The model is overloaded.".into()
            }
        );
        let cards = deck.since(mark);
        assert_eq!(cards.len(), 1);
        assert_eq!(
            cards[0].body,
            CardBody::Error {
                message: "The model is overloaded.".into()
            }
        );
        assert_eq!(deck.count(CardKind::User), 1);
    }

    #[tokio::test]
    async fn render_failure_ends_turn_with_error_card() {
        let mut deck = user_deck();
        let renderers = Renderers::new(
            Arc::new(FailingMarkdown),
            Arc::new(RecordingHighlighter::default()),
        );
        let turn = ActiveTurn::start(
            boxed(vec![Ok(ResponseFragment::text("!boom"))]),
            renderers,
            CancellationToken::new(),
            &mut deck,
        );
        let end = turn.run(&mut deck).await;
        assert!(matches!(end, TurnEnd::Failed { .. }));
        assert_eq!(deck.count(CardKind::Error), 1);
        assert_eq!(deck.count(CardKind::Text), 0);
    }

    #[tokio::test]
    async fn stop_before_reading_applies_nothing_further() {
        let mut deck = user_deck();
        let mark = deck.mark();
        let (renderers, highlighter) = renderers();
        let cancel = CancellationToken::new();
        let turn = ActiveTurn::start(
            boxed(vec![
                Ok(ResponseFragment::executable_code("print(1)")),
                Ok(ResponseFragment::text("never shown")),
            ]),
            renderers,
            cancel.clone(),
            &mut deck,
        );

        let mut turn = turn;
        let item = turn.next_item().await;
        let turn = match turn.handle(item, &mut deck) {
            TurnStep::Continue(turn) => turn,
            TurnStep::Ended(end) => panic!("unexpected end {end:?}"),
        };
        cancel.cancel();
        let end = turn.run(&mut deck).await;

        assert!(matches!(end, TurnEnd::Stopped(_)));
        let kinds: Vec<_> = deck.since(mark).iter().map(|c| c.body.kind()).collect();
        assert_eq!(kinds, vec![CardKind::Code]);
        // the highlight pass still runs on stop
        assert_eq!(highlighter.calls().len(), 1);
    }

    #[tokio::test]
    async fn explicit_stop_finishes_immediately() {
        let mut deck = user_deck();
        let (renderers, _) = renderers();
        let turn = ActiveTurn::start(
            stream::pending().boxed(),
            renderers,
            CancellationToken::new(),
            &mut deck,
        );
        let token = turn.cancel_token().clone();
        let end = turn.stop(&mut deck);
        assert!(token.is_cancelled());
        assert!(matches!(end, TurnEnd::Stopped(ref o) if o.no_output));
        assert_eq!(deck.count(CardKind::Thinking), 0);
        assert_eq!(deck.count(CardKind::NoOutput), 1);
    }
}
