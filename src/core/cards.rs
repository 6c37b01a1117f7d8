use ratatui::text::Line;

pub type CardId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CardKind {
    User,
    Thinking,
    Text,
    ToolCall,
    Code,
    Result,
    NoOutput,
    Error,
}

/// Contents of one independently updatable transcript region.
#[derive(Clone, Debug, PartialEq)]
pub enum CardBody {
    /// The submitted prompt. `image_mime` is set when an image was attached.
    User {
        text: String,
        image_mime: Option<String>,
    },

    /// Transient placeholder shown until the first fragment arrives.
    Thinking,

    /// Model prose. `source` is the displayed markdown, `markup` its
    /// rendering.
    Text {
        source: String,
        markup: Vec<Line<'static>>,
    },

    /// A tool call the backend is executing; `preview` grows as the call's
    /// code streams in.
    ToolCall { language: String, preview: String },

    /// Code the model committed. `highlighted` stays `None` until the
    /// highlight pass at the end of the turn.
    Code {
        language: String,
        code: String,
        highlighted: Option<Vec<Line<'static>>>,
    },

    /// Verbatim execution output.
    Result { output: String },

    /// The model returned nothing at all.
    NoOutput,

    Error { message: String },
}

impl CardBody {
    pub fn kind(&self) -> CardKind {
        match self {
            CardBody::User { .. } => CardKind::User,
            CardBody::Thinking => CardKind::Thinking,
            CardBody::Text { .. } => CardKind::Text,
            CardBody::ToolCall { .. } => CardKind::ToolCall,
            CardBody::Code { .. } => CardKind::Code,
            CardBody::Result { .. } => CardKind::Result,
            CardBody::NoOutput => CardKind::NoOutput,
            CardBody::Error { .. } => CardKind::Error,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Card {
    pub id: CardId,
    pub body: CardBody,
}

/// Position in the deck captured before a turn starts, so the turn's cards
/// can be discarded as a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeckMark(usize);

/// The ordered card transcript of the current chat.
#[derive(Debug, Default)]
pub struct CardDeck {
    cards: Vec<Card>,
    next_id: CardId,
}

impl CardDeck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, body: CardBody) -> CardId {
        let id = self.next_id;
        self.next_id += 1;
        self.cards.push(Card { id, body });
        id
    }

    pub fn get(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn body_mut(&mut self, id: CardId) -> Option<&mut CardBody> {
        self.cards
            .iter_mut()
            .find(|card| card.id == id)
            .map(|card| &mut card.body)
    }

    /// Remove a card, returning whether it was present.
    pub fn remove(&mut self, id: CardId) -> bool {
        let before = self.cards.len();
        self.cards.retain(|card| card.id != id);
        self.cards.len() != before
    }

    pub fn mark(&self) -> DeckMark {
        DeckMark(self.cards.len())
    }

    pub fn truncate(&mut self, mark: DeckMark) {
        self.cards.truncate(mark.0);
    }

    /// Cards added since `mark`.
    pub fn since(&self, mark: DeckMark) -> &[Card] {
        self.cards.get(mark.0..).unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn count(&self, kind: CardKind) -> usize {
        self.cards
            .iter()
            .filter(|card| card.body.kind() == kind)
            .count()
    }

    /// Code of the most recent code card, which is what the copy control
    /// acts on.
    pub fn latest_code(&self) -> Option<&str> {
        self.cards.iter().rev().find_map(|card| match &card.body {
            CardBody::Code { code, .. } => Some(code.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_even_after_removal() {
        let mut deck = CardDeck::new();
        let a = deck.push(CardBody::Thinking);
        assert!(deck.remove(a));
        let b = deck.push(CardBody::NoOutput);
        assert_ne!(a, b);
        assert!(!deck.remove(a));
        assert_eq!(deck.len(), 1);
    }

    #[test]
    fn truncate_to_mark_discards_later_cards() {
        let mut deck = CardDeck::new();
        deck.push(CardBody::User {
            text: "hi".into(),
            image_mime: None,
        });
        let mark = deck.mark();
        deck.push(CardBody::Thinking);
        deck.push(CardBody::Result {
            output: "1".into(),
        });
        assert_eq!(deck.since(mark).len(), 2);

        deck.truncate(mark);
        assert_eq!(deck.len(), 1);
        assert!(deck.since(mark).is_empty());
    }

    #[test]
    fn latest_code_picks_most_recent_code_card() {
        let mut deck = CardDeck::new();
        assert_eq!(deck.latest_code(), None);
        for code in ["a()", "b()"] {
            deck.push(CardBody::Code {
                language: "js".into(),
                code: code.into(),
                highlighted: None,
            });
        }
        deck.push(CardBody::Result {
            output: String::new(),
        });
        assert_eq!(deck.latest_code(), Some("b()"));
    }
}
