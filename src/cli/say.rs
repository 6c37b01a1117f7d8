//! TUI-less "say" command

use std::error::Error;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::core::cards::CardDeck;
use crate::core::image::ImageData;
use crate::core::render::{lines_to_plain, Renderers};
use crate::core::session::{ConversationBackend, UserTurn};
use crate::core::turn::{ActiveTurn, TurnEnd};
use crate::ui::cards::{card_lines, CardView};
use crate::ui::theme::Theme;

/// Cards as plain text, one blank line apart. No copy control is offered.
pub fn transcript_text(deck: &CardDeck, theme: &Theme) -> String {
    let view = CardView {
        spinner_tick: 0,
        copy_label: "",
    };
    deck.cards()
        .iter()
        .map(|card| lines_to_plain(&card_lines(card, false, theme, view)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Run one turn to completion and return the cards it produced.
pub async fn say_once(
    backend: &mut dyn ConversationBackend,
    renderers: Renderers,
    turn: UserTurn,
) -> (CardDeck, TurnEnd) {
    let mut deck = CardDeck::new();
    let stream = backend.submit_turn(turn);
    let active = ActiveTurn::start(stream, renderers, CancellationToken::new(), &mut deck);
    let end = active.run(&mut deck).await;
    (deck, end)
}

pub async fn run_say(
    mut backend: Box<dyn ConversationBackend>,
    renderers: Renderers,
    theme: &Theme,
    prompt: Vec<String>,
    image: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    let image = image.map(|path| ImageData::from_path(&path)).transpose()?;
    if prompt.trim().is_empty() && image.is_none() {
        eprintln!("Usage: cardchat say <prompt> [--image PATH]");
        std::process::exit(1);
    }

    let turn = UserTurn {
        text: (!prompt.trim().is_empty()).then(|| prompt.trim().to_string()),
        image,
    };
    let (deck, end) = say_once(backend.as_mut(), renderers, turn).await;
    println!("{}", transcript_text(&deck, theme));

    match end {
        TurnEnd::Failed { message } => Err(message.into()),
        TurnEnd::Completed(_) | TurnEnd::Stopped(_) => Ok(()),
    }
}
