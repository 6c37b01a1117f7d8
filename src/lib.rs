//! cardchat is a terminal chat client that streams a multi-modal conversation
//! and shows the model's reply as live cards.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation session, the stream interpreter that
//!   turns response fragments into cards, and the composer state.
//! - [`ui`] renders the card deck and runs the interactive event loop.
//! - [`api`] defines the request and response payloads of the backend.
//! - [`logging`] sends diagnostics to a file, away from the terminal.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod logging;
pub mod ui;
pub mod utils;
