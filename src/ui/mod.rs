//! Terminal UI layer for interactive chat sessions.
//!
//! - [`chat_loop`]: the event loop that feeds key presses, stream fragments
//!   and capture results into [`chat_loop::ChatApp`].
//! - [`renderer`], [`cards`] and [`layout`]: turning the card deck and the
//!   composer into a frame.
//! - [`markdown`] and [`theme`]: text card rendering and color policy.
//!
//! Ownership boundary: this layer presents and captures interaction state, while
//! [`crate::core`] owns the turn lifecycle and backend coordination.

pub mod cards;
pub mod chat_loop;
pub mod layout;
pub mod markdown;
pub mod renderer;
pub mod theme;
