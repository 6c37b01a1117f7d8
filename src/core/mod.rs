pub mod cards;
pub mod config;
pub mod controller;
pub mod error;
pub mod fragment;
pub mod image;
pub mod interpreter;
pub mod markers;
pub mod media;
pub mod render;
pub mod session;
pub mod sse;
pub mod turn;
