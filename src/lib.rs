//! UCI protocol front-end.
//!
//! Wraps any [`engine::Engine`] behind the line-oriented Universal Chess
//! Interface: command dispatch, typed option negotiation, keyword parameter
//! parsing and a single-slot background executor for long searches.

pub mod config;
pub mod engine;
pub mod engines;
pub mod sync;
pub mod timer;
pub mod uci;

pub use engine::{Engine, SharedEngine};
pub use uci::Uci;
