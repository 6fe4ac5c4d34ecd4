//! The boundary between the protocol front-end and a chess engine.
//!
//! The front-end never looks inside an engine. It asks for the engine's
//! [`Capabilities`] and options, forwards positions and moves, and runs the
//! [`LongRunningTask`]s the engine hands back on its background worker.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::sync::StopFlag;
use crate::uci::moves::UciMove;
use crate::uci::options::UciOption;
use crate::uci::parameters::{GoParameters, PerftParameters};

pub mod background;
mod reply;
mod task;

pub use background::{BackgroundTaskManager, CancelAction, ErrorSink, TaskStopper};
pub use reply::{GoReply, Score, SearchInfo};
pub use task::LongRunningTask;

/// FEN of the standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },
    #[error("illegal move {mv}: {reason}")]
    IllegalMove { mv: UciMove, reason: String },
    #[error("no position is set")]
    NoPosition,
    #[error("{0}")]
    Search(String),
}

/// Optional protocol features an engine supports.
///
/// Queried once each time the engine is selected, to build the automatic
/// options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Fischer random castling rules are available (`UCI_Chess960`).
    pub chess960: bool,
    /// The engine has an opening book; the value is the `OwnBook` default.
    pub own_book: Option<bool>,
    /// The engine has a sizeable hash table; the value is the `Hash`
    /// default in megabytes.
    pub default_hash_size: Option<u32>,
}

/// What a `position` command asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionSpec {
    pub fen: String,
    pub moves: Vec<UciMove>,
}

impl PositionSpec {
    #[must_use]
    pub fn start_position() -> Self {
        PositionSpec {
            fen: START_FEN.to_string(),
            moves: Vec::new(),
        }
    }
}

/// Node count below one root move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divide {
    pub mv: UciMove,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerftResult {
    pub divides: Vec<Divide>,
    pub leaves: u64,
    /// Moves generated over the whole tree.
    pub moves_found: u64,
    /// Moves actually played over the whole tree.
    pub moves_made: u64,
    pub interrupted: bool,
}

/// Move generator self-check.
pub trait Perft: Send + Sync {
    /// Count the leaves below `position`, split by root move.
    ///
    /// Returns early with `interrupted` set once `stop` is raised.
    ///
    /// # Errors
    ///
    /// Fails if `position` cannot be set up.
    fn divide(
        &self,
        position: &PositionSpec,
        params: &PerftParameters,
        stop: &StopFlag,
    ) -> Result<PerftResult, EngineError>;
}

/// A chess engine as seen by the protocol front-end.
pub trait Engine: Send {
    /// Identifier used by `id name` and the `engine` command.
    fn id(&self) -> &str;

    fn author(&self) -> Option<&str> {
        None
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Engine specific options, declared after `id` in reply to `uci`.
    ///
    /// Called every time the engine is selected; triggers usually capture
    /// state shared with the engine.
    fn options(&self) -> Vec<Box<dyn UciOption>> {
        Vec::new()
    }

    fn new_game(&mut self) {}

    /// Replace the current position.
    ///
    /// # Errors
    ///
    /// Fails if `fen` does not describe a valid position.
    fn set_start_position(&mut self, fen: &str) -> Result<(), EngineError>;

    /// Play a move on the current position.
    ///
    /// # Errors
    ///
    /// Fails if no position is set or the move is illegal.
    fn apply_move(&mut self, mv: &UciMove) -> Result<(), EngineError>;

    fn is_position_set(&self) -> bool;

    /// Prepare a search of the current position.
    ///
    /// The returned task runs on the background worker; it must not borrow
    /// the engine.
    ///
    /// # Errors
    ///
    /// Fails if the search cannot be started, e.g. without a position.
    fn go(&mut self, params: &GoParameters) -> Result<LongRunningTask<GoReply>, EngineError>;

    fn set_chess960(&mut self, _enabled: bool) {}

    fn set_own_book(&mut self, _enabled: bool) {}

    fn set_hash_table_size(&mut self, _size_mb: u32) {}

    /// Human readable board, for the `d` command.
    fn board_as_string(&self) -> Option<String> {
        None
    }

    /// FEN of the current position, for `d fen`.
    fn fen(&self) -> Option<String> {
        None
    }

    fn perft(&self) -> Option<Arc<dyn Perft>> {
        None
    }
}

/// An engine shared between the dispatcher and option triggers.
pub type SharedEngine = Arc<Mutex<dyn Engine>>;

/// Wrap an engine for registration.
pub fn shared<E: Engine + 'static>(engine: E) -> SharedEngine {
    Arc::new(Mutex::new(engine))
}
