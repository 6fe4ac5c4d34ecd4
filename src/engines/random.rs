//! An engine that plays a random legal move.

use std::sync::Arc;

use rand::seq::SliceRandom;
use shakmaty::{Move, Position};

use super::position::{to_legal_move, to_protocol_move, Session, ShakmatyPerft};
use crate::engine::{Capabilities, Engine, EngineError, GoReply, LongRunningTask, Perft};
use crate::uci::moves::UciMove;
use crate::uci::parameters::GoParameters;

pub const RANDOM_ENGINE_ID: &str = "random";

#[derive(Debug, Default)]
pub struct RandomEngine {
    session: Session,
}

impl RandomEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for RandomEngine {
    fn id(&self) -> &str {
        RANDOM_ENGINE_ID
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            chess960: true,
            ..Capabilities::default()
        }
    }

    fn set_start_position(&mut self, fen: &str) -> Result<(), EngineError> {
        self.session.set_fen(fen)
    }

    fn apply_move(&mut self, mv: &UciMove) -> Result<(), EngineError> {
        self.session.apply(mv)
    }

    fn is_position_set(&self) -> bool {
        self.session.is_set()
    }

    fn go(&mut self, params: &GoParameters) -> Result<LongRunningTask<GoReply>, EngineError> {
        let pos = self.session.position()?.clone();
        let castling = self.session.castling_mode();
        let candidates: Vec<Move> = if params.search_moves.is_empty() {
            pos.legal_moves().into_iter().collect()
        } else {
            params
                .search_moves
                .iter()
                .filter_map(|mv| to_legal_move(&pos, mv).ok())
                .collect()
        };
        Ok(LongRunningTask::new(move |_| {
            let chosen = candidates.choose(&mut rand::thread_rng());
            Ok(GoReply::new(chosen.map(|m| to_protocol_move(m, castling))))
        }))
    }

    fn set_chess960(&mut self, enabled: bool) {
        self.session.set_chess960(enabled);
    }

    fn board_as_string(&self) -> Option<String> {
        self.session.board_string()
    }

    fn fen(&self) -> Option<String> {
        self.session.fen()
    }

    fn perft(&self) -> Option<Arc<dyn Perft>> {
        Some(Arc::new(ShakmatyPerft::new(self.session.castling_mode())))
    }
}
