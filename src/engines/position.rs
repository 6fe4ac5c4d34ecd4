//! Position tracking and perft shared by the bundled engines.
//!
//! Move generation comes from `shakmaty`; this module only converts between
//! its types and the protocol types.

use std::thread;

use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Move, Position};

use crate::engine::{Divide, EngineError, Perft, PerftResult, PositionSpec};
use crate::sync::StopFlag;
use crate::uci::moves::UciMove;
use crate::uci::parameters::PerftParameters;

/// Build a position from a FEN string.
///
/// # Errors
///
/// Fails if `fen` is malformed or describes an impossible position.
pub fn from_fen(fen: &str, castling: CastlingMode) -> Result<Chess, EngineError> {
    let invalid = |reason: String| EngineError::InvalidFen {
        fen: fen.to_string(),
        reason,
    };
    let parsed: Fen = fen.trim().parse().map_err(|e| invalid(format!("{e}")))?;
    parsed
        .into_position(castling)
        .map_err(|e| invalid(format!("{e}")))
}

/// Find the legal move matching `mv`.
///
/// # Errors
///
/// Fails if `mv` is not a legal move of `pos`.
pub fn to_legal_move(pos: &Chess, mv: &UciMove) -> Result<Move, EngineError> {
    let illegal = |reason: &str| EngineError::IllegalMove {
        mv: mv.clone(),
        reason: reason.to_string(),
    };
    let uci: shakmaty::uci::UciMove = mv
        .to_string()
        .parse()
        .map_err(|_| illegal("not a square to square move"))?;
    uci.to_move(pos)
        .map_err(|_| illegal("not legal in this position"))
}

/// Protocol form of a legal move.
#[must_use]
pub fn to_protocol_move(mv: &Move, castling: CastlingMode) -> UciMove {
    let text = mv.to_uci(castling).to_string();
    let promotion = text.chars().nth(4);
    UciMove::new(&text[0..2], &text[2..4], promotion)
}

/// Play `mv` on a copy of `pos`.
///
/// # Errors
///
/// Fails if the move is illegal.
pub fn play(pos: &Chess, mv: &UciMove) -> Result<Chess, EngineError> {
    let legal = to_legal_move(pos, mv)?;
    pos.clone().play(&legal).map_err(|_| EngineError::IllegalMove {
        mv: mv.clone(),
        reason: "not legal in this position".to_string(),
    })
}

/// The current position of an engine.
#[derive(Debug, Clone)]
pub struct Session {
    position: Option<Chess>,
    castling: CastlingMode,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            position: None,
            castling: CastlingMode::Standard,
        }
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_chess960(&mut self, enabled: bool) {
        self.castling = CastlingMode::from_chess960(enabled);
    }

    #[must_use]
    pub fn castling_mode(&self) -> CastlingMode {
        self.castling
    }

    /// Replace the position. The previous one is dropped even on failure.
    ///
    /// # Errors
    ///
    /// Fails if `fen` is invalid.
    pub fn set_fen(&mut self, fen: &str) -> Result<(), EngineError> {
        self.position = None;
        self.position = Some(from_fen(fen, self.castling)?);
        Ok(())
    }

    /// # Errors
    ///
    /// Fails without a position or if `mv` is illegal.
    pub fn apply(&mut self, mv: &UciMove) -> Result<(), EngineError> {
        let current = self.position.as_ref().ok_or(EngineError::NoPosition)?;
        self.position = Some(play(current, mv)?);
        Ok(())
    }

    /// # Errors
    ///
    /// Fails without a position.
    pub fn position(&self) -> Result<&Chess, EngineError> {
        self.position.as_ref().ok_or(EngineError::NoPosition)
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.position.is_some()
    }

    pub fn clear(&mut self) {
        self.position = None;
    }

    #[must_use]
    pub fn board_string(&self) -> Option<String> {
        self.position.as_ref().map(|pos| format!("{:?}", pos.board()))
    }

    #[must_use]
    pub fn fen(&self) -> Option<String> {
        self.position.as_ref().map(|pos| {
            Fen::from_setup(pos.clone().into_setup(EnPassantMode::Legal)).to_string()
        })
    }
}

/// Perft on `shakmaty` positions.
#[derive(Debug, Clone, Copy)]
pub struct ShakmatyPerft {
    castling: CastlingMode,
}

impl ShakmatyPerft {
    #[must_use]
    pub fn new(castling: CastlingMode) -> Self {
        ShakmatyPerft { castling }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    leaves: u64,
    found: u64,
    made: u64,
}

impl Counts {
    fn add(&mut self, other: Counts) {
        self.leaves += other.leaves;
        self.found += other.found;
        self.made += other.made;
    }
}

/// Count leaves below `pos`; `None` once `stop` is raised.
fn count(pos: &Chess, depth: u32, play_leaves: bool, stop: &StopFlag) -> Option<Counts> {
    if stop.is_stopped() {
        return None;
    }
    let moves = pos.legal_moves();
    let found = moves.len() as u64;
    if depth <= 1 && !play_leaves {
        return Some(Counts {
            leaves: found,
            found,
            made: 0,
        });
    }
    let mut counts = Counts {
        found,
        ..Counts::default()
    };
    for m in &moves {
        let next = pos.clone().play(m).ok()?;
        counts.made += 1;
        if depth <= 1 {
            counts.leaves += 1;
        } else {
            counts.add(count(&next, depth - 1, play_leaves, stop)?);
        }
    }
    Some(counts)
}

impl Perft for ShakmatyPerft {
    fn divide(
        &self,
        position: &PositionSpec,
        params: &PerftParameters,
        stop: &StopFlag,
    ) -> Result<PerftResult, EngineError> {
        let mut root = from_fen(&position.fen, self.castling)?;
        for mv in &position.moves {
            root = play(&root, mv)?;
        }
        if params.depth == 0 {
            return Ok(PerftResult {
                leaves: 1,
                ..PerftResult::default()
            });
        }

        let root_moves: Vec<Move> = pos_moves(&root);
        let threads = (params.parallelism.max(1) as usize).min(root_moves.len().max(1));
        let chunk = root_moves.len().div_ceil(threads).max(1);
        log::debug!(
            "perft depth {} on {} root moves with {threads} thread(s)",
            params.depth,
            root_moves.len()
        );

        let per_move: Vec<Option<(Move, Counts)>> = thread::scope(|scope| {
            let workers: Vec<_> = root_moves
                .chunks(chunk)
                .map(|moves| {
                    let root = &root;
                    scope.spawn(move || {
                        moves
                            .iter()
                            .map(|m| {
                                let next = root.clone().play(m).ok()?;
                                let mut below = if params.depth <= 1 {
                                    Counts {
                                        leaves: 1,
                                        ..Counts::default()
                                    }
                                } else {
                                    count(&next, params.depth - 1, params.play_leaves, stop)?
                                };
                                below.made += 1;
                                Some((m.clone(), below))
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            workers
                .into_iter()
                .flat_map(|worker| {
                    worker.join().unwrap_or_else(|_| {
                        log::error!("perft worker panicked");
                        vec![None]
                    })
                })
                .collect()
        });

        let mut result = PerftResult {
            moves_found: root_moves.len() as u64,
            ..PerftResult::default()
        };
        for entry in per_move {
            let Some((m, counts)) = entry else {
                result.interrupted = true;
                continue;
            };
            result.leaves += counts.leaves;
            result.moves_found += counts.found;
            result.moves_made += counts.made;
            result.divides.push(Divide {
                mv: to_protocol_move(&m, self.castling),
                count: counts.leaves,
            });
        }
        result.interrupted |= stop.is_stopped();
        Ok(result)
    }
}

fn pos_moves(pos: &Chess) -> Vec<Move> {
    pos.legal_moves().into_iter().collect()
}
