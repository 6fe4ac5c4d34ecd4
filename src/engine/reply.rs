//! Search results as reported to the controller.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::uci::moves::UciMove;

/// Evaluation of a position from the side to move's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Score {
    /// Exact score in centipawns.
    Cp(i32),
    /// The score is at least this many centipawns.
    LowerBound(i32),
    /// The score is at most this many centipawns.
    UpperBound(i32),
    /// Mate in this many moves; negative when the engine is getting mated.
    Mate(i32),
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Cp(cp) => write!(f, "cp {cp}"),
            Score::LowerBound(cp) => write!(f, "lowerbound {cp}"),
            Score::UpperBound(cp) => write!(f, "upperbound {cp}"),
            Score::Mate(moves) => write!(f, "mate {moves}"),
        }
    }
}

/// Details of the search that produced a [`GoReply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchInfo {
    pub depth: u32,
    pub score: Option<Score>,
    pub pv: Vec<UciMove>,
}

impl fmt::Display for SearchInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "info depth {}", self.depth)?;
        if let Some(score) = &self.score {
            write!(f, " score {score}")?;
        }
        if !self.pv.is_empty() {
            f.write_str(" multipv 1 pv")?;
            for mv in &self.pv {
                write!(f, " {mv}")?;
            }
        }
        Ok(())
    }
}

/// Answer to a `go` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoReply {
    pub best_move: Option<UciMove>,
    pub ponder_move: Option<UciMove>,
    pub info: Option<SearchInfo>,
}

impl GoReply {
    #[must_use]
    pub fn new(best_move: Option<UciMove>) -> Self {
        GoReply {
            best_move,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_ponder(mut self, ponder_move: Option<UciMove>) -> Self {
        self.ponder_move = ponder_move;
        self
    }

    #[must_use]
    pub fn with_info(mut self, info: SearchInfo) -> Self {
        self.info = Some(info);
        self
    }

    /// The protocol lines for this reply: the info line, if any, then
    /// the `bestmove` line.
    #[must_use]
    pub fn to_uci_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(2);
        if let Some(info) = &self.info {
            lines.push(info.to_string());
        }
        lines.push(self.to_string());
        lines
    }
}

/// Formats the `bestmove` line.
impl fmt::Display for GoReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.best_move {
            None => f.write_str("bestmove (none)"),
            Some(best) => {
                write!(f, "bestmove {best}")?;
                if let Some(ponder) = &self.ponder_move {
                    write!(f, " ponder {ponder}")?;
                }
                Ok(())
            }
        }
    }
}
