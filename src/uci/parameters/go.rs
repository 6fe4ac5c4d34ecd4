//! Arguments of the `go` command.

use std::collections::VecDeque;

use once_cell::sync::Lazy;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{positive_int, ParamError, ParamSpec, Parser};
use crate::uci::moves::UciMove;

/// Remaining time and increment of one side, in milliseconds. 0 when unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlayerClock {
    pub remaining_ms: u32,
    pub increment_ms: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeOptions {
    pub moves_to_go: u32,
    pub move_time_ms: u32,
    pub white: PlayerClock,
    pub black: PlayerClock,
    pub infinite: bool,
}

/// Parsed `go` arguments. Numeric fields are 0 when not given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GoParameters {
    pub time: TimeOptions,
    pub ponder: bool,
    pub depth: u32,
    pub nodes: u32,
    pub mate: u32,
    pub search_moves: Vec<UciMove>,
}

impl GoParameters {
    /// Parse `go` arguments, returning the parameters and the ignored tokens.
    ///
    /// # Errors
    ///
    /// Fails on a missing, malformed or negative number, or a malformed
    /// move after `searchmoves`.
    pub fn parse(tokens: &mut VecDeque<String>) -> Result<(Self, Vec<String>), ParamError> {
        let mut params = GoParameters::default();
        let ignored = GO_PARSER.parse(&mut params, tokens)?;
        Ok((params, ignored))
    }
}

macro_rules! int_param {
    ($name:literal, |$p:ident| $field:expr) => {
        ParamSpec::new(&[$name], |$p: &mut GoParameters, tok| {
            $field = positive_int(tok)?;
            Ok(())
        })
    };
}

fn go_specs() -> Vec<ParamSpec<GoParameters>> {
    vec![
        int_param!("wtime", |p| p.time.white.remaining_ms),
        int_param!("winc", |p| p.time.white.increment_ms),
        int_param!("btime", |p| p.time.black.remaining_ms),
        int_param!("binc", |p| p.time.black.increment_ms),
        int_param!("movestogo", |p| p.time.moves_to_go),
        int_param!("movetime", |p| p.time.move_time_ms),
        int_param!("depth", |p| p.depth),
        int_param!("nodes", |p| p.nodes),
        int_param!("mate", |p| p.mate),
        ParamSpec::new(&["infinite"], |p: &mut GoParameters, _| {
            p.time.infinite = true;
            Ok(())
        }),
        ParamSpec::new(&["ponder"], |p: &mut GoParameters, _| {
            p.ponder = true;
            Ok(())
        }),
        ParamSpec::new(&["searchmoves"], |p: &mut GoParameters, tok| {
            while let Some(mv) = tok.pop_front() {
                p.search_moves.push(mv.parse()?);
            }
            Ok(())
        }),
    ]
}

pub static GO_PARSER: Lazy<Parser<GoParameters>> =
    Lazy::new(|| Parser::new(go_specs()).expect("go keywords are distinct"));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uci::parameters::tokens;

    fn parse(text: &str) -> Result<(GoParameters, Vec<String>), ParamError> {
        GoParameters::parse(&mut tokens(text))
    }

    #[test]
    fn test_clock_parameters() {
        let (params, ignored) =
            parse("wtime 297999 btime 300000 winc 3000 binc 4000").expect("valid go");
        assert!(ignored.is_empty());
        assert_eq!(params.depth, 0);
        assert_eq!(params.mate, 0);
        assert_eq!(params.nodes, 0);
        assert!(!params.ponder);
        assert!(params.search_moves.is_empty());
        assert_eq!(params.time.moves_to_go, 0);
        assert_eq!(params.time.move_time_ms, 0);
        assert!(!params.time.infinite);
        assert_eq!(
            params.time.white,
            PlayerClock {
                remaining_ms: 297_999,
                increment_ms: 3000
            }
        );
        assert_eq!(
            params.time.black,
            PlayerClock {
                remaining_ms: 300_000,
                increment_ms: 4000
            }
        );
    }

    #[test]
    fn test_limit_parameters() {
        let (params, ignored) =
            parse("depth 5 nodes 400000 mate 3 movetime 50000 movestogo 2").expect("valid go");
        assert!(ignored.is_empty());
        assert_eq!(params.depth, 5);
        assert_eq!(params.mate, 3);
        assert_eq!(params.nodes, 400_000);
        assert_eq!(params.time.moves_to_go, 2);
        assert_eq!(params.time.move_time_ms, 50_000);
        assert_eq!(params.time.white, PlayerClock::default());
        assert_eq!(params.time.black, PlayerClock::default());
    }

    #[test]
    fn test_search_moves_and_flags() {
        let (params, ignored) = parse("searchmoves e2e4 d2d4 infinite ponder").expect("valid go");
        assert!(ignored.is_empty());
        assert!(params.ponder);
        assert!(params.time.infinite);
        let moves: Vec<String> = params.search_moves.iter().map(ToString::to_string).collect();
        assert_eq!(moves, vec!["e2e4", "d2d4"]);
        assert_eq!(params.search_moves[0].from_square(), "e2");
        assert_eq!(params.search_moves[1].to_square(), "d4");
    }

    #[test]
    fn test_extra_arguments_are_reported() {
        let (params, ignored) = parse("foo depth 3 4 bar infinite").expect("valid go");
        assert_eq!(params.depth, 3);
        assert_eq!(ignored, vec!["foo", "4", "bar"]);
    }

    #[test]
    fn test_illegal_values() {
        assert_eq!(parse("depth ponder").err(), Some(ParamError::MissingValue));
        assert_eq!(
            parse("depth -1").err(),
            Some(ParamError::Negative("-1".to_string()))
        );
        assert_eq!(parse("nodes ponder").err(), Some(ParamError::MissingValue));
        assert_eq!(
            parse("nodes -1").err(),
            Some(ParamError::Negative("-1".to_string()))
        );
        assert!(matches!(
            parse("searchmoves e2"),
            Err(ParamError::Move(_))
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_json() {
        let (params, _) = parse("wtime 1000 searchmoves e2e4").expect("valid go");
        let json = serde_json::to_string(&params).expect("serialize");
        let back: GoParameters = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, params);
    }
}
