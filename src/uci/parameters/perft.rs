//! Arguments of the `perft` and `test` diagnostic commands.
//!
//! Both start with a mandatory depth followed by keyword options.

use std::collections::VecDeque;

use once_cell::sync::Lazy;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{positive_int, ParamError, ParamSpec, Parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PerftParameters {
    pub depth: u32,
    /// Number of threads the root moves are split over.
    pub parallelism: u32,
    /// Generate strictly legal moves instead of pseudo-legal ones.
    pub legal: bool,
    /// Play the leaf moves instead of only counting them.
    pub play_leaves: bool,
}

impl Default for PerftParameters {
    fn default() -> Self {
        PerftParameters {
            depth: 0,
            parallelism: 1,
            legal: false,
            play_leaves: false,
        }
    }
}

impl AsMut<PerftParameters> for PerftParameters {
    fn as_mut(&mut self) -> &mut PerftParameters {
        self
    }
}

/// `test` arguments: perft settings plus an optional time cut.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PerfStatsParameters {
    pub perft: PerftParameters,
    /// Seconds after which the run is stopped.
    pub cut_time_s: Option<u32>,
}

impl AsMut<PerftParameters> for PerfStatsParameters {
    fn as_mut(&mut self) -> &mut PerftParameters {
        &mut self.perft
    }
}

fn depth<T: AsMut<PerftParameters>>(
    p: &mut T,
    tok: &mut VecDeque<String>,
) -> Result<(), ParamError> {
    p.as_mut().depth = positive_int(tok)?;
    Ok(())
}

fn threads<T: AsMut<PerftParameters>>(
    p: &mut T,
    tok: &mut VecDeque<String>,
) -> Result<(), ParamError> {
    p.as_mut().parallelism = positive_int(tok)?;
    Ok(())
}

fn legal<T: AsMut<PerftParameters>>(p: &mut T, _: &mut VecDeque<String>) -> Result<(), ParamError> {
    p.as_mut().legal = true;
    Ok(())
}

fn play_leaves<T: AsMut<PerftParameters>>(
    p: &mut T,
    _: &mut VecDeque<String>,
) -> Result<(), ParamError> {
    p.as_mut().play_leaves = true;
    Ok(())
}

fn perft_like_parser<T: AsMut<PerftParameters>>() -> Result<Parser<T>, ParamError> {
    Parser::new([
        ParamSpec::new(&["threads", "t"], threads::<T>),
        ParamSpec::new(&["legal", "l"], legal::<T>),
        ParamSpec::new(&["playleaves", "pl"], play_leaves::<T>),
    ])
    .map(|parser| parser.with_leading(depth::<T>))
}

pub static PERFT_PARSER: Lazy<Parser<PerftParameters>> =
    Lazy::new(|| perft_like_parser().expect("perft keywords are distinct"));

pub static PERF_STATS_PARSER: Lazy<Parser<PerfStatsParameters>> = Lazy::new(|| {
    perft_like_parser()
        .and_then(|mut parser| {
            parser.add(ParamSpec::new(&["cut"], |p: &mut PerfStatsParameters, tok| {
                p.cut_time_s = Some(positive_int(tok)?);
                Ok(())
            }))?;
            Ok(parser)
        })
        .expect("test keywords are distinct")
});
