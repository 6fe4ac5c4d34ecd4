//! Turning `go` clock arguments into search time limits.

use std::time::Duration;

use shakmaty::Color;

use crate::uci::parameters::GoParameters;

/// Time threshold below which we enter "panic mode" (in ms)
const PANIC_THRESHOLD_MS: u64 = 5000;

/// Minimum moves-to-go estimate to avoid over-thinking
const MIN_MOVES_TO_GO: u64 = 10;

/// Safety margin added to overhead for critical time detection
const CRITICAL_TIME_MARGIN_MS: u64 = 50;

/// Panic mode: fraction of remaining time to use
const PANIC_TIME_FRACTION: f64 = 0.05;

const PANIC_MIN_FRACTION: u64 = 5;
const PANIC_HARD_FRACTION: u64 = 3;

/// Time thresholds for moves-to-go estimation (in ms)
const LONG_TIME_CONTROL_MS: u64 = 300_000;
const MEDIUM_TIME_CONTROL_MS: u64 = 60_000;

const LONG_MOVES_ESTIMATE: u64 = 40;
const MEDIUM_MOVES_ESTIMATE: u64 = 30;
const SHORT_MOVES_ESTIMATE: u64 = 25;

#[derive(Debug, Clone, Copy)]
pub struct TimeConfig {
    /// Time to reserve for communication latency.
    pub move_overhead_ms: u64,
    /// Percentage of remaining time usable as soft limit.
    pub soft_time_percent: u64,
    /// Percentage of remaining time usable as hard limit.
    pub hard_time_percent: u64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            move_overhead_ms: 50,
            soft_time_percent: 5,
            hard_time_percent: 20,
        }
    }
}

/// How long a search may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeControl {
    /// No time limit: `infinite`, `ponder`, or no clock given at all.
    #[default]
    Infinite,
    MoveTime { time_ms: u64 },
    Incremental {
        time_left_ms: u64,
        inc_ms: u64,
        movestogo: Option<u64>,
    },
}

/// Soft and hard limits of a timed search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimits {
    /// Do not start a new iteration after this.
    pub soft: Duration,
    /// Abort the search at this point.
    pub hard: Duration,
}

impl TimeControl {
    /// Read the time control for the side to move from `go` arguments.
    ///
    /// `movetime` wins over clocks; `infinite` and `ponder` win over both.
    #[must_use]
    pub fn from_go(params: &GoParameters, side: Color) -> Self {
        let time = &params.time;
        if time.infinite || params.ponder {
            return TimeControl::Infinite;
        }
        if time.move_time_ms > 0 {
            return TimeControl::MoveTime {
                time_ms: u64::from(time.move_time_ms),
            };
        }
        let clock = match side {
            Color::White => time.white,
            Color::Black => time.black,
        };
        if clock.remaining_ms == 0 {
            return TimeControl::Infinite;
        }
        TimeControl::Incremental {
            time_left_ms: u64::from(clock.remaining_ms),
            inc_ms: u64::from(clock.increment_ms),
            movestogo: (time.moves_to_go > 0).then(|| u64::from(time.moves_to_go)),
        }
    }

    /// Compute the limits of this time control, `None` when unlimited.
    #[must_use]
    pub fn compute_limits(&self, config: &TimeConfig) -> Option<TimeLimits> {
        let (soft_ms, hard_ms) = match self {
            TimeControl::Infinite => return None,
            // An explicit movetime is used as given, overhead included.
            TimeControl::MoveTime { time_ms } => ((*time_ms).max(1), (*time_ms).max(1)),
            TimeControl::Incremental {
                time_left_ms,
                inc_ms,
                movestogo,
            } => compute_incremental_limits(*time_left_ms, *inc_ms, *movestogo, config),
        };
        Some(TimeLimits {
            soft: Duration::from_millis(soft_ms),
            hard: Duration::from_millis(hard_ms),
        })
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn compute_incremental_limits(
    time_left_ms: u64,
    inc_ms: u64,
    movestogo: Option<u64>,
    config: &TimeConfig,
) -> (u64, u64) {
    let safe_ms = time_left_ms.saturating_sub(config.move_overhead_ms);

    if time_left_ms
        <= config
            .move_overhead_ms
            .saturating_add(CRITICAL_TIME_MARGIN_MS)
    {
        let fallback = (time_left_ms / 2).max(1);
        return (fallback, fallback);
    }

    if safe_ms < PANIC_THRESHOLD_MS {
        let panic_factor = safe_ms as f64 / PANIC_THRESHOLD_MS as f64;
        let target = (safe_ms as f64 * PANIC_TIME_FRACTION * panic_factor) as u64 + inc_ms;
        let target = target.min(safe_ms / PANIC_MIN_FRACTION).max(1);
        let hard = (safe_ms / PANIC_HARD_FRACTION).max(target).max(1);
        return (target, hard);
    }

    let moves_to_go = movestogo
        .unwrap_or(if safe_ms > LONG_TIME_CONTROL_MS {
            LONG_MOVES_ESTIMATE
        } else if safe_ms > MEDIUM_TIME_CONTROL_MS {
            MEDIUM_MOVES_ESTIMATE
        } else {
            SHORT_MOVES_ESTIMATE
        })
        .max(MIN_MOVES_TO_GO);

    let base_time = safe_ms / moves_to_go + inc_ms;
    let soft_cap = safe_ms * config.soft_time_percent / 100;
    let hard_cap = safe_ms * config.hard_time_percent / 100;

    let soft_ms = base_time.min(soft_cap).max(1);
    let hard_ms = hard_cap.max(soft_ms).max(1);
    (soft_ms, hard_ms)
}
