//! Text reports for the `perft` and `test` commands.

use std::time::Duration;

use crate::engine::PerftResult;
use crate::uci::parameters::PerftParameters;

/// Format with thousands separators.
#[must_use]
pub fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

fn per_second(count: u64, elapsed: Duration) -> u64 {
    let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX).max(1);
    count.saturating_mul(1000) / ms
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Lines printed after a `perft` run.
#[must_use]
pub fn perft_report(result: &PerftResult, params: &PerftParameters, elapsed: Duration) -> Vec<String> {
    if result.interrupted {
        return vec!["perft process has been interrupted".to_string()];
    }
    let mut lines: Vec<String> = result
        .divides
        .iter()
        .map(|d| format!("{}: {}", d.mv, d.count))
        .collect();
    lines.push(format!(
        "perft {} leaves in {}ms ({} leaves/s) (using {} thread(s))",
        group_digits(result.leaves),
        group_digits(elapsed_ms(elapsed)),
        group_digits(per_second(result.leaves, elapsed)),
        params.parallelism
    ));
    lines.push(format!(
        "perft {} {}legal moves generated ({} mv/s). {} moves made ({} mv/s)",
        group_digits(result.moves_found),
        if params.legal { "" } else { "pseudo-" },
        group_digits(per_second(result.moves_found, elapsed)),
        group_digits(result.moves_made),
        group_digits(per_second(result.moves_made, elapsed)),
    ));
    lines
}

/// Summary line printed at the end of a `test` run.
#[must_use]
pub fn perf_stats_summary(moves: u64, params: &PerftParameters, elapsed: Duration) -> String {
    format!(
        "perf: {} {}legal moves in {}ms ({} mv/s) (using {} thread(s) and {}playing leave moves)",
        group_digits(moves),
        if params.legal { "" } else { "pseudo-" },
        group_digits(elapsed_ms(elapsed)),
        group_digits(per_second(moves, elapsed)),
        params.parallelism,
        if params.play_leaves || !params.legal { "" } else { "not " }
    )
}

/// Line printed when a test position gives the wrong count.
#[must_use]
pub fn count_error(fen: &str, expected: u64, actual: u64) -> String {
    format!("Error for {fen} expected {expected} got {actual}")
}
