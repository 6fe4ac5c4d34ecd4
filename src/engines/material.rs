//! A small alpha-beta engine that only counts material.
//!
//! Iterative deepening negamax with a transposition table and a capture
//! quiescence search. Good enough to exercise every part of the protocol
//! front-end: clocks, `stop`, `searchmoves`, `nodes`, `mate` and options.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position, Role};

use super::position::{to_legal_move, to_protocol_move, Session, ShakmatyPerft};
use super::table::{BoundType, TranspositionTable};
use super::time::{TimeConfig, TimeControl};
use crate::engine::{
    Capabilities, Engine, EngineError, GoReply, LongRunningTask, Perft, Score, SearchInfo,
};
use crate::sync::StopFlag;
use crate::timer::DeadlineTimer;
use crate::uci::moves::UciMove;
use crate::uci::options::{ButtonOption, SpinOption, UciOption};
use crate::uci::parameters::GoParameters;

pub const MATERIAL_ENGINE_ID: &str = "material";

pub const MATE_SCORE: i32 = 100_000;
const MAX_DEPTH: u32 = 64;
const DEFAULT_DEPTH: u32 = 32;
const DEFAULT_HASH_MB: u32 = 16;

const PAWN_VALUE: i32 = 100;
const KNIGHT_VALUE: i32 = 320;
const BISHOP_VALUE: i32 = 330;
const ROOK_VALUE: i32 = 500;
const QUEEN_VALUE: i32 = 900;

#[must_use]
pub fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => PAWN_VALUE,
        Role::Knight => KNIGHT_VALUE,
        Role::Bishop => BISHOP_VALUE,
        Role::Rook => ROOK_VALUE,
        Role::Queen => QUEEN_VALUE,
        Role::King => 0,
    }
}

/// Material balance from the side to move's point of view.
#[must_use]
pub fn evaluate(pos: &Chess) -> i32 {
    let board = pos.board();
    let side = |color: Color| -> i32 {
        Role::ALL
            .iter()
            .map(|&role| {
                let count = (board.by_role(role) & board.by_color(color)).count();
                piece_value(role) * i32::try_from(count).unwrap_or(0)
            })
            .sum()
    };
    let white = side(Color::White) - side(Color::Black);
    if pos.turn() == Color::White {
        white
    } else {
        -white
    }
}

fn mvv_lva_score(m: &Move) -> i32 {
    match m.capture() {
        Some(victim) => piece_value(victim) * 10 - piece_value(m.role()),
        None => m.promotion().map_or(-QUEEN_VALUE * 10, piece_value),
    }
}

fn hash(pos: &Chess) -> u64 {
    let z: Zobrist64 = pos.zobrist_hash(EnPassantMode::Legal);
    z.0
}

/// Convert a search score to the protocol form.
#[must_use]
pub fn to_score(score: i32) -> Score {
    if score.abs() >= MATE_SCORE - MAX_DEPTH as i32 * 2 {
        let plies = MATE_SCORE - score.abs();
        let moves = (plies + 1) / 2;
        Score::Mate(if score > 0 { moves } else { -moves })
    } else {
        Score::Cp(score)
    }
}

struct Searcher<'a> {
    table: &'a mut TranspositionTable,
    stop: &'a StopFlag,
    nodes: u64,
    node_limit: Option<u64>,
    aborted: bool,
}

impl Searcher<'_> {
    fn should_stop(&mut self) -> bool {
        if !self.aborted {
            let out_of_nodes = self.node_limit.is_some_and(|limit| self.nodes >= limit);
            self.aborted = out_of_nodes || self.stop.is_stopped();
        }
        self.aborted
    }

    fn ordered_moves(&self, pos: &Chess, hash_move: Option<&Move>) -> Vec<Move> {
        let mut moves: Vec<Move> = pos.legal_moves().into_iter().collect();
        moves.sort_by_key(|m| -mvv_lva_score(m));
        if let Some(hm) = hash_move {
            if let Some(index) = moves.iter().position(|m| m == hm) {
                moves[..=index].rotate_right(1);
            }
        }
        moves
    }

    fn negamax(&mut self, pos: &Chess, depth: u32, mut alpha: i32, mut beta: i32, ply: i32) -> i32 {
        if self.should_stop() {
            return 0;
        }
        self.nodes += 1;

        if ply > 0 && pos.is_insufficient_material() {
            return 0;
        }

        let original_alpha = alpha;
        let key = hash(pos);
        let mut hash_move = None;
        if let Some(entry) = self.table.probe(key) {
            if entry.depth >= depth && ply > 0 {
                match entry.bound_type {
                    BoundType::Exact => return entry.score,
                    BoundType::LowerBound => alpha = alpha.max(entry.score),
                    BoundType::UpperBound => beta = beta.min(entry.score),
                }
                if alpha >= beta {
                    return entry.score;
                }
            }
            hash_move = entry.best_move.clone();
        }

        let moves = self.ordered_moves(pos, hash_move.as_ref());
        if moves.is_empty() {
            return if pos.is_check() { -(MATE_SCORE - ply) } else { 0 };
        }
        if depth == 0 {
            return self.quiescence(pos, alpha, beta);
        }

        let mut best_score = -MATE_SCORE * 2;
        let mut best_move = None;
        for m in moves {
            let Ok(next) = pos.clone().play(&m) else {
                continue;
            };
            let score = -self.negamax(&next, depth - 1, -beta, -alpha, ply + 1);
            if self.aborted {
                return 0;
            }
            if score > best_score {
                best_score = score;
                best_move = Some(m);
            }
            alpha = alpha.max(best_score);
            if alpha >= beta {
                break;
            }
        }

        let bound_type = if best_score <= original_alpha {
            BoundType::UpperBound
        } else if best_score >= beta {
            BoundType::LowerBound
        } else {
            BoundType::Exact
        };
        self.table.store(key, depth, best_score, bound_type, best_move);
        best_score
    }

    fn quiescence(&mut self, pos: &Chess, mut alpha: i32, beta: i32) -> i32 {
        if self.should_stop() {
            return 0;
        }
        self.nodes += 1;

        let stand_pat = evaluate(pos);
        if stand_pat >= beta {
            return beta;
        }
        alpha = alpha.max(stand_pat);

        let mut captures: Vec<Move> = pos.capture_moves().into_iter().collect();
        captures.sort_by_key(|m| -mvv_lva_score(m));
        for m in captures {
            let Ok(next) = pos.clone().play(&m) else {
                continue;
            };
            let score = -self.quiescence(&next, -beta, -alpha);
            if self.aborted {
                return 0;
            }
            if score >= beta {
                return beta;
            }
            alpha = alpha.max(score);
        }
        alpha
    }

    /// Search the root moves; `None` if the iteration was cut short.
    fn search_root(&mut self, pos: &Chess, root_moves: &mut [Move], depth: u32) -> Option<(Move, i32)> {
        let mut alpha = -MATE_SCORE * 2;
        let mut best: Option<(Move, i32)> = None;
        for m in root_moves.iter() {
            let Ok(next) = pos.clone().play(m) else {
                continue;
            };
            let score = -self.negamax(&next, depth - 1, -MATE_SCORE * 2, -alpha, 1);
            if self.aborted {
                return None;
            }
            if score > alpha {
                alpha = score;
                best = Some((m.clone(), score));
            }
        }
        // Search the best move first at the next depth.
        if let Some((best_move, _)) = &best {
            if let Some(index) = root_moves.iter().position(|m| m == best_move) {
                root_moves[..=index].rotate_right(1);
            }
            self.table
                .store(hash(pos), depth, alpha, BoundType::Exact, Some(best_move.clone()));
        }
        best
    }
}

fn principal_variation(table: &TranspositionTable, pos: &Chess, first: &Move, max_plies: u32) -> Vec<Move> {
    let mut pv = vec![first.clone()];
    let Ok(mut current) = pos.clone().play(first) else {
        return pv;
    };
    while pv.len() < max_plies as usize {
        let Some(mv) = table.probe(hash(&current)).and_then(|e| e.best_move.clone()) else {
            break;
        };
        if !current.is_legal(&mv) {
            break;
        }
        match current.play(&mv) {
            Ok(next) => current = next,
            Err(_) => break,
        }
        pv.push(mv);
    }
    pv
}

/// Everything a search needs, detached from the engine.
struct SearchJob {
    pos: Chess,
    castling: CastlingMode,
    root_moves: Vec<Move>,
    params: GoParameters,
    max_depth: u32,
    table: Arc<Mutex<TranspositionTable>>,
    hash_size_mb: u32,
    clear_requested: Arc<AtomicBool>,
    time_config: TimeConfig,
}

impl SearchJob {
    fn run(mut self, stop: &StopFlag) -> Result<GoReply, EngineError> {
        let start = Instant::now();
        let limits = TimeControl::from_go(&self.params, self.pos.turn()).compute_limits(&self.time_config);
        let timer = match limits {
            Some(limits) => {
                let flag = stop.clone();
                DeadlineTimer::start_at(start + limits.hard, move || flag.stop())
                    .map_err(|e| EngineError::Search(format!("cannot start the search timer: {e}")))?
            }
            None => None,
        };

        let mut table = self.table.lock();
        let clear = self.clear_requested.swap(false, Ordering::AcqRel);
        if table.size_mb() != self.hash_size_mb {
            *table = TranspositionTable::new(self.hash_size_mb);
        } else if clear {
            table.clear();
        }

        let mut searcher = Searcher {
            table: &mut *table,
            stop,
            nodes: 0,
            node_limit: (self.params.nodes > 0).then(|| u64::from(self.params.nodes)),
            aborted: false,
        };
        let mut best: Option<(Move, i32, u32)> = None;
        for depth in 1..=self.max_depth {
            let Some((mv, score)) = searcher.search_root(&self.pos, &mut self.root_moves, depth) else {
                break;
            };
            log::trace!("depth {depth}: {} score {score}", mv.to_uci(self.castling));
            best = Some((mv, score, depth));
            if limits.is_some_and(|l| start.elapsed() >= l.soft) {
                break;
            }
            if score.abs() >= MATE_SCORE - MAX_DEPTH as i32 * 2 {
                let found = to_score(score);
                let wanted = i32::try_from(self.params.mate).unwrap_or(i32::MAX);
                if self.params.mate == 0 || matches!(found, Score::Mate(n) if n > 0 && n <= wanted) {
                    break;
                }
            }
        }
        let nodes = searcher.nodes;

        // Without a clock the reply waits for `stop`.
        if limits.is_none() && (self.params.time.infinite || self.params.ponder) {
            while !stop.is_stopped() {
                thread::sleep(Duration::from_millis(5));
            }
        }
        if let Some(timer) = timer {
            timer.cancel();
        }

        let Some((best_move, score, depth)) = best.or_else(|| {
            self.root_moves.first().map(|m| (m.clone(), evaluate(&self.pos), 0))
        }) else {
            return Ok(GoReply::new(None));
        };
        let pv = principal_variation(&table, &self.pos, &best_move, depth.max(1));
        log::debug!(
            "search finished: depth {depth}, {nodes} nodes in {} ms",
            start.elapsed().as_millis()
        );
        let pv: Vec<UciMove> = pv.iter().map(|m| to_protocol_move(m, self.castling)).collect();
        Ok(GoReply::new(Some(to_protocol_move(&best_move, self.castling)))
            .with_ponder(pv.get(1).cloned())
            .with_info(SearchInfo {
                depth,
                score: Some(to_score(score)),
                pv,
            }))
    }
}

/// Material-only alpha-beta engine.
pub struct MaterialEngine {
    session: Session,
    max_depth: Arc<AtomicU32>,
    hash_size_mb: u32,
    table: Arc<Mutex<TranspositionTable>>,
    clear_requested: Arc<AtomicBool>,
    time_config: TimeConfig,
}

impl Default for MaterialEngine {
    fn default() -> Self {
        MaterialEngine {
            session: Session::new(),
            max_depth: Arc::new(AtomicU32::new(DEFAULT_DEPTH)),
            hash_size_mb: DEFAULT_HASH_MB,
            table: Arc::new(Mutex::new(TranspositionTable::new(DEFAULT_HASH_MB))),
            clear_requested: Arc::new(AtomicBool::new(false)),
            time_config: TimeConfig::default(),
        }
    }
}

impl MaterialEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn hash_size_mb(&self) -> u32 {
        self.hash_size_mb
    }
}

impl Engine for MaterialEngine {
    fn id(&self) -> &str {
        MATERIAL_ENGINE_ID
    }

    fn author(&self) -> Option<&str> {
        Some(env!("CARGO_PKG_AUTHORS")).filter(|a| !a.is_empty())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            chess960: true,
            own_book: None,
            default_hash_size: Some(DEFAULT_HASH_MB),
        }
    }

    fn options(&self) -> Vec<Box<dyn UciOption>> {
        let mut options: Vec<Box<dyn UciOption>> = Vec::new();
        let depth = Arc::clone(&self.max_depth);
        match SpinOption::<u32>::new("Depth", DEFAULT_DEPTH, 1, MAX_DEPTH, move |value| {
            depth.store(*value, Ordering::Release);
        }) {
            Ok(option) => options.push(Box::new(option)),
            Err(e) => log::warn!("{e}"),
        }
        let clear = Arc::clone(&self.clear_requested);
        match ButtonOption::new("Clear Hash", move || clear.store(true, Ordering::Release)) {
            Ok(option) => options.push(Box::new(option)),
            Err(e) => log::warn!("{e}"),
        }
        options
    }

    fn new_game(&mut self) {
        self.clear_requested.store(true, Ordering::Release);
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
        let root_moves: Vec<Move> = if params.search_moves.is_empty() {
            pos.legal_moves().into_iter().collect()
        } else {
            params
                .search_moves
                .iter()
                .map(|mv| to_legal_move(&pos, mv))
                .collect::<Result<_, _>>()?
        };
        let max_depth = if params.depth > 0 {
            params.depth.min(MAX_DEPTH)
        } else if params.mate > 0 {
            params.mate.saturating_mul(2).min(MAX_DEPTH)
        } else {
            self.max_depth.load(Ordering::Acquire)
        };
        let job = SearchJob {
            pos,
            castling: self.session.castling_mode(),
            root_moves,
            params: params.clone(),
            max_depth,
            table: Arc::clone(&self.table),
            hash_size_mb: self.hash_size_mb,
            clear_requested: Arc::clone(&self.clear_requested),
            time_config: self.time_config,
        };
        Ok(LongRunningTask::new(move |stop| job.run(stop)))
    }

    fn set_chess960(&mut self, enabled: bool) {
        self.session.set_chess960(enabled);
    }

    fn set_hash_table_size(&mut self, size_mb: u32) {
        log::debug!("hash size set to {size_mb} MB");
        self.hash_size_mb = size_mb;
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
