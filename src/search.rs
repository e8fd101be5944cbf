//! Implements the game-tree search.
//!
//! The search is a negamax alpha-beta with a transposition table,
//! move ordering, null-move pruning, late move reductions, futility
//! pruning, and check extensions. Four strategies share this one
//! node implementation and differ only in two switches: whether the
//! horizon falls through to the quiescence search or to the static
//! evaluation, and whether the non-first moves are probed with scout
//! (null) windows and re-searched on success (principal variation
//! search).
//!
//! Timeouts are values, not exceptions: the cancel signal is polled
//! at every node, and an observed cancellation unwinds the recursion
//! as `Err(TerminatedSearch)` through the ordinary `?` operator. An
//! interrupted branch stores nothing in the transposition table, so
//! no half-searched score can poison later probes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use log::warn;
use crate::basetypes::*;
use crate::board::Board;
use crate::evaluation::{self, EvalProfile, Evaluator};
use crate::movegen;
use crate::moves::{Move, MoveDigest};
use crate::ordering::MoveOrdering;
use crate::quiescence::{self, QsearchContext, QuiescenceCache};
use crate::rules;
use crate::threats::{self, ThreatReport};
use crate::tt::{TranspositionTable, BOUND_EXACT, BOUND_LOWER, BOUND_UPPER, DEFAULT_TT_CAPACITY};

/// Represents a terminated search condition.
///
/// Raised (as a plain `Err` value) when the cancel signal is
/// observed. Everything computed in the interrupted branch is
/// abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminatedSearch;

/// Errors a root search can report to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchError {
    /// The input position violates a board invariant; the engine
    /// refuses to search it.
    IllegalPosition,

    /// The search was cancelled before the root iteration finished.
    Terminated,
}

impl From<TerminatedSearch> for SearchError {
    fn from(_: TerminatedSearch) -> SearchError {
        SearchError::Terminated
    }
}

/// The shared cancel signal.
///
/// The scheduler side calls `set`; the search worker polls `is_set`
/// at every node and unwinds cooperatively. This is the only state
/// shared between the two tasks.
#[derive(Clone)]
pub struct CancelSignal {
    flag: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> CancelSignal {
        CancelSignal { flag: Arc::new(AtomicBool::new(false)) }
    }

    #[inline]
    pub fn set(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn clear(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        CancelSignal::new()
    }
}

/// Counters maintained during a search (written only by the search
/// worker).
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchStatistics {
    pub nodes: NodeCount,
    pub quiescence_nodes: NodeCount,
    pub tt_hits: NodeCount,
    pub beta_cutoffs: NodeCount,
    pub null_move_cutoffs: NodeCount,
    pub futility_prunes: NodeCount,
    pub lmr_reductions: NodeCount,
}

/// The four search strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Plain alpha-beta; the horizon returns the static evaluation.
    AlphaBeta,

    /// Alpha-beta with quiescence search at the horizon.
    AlphaBetaQuiescence,

    /// Principal variation search: scout windows for the non-first
    /// moves, re-searched with the full window on success.
    Pvs,

    /// Principal variation search with quiescence at the horizon.
    PvsQuiescence,
}

impl Strategy {
    #[inline]
    fn uses_quiescence(self) -> bool {
        matches!(self, Strategy::AlphaBetaQuiescence | Strategy::PvsQuiescence)
    }

    #[inline]
    fn uses_scout_windows(self) -> bool {
        matches!(self, Strategy::Pvs | Strategy::PvsQuiescence)
    }
}

/// The result of a completed root search.
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// The best move, or `None` when the position has no legal move
    /// or is already decided.
    pub best_move: Option<Move>,

    /// The value from the perspective of the side to move.
    pub value: Value,

    /// The searched depth.
    pub depth: u8,

    /// Searched nodes (main search plus quiescence).
    pub searched_nodes: NodeCount,

    /// Wall-clock time of the search in milliseconds.
    pub time_ms: u64,
}

/// Tunable engine parameters.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub tt_capacity: usize,
    pub quiescence_cache_capacity: usize,
    pub must_defend_cutoff: Value,
}

impl Default for EngineOptions {
    fn default() -> EngineOptions {
        EngineOptions {
            tt_capacity: DEFAULT_TT_CAPACITY,
            quiescence_cache_capacity: 1 << 14,
            must_defend_cutoff: threats::MUST_DEFEND_CUTOFF,
        }
    }
}

// Pruning parameters.
const NULL_MOVE_MIN_DEPTH: u8 = 3;
const NULL_MOVE_VERIFICATION_DEPTH: u8 = 6;
const LMR_MIN_DEPTH: u8 = 3;
const LMR_MOVE_THRESHOLD: usize = 4;
const FUTILITY_MAX_DEPTH: u8 = 4;
static FUTILITY_MARGINS: [Value; 5] = [0, 150, 250, 400, 600];
static REVERSE_FUTILITY_MARGINS: [Value; 5] = [0, 200, 350, 500, 650];

// Below this many tower segments the position counts as an endgame
// (null-move pruning and stand-pat pruning are then unsound).
const ENDGAME_SEGMENT_LIMIT: usize = 5;

lazy_static! {
    // The late-move-reduction table, indexed by depth and move
    // number: round(0.75 + ln(depth) * ln(move#) / 2.25).
    static ref LMR_TABLE: [[u8; 64]; 64] = {
        let mut table = [[0u8; 64]; 64];
        for depth in 1..64 {
            for move_number in 1..64 {
                let r = 0.75 + (depth as f64).ln() * (move_number as f64).ln() / 2.25;
                table[depth][move_number] = r.round() as u8;
            }
        }
        table
    };
}

#[inline]
fn lmr_reduction(depth: u8, move_number: usize) -> u8 {
    LMR_TABLE[(depth as usize).min(63)][move_number.min(63)]
}

/// Returns a move to play when the search could not produce one: the
/// first capture if any, otherwise the first legal move.
pub fn emergency_move(board: &Board) -> Option<Move> {
    let moves = movegen::generate_all(board);
    moves.iter()
         .find(|&&m| rules::is_capture(board, m))
         .or_else(|| moves.first())
         .cloned()
}

/// The search engine.
///
/// Owns the transposition table, the move ordering tables, the
/// evaluator, the quiescence cache, and the statistics. Nothing in
/// here is shared between engines.
pub struct SearchEngine {
    tt: TranspositionTable,
    ordering: MoveOrdering,
    evaluator: Evaluator,
    qcache: QuiescenceCache,
    statistics: SearchStatistics,
    cancel: CancelSignal,
    options: EngineOptions,
}

impl SearchEngine {
    pub fn new(profile: EvalProfile) -> SearchEngine {
        SearchEngine::with_options(profile, EngineOptions::default())
    }

    pub fn with_options(profile: EvalProfile, options: EngineOptions) -> SearchEngine {
        SearchEngine {
            tt: TranspositionTable::new(options.tt_capacity),
            ordering: MoveOrdering::new(),
            evaluator: Evaluator::new(profile),
            qcache: QuiescenceCache::new(options.quiescence_cache_capacity),
            statistics: SearchStatistics::default(),
            cancel: CancelSignal::new(),
            options,
        }
    }

    /// Returns a handle on the cancel signal, for the scheduling
    /// side.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Makes the engine poll a caller-owned cancel signal (the
    /// deepening driver shares one signal between the scheduler and
    /// the worker).
    pub fn use_cancel_signal(&mut self, signal: CancelSignal) {
        self.cancel = signal;
    }

    pub fn statistics(&self) -> &SearchStatistics {
        &self.statistics
    }

    /// Switches the scoring profile (between searches).
    pub fn set_profile(&mut self, profile: EvalProfile) {
        self.evaluator = Evaluator::new(profile);
        self.qcache.clear();
    }

    #[inline]
    pub fn profile(&self) -> EvalProfile {
        self.evaluator.profile()
    }

    /// Searches the position to the given depth and returns the best
    /// move for the side to move.
    ///
    /// Returns `Err(SearchError::IllegalPosition)` when the input
    /// violates a board invariant, and `Err(SearchError::Terminated)`
    /// when the cancel signal fired before the iteration completed.
    pub fn find_best_move(&mut self,
                          board: &Board,
                          depth: u8,
                          strategy: Strategy)
                          -> Result<SearchReport, SearchError> {
        self.find_best_move_window(board, depth, strategy, VALUE_MIN, VALUE_MAX)
    }

    /// The window form of `find_best_move`, used by the deepening
    /// driver for its aspiration windows. A value at or outside the
    /// window is a fail low/high; the caller widens and re-searches.
    pub fn find_best_move_window(&mut self,
                                 board: &Board,
                                 depth: u8,
                                 strategy: Strategy,
                                 lower_bound: Value,
                                 upper_bound: Value)
                                 -> Result<SearchReport, SearchError> {
        debug_assert!(lower_bound < upper_bound);
        board.validate().map_err(|_| {
            warn!("refusing to search an invalid position: {}", board);
            SearchError::IllegalPosition
        })?;
        if self.cancel.is_set() {
            return Err(SearchError::Terminated);
        }
        let start = Instant::now();
        let depth = depth.clamp(1, MAX_DEPTH);
        self.statistics = SearchStatistics::default();
        self.ordering.new_iteration();

        if let Some(value) = evaluation::evaluate_terminal(board, 0) {
            return Ok(SearchReport {
                best_move: None,
                value: relative(board, value),
                depth,
                searched_nodes: 0,
                time_ms: elapsed_ms(start),
            });
        }

        let mut moves = movegen::generate_all(board);
        if moves.is_empty() {
            // Stalemate: no legal move in an undecided position.
            return Ok(SearchReport {
                best_move: None,
                value: 0,
                depth,
                searched_nodes: 0,
                time_ms: elapsed_ms(start),
            });
        }

        let tt_move = self.tt.probe(board.hash()).map_or(0, |e| e.move_digest());
        let threat_report = threats::detect_with_cutoff(board, self.options.must_defend_cutoff);
        self.ordering.order_moves(board, &mut moves, 0, tt_move, Some(&threat_report));

        let mut alpha = lower_bound;
        let mut best = VALUE_MIN;
        let mut best_move = moves[0];
        for (i, &m) in moves.iter().enumerate() {
            let mut child = board.clone();
            child.do_move(m);
            let gives_check = rules::in_check(&child, child.us());
            let new_depth = if gives_check { depth } else { depth - 1 };

            let value = if i == 0 || !strategy.uses_scout_windows() {
                -self.node(&child, new_depth, -upper_bound, -alpha, 1, i == 0, true, strategy)?
            } else {
                let scout = -self.node(&child, new_depth, -alpha - 1, -alpha, 1, false, true,
                                       strategy)?;
                if scout > alpha && scout < upper_bound {
                    -self.node(&child, new_depth, -upper_bound, -alpha, 1, false, true, strategy)?
                } else {
                    scout
                }
            };

            if value > best {
                best = value;
                best_move = m;
            }
            if value > alpha {
                alpha = value;
                self.ordering.set_pv_move(0, m);
            }
            if alpha >= upper_bound {
                break;
            }
        }

        let bound = if best <= lower_bound {
            BOUND_UPPER
        } else if best >= upper_bound {
            BOUND_LOWER
        } else {
            BOUND_EXACT
        };
        self.tt.store(board.hash(), best, bound, depth as i16, best_move.digest());

        Ok(SearchReport {
            best_move: Some(best_move),
            value: best,
            depth,
            searched_nodes: self.statistics.nodes + self.statistics.quiescence_nodes,
            time_ms: elapsed_ms(start),
        })
    }

    /// Searches with an explicit window and returns the value from
    /// Red's perspective (`maximizing` must say whether Red is the
    /// side to move). Internal callers only; the deepening driver
    /// re-enters through `find_best_move`.
    pub fn search(&mut self,
                  board: &Board,
                  depth: u8,
                  alpha: Value,
                  beta: Value,
                  maximizing: bool,
                  strategy: Strategy)
                  -> Result<Value, SearchError> {
        debug_assert_eq!(maximizing, board.red_to_move());
        board.validate().map_err(|_| SearchError::IllegalPosition)?;
        let (lower, upper) = if maximizing { (alpha, beta) } else { (-beta, -alpha) };
        let value = self.node(board, depth.min(MAX_DEPTH), lower, upper, 0, true, true, strategy)?;
        Ok(if maximizing { value } else { -value })
    }

    /// One alpha-beta node, negamax convention. Everything the four
    /// strategies share lives here.
    fn node(&mut self,
            board: &Board,
            depth: u8,
            mut alpha: Value,
            beta: Value,
            ply: usize,
            is_pv: bool,
            allow_null: bool,
            strategy: Strategy)
            -> Result<Value, TerminatedSearch> {
        self.statistics.nodes += 1;
        if self.cancel.is_set() {
            return Err(TerminatedSearch);
        }

        if let Some(value) = evaluation::evaluate_terminal(board, ply) {
            return Ok(relative(board, value));
        }
        if ply >= MAX_PLY {
            return Ok(self.evaluator.evaluate_relative(board, ply));
        }

        let alpha_orig = alpha;

        // Consult the transposition table.
        let mut tt_move: MoveDigest = 0;
        if let Some(entry) = self.tt.probe(board.hash()) {
            tt_move = entry.move_digest();
            if !is_pv && entry.depth() >= depth as i16 {
                let value = entry.value();
                let usable = match entry.bound() {
                    BOUND_EXACT => true,
                    BOUND_LOWER => value >= beta,
                    BOUND_UPPER => value <= alpha,
                    _ => false,
                };
                if usable {
                    self.statistics.tt_hits += 1;
                    return Ok(value);
                }
            }
        }

        let in_check = rules::in_check(board, board.us());

        // The horizon: quiescence or static evaluation, depending on
        // the strategy.
        if depth == 0 {
            return self.leaf(board, alpha, beta, ply, strategy);
        }

        let is_endgame = endgame(board);

        // Reverse futility pruning (stand-pat pruning): when the
        // static evaluation beats beta by a depth-scaled margin, the
        // node will almost surely fail high anyway.
        if !is_pv && !in_check && !is_endgame && depth <= FUTILITY_MAX_DEPTH &&
           beta.abs() < MATE_THRESHOLD {
            let eval = self.evaluator.evaluate_relative(board, ply);
            if eval - REVERSE_FUTILITY_MARGINS[depth as usize] >= beta {
                return Ok(eval);
            }
        }

        // Null move pruning: give the opponent a free shot; if the
        // position still fails high, a real move will too.
        if allow_null && !is_pv && !in_check && !is_endgame && depth >= NULL_MOVE_MIN_DEPTH &&
           has_tower_material(board) {
            let reduction = if depth >= 7 { 4 } else { 3 };
            let mut child = board.clone();
            child.do_null();
            let reduced = depth.saturating_sub(1 + reduction);
            let value =
                -self.node(&child, reduced, -beta, -beta + 1, ply + 1, false, false, strategy)?;
            if value >= beta {
                let verified = if depth >= NULL_MOVE_VERIFICATION_DEPTH &&
                                  value >= beta + TOWER_SEGMENT_VALUE {
                    // Large cutoffs at high depth are re-checked with
                    // a reduced real search.
                    self.node(board, depth - reduction, alpha, beta, ply, false, false,
                              strategy)? >= beta
                } else {
                    true
                };
                if verified {
                    self.statistics.null_move_cutoffs += 1;
                    // Null-move mate scores are not trustworthy.
                    return Ok(if value >= MATE_THRESHOLD { beta } else { value });
                }
            }
        }

        let mut moves = movegen::generate_all(board);
        if moves.is_empty() {
            // No legal move in an undecided position: a dead draw.
            return Ok(0);
        }

        // The threat detector is consulted where its cost pays off:
        // on the principal variation and in check.
        let threat_report: Option<ThreatReport> = if is_pv || in_check {
            Some(threats::detect_with_cutoff(board, self.options.must_defend_cutoff))
        } else {
            None
        };
        self.ordering.order_moves(board, &mut moves, ply, tt_move, threat_report.as_ref());

        let futility_eval = if !is_pv && !in_check && depth <= FUTILITY_MAX_DEPTH {
            Some(self.evaluator.evaluate_relative(board, ply))
        } else {
            None
        };

        let mut best = VALUE_MIN;
        let mut best_move = Move::invalid();
        let mut searched = 0usize;
        for &m in moves.iter() {
            let is_capture = rules::is_capture(board, m);
            let is_winning = rules::is_winning_move(board, m);
            let mut child = board.clone();
            child.do_move(m);
            let gives_check = rules::in_check(&child, child.us());

            // Futility pruning: a quiet, non-checking move at
            // shallow depth that can not lift the evaluation to
            // alpha is skipped (never the first move).
            if let Some(eval) = futility_eval {
                if searched > 0 && !is_capture && !is_winning && !gives_check &&
                   eval + FUTILITY_MARGINS[depth as usize] <= alpha {
                    self.statistics.futility_prunes += 1;
                    searched += 1;
                    continue;
                }
            }

            // Check extension.
            let new_depth = if gives_check { depth } else { depth - 1 };

            let value = if searched == 0 {
                -self.node(&child, new_depth, -beta, -alpha, ply + 1, is_pv, true, strategy)?
            } else {
                let mut value = alpha + 1;

                // Late move reductions: quiet moves far down the
                // list are first probed shallower.
                if depth >= LMR_MIN_DEPTH && searched >= LMR_MOVE_THRESHOLD && !in_check &&
                   !is_capture && !is_winning && !gives_check {
                    let r = lmr_reduction(depth, searched).min(depth.saturating_sub(2));
                    if r > 0 {
                        self.statistics.lmr_reductions += 1;
                        value = -self.node(&child, new_depth.saturating_sub(r), -alpha - 1,
                                           -alpha, ply + 1, false, true, strategy)?;
                    }
                }

                if value > alpha {
                    if strategy.uses_scout_windows() {
                        value = -self.node(&child, new_depth, -alpha - 1, -alpha, ply + 1, false,
                                           true, strategy)?;
                        if value > alpha && value < beta {
                            value = -self.node(&child, new_depth, -beta, -alpha, ply + 1, is_pv,
                                               true, strategy)?;
                        }
                    } else {
                        value = -self.node(&child, new_depth, -beta, -alpha, ply + 1, false, true,
                                           strategy)?;
                    }
                }
                value
            };
            searched += 1;

            if value > best {
                best = value;
                best_move = m;
            }
            if value > alpha {
                alpha = value;
                if is_pv {
                    self.ordering.set_pv_move(ply, m);
                }
            }
            if alpha >= beta {
                self.statistics.beta_cutoffs += 1;
                if !is_capture {
                    self.ordering.record_cutoff(m, depth, ply);
                }
                break;
            }
        }

        let bound = if best <= alpha_orig {
            BOUND_UPPER
        } else if best >= beta {
            BOUND_LOWER
        } else {
            BOUND_EXACT
        };
        self.tt.store(board.hash(), best, bound, depth as i16, best_move.digest());
        Ok(best)
    }

    /// The horizon hook: quiescence for the `*Quiescence` strategies,
    /// the static evaluation otherwise.
    fn leaf(&mut self,
            board: &Board,
            alpha: Value,
            beta: Value,
            ply: usize,
            strategy: Strategy)
            -> Result<Value, TerminatedSearch> {
        if strategy.uses_quiescence() {
            let mut ctx = QsearchContext {
                evaluator: &self.evaluator,
                cache: &mut self.qcache,
                statistics: &mut self.statistics,
                cancel: &self.cancel,
            };
            quiescence::qsearch(&mut ctx,
                                board,
                                alpha,
                                beta,
                                ply,
                                self.evaluator.profile().max_quiescence_depth())
        } else {
            Ok(self.evaluator.evaluate_relative(board, ply))
        }
    }
}

#[inline]
fn relative(board: &Board, value: Value) -> Value {
    if board.red_to_move() {
        value
    } else {
        -value
    }
}

#[inline]
fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Checks if the side to move has enough tower material for the
/// null-move assumption to hold.
fn has_tower_material(board: &Board) -> bool {
    segment_count(board, board.us()) >= 2
}

/// Endgame detection: very little tower material left in total.
fn endgame(board: &Board) -> bool {
    segment_count(board, RED) + segment_count(board, BLUE) <= ENDGAME_SEGMENT_LIMIT
}

fn segment_count(board: &Board, color: Color) -> usize {
    let mut segments = 0;
    let mut towers = board.towers(color);
    while towers != 0 {
        let sq = crate::bitsets::bitscan_forward_and_reset(&mut towers);
        segments += board.height(color, sq);
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, START_POSITION};

    const ALL_STRATEGIES: [Strategy; 4] = [Strategy::AlphaBeta,
                                           Strategy::AlphaBetaQuiescence,
                                           Strategy::Pvs,
                                           Strategy::PvsQuiescence];

    fn engine() -> SearchEngine {
        SearchEngine::new(EvalProfile::Quick)
    }

    #[test]
    fn test_depth_one_returns_legal_move() {
        let board = Board::from_notation(START_POSITION).unwrap();
        let legal = movegen::generate_all(&board);
        for strategy in ALL_STRATEGIES {
            let mut e = engine();
            let report = e.find_best_move(&board, 1, strategy).unwrap();
            let best = report.best_move.unwrap();
            assert!(legal.contains(&best), "{:?} returned illegal move {}", strategy, best);
        }
        // At depth 1 with plain alpha-beta, every searched node is a
        // root child.
        let mut e = engine();
        let report = e.find_best_move(&board, 1, Strategy::AlphaBeta).unwrap();
        assert!(report.searched_nodes <= legal.len() as NodeCount);
    }

    #[test]
    fn test_tactical_position_depth_three() {
        let board = Board::from_notation("7/7/3b33/BG1r43/3RG3/7/7 r").unwrap();
        let mut e = engine();
        let report = e.find_best_move(&board, 3, Strategy::PvsQuiescence).unwrap();
        let best = report.best_move.unwrap();
        assert!(movegen::generate_all(&board).contains(&best));
        assert!(report.value.abs() < CASTLE_REACH);
    }

    #[test]
    fn test_guard_advancement_is_found() {
        let board = Board::from_notation("3RG3/7/7/7/7/7/3BG3 r").unwrap();
        let mut e = engine();
        let report = e.find_best_move(&board, 5, Strategy::PvsQuiescence).unwrap();
        // The position is symmetric except for the move; advancing
        // the guard is all Red can gain.
        assert!(report.value > 0);
        assert!(report.best_move.is_some());
    }

    #[test]
    fn test_guard_capture_found_by_all_strategies() {
        // Red captures the blue guard in one move.
        let board = Board::from_notation("3RG3/7/7/3r23/7/3BG3/7 r").unwrap();
        let winning = Move::new(D4, D2, 2);
        for strategy in ALL_STRATEGIES {
            for depth in [1, 2, 3] {
                let mut e = engine();
                let report = e.find_best_move(&board, depth, strategy).unwrap();
                assert_eq!(report.best_move, Some(winning),
                           "{:?} at depth {} missed the guard capture", strategy, depth);
                assert!(report.value >= MATE_THRESHOLD / 2);
            }
        }
    }

    #[test]
    fn test_castle_run_found() {
        // Red's guard stands next to the empty blue castle.
        let board = Board::from_notation("7/7/7/7/7/3RG3/2BG4 r").unwrap();
        let mut e = engine();
        let report = e.find_best_move(&board, 2, Strategy::AlphaBetaQuiescence).unwrap();
        assert_eq!(report.best_move, Some(Move::new(D2, D1, 1)));
        assert!(report.value >= MATE_THRESHOLD);
    }

    #[test]
    fn test_search_is_deterministic() {
        let board = Board::from_notation("7/7/3b33/BG1r43/3RG3/7/7 r").unwrap();
        let run = || {
            let mut e = engine();
            let r = e.find_best_move(&board, 3, Strategy::PvsQuiescence).unwrap();
            (r.best_move, r.value)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_faster_win_scores_higher() {
        let mut e = engine();
        // Mate in one: step onto the blue castle.
        let mate_in_one = Board::from_notation("7/7/7/7/7/3RG3/BG6 r").unwrap();
        let quick = e.find_best_move(&mate_in_one, 4, Strategy::PvsQuiescence).unwrap();
        // Mate in three: two guard steps away.
        let mut e = engine();
        let mate_in_three = Board::from_notation("7/7/7/7/3RG3/7/BG6 r").unwrap();
        let slow = e.find_best_move(&mate_in_three, 4, Strategy::PvsQuiescence).unwrap();
        assert!(quick.value >= MATE_THRESHOLD);
        assert!(slow.value >= MATE_THRESHOLD);
        assert!(quick.value > slow.value,
                "mate in 1 ({}) should outscore mate in 3 ({})", quick.value, slow.value);
    }

    #[test]
    fn test_terminal_position_reports_no_move() {
        // Blue's guard is gone; there is nothing to search.
        let board = Board::from_notation("3RG3/7/7/7/7/7/7 r").unwrap();
        let mut e = engine();
        let report = e.find_best_move(&board, 3, Strategy::AlphaBeta).unwrap();
        assert_eq!(report.best_move, None);
        assert!(report.value >= MATE_THRESHOLD);
    }

    #[test]
    fn test_cancelled_search_returns_terminated() {
        let board = Board::from_notation(START_POSITION).unwrap();
        let mut e = engine();
        e.cancel_signal().set();
        assert_eq!(e.find_best_move(&board, 3, Strategy::Pvs).err(),
                   Some(SearchError::Terminated));
    }

    #[test]
    fn test_search_window_form_matches_find_best_move() {
        let board = Board::from_notation("7/7/3b33/BG1r43/3RG3/7/7 r").unwrap();
        let mut e = engine();
        let report = e.find_best_move(&board, 2, Strategy::AlphaBeta).unwrap();
        let mut e = engine();
        let value = e.search(&board, 2, VALUE_MIN, VALUE_MAX, true, Strategy::AlphaBeta).unwrap();
        // `search` reports from Red's perspective; Red is to move.
        assert_eq!(value, report.value);
    }

    #[test]
    fn test_emergency_move_prefers_captures() {
        let board = Board::from_notation("3RG3/7/7/1r31b33/7/7/3BG3 r").unwrap();
        // No capture available (the b3 is too tall from distance 2):
        // any legal move will do.
        assert!(emergency_move(&board).is_some());
        let board = Board::from_notation("3RG3/7/7/1r31b23/7/7/3BG3 r").unwrap();
        let m = emergency_move(&board).unwrap();
        assert!(rules::is_capture(&board, m));
    }
}
