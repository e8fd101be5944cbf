//! Implements the quiescence search.
//!
//! Quiescence search is a restricted search which considers only a
//! limited set of moves (captures, guard runs onto the opposing
//! castle, moves that attack the enemy guard, and guard escapes when
//! the guard is attacked). The goal is to statically evaluate only
//! "quiet" positions -- positions where there are no winning tactical
//! moves to be made. Although this search can cheaply and correctly
//! resolve many simple tactical issues, it is completely blind to the
//! more complex ones.
//!
//! Termination is guaranteed: the tactical move set shrinks the
//! material on the board, the depth is bounded by the profile's
//! quiescence limit, and an empty tactical set returns the static
//! evaluation ("standing pat").

use std::collections::HashMap;
use crate::basetypes::*;
use crate::board::Board;
use crate::evaluation::{self, Evaluator};
use crate::movegen;
use crate::rules;
use crate::search::{CancelSignal, SearchStatistics, TerminatedSearch};
use crate::see;
use crate::tt::{BoundType, BOUND_EXACT, BOUND_LOWER, BOUND_UPPER};

// Safety margin for delta pruning.
const DELTA_MARGIN: Value = 150;

// Captures that lose clearly more than this are not searched.
const SEE_PRUNE_THRESHOLD: Value = -50;

#[derive(Clone, Copy)]
struct CacheEntry {
    value: Value,
    depth: i8,
    bound: BoundType,
}

/// A small bounded cache for quiescence results.
pub struct QuiescenceCache {
    entries: HashMap<u64, CacheEntry>,
    capacity: usize,
}

impl QuiescenceCache {
    pub fn new(capacity: usize) -> QuiescenceCache {
        QuiescenceCache {
            entries: HashMap::with_capacity(capacity),
            capacity,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn probe(&self, hash: u64, depth: i8, alpha: Value, beta: Value) -> Option<Value> {
        let entry = self.entries.get(&hash)?;
        if entry.depth < depth {
            return None;
        }
        match entry.bound {
            BOUND_EXACT => Some(entry.value),
            BOUND_LOWER if entry.value >= beta => Some(entry.value),
            BOUND_UPPER if entry.value <= alpha => Some(entry.value),
            _ => None,
        }
    }

    fn store(&mut self, hash: u64, value: Value, depth: i8, bound: BoundType) {
        if self.entries.len() >= self.capacity {
            // The cache is tiny and short-lived; a flush is cheaper
            // than bookkeeping an eviction order.
            self.entries.clear();
        }
        self.entries.insert(hash, CacheEntry { value, depth, bound });
    }
}

/// The borrowed pieces of engine state the quiescence search works
/// with.
pub struct QsearchContext<'a> {
    pub evaluator: &'a Evaluator,
    pub cache: &'a mut QuiescenceCache,
    pub statistics: &'a mut SearchStatistics,
    pub cancel: &'a CancelSignal,
}

/// Resolves the tactical noise below a horizon leaf and returns a
/// value from the perspective of the side to move.
pub fn qsearch(ctx: &mut QsearchContext,
               board: &Board,
               mut alpha: Value,
               beta: Value,
               ply: usize,
               depth_left: i8)
               -> Result<Value, TerminatedSearch> {
    ctx.statistics.quiescence_nodes += 1;
    if ctx.cancel.is_set() {
        return Err(TerminatedSearch);
    }

    if let Some(value) = evaluation::evaluate_terminal(board, ply) {
        return Ok(relative(board, value));
    }

    // Standing pat: the side to move is not obliged to continue the
    // tactics, so the static evaluation bounds the score from below.
    let stand_pat = ctx.evaluator.evaluate_relative(board, ply);
    if depth_left <= 0 || ply >= MAX_PLY {
        return Ok(stand_pat);
    }
    if stand_pat >= beta {
        return Ok(beta);
    }

    if let Some(value) = ctx.cache.probe(board.hash(), depth_left, alpha, beta) {
        return Ok(value);
    }

    // Delta pruning: even winning the biggest capture possible plus
    // a margin will not lift this position to `alpha`.
    if stand_pat + GUARD_VALUE + DELTA_MARGIN < alpha {
        return Ok(stand_pat);
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }
    let alpha_orig = alpha;

    let mut moves = movegen::generate_tactical(board);
    if moves.is_empty() {
        return Ok(stand_pat);
    }
    // Best victims first.
    moves.sort_by_key(|&m| -rules::victim_value(board, m));

    let mut best = stand_pat;
    for m in moves {
        let victim = rules::victim_value(board, m);
        let winning = rules::is_winning_move(board, m);

        // Per-move delta pruning.
        if !winning && stand_pat + victim + DELTA_MARGIN < alpha {
            continue;
        }
        // Clearly losing captures are not worth resolving.
        if !winning && victim > 0 && see::evaluate_exchange(board, m) < SEE_PRUNE_THRESHOLD {
            continue;
        }

        let mut child = board.clone();
        child.do_move(m);
        let value = -qsearch(ctx, &child, -beta, -alpha, ply + 1, depth_left - 1)?;

        if value >= beta {
            ctx.cache.store(board.hash(), value, depth_left, BOUND_LOWER);
            return Ok(beta);
        }
        if value > best {
            best = value;
            if value > alpha {
                alpha = value;
            }
        }
    }

    let bound = if best <= alpha_orig { BOUND_UPPER } else { BOUND_EXACT };
    ctx.cache.store(board.hash(), best, depth_left, bound);
    Ok(alpha)
}

#[inline]
fn relative(board: &Board, value: Value) -> Value {
    if board.red_to_move() {
        value
    } else {
        -value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::EvalProfile;

    fn run_qsearch(notation: &str, depth: i8) -> Value {
        let board = Board::from_notation(notation).unwrap();
        let evaluator = Evaluator::new(EvalProfile::Quick);
        let mut cache = QuiescenceCache::new(1024);
        let mut statistics = SearchStatistics::default();
        let cancel = CancelSignal::new();
        let mut ctx = QsearchContext {
            evaluator: &evaluator,
            cache: &mut cache,
            statistics: &mut statistics,
            cancel: &cancel,
        };
        qsearch(&mut ctx, &board, VALUE_MIN, VALUE_MAX, 0, depth).unwrap()
    }

    #[test]
    fn test_quiet_position_stands_pat() {
        let board = Board::from_notation("3RG3/7/7/3r23/7/7/3BG3 b").unwrap();
        let evaluator = Evaluator::new(EvalProfile::Quick);
        let mut cache = QuiescenceCache::new(1024);
        let mut statistics = SearchStatistics::default();
        let cancel = CancelSignal::new();
        let mut ctx = QsearchContext {
            evaluator: &evaluator,
            cache: &mut cache,
            statistics: &mut statistics,
            cancel: &cancel,
        };
        let value = qsearch(&mut ctx, &board, VALUE_MIN, VALUE_MAX, 0, 8).unwrap();
        // Blue has nothing tactical, so the search stands pat.
        assert_eq!(value, evaluator.evaluate_relative(&board, 0));
    }

    #[test]
    fn test_hanging_guard_is_taken() {
        // Red to move wins the blue guard.
        let value = run_qsearch("3RG3/7/7/3r23/7/3BG3/7 r", 8);
        assert!(value >= MATE_THRESHOLD / 2);
    }

    #[test]
    fn test_terminated_search_propagates() {
        let board = Board::from_notation("3RG3/7/7/3r23/7/3BG3/7 r").unwrap();
        let evaluator = Evaluator::new(EvalProfile::Quick);
        let mut cache = QuiescenceCache::new(1024);
        let mut statistics = SearchStatistics::default();
        let cancel = CancelSignal::new();
        cancel.set();
        let mut ctx = QsearchContext {
            evaluator: &evaluator,
            cache: &mut cache,
            statistics: &mut statistics,
            cancel: &cancel,
        };
        assert!(qsearch(&mut ctx, &board, VALUE_MIN, VALUE_MAX, 0, 8).is_err());
    }

    #[test]
    fn test_cache_is_bounded() {
        let mut cache = QuiescenceCache::new(8);
        for hash in 0..1000u64 {
            cache.store(hash, 0, 4, BOUND_EXACT);
        }
        assert!(cache.entries.len() <= 8);
    }
}
