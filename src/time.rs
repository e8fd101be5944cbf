//! Implements the time manager.
//!
//! Given the remaining clock, the move number, and the position, the
//! manager allocates a wall-clock budget for the next move. The
//! allocation starts from an even division of the remaining time over
//! the expected rest of the game and is then scaled by the game
//! phase, by the tactical complexity of the position, and by a few
//! situational multipliers, with hard floors and ceilings so that the
//! engine can neither stall nor flag.

use std::cmp::max;
use crate::basetypes::*;
use crate::bitsets::bitscan_forward_and_reset;
use crate::board::Board;
use crate::evaluation::{EvalProfile, Evaluator};
use crate::movegen;
use crate::rules;
use crate::threats;

/// The phase of the game, estimated from material and move number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

/// Estimates the game phase.
pub fn game_phase(board: &Board, move_number: u32) -> GamePhase {
    let segments = segment_total(board);
    if segments <= 5 {
        GamePhase::Endgame
    } else if move_number < 10 && segments >= 12 {
        GamePhase::Opening
    } else {
        GamePhase::Middlegame
    }
}

// Clock states requiring immediate play.
const PANIC_THRESHOLD_MS: u64 = 2_000;
const EMERGENCY_THRESHOLD_MS: u64 = 8_000;

/// Allocates time budgets for moves.
pub struct TimeManager;

impl TimeManager {
    pub fn new() -> TimeManager {
        TimeManager
    }

    /// Returns the wall-clock budget in milliseconds for the next
    /// move.
    pub fn allocate(&self, remaining_ms: u64, move_number: u32, board: &Board) -> u64 {
        // With almost no clock left, any deep thought loses on time.
        if remaining_ms < PANIC_THRESHOLD_MS {
            return max(150, remaining_ms / 12);
        }
        if remaining_ms <= EMERGENCY_THRESHOLD_MS {
            return max(400, remaining_ms / 6);
        }

        let moves_left = max(40u64.saturating_sub(move_number as u64), 10);
        let mut budget = remaining_ms / max(moves_left, 3);
        if move_number < 20 {
            budget = budget * 13 / 10;
        }

        budget = match game_phase(board, move_number) {
            GamePhase::Opening => budget * 8 / 10,
            GamePhase::Middlegame => budget,
            GamePhase::Endgame => budget * 3,
        };

        // Complexity: tactical move count, guard danger, evaluation
        // spread, and material imbalance, mapped into x0.7 .. x2.5.
        budget = budget * complexity_permille(board) / 1000;

        // Situational multipliers.
        let report = threats::detect(board);
        let evaluator = Evaluator::new(EvalProfile::UltraFast);
        let value = evaluator.evaluate_relative(board, 0);
        if report.in_check || report.must_defend {
            // Critical position.
            budget *= 4;
        } else if value >= 8 * TOWER_SEGMENT_VALUE {
            // Clear advantage: invest time to convert it.
            budget *= 3;
        } else if value.abs() <= TOWER_SEGMENT_VALUE && report.threat_level > 0 {
            // A close decision point.
            budget = budget * 18 / 10;
        }

        // Safety factor and hard bounds.
        budget = budget * 85 / 100;
        budget.clamp(max(200, remaining_ms / 80), remaining_ms / 3)
    }
}

impl Default for TimeManager {
    fn default() -> Self {
        TimeManager::new()
    }
}

/// Maps the position's complexity into 700..=2500 per-mille.
fn complexity_permille(board: &Board) -> u64 {
    let mut score: u64 = 0;

    let tactical = movegen::generate_tactical(board).len() as u64;
    score += tactical.min(16);

    if rules::in_check(board, board.us()) || rules::in_check(board, board.them()) {
        score += 10;
    }

    let red = segment_count(board, RED) as i64;
    let blue = segment_count(board, BLUE) as i64;
    if (red - blue).abs() <= 1 {
        // Balanced material keeps every line alive.
        score += 5;
    }

    let evaluator = Evaluator::new(EvalProfile::UltraFast);
    if evaluator.evaluate(board, 0).abs() <= 2 * TOWER_SEGMENT_VALUE {
        score += 5;
    }

    700 + score.min(36) * 50
}

fn segment_total(board: &Board) -> usize {
    segment_count(board, RED) + segment_count(board, BLUE)
}

fn segment_count(board: &Board, color: Color) -> usize {
    let mut segments = 0;
    let mut towers = board.towers(color);
    while towers != 0 {
        let sq = bitscan_forward_and_reset(&mut towers);
        segments += board.height(color, sq);
    }
    segments
}
