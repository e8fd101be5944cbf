//! Implements the static evaluator.
//!
//! The evaluation is always calculated from Red's perspective
//! (positive values are good for Red). It is the sum of a number of
//! sub-terms -- material with piece-square tables, tactical threats,
//! guard safety, mobility and board control, and piece coordination
//! -- combined with integer weights that depend on the active scoring
//! profile. The profile is selected once per search from the
//! remaining time budget, so that a blitz search spends its nodes on
//! depth rather than on expensive leaf evaluations.

use std::time::Duration;
use crate::basetypes::*;
use crate::bitsets::*;
use crate::board::Board;
use crate::geometry::BoardGeometry;
use crate::movegen;
use crate::rules;

/// The scoring profile of the evaluator.
///
/// Profiles trade evaluation quality for speed. The driver selects
/// one from the remaining clock before a search starts, and the
/// profile is then fixed for the whole search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalProfile {
    /// Material and halved piece-square tables only (under 2 seconds
    /// on the clock).
    UltraFast,

    /// Material, threats, guard safety, mobility, and basic
    /// coordination at natural weights (2 to 8 seconds).
    Quick,

    /// The same components at calibrated percentage weights, plus a
    /// small tempo term (8 to 25 seconds).
    Balanced,

    /// Full-weight components plus strategic control (over 25
    /// seconds).
    Enhanced,
}

impl EvalProfile {
    /// Selects the profile for the given remaining time budget.
    pub fn for_remaining_time(remaining: Duration) -> EvalProfile {
        let ms = remaining.as_millis();
        if ms < 2_000 {
            EvalProfile::UltraFast
        } else if ms < 8_000 {
            EvalProfile::Quick
        } else if ms <= 25_000 {
            EvalProfile::Balanced
        } else {
            EvalProfile::Enhanced
        }
    }

    /// Returns how deep the quiescence search may go under this
    /// profile.
    pub fn max_quiescence_depth(self) -> i8 {
        match self {
            EvalProfile::UltraFast => 8,
            EvalProfile::Quick => 11,
            EvalProfile::Balanced => 14,
            EvalProfile::Enhanced => 17,
        }
    }
}

/// The static evaluator.
pub struct Evaluator {
    profile: EvalProfile,
}

impl Evaluator {
    pub fn new(profile: EvalProfile) -> Evaluator {
        Evaluator { profile }
    }

    #[inline]
    pub fn profile(&self) -> EvalProfile {
        self.profile
    }

    /// Statically evaluates the position from Red's perspective.
    ///
    /// `ply` is the distance from the search root, used to prefer
    /// faster wins and slower losses in terminal positions.
    pub fn evaluate(&self, board: &Board, ply: usize) -> Value {
        if let Some(value) = evaluate_terminal(board, ply) {
            return value;
        }
        let value = match self.profile {
            EvalProfile::UltraFast => material_and_pst(board, true),
            EvalProfile::Quick => {
                material_and_pst(board, false) + tactical_threats(board) +
                guard_safety(board) + mobility_and_control(board) +
                coordination(board)
            }
            EvalProfile::Balanced => {
                (material_and_pst(board, false) * 30 + tactical_threats(board) * 25 +
                 guard_safety(board) * 25 + mobility_and_control(board) * 15 +
                 coordination(board) * 5) / 100 + tempo(board)
            }
            EvalProfile::Enhanced => {
                material_and_pst(board, false) + tactical_threats(board) +
                guard_safety(board) + mobility_and_control(board) +
                coordination(board) + strategic_control(board) + tempo(board)
            }
        };
        // Only terminal positions may reach the mate range.
        value.clamp(-(MATE_THRESHOLD - 1), MATE_THRESHOLD - 1)
    }

    /// Statically evaluates the position from the perspective of the
    /// side to move (the form the negamax search consumes).
    #[inline]
    pub fn evaluate_relative(&self, board: &Board, ply: usize) -> Value {
        let value = self.evaluate(board, ply);
        if board.red_to_move() {
            value
        } else {
            -value
        }
    }
}

/// Detects won/lost positions.
///
/// Returns `±(CASTLE_REACH - ply)` when a guard has been captured or
/// stands on the opposing castle, so that wins found closer to the
/// root score higher.
pub fn evaluate_terminal(board: &Board, ply: usize) -> Option<Value> {
    rules::winner(board).map(|color| {
        let magnitude = CASTLE_REACH - ply as Value;
        if color == RED {
            magnitude
        } else {
            -magnitude
        }
    })
}

// Piece-square table for towers, indexed [rank][file] from Red's
// perspective (Red advances toward rank 1). Blue reads it with the
// rank mirrored.
static TOWER_PST: [[Value; 7]; 7] = [
    [30, 35, 40, 45, 40, 35, 30],
    [25, 30, 35, 40, 35, 30, 25],
    [20, 25, 30, 35, 30, 25, 20],
    [15, 20, 25, 30, 25, 20, 15],
    [10, 15, 20, 25, 20, 15, 10],
    [5, 10, 15, 20, 15, 10, 5],
    [0, 5, 10, 15, 10, 5, 0],
];

// Piece-square table for guards. The big values sit on the file
// leading to the opposing castle.
static GUARD_PST: [[Value; 7]; 7] = [
    [40, 60, 80, 120, 80, 60, 40],
    [30, 45, 60, 90, 60, 45, 30],
    [20, 30, 40, 60, 40, 30, 20],
    [10, 20, 30, 40, 30, 20, 10],
    [5, 10, 20, 30, 20, 10, 5],
    [0, 5, 10, 20, 10, 5, 0],
    [0, 0, 5, 10, 5, 0, 0],
];

// Convex bonus for tall stacks.
const HEIGHT_BONUS_FACTOR: Value = 8;

// Flat bonus for a tower that has crossed the midline.
const MIDLINE_BONUS: Value = 20;

// Per-rank bonus for guard advancement toward the opposing castle.
const GUARD_ADVANCE_BONUS: Value = 15;

#[inline]
fn pst_lookup(table: &[[Value; 7]; 7], color: Color, square: Square) -> Value {
    let r = if color == RED { rank(square) } else { RANK_7 - rank(square) };
    table[r][file(square)]
}

/// Material and piece-square terms.
///
/// Each tower contributes its segment value, a positional bonus
/// scaled by `min(height, 3)`, a convex height bonus, and a midline
/// bonus; guards contribute their base value plus advancement terms.
/// With `half_weights` the positional part is halved (the ultra-fast
/// profile).
pub fn material_and_pst(board: &Board, half_weights: bool) -> Value {
    let divisor = if half_weights { 2 } else { 1 };
    let mut total = 0;
    for color in 0..2 {
        let mut value = 0;
        let mut towers = board.towers(color);
        while towers != 0 {
            let sq = bitscan_forward_and_reset(&mut towers);
            let height = board.height(color, sq) as Value;
            value += height * TOWER_SEGMENT_VALUE;
            value += pst_lookup(&TOWER_PST, color, sq) * height.min(3) / divisor;
            value += (height - 1) * (height - 1) * HEIGHT_BONUS_FACTOR;
            if advancement(color, sq) >= 4 {
                value += MIDLINE_BONUS;
            }
        }
        if let Some(sq) = board.guard_square(color) {
            value += GUARD_VALUE;
            value += pst_lookup(&GUARD_PST, color, sq) / divisor;
            value += advancement(color, sq) as Value * GUARD_ADVANCE_BONUS / divisor;
        }
        total += if color == RED { value } else { -value };
    }
    total
}

/// Tactical threat term.
///
/// Capture moves available to a side score in proportion to the
/// victim's value, with a 4x multiplier for threats against a guard
/// and a 6x multiplier for outright winning moves (guard captures and
/// guard runs onto the opposing castle). Opponent threats count
/// against.
pub fn tactical_threats(board: &Board) -> Value {
    let mut total = 0;
    for color in 0..2 {
        let view = board_with_side_to_move(board, color);
        let mut value = 0;
        for m in movegen::generate_all(&view) {
            let victim = rules::victim_value(&view, m);
            let threat = if rules::is_winning_move(&view, m) {
                6 * GUARD_VALUE / 10
            } else if view.guards(view.them()) & (1 << m.dest_square()) != 0 {
                4 * victim / 10
            } else if victim > 0 {
                victim / 10
            } else {
                continue;
            };
            value += threat;
        }
        total += if color == RED { value } else { -value };
    }
    total
}

// Penalties and bonuses for the guard safety term.
const GUARD_ATTACKED_PENALTY: Value = 150;
const GUARD_SUPPORT_BONUS: Value = 25;

/// Guard safety term.
///
/// An attacked guard is penalized, doubly so with no escape square
/// and by half extra with a single one. Friendly pieces adjacent to
/// the guard add a small support bonus.
pub fn guard_safety(board: &Board) -> Value {
    let g = BoardGeometry::get();
    let mut total = 0;
    for color in 0..2 {
        let mut value = 0;
        if let Some(sq) = board.guard_square(color) {
            if rules::attackers_of(board, opposing(color), sq) != 0 {
                value -= GUARD_ATTACKED_PENALTY;
                match pop_count(rules::guard_escape_squares(board, color)) {
                    0 => value -= GUARD_ATTACKED_PENALTY,
                    1 => value -= GUARD_ATTACKED_PENALTY / 2,
                    _ => {}
                }
            }
            let supporters = g.neighbors[sq] & board.occupied_by(color);
            value += pop_count(supporters) as Value * GUARD_SUPPORT_BONUS;
        }
        total += if color == RED { value } else { -value };
    }
    total
}

const MOBILITY_WEIGHT: Value = 2;
const CENTER_CONTROL_WEIGHT: Value = 5;

/// Mobility and board control term.
///
/// The difference of the move counts, plus the central squares scored
/// by the number of attackers from each side.
pub fn mobility_and_control(board: &Board) -> Value {
    let red_moves = movegen::generate_all(&board_with_side_to_move(board, RED)).len() as Value;
    let blue_moves = movegen::generate_all(&board_with_side_to_move(board, BLUE)).len() as Value;
    let mut value = (red_moves - blue_moves) * MOBILITY_WEIGHT;

    let mut center = BB_CENTER;
    while center != 0 {
        let sq = bitscan_forward_and_reset(&mut center);
        let red = pop_count(rules::attackers_of(board, RED, sq)) as Value;
        let blue = pop_count(rules::attackers_of(board, BLUE, sq)) as Value;
        value += (red - blue) * CENTER_CONTROL_WEIGHT;
    }
    value
}

const COORDINATION_WEIGHT: Value = 4;

/// Coordination term: counts friendly pieces standing orthogonally
/// adjacent to each other.
pub fn coordination(board: &Board) -> Value {
    let g = BoardGeometry::get();
    let mut total = 0;
    for color in 0..2 {
        let mut value = 0;
        let mut pieces = board.occupied_by(color);
        while pieces != 0 {
            let sq = bitscan_forward_and_reset(&mut pieces);
            value += pop_count(g.neighbors[sq] & board.occupied_by(color)) as Value;
        }
        total += if color == RED { value } else { -value } * COORDINATION_WEIGHT;
    }
    total
}

const STRATEGIC_CONTROL_WEIGHT: Value = 3;

/// Strategic control term (enhanced profile only): attacks on the
/// castles, the castle files, and the extended center.
pub fn strategic_control(board: &Board) -> Value {
    let mut value = 0;
    let mut strategic = BB_STRATEGIC;
    while strategic != 0 {
        let sq = bitscan_forward_and_reset(&mut strategic);
        let red = pop_count(rules::attackers_of(board, RED, sq)) as Value;
        let blue = pop_count(rules::attackers_of(board, BLUE, sq)) as Value;
        value += (red - blue) * STRATEGIC_CONTROL_WEIGHT;
    }
    value
}

const TEMPO_BONUS: Value = 10;

/// A small bonus for having the move.
#[inline]
pub fn tempo(board: &Board) -> Value {
    if board.red_to_move() {
        TEMPO_BONUS
    } else {
        -TEMPO_BONUS
    }
}

/// Returns a copy of the board with the given color to move.
fn board_with_side_to_move(board: &Board, color: Color) -> Board {
    let mut view = board.clone();
    if view.us() != color {
        view.do_null();
    }
    view
}
