//! Implements static exchange evaluation (SEE).
//!
//! SEE examines the consequence of a series of exchanges on the
//! destination square after a given capture, and calculates the
//! likely material change, assuming that both sides keep capturing on
//! that square with their least valuable attacker, and that either
//! side may stop the exchange when continuing would lose material. A
//! positive value indicates a winning capture. SEE is calculated
//! without actually trying moves on the board, so the value may be
//! inexact, but its sign is reliable.
//!
//! Two game-specific points:
//!
//! * A tower always travels as many squares as the number of segments
//!   it moves, so a capture from distance `d` commits exactly `d`
//!   segments, and recapturing the arrived stack needs a distance of
//!   at least `d` (or a guard, which captures anything adjacent).
//!
//! * X-ray attackers are included: when a capture vacates a square,
//!   a tower further along the same ray joins the exchange if its
//!   height covers the extended distance.
//!
//! The gain list, an unary tree since there are no branches but just
//! a series of captures, is negamaxed for the final value.

use std::cmp::max;
use crate::basetypes::*;
use crate::bitsets::*;
use crate::board::Board;
use crate::geometry::{BoardGeometry, DIRECTION_COUNT};
use crate::moves::Move;
use crate::rules;

// The longest possible exchange involves every piece on the board.
const MAX_EXCHANGE_LENGTH: usize = 20;

#[derive(Clone, Copy)]
struct Attacker {
    square: Square,
    color: Color,
    /// `0` for a guard.
    height: usize,
    distance: usize,
    used: bool,
}

impl Attacker {
    /// The material the attacker commits onto the exchange square.
    #[inline]
    fn committed_value(&self) -> Value {
        if self.height == 0 {
            GUARD_VALUE
        } else {
            self.distance as Value * TOWER_SEGMENT_VALUE
        }
    }

    /// The capture constraint the arrived piece imposes on the next
    /// capturer (`0` means "capturable by anything", which holds for
    /// guards).
    #[inline]
    fn arrival_size(&self) -> usize {
        if self.height == 0 {
            0
        } else {
            self.distance
        }
    }
}

/// Returns the likely material change resulting from a capture move,
/// for the side playing it.
///
/// Returns `0` for non-captures. The function is total and
/// deterministic for every legal move.
pub fn evaluate_exchange(board: &Board, m: Move) -> Value {
    if !rules::is_capture(board, m) {
        return 0;
    }

    let g = BoardGeometry::get();
    let us = board.us();
    let from = m.orig_square();
    let target = m.dest_square();
    let mover_is_guard = rules::is_guard_move(board, m);

    let mut occupied = board.occupied() & !(1 << from);
    let mut attackers = collect_attackers(board, target, occupied);

    let mut gain = [0 as Value; MAX_EXCHANGE_LENGTH];
    let mut depth = 0;
    gain[0] = rules::victim_value(board, m);

    // The piece now standing on the exchange square.
    let mut arrived_value = if mover_is_guard {
        GUARD_VALUE
    } else {
        m.amount() as Value * TOWER_SEGMENT_VALUE
    };
    let mut arrived_size = if mover_is_guard { 0 } else { m.amount() };

    add_xray_attacker(board, g, target, from, occupied, &mut attackers);
    let mut side = 1 ^ us;

    loop {
        if depth + 1 >= MAX_EXCHANGE_LENGTH {
            break;
        }

        // Find the least valuable attacker of `side` that may legally
        // capture the arrived piece.
        let mut choice: Option<usize> = None;
        for (i, a) in attackers.iter().enumerate() {
            if a.used || a.color != side {
                continue;
            }
            if arrived_size > 0 && a.height > 0 && a.distance < arrived_size {
                // A tower capture travels `distance` segments, which
                // here is not enough to take the arrived stack.
                continue;
            }
            match choice {
                Some(j) if attackers[j].committed_value() <= a.committed_value() => {}
                _ => choice = Some(i),
            }
        }
        let i = match choice {
            Some(i) => i,
            None => break,
        };

        // Store a speculative value that will be used if the arrived
        // piece happens to be defended.
        depth += 1;
        gain[depth] = arrived_value - gain[depth - 1];
        if max(-gain[depth - 1], gain[depth]) < 0 {
            // The side that made the last capture wins even if the
            // arrived piece happens to be defended, so the exchange
            // can stop here. The returned value may then be inexact,
            // but the sign is correct.
            break;
        }

        attackers[i].used = true;
        arrived_value = attackers[i].committed_value();
        arrived_size = attackers[i].arrival_size();
        occupied &= !(1u64 << attackers[i].square);
        add_xray_attacker(board, g, target, attackers[i].square, occupied, &mut attackers);
        side = 1 ^ side;
    }

    // Negamax the gain list for the final static exchange evaluation.
    while depth > 0 {
        gain[depth - 1] = -max(-gain[depth - 1], gain[depth]);
        depth -= 1;
    }
    gain[0]
}

/// Checks if a capture does not lose material (`SEE >= 0`).
#[inline]
pub fn is_safe_capture(board: &Board, m: Move) -> bool {
    evaluate_exchange(board, m) >= 0
}

fn collect_attackers(board: &Board, target: Square, occupied: u64) -> Vec<Attacker> {
    let g = BoardGeometry::get();
    let mut attackers = Vec::with_capacity(8);
    for color in 0..2 {
        if board.guards(color) & g.neighbors[target] & occupied != 0 {
            attackers.push(Attacker {
                square: bitscan_forward(board.guards(color) & g.neighbors[target]),
                color,
                height: 0,
                distance: 1,
                used: false,
            });
        }
    }
    for dir in 0..DIRECTION_COUNT {
        for (i, &s) in g.rays[target][dir].iter().enumerate() {
            if occupied & (1 << s) == 0 {
                continue;
            }
            for color in 0..2 {
                if board.towers(color) & (1 << s) != 0 && board.height(color, s) >= i + 1 {
                    attackers.push(Attacker {
                        square: s,
                        color,
                        height: board.height(color, s),
                        distance: i + 1,
                        used: false,
                    });
                }
            }
            break;
        }
    }
    attackers
}

/// After the square `vacated` has been emptied, adds the tower that
/// may now see `target` through it, if any.
fn add_xray_attacker(board: &Board,
                     g: &BoardGeometry,
                     target: Square,
                     vacated: Square,
                     occupied: u64,
                     attackers: &mut Vec<Attacker>) {
    if g.distance(target, vacated).is_none() {
        return;
    }
    for dir in 0..DIRECTION_COUNT {
        let ray = &g.rays[target][dir];
        let vacated_index = match ray.iter().position(|&s| s == vacated) {
            Some(i) => i,
            None => continue,
        };
        for (i, &s) in ray.iter().enumerate().skip(vacated_index + 1) {
            if occupied & (1 << s) == 0 {
                continue;
            }
            for color in 0..2 {
                if board.towers(color) & (1 << s) != 0 && board.height(color, s) >= i + 1 {
                    if !attackers.iter().any(|a| a.square == s) {
                        attackers.push(Attacker {
                            square: s,
                            color,
                            height: board.height(color, s),
                            distance: i + 1,
                            used: false,
                        });
                    }
                }
            }
            return;
        }
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::moves::Move;

    #[test]
    fn test_non_capture_is_zero() {
        let b = Board::from_notation("3RG3/7/7/3r23/7/7/3BG3 r").unwrap();
        assert_eq!(evaluate_exchange(&b, Move::new(D4, D3, 1)), 0);
        assert_eq!(evaluate_exchange(&b, Move::new(D4, D2, 2)), 0);
    }

    #[test]
    fn test_undefended_guard_capture() {
        // A red 2-tower takes the undefended blue guard.
        let b = Board::from_notation("3RG3/7/7/3r23/7/3BG3/7 r").unwrap();
        let m = Move::new(D4, D2, 2);
        assert_eq!(evaluate_exchange(&b, m), GUARD_VALUE);
        assert!(is_safe_capture(&b, m));
    }

    #[test]
    fn test_equal_exchange() {
        // r1 takes b1, the b1 behind recaptures: 100 for 100.
        let b = Board::from_notation("3RG3/7/3b13/3b13/3r13/7/3BG3 r").unwrap();
        assert_eq!(evaluate_exchange(&b, Move::new(D3, D4, 1)), 0);
        assert!(is_safe_capture(&b, Move::new(D3, D4, 1)));
    }

    #[test]
    fn test_losing_capture() {
        // Two segments take a single one and a far defender that can
        // reach the arrived 2-stack recaptures: -100.
        let b = Board::from_notation("3RG3/3b23/7/3b13/7/3r23/3BG3 r").unwrap();
        let m = Move::new(D2, D4, 2);
        assert_eq!(evaluate_exchange(&b, m), -TOWER_SEGMENT_VALUE);
        assert!(!is_safe_capture(&b, m));
    }

    #[test]
    fn test_defender_declines_losing_recapture() {
        // The blue guard defends the b1, but recapturing would hang
        // the guard to the red tower x-raying through the vacated
        // square, so the guard stands pat and Red keeps the segment.
        let b = Board::from_notation("3RG3/7/7/3b1BG2/3r13/3r23/7 r").unwrap();
        let m = Move::new(D3, D4, 1);
        assert_eq!(evaluate_exchange(&b, m), TOWER_SEGMENT_VALUE);
    }

    #[test]
    fn test_xray_recapture() {
        // Red: r1 on D3 with r2 on D2 behind it. Blue: b1 on D4
        // defended by b1 on D5. After the front exchange the rear
        // red tower x-rays through the vacated D3 and wins a segment.
        let b = Board::from_notation("3RG3/7/3b13/3b13/3r13/3r23/3BG3 r").unwrap();
        let m = Move::new(D3, D4, 1);
        assert_eq!(evaluate_exchange(&b, m), TOWER_SEGMENT_VALUE);
    }

    #[test]
    fn test_tall_stack_cannot_be_recaptured_from_close() {
        // A red 3-tower lands three segments on D4; the blue tower
        // on D5 is adjacent but a distance-1 move can not capture a
        // 3-stack, so there is no recapture.
        let b = Board::from_notation("3RG3/7/3b23/3b13/7/7/BG2r33 r").unwrap();
        let m = Move::new(D1, D4, 3);
        assert_eq!(evaluate_exchange(&b, m), TOWER_SEGMENT_VALUE);
    }
}
