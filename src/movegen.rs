//! Implements the move generator.
//!
//! Move generation walks the precomputed directional rays, so the
//! legality conditions reduce to occupancy checks along the ray:
//!
//! * A guard moves one square orthogonally to any square not occupied
//!   by a friendly piece, capturing whatever enemy piece stands
//!   there.
//!
//! * A tower of height `h` moves `amount` segments (`1..=h`) exactly
//!   `amount` squares along a clear orthogonal line. The destination
//!   must be empty, hold a friendly tower (the segments stack), hold
//!   an enemy tower of height at most `amount` (the stack is
//!   captured), or hold the enemy guard (always captured).
//!
//! The order of the generated moves is unspecified; the move ordering
//! module sorts them.

use crate::basetypes::*;
use crate::bitsets::*;
use crate::board::Board;
use crate::geometry::{BoardGeometry, DIRECTION_COUNT};
use crate::moves::Move;
use crate::rules;

/// Generates all legal moves for the side to move.
///
/// Every returned move is legal, and every legal move is returned
/// exactly once. An empty list means the side to move has no legal
/// move (the game is then either already decided or scored as a
/// draw by the search).
pub fn generate_all(board: &Board) -> Vec<Move> {
    let mut moves = Vec::with_capacity(64);
    let us = board.us();
    generate_guard_moves(board, us, &mut moves);
    generate_tower_moves(board, us, &mut moves);
    moves
}

/// Generates the legal capture moves for the side to move.
pub fn generate_captures(board: &Board) -> Vec<Move> {
    let mut moves = generate_all(board);
    moves.retain(|&m| rules::is_capture(board, m));
    moves
}

/// Generates the "critical tactical moves" for the quiescence
/// search: all captures, guard moves onto the opposing castle, moves
/// that attack the enemy guard from their destination square, and --
/// when the own guard is attacked -- every guard move.
pub fn generate_tactical(board: &Board) -> Vec<Move> {
    let us = board.us();
    let in_check = rules::in_check(board, us);
    let enemy_guard = board.guard_square(board.them());
    let g = BoardGeometry::get();
    let mut moves = generate_all(board);
    moves.retain(|&m| {
        if rules::is_capture(board, m) || rules::is_winning_move(board, m) {
            return true;
        }
        let is_guard = rules::is_guard_move(board, m);
        if in_check && is_guard {
            return true;
        }
        // A quiet move that puts the arriving piece in range of the
        // enemy guard is a threat worth resolving.
        if let Some(target) = enemy_guard {
            let to = m.dest_square();
            let reach = if is_guard { 1 } else { m.amount() };
            if let Some(d) = g.distance(to, target) {
                if d <= reach && g.between[to][target] & board.occupied() & !(1 << m.orig_square()) == 0 {
                    return true;
                }
            }
        }
        false
    });
    moves
}

fn generate_guard_moves(board: &Board, us: Color, moves: &mut Vec<Move>) {
    let square = match board.guard_square(us) {
        Some(square) => square,
        None => return,
    };
    let g = BoardGeometry::get();
    let mut targets = g.neighbors[square] & !board.occupied_by(us);
    while targets != 0 {
        let to = bitscan_forward_and_reset(&mut targets);
        moves.push(Move::new(square, to, 1));
    }
}

fn generate_tower_moves(board: &Board, us: Color, moves: &mut Vec<Move>) {
    let g = BoardGeometry::get();
    let them = 1 ^ us;
    let mut towers = board.towers(us);
    while towers != 0 {
        let from = bitscan_forward_and_reset(&mut towers);
        let height = board.height(us, from);
        for dir in 0..DIRECTION_COUNT {
            for (i, &to) in g.rays[from][dir].iter().enumerate() {
                let amount = i + 1;
                if amount > height {
                    break;
                }
                let to_bb = 1u64 << to;
                if board.occupied() & to_bb == 0 {
                    moves.push(Move::new(from, to, amount));
                    continue;
                }
                // The ray is blocked here; only a landing on this
                // square can still be legal.
                if board.towers(us) & to_bb != 0 {
                    moves.push(Move::new(from, to, amount));
                } else if board.guards(them) & to_bb != 0 {
                    moves.push(Move::new(from, to, amount));
                } else if board.towers(them) & to_bb != 0 && board.height(them, to) <= amount {
                    moves.push(Move::new(from, to, amount));
                }
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use crate::board::{Board, START_POSITION};
    use crate::rules;

    fn notations(moves: &[Move]) -> HashSet<String> {
        moves.iter().map(|m| m.notation()).collect()
    }

    #[test]
    fn test_lone_guard_moves() {
        let b = Board::from_notation("3RG3/7/7/7/7/7/3BG3 r").unwrap();
        let moves: Vec<Move> = generate_all(&b)
            .into_iter()
            .filter(|&m| rules::is_guard_move(&b, m))
            .collect();
        assert_eq!(notations(&moves),
                   ["D7C71", "D7E71", "D7D61"].iter().map(|s| s.to_string()).collect());
    }

    #[test]
    fn test_tower_moves_split_and_stack() {
        // A red 2-tower on D4, a red 1-tower on D5, open elsewhere.
        let b = Board::from_notation("3RG3/7/3r13/3r23/7/7/3BG3 r").unwrap();
        let moves = generate_all(&b);
        let set = notations(&moves);
        // One segment in every direction, including the stack onto D5.
        assert!(set.contains("D4D51"));
        assert!(set.contains("D4D31"));
        assert!(set.contains("D4C41"));
        assert!(set.contains("D4E41"));
        // Two segments where the path is clear...
        assert!(set.contains("D4D22"));
        assert!(set.contains("D4B42"));
        assert!(set.contains("D4F42"));
        // ...but not through the friendly tower on D5.
        assert!(!set.contains("D4D62"));
        // Three segments exceed the stack height.
        assert!(!set.contains("D4A43"));
    }

    #[test]
    fn test_capture_requires_sufficient_amount() {
        // A blue 2-tower stands two squares east of a red 3-tower.
        let b = Board::from_notation("3RG3/7/7/1r31b23/7/7/3BG3 r").unwrap();
        let set = notations(&generate_all(&b));
        // Landing on it from distance 2 captures (2 >= height 2).
        assert!(set.contains("B4D42"));
        // Stopping one short is an ordinary quiet move.
        assert!(set.contains("B4C41"));
        // A blue 3-tower is too tall to capture from distance 2.
        let b = Board::from_notation("3RG3/7/7/1r31b33/7/7/3BG3 r").unwrap();
        let set = notations(&generate_all(&b));
        assert!(!set.contains("B4D42"));
    }

    #[test]
    fn test_guard_captures_anything_adjacent() {
        let b = Board::from_notation("3RGb52/7/7/7/7/7/3BG3 r").unwrap();
        let set = notations(&generate_all(&b));
        assert!(set.contains("D7E71"));
    }

    #[test]
    fn test_no_wrap_between_ranks() {
        // A red 3-tower on G4: eastward moves must not wrap to the
        // next rank.
        let b = Board::from_notation("3RG3/7/7/6r3/7/7/3BG3 r").unwrap();
        for m in generate_all(&b) {
            let from = m.orig_square();
            let to = m.dest_square();
            assert!(rank(from) == rank(to) || file(from) == file(to),
                    "diagonal move generated: {}", m);
        }
        let set = notations(&generate_all(&b));
        assert!(set.contains("G4F41"));
        assert!(set.contains("G4D43"));
        assert!(set.contains("G4G73"));
        assert!(!set.contains("G4A51"));
    }

    #[test]
    fn test_start_position_move_count() {
        let b = Board::from_notation(START_POSITION).unwrap();
        let moves = generate_all(&b);
        // All moves unique.
        let set: HashSet<Move> = moves.iter().cloned().collect();
        assert_eq!(set.len(), moves.len());
        assert!(moves.len() > 20);
        // Red and Blue have the same number of moves in the mirrored
        // start position.
        let b2 = Board::from_notation(&START_POSITION.replace(" r", " b")).unwrap();
        assert_eq!(generate_all(&b2).len(), moves.len());
    }

    #[test]
    fn test_generate_captures_subset() {
        let b = Board::from_notation("3RG3/7/7/1r31b23/7/7/3BG3 r").unwrap();
        let captures = generate_captures(&b);
        assert_eq!(notations(&captures),
                   ["B4D42"].iter().map(|s| s.to_string()).collect());
    }

    #[test]
    fn test_generate_tactical_includes_guard_threats() {
        // Red can step a tower into range of the blue guard.
        let b = Board::from_notation("3RG3/7/7/3r23/7/7/3BG3 r").unwrap();
        let tactical = generate_tactical(&b);
        let set = notations(&tactical);
        // Both segments to D2 bring the blue guard into reach.
        assert!(set.contains("D4D22"));
        // One segment to D3 threatens nothing.
        assert!(!set.contains("D4D31"));
    }

    #[test]
    fn test_tactical_in_check_includes_guard_moves() {
        let b = Board::from_notation("3RG3/3b23/7/7/7/7/3BG3 r").unwrap();
        assert!(rules::in_check(&b, RED));
        let set = notations(&generate_tactical(&b));
        assert!(set.contains("D7C71"));
        assert!(set.contains("D7E71"));
    }
}
