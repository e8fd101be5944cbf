//! Game rules queries: terminal outcomes, checks, and attack and path
//! calculations.
//!
//! A tower of height `h` attacks a square at orthogonal distance `d`
//! exactly when `d <= h` and the squares in between are empty (a move
//! of `amount` segments always travels `amount` squares). A guard
//! attacks the four adjacent squares.

use crate::basetypes::*;
use crate::bitsets::*;
use crate::board::Board;
use crate::geometry::{BoardGeometry, DIRECTION_COUNT};
use crate::moves::Move;

/// Returns the winning color of a finished game, or `None` while the
/// game is still going.
///
/// A game is over when a guard has been captured, or when a guard
/// stands on the opposing castle square.
pub fn winner(board: &Board) -> Option<Color> {
    if board.guards(BLUE) == 0 {
        return Some(RED);
    }
    if board.guards(RED) == 0 {
        return Some(BLUE);
    }
    if board.guards(RED) == 1 << BLUE_CASTLE {
        return Some(RED);
    }
    if board.guards(BLUE) == 1 << RED_CASTLE {
        return Some(BLUE);
    }
    None
}

/// Checks if the game is over.
#[inline]
pub fn is_terminal(board: &Board) -> bool {
    winner(board).is_some()
}

/// Returns a bit-set of the squares with pieces of `color` that
/// attack `square`.
pub fn attackers_of(board: &Board, color: Color, square: Square) -> u64 {
    let g = BoardGeometry::get();
    let occupied = board.occupied();
    let mut attackers = board.guards(color) & g.neighbors[square];
    for dir in 0..DIRECTION_COUNT {
        for (i, &s) in g.rays[square][dir].iter().enumerate() {
            if occupied & (1 << s) != 0 {
                if board.towers(color) & (1 << s) != 0 && board.height(color, s) >= i + 1 {
                    attackers |= 1 << s;
                }
                break;
            }
        }
    }
    attackers
}

/// Checks if the guard of the given color is attacked.
pub fn in_check(board: &Board, color: Color) -> bool {
    match board.guard_square(color) {
        Some(square) => attackers_of(board, opposing(color), square) != 0,
        None => false,
    }
}

/// Checks if the squares strictly between `from` and `to` are all
/// empty. Returns `false` when the squares do not share a rank or
/// file.
pub fn path_clear(board: &Board, from: Square, to: Square) -> bool {
    let g = BoardGeometry::get();
    g.distance(from, to).is_some() && g.between[from][to] & board.occupied() == 0
}

/// Checks if the move captures an enemy piece (for the side to move).
#[inline]
pub fn is_capture(board: &Board, m: Move) -> bool {
    board.occupied_by(board.them()) & (1 << m.dest_square()) != 0
}

/// Checks if the move is played by the guard of the side to move.
#[inline]
pub fn is_guard_move(board: &Board, m: Move) -> bool {
    board.guards(board.us()) & (1 << m.orig_square()) != 0
}

/// Checks if the move wins the game on the spot: it captures the
/// enemy guard, or it brings the own guard to the opposing castle.
pub fn is_winning_move(board: &Board, m: Move) -> bool {
    let to = m.dest_square();
    board.guards(board.them()) & (1 << to) != 0 ||
    (is_guard_move(board, m) && to == target_castle(board.us()))
}

/// Returns the value of the piece a move captures (`0` for quiet
/// moves).
pub fn victim_value(board: &Board, m: Move) -> Value {
    let to = m.dest_square();
    let them = board.them();
    if board.guards(them) & (1 << to) != 0 {
        GUARD_VALUE
    } else if board.towers(them) & (1 << to) != 0 {
        board.height(them, to) as Value * TOWER_SEGMENT_VALUE
    } else {
        0
    }
}

/// Returns a bit-set of the squares the guard of the given color can
/// flee to: adjacent squares that are not occupied by a friendly
/// piece and are not attacked by the enemy.
pub fn guard_escape_squares(board: &Board, color: Color) -> u64 {
    let square = match board.guard_square(color) {
        Some(square) => square,
        None => return 0,
    };
    let g = BoardGeometry::get();
    let enemy = opposing(color);
    let mut candidates = g.neighbors[square] & !board.occupied_by(color);
    let mut escapes = 0;
    while candidates != 0 {
        let s = bitscan_forward_and_reset(&mut candidates);
        if attackers_of(board, enemy, s) == 0 {
            escapes |= 1 << s;
        }
    }
    escapes
}
