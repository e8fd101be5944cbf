//! This module defines the most basic types and constants like the
//! colors, squares, files, and ranks of the 7x7 board, and the value
//! scale used by the evaluator and the search. It also defines few
//! simple functions.

/// `RED` or `BLUE`
pub type Color = usize; // 0 or 1

/// From 0 to 6 (0 is rank 1, 6 is rank 7)
pub type Rank = usize;

/// From 0 to 6 (0 is file A, 6 is file G)
pub type File = usize;

/// From 0 to 48 (0 is A1, 48 is G7)
pub type Square = usize;

/// Evaluation value in milli-units of a single tower segment.
///
/// Positive values are good for Red, negative values are good for
/// Blue. The magnitude of a value never reaches `VALUE_MAX` except
/// for won/lost positions.
pub type Value = i32;

/// Number of searched positions.
pub type NodeCount = u64;

// Colors
pub const RED: Color = 0;
pub const BLUE: Color = 1;

// Ranks
pub const RANK_1: Rank = 0;
pub const RANK_2: Rank = 1;
pub const RANK_3: Rank = 2;
pub const RANK_4: Rank = 3;
pub const RANK_5: Rank = 4;
pub const RANK_6: Rank = 5;
pub const RANK_7: Rank = 6;

// Files
pub const FILE_A: File = 0;
pub const FILE_B: File = 1;
pub const FILE_C: File = 2;
pub const FILE_D: File = 3;
pub const FILE_E: File = 4;
pub const FILE_F: File = 5;
pub const FILE_G: File = 6;

// Squares
pub const A1: Square = 0 + 0 * 7;
pub const B1: Square = 1 + 0 * 7;
pub const C1: Square = 2 + 0 * 7;
pub const D1: Square = 3 + 0 * 7;
pub const E1: Square = 4 + 0 * 7;
pub const F1: Square = 5 + 0 * 7;
pub const G1: Square = 6 + 0 * 7;
pub const A2: Square = 0 + 1 * 7;
pub const B2: Square = 1 + 1 * 7;
pub const C2: Square = 2 + 1 * 7;
pub const D2: Square = 3 + 1 * 7;
pub const E2: Square = 4 + 1 * 7;
pub const F2: Square = 5 + 1 * 7;
pub const G2: Square = 6 + 1 * 7;
pub const A3: Square = 0 + 2 * 7;
pub const B3: Square = 1 + 2 * 7;
pub const C3: Square = 2 + 2 * 7;
pub const D3: Square = 3 + 2 * 7;
pub const E3: Square = 4 + 2 * 7;
pub const F3: Square = 5 + 2 * 7;
pub const G3: Square = 6 + 2 * 7;
pub const A4: Square = 0 + 3 * 7;
pub const B4: Square = 1 + 3 * 7;
pub const C4: Square = 2 + 3 * 7;
pub const D4: Square = 3 + 3 * 7;
pub const E4: Square = 4 + 3 * 7;
pub const F4: Square = 5 + 3 * 7;
pub const G4: Square = 6 + 3 * 7;
pub const A5: Square = 0 + 4 * 7;
pub const B5: Square = 1 + 4 * 7;
pub const C5: Square = 2 + 4 * 7;
pub const D5: Square = 3 + 4 * 7;
pub const E5: Square = 4 + 4 * 7;
pub const F5: Square = 5 + 4 * 7;
pub const G5: Square = 6 + 4 * 7;
pub const A6: Square = 0 + 5 * 7;
pub const B6: Square = 1 + 5 * 7;
pub const C6: Square = 2 + 5 * 7;
pub const D6: Square = 3 + 5 * 7;
pub const E6: Square = 4 + 5 * 7;
pub const F6: Square = 5 + 5 * 7;
pub const G6: Square = 6 + 5 * 7;
pub const A7: Square = 0 + 6 * 7;
pub const B7: Square = 1 + 6 * 7;
pub const C7: Square = 2 + 6 * 7;
pub const D7: Square = 3 + 6 * 7;
pub const E7: Square = 4 + 6 * 7;
pub const F7: Square = 5 + 6 * 7;
pub const G7: Square = 6 + 6 * 7;

/// The number of squares on the board.
pub const SQUARE_COUNT: usize = 49;

/// The tallest stack a tower can ever form.
///
/// Each side starts with 7 single-segment towers, and stacking and
/// capturing can never create a stack taller than the total number of
/// segments a side owns.
pub const MAX_STACK_HEIGHT: usize = 7;

/// Red's own castle square. Blue wins by moving its guard here.
pub const RED_CASTLE: Square = D7;

/// Blue's own castle square. Red wins by moving its guard here.
pub const BLUE_CASTLE: Square = D1;

/// The value of one tower segment.
pub const TOWER_SEGMENT_VALUE: Value = 100;

/// The material value of a guard.
pub const GUARD_VALUE: Value = 2000;

/// The magnitude assigned to won/lost positions (guard captured, or a
/// guard standing on the opposing castle). Depth-adjusted, so that
/// faster wins get slightly bigger magnitudes.
pub const CASTLE_REACH: Value = 25_000;

/// Scores above this magnitude indicate a forced win/loss.
pub const MATE_THRESHOLD: Value = 20_000;

/// The biggest possible evaluation value.
pub const VALUE_MAX: Value = 30_000;

/// The smallest possible evaluation value.
pub const VALUE_MIN: Value = -VALUE_MAX;

/// A value that can not occur as a real evaluation.
pub const VALUE_UNKNOWN: Value = VALUE_MIN - 1;

/// The maximum search depth in half-moves.
pub const MAX_DEPTH: u8 = 63;

/// The size of the per-ply tables kept by the search (killers, PV).
pub const MAX_PLY: usize = 64;

/// Returns the square on given file and rank.
#[inline]
pub fn square(file: File, rank: Rank) -> Square {
    debug_assert!(file < 7);
    debug_assert!(rank < 7);
    rank * 7 + file
}

/// Returns the rank of a given square.
#[inline]
pub fn rank(square: Square) -> Rank {
    debug_assert!(square < SQUARE_COUNT);
    square / 7
}

/// Returns the file of a given square.
#[inline]
pub fn file(square: Square) -> File {
    debug_assert!(square < SQUARE_COUNT);
    square % 7
}

/// Returns the opposing color.
#[inline]
pub fn opposing(color: Color) -> Color {
    debug_assert!(color <= 1);
    1 ^ color
}

/// Returns the castle square a guard of the given color is trying to
/// reach.
#[inline]
pub fn target_castle(color: Color) -> Square {
    if color == RED {
        BLUE_CASTLE
    } else {
        RED_CASTLE
    }
}

/// Returns the castle square a guard of the given color is defending.
#[inline]
pub fn own_castle(color: Color) -> Square {
    if color == RED {
        RED_CASTLE
    } else {
        BLUE_CASTLE
    }
}

/// Returns how many ranks the given square is advanced toward the
/// opposing home row (0 for the own home row, 6 for the opposing one).
#[inline]
pub fn advancement(color: Color, square: Square) -> usize {
    if color == RED {
        RANK_7 - rank(square)
    } else {
        rank(square)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_math() {
        assert_eq!(square(FILE_A, RANK_1), A1);
        assert_eq!(square(FILE_G, RANK_7), G7);
        assert_eq!(square(FILE_D, RANK_4), D4);
        assert_eq!(rank(D4), RANK_4);
        assert_eq!(file(D4), FILE_D);
        assert_eq!(rank(G7), RANK_7);
        assert_eq!(file(G7), FILE_G);
        assert_eq!(SQUARE_COUNT, 49);
    }

    #[test]
    fn test_castles_and_advancement() {
        assert_eq!(target_castle(RED), D1);
        assert_eq!(target_castle(BLUE), D7);
        assert_eq!(own_castle(RED), D7);
        assert_eq!(own_castle(BLUE), D1);
        assert_eq!(advancement(RED, D7), 0);
        assert_eq!(advancement(RED, D1), 6);
        assert_eq!(advancement(BLUE, D1), 0);
        assert_eq!(advancement(BLUE, D7), 6);
        assert_eq!(opposing(RED), BLUE);
        assert_eq!(opposing(BLUE), RED);
    }
}
