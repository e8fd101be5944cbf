//! Defines what information a move should contain.

use std::fmt;
use crate::basetypes::*;

/// Represents a move on the board.
///
/// A move relocates `amount` segments from an origin square to a
/// destination square. Guards always move with `amount == 1`; towers
/// may move any number of segments between one and the full stack
/// height.
///
/// `Move` is a 16-bit unsigned number, laid out the following way:
///
///  ```text
///   15                                                           0
///  +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
///  |   |   |   |   |   |   |   |   |   |   |   |   |   |   |   |   |
///  |    Amount     |       Origin square   |  Destination square   |
///  |    4 bits     |          6 bits       |        6 bits         |
///  +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
///  ```
///
/// Equality is structural over all three fields, and the packed
/// representation provides a stable hash for the killer and history
/// tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Move(u16);

/// The number that a `Move` packs into. `0` encodes "no move".
pub type MoveDigest = u16;

impl Move {
    /// Creates a new instance of `Move`.
    #[inline]
    pub fn new(orig_square: Square, dest_square: Square, amount: usize) -> Move {
        debug_assert!(orig_square < SQUARE_COUNT);
        debug_assert!(dest_square < SQUARE_COUNT);
        debug_assert!(orig_square != dest_square);
        debug_assert!(amount >= 1 && amount <= MAX_STACK_HEIGHT);
        Move((amount << M_SHIFT_AMOUNT | orig_square << M_SHIFT_ORIG_SQUARE |
              dest_square << M_SHIFT_DEST_SQUARE) as u16)
    }

    /// Creates an invalid move instance.
    ///
    /// The returned instance is used as a sentinel when no real move
    /// is available (for example in an empty killer slot).
    #[inline]
    pub fn invalid() -> Move {
        Move(0)
    }

    /// Checks if the move is not the sentinel returned by `invalid`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub fn orig_square(&self) -> Square {
        ((self.0 as usize & M_MASK_ORIG_SQUARE) >> M_SHIFT_ORIG_SQUARE) as Square
    }

    #[inline]
    pub fn dest_square(&self) -> Square {
        ((self.0 as usize & M_MASK_DEST_SQUARE) >> M_SHIFT_DEST_SQUARE) as Square
    }

    /// Returns the number of segments the move relocates (always `1`
    /// for guard moves).
    #[inline]
    pub fn amount(&self) -> usize {
        (self.0 as usize & M_MASK_AMOUNT) >> M_SHIFT_AMOUNT
    }

    /// Returns the packed 16-bit representation of the move.
    ///
    /// This is what the transposition table stores as the "best
    /// move" for a position.
    #[inline]
    pub fn digest(&self) -> MoveDigest {
        self.0
    }

    /// Re-creates a move from its digest.
    ///
    /// Returns `None` for the zero digest. The caller is responsible
    /// for checking that the move is pseudo-legal in the current
    /// position (digests can come from hash collisions in the
    /// transposition table).
    #[inline]
    pub fn from_digest(digest: MoveDigest) -> Option<Move> {
        if digest == 0 {
            None
        } else {
            Some(Move(digest))
        }
    }

    /// Returns the notation of the move: `<from><to><amount>`.
    ///
    /// Examples: `D4D51` (one segment from D4 to D5), `C3C62` (two
    /// segments from C3 to C6).
    pub fn notation(&self) -> String {
        format!("{}{}{}",
                square_notation(self.orig_square()),
                square_notation(self.dest_square()),
                self.amount())
    }

    /// Parses a move from its `<from><to><amount>` notation.
    pub fn from_notation(s: &str) -> Option<Move> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() != 5 {
            return None;
        }
        let orig = parse_square(chars[0], chars[1])?;
        let dest = parse_square(chars[2], chars[3])?;
        let amount = chars[4].to_digit(10)? as usize;
        if orig == dest || amount < 1 || amount > MAX_STACK_HEIGHT {
            return None;
        }
        Some(Move::new(orig, dest, amount))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.notation())
    }
}

// Field shifts
const M_SHIFT_AMOUNT: usize = 12;
const M_SHIFT_ORIG_SQUARE: usize = 6;
const M_SHIFT_DEST_SQUARE: usize = 0;

// Field masks
const M_MASK_AMOUNT: usize = 0b1111 << M_SHIFT_AMOUNT;
const M_MASK_ORIG_SQUARE: usize = 0b111111 << M_SHIFT_ORIG_SQUARE;
const M_MASK_DEST_SQUARE: usize = 0b111111 << M_SHIFT_DEST_SQUARE;

/// Returns the notation for a given square (`A1` to `G7`).
pub fn square_notation(square: Square) -> &'static str {
    lazy_static! {
        static ref NOTATION: Vec<String> = (0..SQUARE_COUNT)
            .map(|i| format!("{}{}",
                ["A", "B", "C", "D", "E", "F", "G"][file(i)],
                ["1", "2", "3", "4", "5", "6", "7"][rank(i)]))
            .collect();
    }
    NOTATION[square].as_str()
}

fn parse_square(file_char: char, rank_char: char) -> Option<Square> {
    let file = match file_char {
        'A'..='G' => file_char as usize - 'A' as usize,
        _ => return None,
    };
    let rank = match rank_char {
        '1'..='7' => rank_char as usize - '1' as usize,
        _ => return None,
    };
    Some(square(file, rank))
}
