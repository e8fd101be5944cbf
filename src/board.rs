//! Implements the board representation.
//!
//! The position is encoded in four piece bit-sets (tower stacks and
//! guards for both colors) plus one stack-height array per color, the
//! side to move, and a cached Zobrist hash. The hash is updated
//! incrementally by `do_move` and can always be re-calculated from
//! scratch, which the debug build asserts after every move.

use std::fmt;
use regex::Regex;
use crate::basetypes::*;
use crate::bitsets::*;
use crate::moves::Move;
use crate::zobrist::ZobristArrays;

/// The notation of the starting position.
pub const START_POSITION: &str = "r1r11RG1r1r1/2r11r12/3r13/7/3b13/2b11b12/b1b11BG1b1b1 r";

/// Represents an illegal position.
///
/// Returned when a position string can not be parsed, or when a
/// position violates a board invariant (overlapping piece sets,
/// duplicated guards, stack heights inconsistent with the tower
/// bit-sets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalPosition;

/// Represents the board: piece bit-sets, stack heights, side to move,
/// and the cached Zobrist hash.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    /// `towers[RED]` and `towers[BLUE]` -- squares holding a tower
    /// stack of the given color.
    towers: [u64; 2],

    /// `guards[RED]` and `guards[BLUE]` -- each has at most one bit
    /// set.
    guards: [u64; 2],

    /// `heights[color][square]` is non-zero exactly when the
    /// corresponding tower bit is set.
    heights: [[u8; SQUARE_COUNT]; 2],

    /// `true` when Red is to move.
    red_to_move: bool,

    /// The cached Zobrist hash.
    hash: u64,
}

impl Board {
    /// Creates a board from piece placements.
    ///
    /// `towers` maps squares to `(color, height)` pairs, `guards`
    /// gives the guard square for each color (`None` for a captured
    /// guard).
    pub fn new(towers: &[(Square, Color, usize)],
               guards: [Option<Square>; 2],
               red_to_move: bool)
               -> Result<Board, IllegalPosition> {
        let mut board = Board {
            towers: [0; 2],
            guards: [0; 2],
            heights: [[0; SQUARE_COUNT]; 2],
            red_to_move,
            hash: 0,
        };
        for &(square, color, height) in towers {
            if square >= SQUARE_COUNT || color > 1 {
                return Err(IllegalPosition);
            }
            if height < 1 || height > MAX_STACK_HEIGHT {
                return Err(IllegalPosition);
            }
            if board.occupied() & (1 << square) != 0 {
                return Err(IllegalPosition);
            }
            board.towers[color] |= 1 << square;
            board.heights[color][square] = height as u8;
        }
        for color in 0..2 {
            if let Some(square) = guards[color] {
                if square >= SQUARE_COUNT || board.occupied() & (1 << square) != 0 {
                    return Err(IllegalPosition);
                }
                board.guards[color] |= 1 << square;
            }
        }
        board.hash = board.calc_hash();
        board.validate()?;
        Ok(board)
    }

    /// Parses a position string.
    ///
    /// The format is seven rank lines separated by `/` (the first
    /// line is rank 7, Red's home row), followed by a side-to-move
    /// token `r` or `b`. Within a rank line a digit stands for that
    /// many empty squares, `r<height>`/`b<height>` for a tower, and
    /// `RG`/`BG` for a guard. A rank line may account for less than
    /// seven squares, in which case the remaining squares are empty.
    ///
    /// Example: `7/7/3b33/BG1r43/3RG3/7/7 r`.
    pub fn from_notation(s: &str) -> Result<Board, IllegalPosition> {
        lazy_static! {
            static ref RANK_RE: Regex = Regex::new(r"^(?:[1-7]|r[1-9]|b[1-9]|RG|BG)*$").unwrap();
        }

        let mut parts = s.split_whitespace();
        let placement = parts.next().ok_or(IllegalPosition)?;
        let to_move = parts.next().ok_or(IllegalPosition)?;
        if parts.next().is_some() {
            return Err(IllegalPosition);
        }
        let red_to_move = match to_move {
            "r" => true,
            "b" => false,
            _ => return Err(IllegalPosition),
        };

        let lines: Vec<&str> = placement.split('/').collect();
        if lines.len() != 7 {
            return Err(IllegalPosition);
        }

        let mut towers = Vec::new();
        let mut guards = [None; 2];
        for (i, line) in lines.iter().enumerate() {
            if !RANK_RE.is_match(line) {
                return Err(IllegalPosition);
            }
            let rank = RANK_7 - i;
            let mut file = 0;
            let mut chars = line.chars();
            while let Some(c) = chars.next() {
                if file > 6 {
                    return Err(IllegalPosition);
                }
                match c {
                    '1'..='7' => {
                        file += c.to_digit(10).unwrap() as usize;
                        if file > 7 {
                            return Err(IllegalPosition);
                        }
                    }
                    'r' | 'b' => {
                        let height = chars.next()
                            .and_then(|h| h.to_digit(10))
                            .ok_or(IllegalPosition)? as usize;
                        let color = if c == 'r' { RED } else { BLUE };
                        towers.push((square(file, rank), color, height));
                        file += 1;
                    }
                    'R' | 'B' => {
                        if chars.next() != Some('G') {
                            return Err(IllegalPosition);
                        }
                        let color = if c == 'R' { RED } else { BLUE };
                        if guards[color].is_some() {
                            return Err(IllegalPosition);
                        }
                        guards[color] = Some(square(file, rank));
                        file += 1;
                    }
                    _ => return Err(IllegalPosition),
                }
            }
        }

        Board::new(&towers, guards, red_to_move)
    }

    /// Returns the notation of the position (see `from_notation`).
    pub fn to_notation(&self) -> String {
        let mut lines = Vec::with_capacity(7);
        for rank in (0..7).rev() {
            let mut line = String::new();
            let mut empty = 0;
            for file in 0..7 {
                let sq = square(file, rank);
                let token = if self.guards[RED] & (1 << sq) != 0 {
                    Some("RG".to_string())
                } else if self.guards[BLUE] & (1 << sq) != 0 {
                    Some("BG".to_string())
                } else if self.towers[RED] & (1 << sq) != 0 {
                    Some(format!("r{}", self.heights[RED][sq]))
                } else if self.towers[BLUE] & (1 << sq) != 0 {
                    Some(format!("b{}", self.heights[BLUE][sq]))
                } else {
                    None
                };
                match token {
                    Some(t) => {
                        if empty > 0 {
                            line.push_str(&empty.to_string());
                            empty = 0;
                        }
                        line.push_str(&t);
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                line.push_str(&empty.to_string());
            }
            lines.push(line);
        }
        format!("{} {}", lines.join("/"), if self.red_to_move { "r" } else { "b" })
    }

    /// Returns the color on move.
    #[inline]
    pub fn us(&self) -> Color {
        if self.red_to_move {
            RED
        } else {
            BLUE
        }
    }

    /// Returns the color not on move.
    #[inline]
    pub fn them(&self) -> Color {
        1 ^ self.us()
    }

    /// Checks if Red is to move.
    #[inline]
    pub fn red_to_move(&self) -> bool {
        self.red_to_move
    }

    /// Returns the tower bit-set for the given color.
    #[inline]
    pub fn towers(&self, color: Color) -> u64 {
        self.towers[color]
    }

    /// Returns the guard bit-set for the given color (at most one bit
    /// set).
    #[inline]
    pub fn guards(&self, color: Color) -> u64 {
        self.guards[color]
    }

    /// Returns the guard square for the given color, or `None` if the
    /// guard has been captured.
    #[inline]
    pub fn guard_square(&self, color: Color) -> Option<Square> {
        if self.guards[color] == 0 {
            None
        } else {
            Some(bitscan_forward(self.guards[color]))
        }
    }

    /// Returns the stack height at a square (`0` unless a tower of
    /// the given color stands there).
    #[inline]
    pub fn height(&self, color: Color, square: Square) -> usize {
        self.heights[color][square] as usize
    }

    /// Returns all occupied squares.
    #[inline]
    pub fn occupied(&self) -> u64 {
        self.towers[RED] | self.towers[BLUE] | self.guards[RED] | self.guards[BLUE]
    }

    /// Returns all squares occupied by the given color.
    #[inline]
    pub fn occupied_by(&self, color: Color) -> u64 {
        self.towers[color] | self.guards[color]
    }

    /// Returns the color occupying a square, or `None` for an empty
    /// square.
    #[inline]
    pub fn color_at(&self, square: Square) -> Option<Color> {
        if self.occupied_by(RED) & (1 << square) != 0 {
            Some(RED)
        } else if self.occupied_by(BLUE) & (1 << square) != 0 {
            Some(BLUE)
        } else {
            None
        }
    }

    /// Checks if a guard stands on the given square.
    #[inline]
    pub fn is_guard(&self, square: Square) -> bool {
        (self.guards[RED] | self.guards[BLUE]) & (1 << square) != 0
    }

    /// Returns the cached Zobrist hash.
    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Calculates the Zobrist hash from scratch.
    pub fn calc_hash(&self) -> u64 {
        let z = ZobristArrays::get();
        let mut hash = 0;
        for color in 0..2 {
            let mut towers = self.towers[color];
            while towers != 0 {
                let sq = bitscan_forward_and_reset(&mut towers);
                hash ^= z.towers[color][self.heights[color][sq] as usize][sq];
            }
            if let Some(sq) = self.guard_square(color) {
                hash ^= z.guards[color][sq];
            }
        }
        if !self.red_to_move {
            hash ^= z.to_move;
        }
        hash
    }

    /// Verifies the board invariants.
    pub fn validate(&self) -> Result<(), IllegalPosition> {
        // Piece sets must be pairwise disjoint and stay on the board.
        let all = [self.towers[RED], self.towers[BLUE], self.guards[RED], self.guards[BLUE]];
        let mut seen = 0u64;
        for bb in all {
            if bb & !BB_BOARD != 0 || bb & seen != 0 {
                return Err(IllegalPosition);
            }
            seen |= bb;
        }
        // At most one guard per color, and not both captured.
        if pop_count(self.guards[RED]) > 1 || pop_count(self.guards[BLUE]) > 1 {
            return Err(IllegalPosition);
        }
        if self.guards[RED] == 0 && self.guards[BLUE] == 0 {
            return Err(IllegalPosition);
        }
        // A tower bit is set exactly when the height is non-zero.
        for color in 0..2 {
            for sq in 0..SQUARE_COUNT {
                let has_bit = self.towers[color] & (1 << sq) != 0;
                let height = self.heights[color][sq] as usize;
                if has_bit != (height > 0) || height > MAX_STACK_HEIGHT {
                    return Err(IllegalPosition);
                }
            }
        }
        // The cached hash must match the from-scratch calculation.
        if self.hash != self.calc_hash() {
            return Err(IllegalPosition);
        }
        Ok(())
    }

    /// Plays a move on the board.
    ///
    /// The move **must** be legal in the current position (as
    /// generated by the move generator). The board is updated in
    /// place, the side to move is toggled, and the Zobrist hash is
    /// updated incrementally.
    pub fn do_move(&mut self, m: Move) {
        let z = ZobristArrays::get();
        let us = self.us();
        let them = 1 ^ us;
        let from = m.orig_square();
        let to = m.dest_square();
        let amount = m.amount();
        let to_bb = 1u64 << to;

        debug_assert!(from != to);
        debug_assert!(self.occupied_by(us) & (1 << from) != 0);

        // Remove whatever the move captures.
        if self.guards[them] & to_bb != 0 {
            self.hash ^= z.guards[them][to];
            self.guards[them] = 0;
        } else if self.towers[them] & to_bb != 0 {
            let victim_height = self.heights[them][to] as usize;
            debug_assert!(self.guards[us] & (1 << from) != 0 || victim_height <= amount);
            self.hash ^= z.towers[them][victim_height][to];
            self.towers[them] &= !to_bb;
            self.heights[them][to] = 0;
        }

        if self.guards[us] & (1 << from) != 0 {
            // A guard move.
            debug_assert_eq!(amount, 1);
            debug_assert!(self.occupied_by(us) & to_bb == 0);
            self.hash ^= z.guards[us][from] ^ z.guards[us][to];
            self.guards[us] = to_bb;
        } else {
            // A tower move.
            let from_height = self.heights[us][from] as usize;
            debug_assert!(amount >= 1 && amount <= from_height);

            // The origin square loses `amount` segments.
            self.hash ^= z.towers[us][from_height][from];
            let left = from_height - amount;
            self.heights[us][from] = left as u8;
            if left > 0 {
                self.hash ^= z.towers[us][left][from];
            } else {
                self.towers[us] &= !(1u64 << from);
            }

            // The destination square gains them, stacking onto a
            // friendly tower if one is there.
            let dest_height = self.heights[us][to] as usize;
            debug_assert!(self.guards[us] & to_bb == 0);
            debug_assert!(dest_height + amount <= MAX_STACK_HEIGHT);
            if dest_height > 0 {
                self.hash ^= z.towers[us][dest_height][to];
            }
            self.heights[us][to] = (dest_height + amount) as u8;
            self.hash ^= z.towers[us][dest_height + amount][to];
            self.towers[us] |= to_bb;
        }

        self.red_to_move = !self.red_to_move;
        self.hash ^= z.to_move;

        debug_assert_eq!(self.hash, self.calc_hash());
    }

    /// Plays a "null move": only the side to move changes.
    ///
    /// Used by the null-move pruning in the search.
    pub fn do_null(&mut self) {
        self.red_to_move = !self.red_to_move;
        self.hash ^= ZobristArrays::get().to_move;
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Board({})", self.to_notation())
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_notation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basetypes::*;
    use crate::moves::Move;

    #[test]
    fn test_parse_start_position() {
        let b = Board::from_notation(START_POSITION).unwrap();
        assert!(b.red_to_move());
        assert_eq!(b.guard_square(RED), Some(D7));
        assert_eq!(b.guard_square(BLUE), Some(D1));
        assert_eq!(pop_count(b.towers(RED)), 7);
        assert_eq!(pop_count(b.towers(BLUE)), 7);
        for sq in [A7, B7, F7, G7, C6, E6, D5] {
            assert_eq!(b.height(RED, sq), 1);
        }
        for sq in [A1, B1, F1, G1, C2, E2, D3] {
            assert_eq!(b.height(BLUE, sq), 1);
        }
        assert_eq!(b.validate(), Ok(()));
    }

    #[test]
    fn test_parse_tactical_position() {
        // The rank line `BG1r43` accounts for six squares only; the
        // seventh is implicitly empty.
        let b = Board::from_notation("7/7/3b33/BG1r43/3RG3/7/7 r").unwrap();
        assert_eq!(b.guard_square(BLUE), Some(A4));
        assert_eq!(b.guard_square(RED), Some(D3));
        assert_eq!(b.height(BLUE, D5), 3);
        assert_eq!(b.height(RED, C4), 4);
        assert_eq!(pop_count(b.occupied()), 4);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(Board::from_notation("").is_err());
        assert!(Board::from_notation("7/7/7/7/7/7/7").is_err());
        assert!(Board::from_notation("7/7/7/7/7/7/7 x").is_err());
        assert!(Board::from_notation("7/7/7/7/7/7 r").is_err());
        assert!(Board::from_notation("8/7/7/7/7/7/7 r").is_err());
        assert!(Board::from_notation("44/7/7/7/7/7/7 r").is_err());
        assert!(Board::from_notation("q6/7/7/7/7/7/7 r").is_err());
        assert!(Board::from_notation("RG1RG4/7/7/7/7/7/3BG3 r").is_err());
        // No guard at all.
        assert!(Board::from_notation("r1r15/7/7/7/7/7/b1b15 r").is_err());
        // Stack height above the maximum.
        assert!(Board::from_notation("3RG3/7/7/r93/7/7/3BG3 r").is_err());
    }

    #[test]
    fn test_notation_round_trip() {
        for s in [START_POSITION,
                  "3RG3/7/7/7/7/7/3BG3 r",
                  "3RG3/7/2r41b2/7/7/3b23/3BG3 b"] {
            let b = Board::from_notation(s).unwrap();
            assert_eq!(Board::from_notation(&b.to_notation()).unwrap(), b);
        }
    }

    #[test]
    fn test_do_move_keeps_hash_consistent() {
        let mut b = Board::from_notation(START_POSITION).unwrap();
        for m in [Move::new(D5, D4, 1), Move::new(D3, D4, 1), Move::new(C6, C5, 1)] {
            b.do_move(m);
            assert_eq!(b.hash(), b.calc_hash());
            assert_eq!(b.validate(), Ok(()));
        }
    }

    #[test]
    fn test_do_move_stacks_and_splits() {
        let mut b = Board::from_notation("3RG3/7/7/2r1r12/7/7/3BG3 r").unwrap();
        // Stack C4 onto D4.
        b.do_move(Move::new(C4, D4, 1));
        assert_eq!(b.height(RED, C4), 0);
        assert_eq!(b.height(RED, D4), 2);
        assert!(b.towers(RED) & (1 << C4) == 0);
        // Blue plays a guard step; then Red splits one segment off.
        b.do_move(Move::new(D1, C1, 1));
        b.do_move(Move::new(D4, D5, 1));
        assert_eq!(b.height(RED, D4), 1);
        assert_eq!(b.height(RED, D5), 1);
        assert_eq!(b.validate(), Ok(()));
    }

    #[test]
    fn test_do_move_captures() {
        // A red 2-tower takes the blue 2-tower two squares away.
        let mut b = Board::from_notation("3RG3/7/7/1r21b23/7/7/3BG3 r").unwrap();
        b.do_move(Move::new(B4, D4, 2));
        assert_eq!(b.height(BLUE, D4), 0);
        assert_eq!(b.height(RED, D4), 2);
        assert_eq!(b.validate(), Ok(()));

        // A guard captures a tall tower.
        let mut b = Board::from_notation("3RG3/3b53/7/7/7/7/3BG3 r").unwrap();
        b.do_move(Move::new(D7, D6, 1));
        assert_eq!(b.height(BLUE, D6), 0);
        assert_eq!(b.guard_square(RED), Some(D6));
        assert_eq!(b.validate(), Ok(()));

        // A tower captures the enemy guard.
        let mut b = Board::from_notation("3RG3/7/7/3r23/7/3BG3/7 r").unwrap();
        b.do_move(Move::new(D4, D2, 2));
        assert_eq!(b.guard_square(BLUE), None);
        assert_eq!(b.height(RED, D2), 2);
        assert_eq!(b.validate(), Ok(()));
    }

    #[test]
    fn test_do_move_is_deterministic() {
        let b = Board::from_notation(START_POSITION).unwrap();
        let m = Move::new(D5, D4, 1);
        let mut b1 = b.clone();
        let mut b2 = b.clone();
        b1.do_move(m);
        b2.do_move(m);
        assert_eq!(b1, b2);
        assert_eq!(b1.hash(), b2.hash());
        // The original board is untouched.
        assert_eq!(b.height(RED, D5), 1);
    }

    #[test]
    fn test_do_null() {
        let mut b = Board::from_notation(START_POSITION).unwrap();
        let hash = b.hash();
        b.do_null();
        assert!(!b.red_to_move());
        assert_ne!(b.hash(), hash);
        assert_eq!(b.hash(), b.calc_hash());
        b.do_null();
        assert_eq!(b.hash(), hash);
    }
}
