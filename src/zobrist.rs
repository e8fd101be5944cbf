//! Look-up tables for calculating Zobrist hashes.
//!
//! Zobrist hashing is a technique to transform a board position into
//! a number of a fixed length, with an equal distribution over all
//! possible numbers, invented by Albert Zobrist. The key property of
//! this method is that two similar positions generate entirely
//! different hash numbers.
//!
//! The hashing convention is: one key per `(color, height, square)`
//! for a tower of exactly that stack height, one key per `(color,
//! square)` for a guard, and one key for the side to move. A tower of
//! height `h` therefore contributes exactly one key -- the dedicated
//! key for height `h` -- and changing a stack's height amounts to
//! XOR-ing out the old height's key and XOR-ing in the new one. The
//! same convention is used by the incremental update in `do_move` and
//! by the from-scratch calculation, so the two always agree.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::basetypes::*;

/// Look-up tables for calculating Zobrist hashes.
pub struct ZobristArrays {
    /// XOR-ed in when Blue is to move.
    pub to_move: u64,

    /// `towers[color][height][square]`, valid for heights `1` to
    /// `MAX_STACK_HEIGHT`. The zero-height row stays zero so that
    /// height deltas can be applied unconditionally.
    pub towers: [[[u64; SQUARE_COUNT]; MAX_STACK_HEIGHT + 1]; 2],

    /// `guards[color][square]`.
    pub guards: [[u64; SQUARE_COUNT]; 2],
}

impl ZobristArrays {
    fn new() -> ZobristArrays {
        // The RNG is seeded with a fixed value so that hashes are
        // reproducible between runs.
        let mut rng = StdRng::seed_from_u64(0x5eed_1234_5678_9abc);

        let to_move = rng.gen();
        let mut towers = [[[0; SQUARE_COUNT]; MAX_STACK_HEIGHT + 1]; 2];
        let mut guards = [[0; SQUARE_COUNT]; 2];

        for color in 0..2 {
            for height in 1..=MAX_STACK_HEIGHT {
                for square in 0..SQUARE_COUNT {
                    towers[color][height][square] = rng.gen();
                }
            }
            for square in 0..SQUARE_COUNT {
                guards[color][square] = rng.gen();
            }
        }

        ZobristArrays { to_move, towers, guards }
    }

    /// Returns a reference to the singleton instance.
    pub fn get() -> &'static ZobristArrays {
        lazy_static! {
            static ref ARRAYS: ZobristArrays = ZobristArrays::new();
        }
        &ARRAYS
    }
}
