//! A search engine for the two-player board game "Guards & Towers".
//!
//! The game is played on a 7x7 board. Each side commands one guard
//! and a set of stackable towers; the game is won by capturing the
//! enemy guard or by walking the own guard onto the opposing castle
//! square. The engine, given a legal position and a depth or time
//! budget, returns the move it judges best for the side to move.
//!
//! The crate is organized in four layers:
//!
//! * Board representation and move generation (`board`, `movegen`,
//!   `rules`) -- bitboard-based position encoding and legal move
//!   enumeration.
//!
//! * Evaluation (`evaluation`, `see`, `threats`) -- a static
//!   positional score with a time-adaptive scoring profile, a static
//!   exchange evaluator, and a tactical threat detector.
//!
//! * Game-tree search (`search`, `quiescence`, `ordering`, `tt`) --
//!   four pluggable alpha-beta/PVS strategies sharing one node
//!   implementation, a transposition table, and the move ordering
//!   heuristics.
//!
//! * Time management (`time`, `deepening`) -- wall-clock budgeting
//!   and an iterative deepening driver with cooperative cancellation
//!   on a worker thread.
//!
//! # Example:
//! ```rust
//! use rampart::board::Board;
//! use rampart::evaluation::EvalProfile;
//! use rampart::search::{SearchEngine, Strategy};
//!
//! let board = Board::from_notation("7/7/3b33/BG1r43/3RG3/7/7 r").unwrap();
//! let mut engine = SearchEngine::new(EvalProfile::Quick);
//! let report = engine.find_best_move(&board, 3, Strategy::PvsQuiescence).unwrap();
//! assert!(report.best_move.is_some());
//! ```
//!
//! For play under a clock, use the deepening driver instead of a
//! fixed depth:
//! ```rust
//! use std::time::Duration;
//! use rampart::board::{Board, START_POSITION};
//! use rampart::deepening::DeepeningSearcher;
//! use rampart::search::Strategy;
//!
//! let board = Board::from_notation(START_POSITION).unwrap();
//! let mut searcher = DeepeningSearcher::new();
//! let outcome = searcher.search_with_budget(&board,
//!                                           Duration::from_millis(80),
//!                                           Strategy::PvsQuiescence);
//! assert!(outcome.best_move.is_some());
//! ```

#[macro_use]
extern crate lazy_static;

pub mod basetypes;
pub mod bitsets;
pub mod moves;
pub mod geometry;
pub mod zobrist;
pub mod board;
pub mod rules;
pub mod movegen;
pub mod evaluation;
pub mod see;
pub mod threats;
pub mod tt;
pub mod ordering;
pub mod quiescence;
pub mod search;
pub mod time;
pub mod deepening;

pub use crate::board::{Board, IllegalPosition, START_POSITION};
pub use crate::deepening::{DeepeningReport, DeepeningSearcher, SearchTask};
pub use crate::evaluation::EvalProfile;
pub use crate::moves::Move;
pub use crate::search::{SearchEngine, SearchError, SearchReport, Strategy};
pub use crate::time::TimeManager;
