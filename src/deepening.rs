//! Implements time-managed iterative deepening.
//!
//! Iterative deepening works as follows: the program starts with a
//! one ply search, then increments the search depth and does another
//! search. This process is repeated until the time allocated for the
//! search is exhausted or the maximum search depth is reached. In
//! case of an unfinished search, the program can always fall back to
//! the move selected in the last completed iteration.
//!
//! Aspiration windows are a way to reduce the search space. We take
//! the value from the last completed iteration, calculate a window
//! around it, and use this as alpha-beta bounds for the next search.
//! Because the window is narrower, more beta cutoffs are achieved,
//! and the search takes a shorter time. The drawback is that if the
//! true value is outside this window, a re-search must be made; the
//! re-search is usually fast, because many positions are remembered
//! in the transposition table.
//!
//! The deepening loop runs on a worker thread. The scheduling side
//! waits on the wall clock and, at the deadline, raises the shared
//! cancel signal; the worker observes it within a bounded number of
//! node expansions and reports the best move of the deepest
//! *completed* iteration. Before starting a new depth, the worker
//! predicts its cost from the observed growth between the completed
//! iterations and gives up on depths that would not finish anyway.
//!
//! # Example:
//! ```text
//! let mut searcher = DeepeningSearcher::new();
//! let outcome = searcher.search_with_budget(
//!     &board, Duration::from_secs(5), Strategy::PvsQuiescence);
//! // `outcome.best_move` is the move of the deepest completed depth.
//! ```

use std::cmp::{max, min};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use log::{debug, warn};
use crate::basetypes::*;
use crate::board::Board;
use crate::evaluation::EvalProfile;
use crate::moves::Move;
use crate::search::{emergency_move, CancelSignal, EngineOptions, SearchEngine, SearchError,
                    SearchReport, Strategy};

// The deepening loop gives up when less than this much of the budget
// is left.
const MIN_REMAINING_MS: u64 = 200;

// A predicted iteration must fit into this share of the remaining
// budget (in percent).
const PREDICTION_BUDGET_SHARE: u64 = 38;

// Safety margin applied to the predicted iteration cost.
const PREDICTION_MARGIN_NUM: u64 = 13;
const PREDICTION_MARGIN_DEN: u64 = 10;

// Aspiration window parameters.
const ASPIRATION_MIN_DEPTH: u8 = 5;
const ASPIRATION_INITIAL_DELTA: Value = 50;

// The worker stops after this many consecutive internal errors.
const MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// Represents a command to the search worker.
enum Command {
    Search(SearchTask),
    Terminate,
    Exit,
}

/// Parameters describing a new deepening search.
#[derive(Clone)]
pub struct SearchTask {
    /// The root position.
    pub board: Board,

    /// The wall-clock budget.
    pub budget: Duration,

    /// The depth at which the deepening stops even with time left.
    pub max_depth: u8,

    /// The strategy used for every iteration.
    pub strategy: Strategy,
}

/// A progress report from the deepening loop.
///
/// Non-final reports (`done == false`) are sent after every completed
/// iteration. The final report repeats the deepest completed result.
#[derive(Debug, Clone)]
pub struct DeepeningReport {
    /// The best move of the deepest completed iteration, or `None`
    /// when the position has no legal move.
    pub best_move: Option<Move>,

    /// The value of the deepest completed iteration, from the
    /// perspective of the side to move (`VALUE_UNKNOWN` if depth 1
    /// never completed).
    pub value: Value,

    /// The deepest completed depth.
    pub depth: u8,

    /// Total searched nodes across all iterations.
    pub searched_nodes: NodeCount,

    /// `true` for the final report of a search.
    pub done: bool,
}

/// Executes searches with iterative deepening on a worker thread.
pub struct DeepeningSearcher {
    thread_join_handle: Option<thread::JoinHandle<()>>,
    thread_commands: Sender<Command>,
    thread_reports: Receiver<DeepeningReport>,
    cancel: CancelSignal,
}

impl DeepeningSearcher {
    pub fn new() -> DeepeningSearcher {
        DeepeningSearcher::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> DeepeningSearcher {
        let (commands_tx, commands_rx) = channel();
        let (reports_tx, reports_rx) = channel();
        let cancel = CancelSignal::new();
        let worker_cancel = cancel.clone();
        DeepeningSearcher {
            thread_commands: commands_tx,
            thread_reports: reports_rx,
            cancel,

            // Spawn a thread that will do the real work.
            thread_join_handle: Some(thread::spawn(move || {
                serve_deepening(commands_rx, reports_tx, worker_cancel, options);
            })),
        }
    }

    /// Starts a new search.
    ///
    /// After calling `start_search`, reports must be received until
    /// one arrives with `done == true`. A new search must not be
    /// started before that.
    pub fn start_search(&mut self, task: SearchTask) {
        self.cancel.clear();
        self.thread_commands.send(Command::Search(task)).unwrap();
    }

    /// Attempts to receive a report without blocking.
    pub fn try_recv_report(&mut self) -> Result<DeepeningReport, TryRecvError> {
        self.thread_reports.try_recv()
    }

    /// Requests the termination of the current search.
    ///
    /// The worker observes the cancel signal within a bounded number
    /// of node expansions and sends its final report.
    pub fn terminate_search(&mut self) {
        self.cancel.set();
        self.thread_commands.send(Command::Terminate).unwrap();
    }

    /// Runs a complete budgeted search: starts it, enforces the
    /// deadline, and returns the final report.
    pub fn search_with_budget(&mut self,
                              board: &Board,
                              budget: Duration,
                              strategy: Strategy)
                              -> DeepeningReport {
        let deadline = Instant::now() + budget;
        self.start_search(SearchTask {
            board: board.clone(),
            budget,
            max_depth: MAX_DEPTH,
            strategy,
        });
        self.wait_for_outcome(deadline)
    }

    /// As `search_with_budget`, with a cap on the depth.
    pub fn search_with_budget_and_depth(&mut self,
                                        board: &Board,
                                        budget: Duration,
                                        max_depth: u8,
                                        strategy: Strategy)
                                        -> DeepeningReport {
        let deadline = Instant::now() + budget;
        self.start_search(SearchTask {
            board: board.clone(),
            budget,
            max_depth,
            strategy,
        });
        self.wait_for_outcome(deadline)
    }

    fn wait_for_outcome(&mut self, deadline: Instant) -> DeepeningReport {
        let mut latched: Option<DeepeningReport> = None;
        let mut cancelled = false;
        loop {
            let now = Instant::now();
            if now >= deadline && !cancelled {
                self.cancel.set();
                cancelled = true;
            }
            let timeout = if cancelled {
                Duration::from_millis(25)
            } else {
                min(deadline.saturating_duration_since(now), Duration::from_millis(25))
            };
            match self.thread_reports.recv_timeout(timeout) {
                Ok(report) => {
                    if report.done {
                        return report;
                    }
                    latched = Some(report);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    // The worker died; fall back to whatever was
                    // latched.
                    return latched.unwrap_or(DeepeningReport {
                        best_move: None,
                        value: VALUE_UNKNOWN,
                        depth: 0,
                        searched_nodes: 0,
                        done: true,
                    });
                }
            }
        }
    }
}

impl Default for DeepeningSearcher {
    fn default() -> Self {
        DeepeningSearcher::new()
    }
}

impl Drop for DeepeningSearcher {
    fn drop(&mut self) {
        self.cancel.set();
        self.thread_commands.send(Command::Exit).ok();
        if let Some(handle) = self.thread_join_handle.take() {
            handle.join().ok();
        }
    }
}

/// Listens for commands, executes deepening searches, sends reports
/// back. Runs on the worker thread.
fn serve_deepening(commands: Receiver<Command>,
                   reports: Sender<DeepeningReport>,
                   cancel: CancelSignal,
                   options: EngineOptions) {
    loop {
        let command = match commands.recv() {
            Ok(command) => command,
            Err(_) => break,
        };
        match command {
            Command::Search(task) => {
                run_deepening(&task, &reports, &cancel, &options);
            }
            Command::Terminate => continue,
            Command::Exit => break,
        }
    }
}

/// The deepening loop for one search task.
fn run_deepening(task: &SearchTask,
                 reports: &Sender<DeepeningReport>,
                 cancel: &CancelSignal,
                 options: &EngineOptions) {
    let start = Instant::now();
    let profile = EvalProfile::for_remaining_time(task.budget);
    let mut engine = SearchEngine::with_options(profile, options.clone());
    engine.use_cancel_signal(cancel.clone());

    let mut latched = DeepeningReport {
        best_move: None,
        value: VALUE_UNKNOWN,
        depth: 0,
        searched_nodes: 0,
        done: false,
    };
    // Completed iterations as (depth, milliseconds) pairs.
    let mut iteration_times: Vec<u64> = Vec::new();
    let mut consecutive_errors = 0u32;
    let mut depth: u8 = 1;

    while depth <= max(task.max_depth, 1) {
        // Depth 1 always runs; deeper iterations must fit the budget.
        if depth > 1 {
            let remaining = task.budget.saturating_sub(start.elapsed());
            let remaining_ms = remaining.as_millis() as u64;
            if remaining_ms < MIN_REMAINING_MS {
                break;
            }
            if let Some(predicted) = predict_iteration_ms(&iteration_times) {
                if predicted > remaining_ms * PREDICTION_BUDGET_SHARE / 100 {
                    debug!("deepening stops before depth {}: predicted {} ms, {} ms left",
                           depth, predicted, remaining_ms);
                    break;
                }
            }
        }

        let iteration_start = Instant::now();
        match search_depth(&mut engine, task, depth, latched.value) {
            Ok(report) => {
                consecutive_errors = 0;
                iteration_times.push(max(iteration_start.elapsed().as_millis() as u64, 1));
                latched = DeepeningReport {
                    best_move: report.best_move.or(latched.best_move),
                    value: report.value,
                    depth,
                    searched_nodes: latched.searched_nodes + report.searched_nodes,
                    done: false,
                };
                reports.send(latched.clone()).ok();
                if report.value.abs() > MATE_THRESHOLD {
                    // A forced win/loss; deeper search can not change
                    // the outcome.
                    break;
                }
                if report.best_move.is_none() {
                    // Terminal or stalemated root.
                    break;
                }
                depth += 1;
            }
            Err(SearchError::Terminated) => {
                // The interrupted iteration is discarded; `latched`
                // still holds the deepest completed one.
                break;
            }
            Err(SearchError::IllegalPosition) => {
                warn!("internal error searching depth {}: illegal root position", depth);
                consecutive_errors += 1;
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    break;
                }
            }
        }
    }

    if latched.best_move.is_none() {
        // Depth 1 never completed (or the root is already decided):
        // fall back to an emergency move so the caller always gets a
        // legal move when one exists.
        latched.best_move = emergency_move(&task.board);
    }
    latched.done = true;
    reports.send(latched).ok();
}

/// Runs one iteration, with aspiration windows once the depth and a
/// previous value allow it.
fn search_depth(engine: &mut SearchEngine,
                task: &SearchTask,
                depth: u8,
                previous_value: Value)
                -> Result<SearchReport, SearchError> {
    if depth < ASPIRATION_MIN_DEPTH || previous_value == VALUE_UNKNOWN ||
       previous_value.abs() >= MATE_THRESHOLD {
        return engine.find_best_move(&task.board, depth, task.strategy);
    }

    let mut delta = ASPIRATION_INITIAL_DELTA;
    let mut alpha = max(VALUE_MIN, previous_value - delta);
    let mut beta = min(VALUE_MAX, previous_value + delta);
    loop {
        if alpha >= beta {
            alpha = VALUE_MIN;
            beta = VALUE_MAX;
        }
        let report = engine.find_best_move_window(&task.board, depth, task.strategy, alpha, beta)?;
        let value = report.value;
        if value <= alpha && alpha > VALUE_MIN {
            // Failed low: reduce alpha and re-search.
            alpha = max(VALUE_MIN, value - delta);
        } else if value >= beta && beta < VALUE_MAX {
            // Failed high: raise beta and re-search.
            beta = min(VALUE_MAX, value + delta);
        } else {
            return Ok(report);
        }
        // Increase the half-width of the aspiration window.
        delta += 3 * delta / 8;
        if delta > 1500 {
            delta = VALUE_MAX;
        }
    }
}

/// Predicts the next iteration's cost in milliseconds: the geometric
/// mean growth between the completed iterations (each ratio bounded
/// into `[0.5, 6.0]`) applied to the last iteration's time, plus a
/// 30% safety margin.
fn predict_iteration_ms(iteration_times: &[u64]) -> Option<u64> {
    if iteration_times.len() < 2 {
        return None;
    }
    let mut log_sum = 0f64;
    let mut count = 0u32;
    for window in iteration_times.windows(2) {
        let ratio = (window[1].max(1) as f64 / window[0].max(1) as f64).clamp(0.5, 6.0);
        log_sum += ratio.ln();
        count += 1;
    }
    let growth = (log_sum / count as f64).exp().clamp(0.5, 6.0);
    let last = *iteration_times.last().unwrap() as f64;
    let predicted = last * growth * PREDICTION_MARGIN_NUM as f64 / PREDICTION_MARGIN_DEN as f64;
    Some(predicted.ceil() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, START_POSITION};
    use crate::movegen;

    #[test]
    fn test_small_budget_completes_depth_one() {
        let board = Board::from_notation(START_POSITION).unwrap();
        let mut searcher = DeepeningSearcher::new();
        let start = Instant::now();
        let outcome = searcher.search_with_budget(&board,
                                                  Duration::from_millis(50),
                                                  Strategy::PvsQuiescence);
        let elapsed = start.elapsed();
        assert!(outcome.done);
        assert!(outcome.depth >= 1);
        let best = outcome.best_move.unwrap();
        assert!(movegen::generate_all(&board).contains(&best));
        assert!(elapsed <= Duration::from_millis(100),
                "a 50 ms budget took {:?}", elapsed);
    }

    #[test]
    fn test_start_position_reaches_depth_three() {
        let board = Board::from_notation(START_POSITION).unwrap();
        let run = || {
            let mut searcher = DeepeningSearcher::new();
            searcher.search_with_budget_and_depth(&board,
                                                  Duration::from_secs(5),
                                                  3,
                                                  Strategy::PvsQuiescence)
        };
        let first = run();
        let second = run();
        assert!(first.depth >= 3, "only reached depth {}", first.depth);
        let best = first.best_move.unwrap();
        assert!(movegen::generate_all(&board).contains(&best));
        // The search is deterministic, so a repeated invocation
        // agrees.
        assert_eq!(first.best_move, second.best_move);
        assert_eq!(first.value, second.value);
    }

    #[test]
    fn test_mate_stops_the_deepening_early() {
        // Red mates in one; there is no point in deep search.
        let board = Board::from_notation("7/7/7/7/7/3RG3/BG6 r").unwrap();
        let mut searcher = DeepeningSearcher::new();
        let start = Instant::now();
        let outcome = searcher.search_with_budget(&board,
                                                  Duration::from_secs(30),
                                                  Strategy::PvsQuiescence);
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(outcome.best_move, Some(crate::moves::Move::new(D2, D1, 1)));
        assert!(outcome.value > MATE_THRESHOLD);
    }

    #[test]
    fn test_decided_position_still_returns_a_legal_move() {
        // Blue's guard is gone; the game is over, but a legal move
        // is still reported.
        let board = Board::from_notation("3RG3/7/7/7/7/7/7 r").unwrap();
        let mut searcher = DeepeningSearcher::new();
        let outcome = searcher.search_with_budget(&board,
                                                  Duration::from_millis(300),
                                                  Strategy::AlphaBetaQuiescence);
        assert!(outcome.done);
        let best = outcome.best_move.unwrap();
        assert!(movegen::generate_all(&board).contains(&best));
    }

    #[test]
    fn test_termination_keeps_completed_iteration() {
        let board = Board::from_notation(START_POSITION).unwrap();
        let mut searcher = DeepeningSearcher::new();
        searcher.start_search(SearchTask {
            board: board.clone(),
            budget: Duration::from_secs(600),
            max_depth: MAX_DEPTH,
            strategy: Strategy::PvsQuiescence,
        });
        // Let at least one iteration complete, then pull the plug.
        let first = loop {
            match searcher.try_recv_report() {
                Ok(report) => break report,
                Err(TryRecvError::Empty) => thread::sleep(Duration::from_millis(5)),
                Err(TryRecvError::Disconnected) => panic!("worker died"),
            }
        };
        assert!(!first.done);
        searcher.terminate_search();
        let final_report = loop {
            match searcher.try_recv_report() {
                Ok(report) if report.done => break report,
                Ok(_) => continue,
                Err(TryRecvError::Empty) => thread::sleep(Duration::from_millis(5)),
                Err(TryRecvError::Disconnected) => panic!("worker died"),
            }
        };
        assert!(final_report.depth >= first.depth);
        assert!(final_report.best_move.is_some());
    }

    #[test]
    fn test_prediction_growth_is_bounded() {
        assert_eq!(predict_iteration_ms(&[10]), None);
        // Explosive growth is clamped to x6, plus the 30% margin.
        let predicted = predict_iteration_ms(&[1, 1000]).unwrap();
        assert!(predicted <= 1000 * 6 * 13 / 10);
        // Shrinking times are clamped to x0.5.
        let predicted = predict_iteration_ms(&[1000, 10]).unwrap();
        assert!(predicted >= 10 / 2);
    }
}
