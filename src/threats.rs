//! Implements the threat detector.
//!
//! The detector classifies the immediate tactical threats the
//! opponent holds against the side to move, and lists the moves that
//! address them. The search uses the report in two places: the move
//! ordering pins defensive moves to the front of the list when a
//! serious threat exists, and the time manager treats threatened
//! positions as complex.

use crate::basetypes::*;
use crate::bitsets::*;
use crate::board::Board;
use crate::geometry::{BoardGeometry, DIRECTION_COUNT};
use crate::movegen;
use crate::moves::Move;
use crate::rules;

/// The kinds of threats the detector recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreatKind {
    /// The opponent can capture the guard.
    GuardCapture,

    /// The opponent's guard can step onto its target castle.
    CastleReach,

    /// One enemy piece attacks two or more pieces at once.
    Fork,

    /// A piece can not move away without exposing the guard.
    Pin,

    /// An enemy piece can move away and uncover an attack on the
    /// guard.
    DiscoveredAttack,
}

/// A single classified threat.
#[derive(Debug, Clone, Copy)]
pub struct Threat {
    pub kind: ThreatKind,
    /// The square of the threatened piece (or the castle square for
    /// `CastleReach`).
    pub target_square: Square,
    /// The enemy move executing the threat, or `Move::invalid()` for
    /// positional threats (pins, discovered attacks) that are not a
    /// single move.
    pub attacker_move: Move,
    pub value: Value,
}

/// The report produced by `detect`.
#[derive(Debug, Clone)]
pub struct ThreatReport {
    /// A coarse 0-255 severity scale.
    pub threat_level: u8,
    /// The own guard is attacked.
    pub in_check: bool,
    /// Some threat's value reaches the cutoff; the move ordering
    /// will then front-load the defensive moves.
    pub must_defend: bool,
    pub immediate_threats: Vec<Threat>,
    pub defensive_moves: Vec<Move>,
}

/// The default threat value at which `must_defend` is raised.
pub const MUST_DEFEND_CUTOFF: Value = 300;

/// Classifies the opponent's immediate threats against the side to
/// move.
pub fn detect(board: &Board) -> ThreatReport {
    detect_with_cutoff(board, MUST_DEFEND_CUTOFF)
}

/// Classifies threats with a caller-chosen `must_defend` cutoff.
pub fn detect_with_cutoff(board: &Board, cutoff: Value) -> ThreatReport {
    let us = board.us();
    let them = board.them();
    let g = BoardGeometry::get();

    // Give the opponent the move and look at what it could do.
    let mut view = board.clone();
    view.do_null();
    let enemy_moves = movegen::generate_all(&view);

    let mut threats = Vec::new();
    for &m in &enemy_moves {
        let to = m.dest_square();
        if board.guards(us) & (1 << to) != 0 {
            threats.push(Threat {
                kind: ThreatKind::GuardCapture,
                target_square: to,
                attacker_move: m,
                value: GUARD_VALUE,
            });
        } else if rules::is_guard_move(&view, m) && to == target_castle(them) {
            threats.push(Threat {
                kind: ThreatKind::CastleReach,
                target_square: to,
                attacker_move: m,
                value: GUARD_VALUE,
            });
        }
    }

    collect_forks(board, &view, &enemy_moves, cutoff, &mut threats);
    collect_ray_threats(board, us, them, g, &mut threats);

    let in_check = rules::in_check(board, us);
    let must_defend = threats.iter().any(|t| t.value >= cutoff);
    let total: Value = threats.iter().map(|t| t.value).sum();
    let threat_level = (total / 50).clamp(0, 255) as u8;

    let defensive_moves = if must_defend {
        collect_defensive_moves(board, &threats, cutoff)
    } else {
        Vec::new()
    };

    ThreatReport {
        threat_level,
        in_check,
        must_defend,
        immediate_threats: threats,
        defensive_moves,
    }
}

/// Finds enemy pieces attacking two or more pieces of the side to
/// move at once.
fn collect_forks(board: &Board,
                 view: &Board,
                 enemy_moves: &[Move],
                 cutoff: Value,
                 threats: &mut Vec<Threat>) {
    let us = board.us();
    // Group the capture moves by their origin square.
    let mut by_attacker: Vec<(Square, Vec<Move>)> = Vec::new();
    for &m in enemy_moves {
        if board.occupied_by(us) & (1 << m.dest_square()) == 0 {
            continue;
        }
        match by_attacker.iter_mut().find(|(sq, _)| *sq == m.orig_square()) {
            Some((_, list)) => list.push(m),
            None => by_attacker.push((m.orig_square(), vec![m])),
        }
    }
    for (_, captures) in by_attacker {
        if captures.len() < 2 {
            continue;
        }
        let mut victims: Vec<(Move, Value)> = captures
            .iter()
            .map(|&m| (m, rules::victim_value(view, m)))
            .collect();
        victims.sort_by_key(|&(_, v)| -v);
        // A fork is only meaningful when the second-best victim is
        // still worth defending.
        if victims[1].1 >= cutoff / 2 {
            let (best, value) = victims[0];
            threats.push(Threat {
                kind: ThreatKind::Fork,
                target_square: best.dest_square(),
                attacker_move: best,
                value,
            });
        }
    }
}

/// Finds pins against, and discovered attacks onto, the guard of the
/// side to move: a single piece standing on an otherwise clear line
/// between the guard and an enemy tower tall enough to cover the
/// distance.
fn collect_ray_threats(board: &Board,
                       us: Color,
                       them: Color,
                       g: &BoardGeometry,
                       threats: &mut Vec<Threat>) {
    let guard = match board.guard_square(us) {
        Some(sq) => sq,
        None => return,
    };
    let occupied = board.occupied();
    for dir in 0..DIRECTION_COUNT {
        let mut blocker: Option<Square> = None;
        for (i, &s) in g.rays[guard][dir].iter().enumerate() {
            if occupied & (1 << s) == 0 {
                continue;
            }
            match blocker {
                None => {
                    blocker = Some(s);
                    continue;
                }
                Some(b) => {
                    // `s` is the second piece on the ray.
                    if board.towers(them) & (1 << s) != 0 && board.height(them, s) >= i + 1 {
                        if board.occupied_by(us) & (1 << b) != 0 {
                            threats.push(Threat {
                                kind: ThreatKind::Pin,
                                target_square: b,
                                attacker_move: Move::invalid(),
                                value: piece_value(board, us, b),
                            });
                        } else {
                            threats.push(Threat {
                                kind: ThreatKind::DiscoveredAttack,
                                target_square: guard,
                                attacker_move: Move::invalid(),
                                value: GUARD_VALUE / 4,
                            });
                        }
                    }
                    break;
                }
            }
        }
    }
}

fn piece_value(board: &Board, color: Color, square: Square) -> Value {
    if board.guards(color) & (1 << square) != 0 {
        GUARD_VALUE
    } else {
        board.height(color, square) as Value * TOWER_SEGMENT_VALUE
    }
}

/// Lists the legal moves that address the serious threats: moving
/// the threatened piece, capturing the attacker, or blocking the
/// attack ray.
fn collect_defensive_moves(board: &Board, threats: &[Threat], cutoff: Value) -> Vec<Move> {
    let g = BoardGeometry::get();
    let mut defenses = Vec::new();
    for m in movegen::generate_all(board) {
        let mut defends = false;
        for t in threats.iter().filter(|t| t.value >= cutoff) {
            let attacker = t.attacker_move;
            // Move the threatened piece away.
            if m.orig_square() == t.target_square {
                defends = true;
            }
            if attacker.is_valid() {
                // Capture the attacker.
                if m.dest_square() == attacker.orig_square() {
                    defends = true;
                }
                // Block the ray (or occupy the castle square a guard
                // is running for).
                let blocking = g.between[attacker.orig_square()][attacker.dest_square()];
                if blocking & (1 << m.dest_square()) != 0 || m.dest_square() == t.target_square {
                    defends = true;
                }
            }
            if defends {
                break;
            }
        }
        if defends && !defenses.contains(&m) {
            defenses.push(m);
        }
    }
    defenses
}

/// Counts how many of the serious threats a move addresses (used by
/// the move ordering to rank the defensive moves).
pub fn defended_threat_count(report: &ThreatReport, m: Move) -> usize {
    let g = BoardGeometry::get();
    report.immediate_threats
        .iter()
        .filter(|t| {
            if m.orig_square() == t.target_square {
                return true;
            }
            let attacker = t.attacker_move;
            attacker.is_valid() &&
            (m.dest_square() == attacker.orig_square() ||
             m.dest_square() == t.target_square ||
             g.between[attacker.orig_square()][attacker.dest_square()] & (1 << m.dest_square()) !=
             0)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, START_POSITION};

    #[test]
    fn test_quiet_position_has_no_threats() {
        let report = detect(&Board::from_notation(START_POSITION).unwrap());
        assert!(!report.in_check);
        assert!(!report.must_defend);
        assert!(report.defensive_moves.is_empty());
    }

    #[test]
    fn test_guard_capture_threat() {
        // The blue 2-tower on D6 attacks the red guard on D7.
        let b = Board::from_notation("3RG3/3b23/7/7/7/7/3BG3 r").unwrap();
        let report = detect(&b);
        assert!(report.in_check);
        assert!(report.must_defend);
        assert!(report.threat_level > 0);
        assert!(report.immediate_threats
                      .iter()
                      .any(|t| t.kind == ThreatKind::GuardCapture && t.target_square == D7));
        // Escaping with the guard is listed as a defense.
        assert!(report.defensive_moves
                      .iter()
                      .any(|m| m.orig_square() == D7));
    }

    #[test]
    fn test_blocking_defense_is_found() {
        // A blue 3-tower on D4 attacks the red guard on D7 from
        // distance 3; the red tower on A6 can block on D6.
        let b = Board::from_notation("3RG3/r36/7/3b33/7/7/3BG3 r").unwrap();
        let report = detect(&b);
        assert!(report.must_defend);
        assert!(report.defensive_moves
                      .iter()
                      .any(|m| m.orig_square() == A6 && m.dest_square() == D6));
    }

    #[test]
    fn test_castle_reach_threat() {
        // The blue guard stands one step below the empty red castle.
        let b = Board::from_notation("2RG4/3BG3/7/7/7/7/7 r").unwrap();
        let report = detect(&b);
        assert!(report.immediate_threats
                      .iter()
                      .any(|t| t.kind == ThreatKind::CastleReach && t.target_square == D7));
        assert!(report.must_defend);
    }

    #[test]
    fn test_fork_detection() {
        // The blue 3-tower on D4 attacks both the red 2-tower on D6
        // (distance 2) and the red 3-tower on G4 (distance 3).
        let b = Board::from_notation("3RG3/3r23/7/3b32r3/7/7/3BG3 r").unwrap();
        let report = detect(&b);
        assert!(report.immediate_threats
                      .iter()
                      .any(|t| t.kind == ThreatKind::Fork && t.target_square == G4));
    }

    #[test]
    fn test_pin_detection() {
        // The red tower on D6 shields the guard on D7 from the blue
        // 4-tower on D3.
        let b = Board::from_notation("3RG3/3r13/7/7/3b43/7/3BG3 r").unwrap();
        let report = detect(&b);
        assert!(report.immediate_threats
                      .iter()
                      .any(|t| t.kind == ThreatKind::Pin && t.target_square == D6));
    }

    #[test]
    fn test_discovered_attack_detection() {
        // The blue 1-tower on D6 masks the blue 4-tower on D3: moving
        // it away would uncover an attack on the red guard.
        let b = Board::from_notation("3RG3/3b13/7/7/3b43/7/3BG3 r").unwrap();
        let report = detect(&b);
        assert!(report.immediate_threats
                      .iter()
                      .any(|t| t.kind == ThreatKind::DiscoveredAttack));
    }
}
