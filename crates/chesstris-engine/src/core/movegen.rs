//! Chess move generation over the sparse board.
//!
//! Every cell doubles as floor: a piece can never move onto a coordinate that
//! has no cell, nor off the board. Destinations are tagged [`MoveKind::Move`]
//! or [`MoveKind::Attack`] and returned in direction-table order, nearest
//! first within a direction.

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use super::{
    board::Occupancy,
    chess_piece::{ChessPiece, PieceKind},
    coord::Coord,
    ids::{PieceId, PlayerId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "camelCase")]
pub enum MoveKind {
    Move,
    Attack,
}

/// A legal destination for a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    pub at: Coord,
    pub kind: MoveKind,
}

impl Destination {
    #[must_use]
    pub const fn new(x: i32, y: i32, kind: MoveKind) -> Self {
        Self {
            at: Coord::new(x, y),
            kind,
        }
    }
}

/// Per-player modifiers applied while generating moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveOptions {
    /// Pieces pass over other pieces (granted by the jump potion).
    pub jump: bool,
}

/// Direction table entry for one piece kind.
#[derive(Debug, Clone, Copy)]
struct MovePattern {
    directions: &'static [(i32, i32)],
    /// `None` for sliding pieces.
    max_distance: Option<i32>,
    can_jump: bool,
}

const ORTHOGONAL: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
const DIAGONAL: [(i32, i32); 4] = [(1, -1), (1, 1), (-1, 1), (-1, -1)];
const ALL_DIRECTIONS: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];
const KNIGHT_JUMPS: [(i32, i32); 8] = [
    (1, -2),
    (2, -1),
    (2, 1),
    (1, 2),
    (-1, 2),
    (-2, 1),
    (-2, -1),
    (-1, -2),
];

const fn pattern(kind: PieceKind) -> MovePattern {
    match kind {
        PieceKind::Rook => MovePattern {
            directions: &ORTHOGONAL,
            max_distance: None,
            can_jump: false,
        },
        PieceKind::Bishop => MovePattern {
            directions: &DIAGONAL,
            max_distance: None,
            can_jump: false,
        },
        PieceKind::Queen => MovePattern {
            directions: &ALL_DIRECTIONS,
            max_distance: None,
            can_jump: false,
        },
        PieceKind::King => MovePattern {
            directions: &ALL_DIRECTIONS,
            max_distance: Some(1),
            can_jump: false,
        },
        PieceKind::Knight => MovePattern {
            directions: &KNIGHT_JUMPS,
            max_distance: Some(1),
            can_jump: true,
        },
        // Pawns are generated separately; the table is only consulted for
        // their capture squares.
        PieceKind::Pawn => MovePattern {
            directions: &[],
            max_distance: Some(1),
            can_jump: false,
        },
    }
}

/// What a square holds from the mover's point of view.
enum Square {
    Blocked,
    Empty,
    Friendly,
    Enemy { king: bool },
    /// Enemy piece that cannot be captured right now.
    Shielded,
}

fn classify<O: Occupancy>(board: &O, mover: &ChessPiece, at: Coord) -> Square {
    if !board.is_in_bounds(at) || !board.has_cell(at) {
        return Square::Blocked;
    }
    match board.piece_at(at) {
        None => Square::Empty,
        Some(other) if other.owner == mover.owner => Square::Friendly,
        Some(other) if other.is_shielded() => Square::Shielded,
        Some(other) => Square::Enemy {
            king: other.kind == PieceKind::King,
        },
    }
}

/// Returns the legal destinations of `piece` on `board`.
///
/// # Example
///
/// ```
/// use chesstris_engine::{Board, Coord, Destination, MoveKind, MoveOptions, generate_moves};
///
/// let board = Board::from_ascii(
///     "
///     __p_
///     __._
///     __._
///     __R_
///     ",
/// );
/// let rook = board.piece_at(Coord::new(2, 3)).unwrap();
/// let moves = generate_moves(&board, rook, MoveOptions::default());
/// assert_eq!(
///     moves,
///     vec![
///         Destination::new(2, 2, MoveKind::Move),
///         Destination::new(2, 1, MoveKind::Move),
///         Destination::new(2, 0, MoveKind::Attack),
///     ]
/// );
/// ```
#[must_use]
pub fn generate_moves<O: Occupancy>(
    board: &O,
    piece: &ChessPiece,
    options: MoveOptions,
) -> Vec<Destination> {
    if piece.kind == PieceKind::Pawn {
        return pawn_moves(board, piece, options).into_iter().collect();
    }

    let pattern = pattern(piece.kind);
    let can_jump = pattern.can_jump || options.jump;
    let mut moves = Vec::new();
    for &(dx, dy) in pattern.directions {
        let mut distance = 1;
        loop {
            if pattern.max_distance.is_some_and(|max| distance > max) {
                break;
            }
            let at = piece.position.offset(dx * distance, dy * distance);
            match classify(board, piece, at) {
                Square::Blocked => break,
                Square::Empty => moves.push(Destination {
                    at,
                    kind: MoveKind::Move,
                }),
                Square::Friendly | Square::Shielded => {
                    if !can_jump {
                        break;
                    }
                }
                Square::Enemy { king } => {
                    if !king || king_path_clear(board, piece, at) {
                        moves.push(Destination {
                            at,
                            kind: MoveKind::Attack,
                        });
                    }
                    if !can_jump {
                        break;
                    }
                }
            }
            distance += 1;
        }
    }
    moves
}

/// Capturing a king requires a clear line between attacker and king.
/// Pawn and knight capturers are exempt.
fn king_path_clear<O: Occupancy>(board: &O, attacker: &ChessPiece, king: Coord) -> bool {
    if matches!(attacker.kind, PieceKind::Knight | PieceKind::Pawn) {
        return true;
    }
    match attacker.position.between(king) {
        Some(mut path) => path.all(|at| board.piece_at(at).is_none()),
        None => true,
    }
}

fn pawn_moves<O: Occupancy>(
    board: &O,
    pawn: &ChessPiece,
    options: MoveOptions,
) -> ArrayVec<Destination, 4> {
    let mut moves = ArrayVec::new();
    let (fx, fy) = pawn.forward.delta();

    let one = pawn.position.offset(fx, fy);
    let one_square = classify(board, pawn, one);
    if matches!(one_square, Square::Empty) {
        moves.push(Destination {
            at: one,
            kind: MoveKind::Move,
        });
    }
    let one_passable = match one_square {
        Square::Empty => true,
        Square::Blocked => false,
        _ => options.jump,
    };
    if one_passable && pawn.on_starting_rank() {
        let two = pawn.position.offset(2 * fx, 2 * fy);
        if matches!(classify(board, pawn, two), Square::Empty) {
            moves.push(Destination {
                at: two,
                kind: MoveKind::Move,
            });
        }
    }

    // Diagonal captures: forward plus one step to either side.
    for side in [-1, 1] {
        let at = pawn.position.offset(fx + side * fy.abs(), fy + side * fx.abs());
        if let Square::Enemy { .. } = classify(board, pawn, at) {
            moves.push(Destination {
                at,
                kind: MoveKind::Attack,
            });
        }
    }
    moves
}

/// Every legal move of every piece owned by `player`, pieces in id order.
pub fn legal_moves_for_player<O: Occupancy>(
    board: &O,
    player: PlayerId,
    options: MoveOptions,
) -> Vec<(PieceId, Destination)> {
    let mut pieces: Vec<&ChessPiece> = board.pieces().filter(|p| p.owner == player).collect();
    pieces.sort_unstable_by_key(|p| p.id);
    let mut moves = Vec::new();
    for piece in pieces {
        moves.extend(
            generate_moves(board, piece, options)
                .into_iter()
                .map(|d| (piece.id, d)),
        );
    }
    moves
}

#[cfg(test)]
mod tests {
    use crate::core::{board::Board, coord::Direction};

    use super::*;

    fn moves_at(board: &Board, x: i32, y: i32) -> Vec<Destination> {
        let piece = board.piece_at(Coord::new(x, y)).unwrap();
        generate_moves(board, piece, MoveOptions::default())
    }

    fn jump_moves_at(board: &Board, x: i32, y: i32) -> Vec<Destination> {
        let piece = board.piece_at(Coord::new(x, y)).unwrap();
        generate_moves(board, piece, MoveOptions { jump: true })
    }

    #[test]
    fn test_rook_stops_at_first_enemy() {
        // Rook at (2,2), enemy at (2,5), empty cells at (2,3) and (2,4),
        // nothing beyond.
        let board = Board::from_ascii(
            "
            ____
            ____
            __R_
            __._
            __._
            __p_
            ",
        );
        assert_eq!(
            moves_at(&board, 2, 2),
            vec![
                Destination::new(2, 3, MoveKind::Move),
                Destination::new(2, 4, MoveKind::Move),
                Destination::new(2, 5, MoveKind::Attack),
            ]
        );
    }

    #[test]
    fn test_rook_does_not_pass_enemy_with_floor_behind() {
        let board = Board::from_ascii(
            "
            __R_
            __._
            __p_
            __._
            ",
        );
        let moves = moves_at(&board, 2, 0);
        assert!(moves.contains(&Destination::new(2, 2, MoveKind::Attack)));
        assert!(!moves.iter().any(|d| d.at == Coord::new(2, 3)));
    }

    #[test]
    fn test_bishop_does_not_pass_enemy_with_floor_behind() {
        let board = Board::from_ascii(
            "
            B___
            _.__
            __p_
            ___.
            ",
        );
        assert_eq!(
            moves_at(&board, 0, 0),
            vec![
                Destination::new(1, 1, MoveKind::Move),
                Destination::new(2, 2, MoveKind::Attack),
            ]
        );
    }

    #[test]
    fn test_queen_stops_at_first_occupied_square() {
        // Enemy on the rank, friend on the diagonal, floor behind both.
        let board = Board::from_ascii(
            "
            Q.p.
            .P__
            __._
            ___.
            ",
        );
        let moves = moves_at(&board, 0, 0);
        assert_eq!(moves.len(), 3);
        assert!(moves.contains(&Destination::new(1, 0, MoveKind::Move)));
        assert!(moves.contains(&Destination::new(2, 0, MoveKind::Attack)));
        assert!(moves.contains(&Destination::new(0, 1, MoveKind::Move)));
        for beyond in [Coord::new(3, 0), Coord::new(2, 2), Coord::new(3, 3)] {
            assert!(!moves.iter().any(|d| d.at == beyond));
        }
    }

    #[test]
    fn test_pawn_double_step_from_starting_rank() {
        let board = Board::from_ascii(
            "
            ____
            ____
            ____
            ____
            ___.
            ___.
            ___P
            ",
        );
        let moves = moves_at(&board, 3, 6);
        assert!(moves.contains(&Destination::new(3, 5, MoveKind::Move)));
        assert!(moves.contains(&Destination::new(3, 4, MoveKind::Move)));
        assert_eq!(moves.len(), 2);
    }

    #[test]
    fn test_pawn_double_step_blocked_by_intervening_piece() {
        let board = Board::from_ascii(
            "
            .
            p
            P
            ",
        );
        assert!(moves_at(&board, 0, 2).is_empty());
    }

    #[test]
    fn test_pawn_no_double_step_after_moving() {
        let mut board = Board::from_ascii(
            "
            .
            .
            .
            P
            ",
        );
        let id = board.piece_at(Coord::new(0, 3)).unwrap().id;
        board.move_piece(id, Coord::new(0, 2)).unwrap();
        assert_eq!(
            moves_at(&board, 0, 2),
            vec![Destination::new(0, 1, MoveKind::Move)]
        );
    }

    #[test]
    fn test_pawn_captures_only_diagonally() {
        let board = Board::from_ascii(
            "
            .p.
            p.p
            .P.
            ",
        );
        assert_eq!(
            moves_at(&board, 1, 2),
            vec![
                Destination::new(1, 1, MoveKind::Move),
                Destination::new(0, 1, MoveKind::Attack),
                Destination::new(2, 1, MoveKind::Attack),
            ]
        );

        // An enemy straight ahead blocks and is not capturable.
        let board = Board::from_ascii(
            "
            p.p
            .p.
            .P.
            ",
        );
        assert!(moves_at(&board, 1, 2).is_empty());
    }

    #[test]
    fn test_pawn_forward_depends_on_facing() {
        let board = Board::from_ascii(
            "
            p.
            ..
            .P
            ",
        );
        // Lowercase pawns advance down, uppercase up.
        let down = moves_at(&board, 0, 0);
        assert!(down.contains(&Destination::new(0, 1, MoveKind::Move)));
        let up = moves_at(&board, 1, 2);
        assert!(up.contains(&Destination::new(1, 1, MoveKind::Move)));
        let pawn = board.piece_at(Coord::new(0, 0)).unwrap();
        assert_eq!(pawn.forward, Direction::Down);
    }

    #[test]
    fn test_knight_ignores_intervening_pieces() {
        let board = Board::from_ascii(
            "
            ._._.
            _ppp_
            _pNp_
            _ppp_
            ._._.
            ",
        );
        let moves = moves_at(&board, 2, 2);
        assert_eq!(moves.len(), 0);

        let board = Board::from_ascii(
            "
            _._._
            .ppp.
            _pNp_
            .ppp.
            _._._
            ",
        );
        let moves = moves_at(&board, 2, 2);
        assert_eq!(moves.len(), 8);
        assert!(moves.iter().all(|d| d.kind == MoveKind::Move));
    }

    #[test]
    fn test_sliders_stop_at_missing_floor() {
        let board = Board::from_ascii("B._.");
        assert!(moves_at(&board, 0, 0).is_empty());

        let board = Board::from_ascii("Q._.");
        assert_eq!(
            moves_at(&board, 0, 0),
            vec![Destination::new(1, 0, MoveKind::Move)]
        );
    }

    #[test]
    fn test_friendly_piece_blocks_without_being_added() {
        let board = Board::from_ascii("R.P.");
        assert_eq!(
            moves_at(&board, 0, 0),
            vec![Destination::new(1, 0, MoveKind::Move)]
        );
    }

    #[test]
    fn test_king_steps_one_square() {
        let board = Board::from_ascii(
            "
            ...
            .K.
            ...
            ",
        );
        assert_eq!(moves_at(&board, 1, 1).len(), 8);
    }

    #[test]
    fn test_jump_lets_sliders_pass_pieces() {
        let board = Board::from_ascii("RPp.");
        assert_eq!(
            jump_moves_at(&board, 0, 0),
            vec![
                Destination::new(2, 0, MoveKind::Attack),
                Destination::new(3, 0, MoveKind::Move),
            ]
        );
    }

    #[test]
    fn test_king_capture_through_block_rejected() {
        // With jump the rook passes the pawn, but may not take a king behind it.
        let board = Board::from_ascii("Rp.k");
        let moves = jump_moves_at(&board, 0, 0);
        assert!(moves.contains(&Destination::new(1, 0, MoveKind::Attack)));
        assert!(moves.contains(&Destination::new(2, 0, MoveKind::Move)));
        assert!(!moves.iter().any(|d| d.at == Coord::new(3, 0)));
    }

    #[test]
    fn test_king_capture_guard_skips_knights() {
        let board = Board::from_ascii(
            "
            _k
            pp
            N_
            ",
        );
        assert!(moves_at(&board, 0, 2).contains(&Destination::new(1, 0, MoveKind::Attack)));
    }

    #[test]
    fn test_shielded_piece_cannot_be_attacked() {
        let mut board = Board::from_ascii("R.p.");
        let pawn = board.piece_at(Coord::new(2, 0)).unwrap().id;
        board.piece_mut(pawn).unwrap().shielded_until = Some(1_000);
        assert_eq!(
            moves_at(&board, 0, 0),
            vec![Destination::new(1, 0, MoveKind::Move)]
        );
    }

    #[test]
    fn test_never_leaves_bounds_or_floor() {
        let board = Board::from_ascii(
            "
            ._.._.
            .Q.R..
            ..__..
            .B._N.
            ._K...
            P.....
            ",
        );
        for piece in board.pieces() {
            for d in generate_moves(&board, piece, MoveOptions { jump: true }) {
                assert!(board.is_in_bounds(d.at), "{piece:?} -> {d:?}");
                assert!(board.has_cell(d.at), "{piece:?} -> {d:?}");
            }
        }
    }

    #[test]
    fn test_legal_moves_for_player_filters_owner() {
        let board = Board::from_ascii("K.k");
        let moves = legal_moves_for_player(&board, PlayerId(1), MoveOptions::default());
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].1, Destination::new(1, 0, MoveKind::Move));
    }
}
