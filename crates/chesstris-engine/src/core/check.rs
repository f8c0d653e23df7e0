use super::{
    board::{Occupancy, SimulatedMove},
    chess_piece::PieceKind,
    ids::PlayerId,
    movegen::{MoveKind, MoveOptions, generate_moves},
};

/// Whether any opponent piece attacks a king of `player`.
///
/// `options` supplies per-player move modifiers (e.g. an active jump
/// potion). A player without a king on the board is never in check.
pub fn is_in_check<O, F>(board: &O, player: PlayerId, options: F) -> bool
where
    O: Occupancy,
    F: Fn(PlayerId) -> MoveOptions,
{
    let kings: Vec<_> = board
        .pieces()
        .filter(|p| p.owner == player && p.kind == PieceKind::King)
        .map(|p| p.position)
        .collect();
    if kings.is_empty() {
        return false;
    }
    board.pieces().filter(|p| p.owner != player).any(|attacker| {
        generate_moves(board, attacker, options(attacker.owner))
            .iter()
            .any(|d| d.kind == MoveKind::Attack && kings.contains(&d.at))
    })
}

/// Whether `player` is in check and no move of theirs escapes it.
///
/// Each candidate move is tried on a [`SimulatedMove`] overlay, so the board
/// is never copied.
pub fn is_in_checkmate<O, F>(board: &O, player: PlayerId, options: F) -> bool
where
    O: Occupancy,
    F: Fn(PlayerId) -> MoveOptions,
{
    if !is_in_check(board, player, &options) {
        return false;
    }
    let own_options = options(player);
    for piece in board.pieces().filter(|p| p.owner == player) {
        for destination in generate_moves(board, piece, own_options) {
            let simulated = SimulatedMove::new(board, piece, destination.at);
            if !is_in_check(&simulated, player, &options) {
                return false;
            }
        }
    }
    true
}
