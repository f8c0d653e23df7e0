use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    chess_piece::{ChessPiece, PieceKind},
    coord::{Coord, Direction},
    ids::{PieceId, PlayerId, PotionId},
};

/// Kind of a board cell that exists in the sparse store.
///
/// Empty squares are not represented: a coordinate without a cell has no
/// floor and nothing can stand on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CellKind {
    /// Cell created by a tetromino lock.
    #[default]
    Normal,
    /// Cell seeded as part of a player's home zone.
    HomeZone,
}

/// A single cell of the board.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub kind: CellKind,
    pub owner: Option<PlayerId>,
    pub piece: Option<PieceId>,
    pub potion: Option<PotionId>,
    pub sponsor: Option<String>,
    /// Game clock (ms) at which the cell was created.
    pub created_at: u64,
}

impl Cell {
    #[must_use]
    pub fn new(kind: CellKind, owner: Option<PlayerId>, created_at: u64) -> Self {
        Self {
            kind,
            owner,
            created_at,
            ..Self::default()
        }
    }
}

/// Error returned when a piece operation would break the cell/piece pairing.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum BoardError {
    #[display("no cell at {at}")]
    NoCell { at: Coord },
    #[display("cell {at} is already occupied")]
    Occupied { at: Coord },
    #[display("{piece} is not on the board")]
    UnknownPiece { piece: PieceId },
}

/// Read-only view of piece occupancy used by move generation.
///
/// [`Board`] implements it directly; [`SimulatedMove`] overlays a single
/// hypothetical move on top of a board without copying it.
pub trait Occupancy {
    fn is_in_bounds(&self, at: Coord) -> bool;

    /// Whether a cell (floor) exists at `at`.
    fn has_cell(&self, at: Coord) -> bool;

    fn piece_at(&self, at: Coord) -> Option<&ChessPiece>;

    fn pieces(&self) -> impl Iterator<Item = &ChessPiece>;
}

/// The sparse board store: coordinate → cell, plus the registry of the chess
/// pieces standing on those cells.
///
/// The store holds no rule logic. It keeps two invariants:
///
/// - a piece's `position` is the coordinate of the only cell whose `piece`
///   field names it
/// - at most one piece occupies a cell
///
/// # Example
///
/// ```
/// use chesstris_engine::{Board, Cell, CellKind, Coord};
///
/// let mut board = Board::new(8, 8);
/// board.set_cell(Coord::new(1, 1), Cell::new(CellKind::Normal, None, 0));
/// assert!(board.get_cell(Coord::new(1, 1)).is_some());
/// assert!(!board.is_occupied(Coord::new(1, 1)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Board {
    width: i32,
    height: i32,
    cells: HashMap<Coord, Cell>,
    pieces: HashMap<PieceId, ChessPiece>,
}

impl Board {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: i32::try_from(width).unwrap_or(i32::MAX),
            height: i32::try_from(height).unwrap_or(i32::MAX),
            cells: HashMap::new(),
            pieces: HashMap::new(),
        }
    }

    #[must_use]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[must_use]
    pub fn is_in_bounds(&self, at: Coord) -> bool {
        (0..self.width).contains(&at.x) && (0..self.height).contains(&at.y)
    }

    #[must_use]
    pub fn get_cell(&self, at: Coord) -> Option<&Cell> {
        self.cells.get(&at)
    }

    pub fn get_cell_mut(&mut self, at: Coord) -> Option<&mut Cell> {
        self.cells.get_mut(&at)
    }

    /// Creates or overwrites the cell at `at` and returns the previous cell.
    ///
    /// Piece occupancy is owned by the piece registry: the occupant of a
    /// replaced cell stays on the new cell, and `cell.piece` is ignored.
    pub fn set_cell(&mut self, at: Coord, mut cell: Cell) -> Option<Cell> {
        cell.piece = self.cells.get(&at).and_then(|c| c.piece);
        self.cells.insert(at, cell)
    }

    /// Removes the cell at `at`, together with the piece standing on it.
    pub fn remove_cell(&mut self, at: Coord) -> Option<(Cell, Option<ChessPiece>)> {
        let cell = self.cells.remove(&at)?;
        let piece = cell.piece.and_then(|id| self.pieces.remove(&id));
        Some((cell, piece))
    }

    /// Whether a chess piece stands on `at`.
    #[must_use]
    pub fn is_occupied(&self, at: Coord) -> bool {
        self.cells.get(&at).is_some_and(|c| c.piece.is_some())
    }

    #[must_use]
    pub fn has_cell(&self, at: Coord) -> bool {
        self.cells.contains_key(&at)
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> impl Iterator<Item = (Coord, &Cell)> + '_ {
        self.cells.iter().map(|(at, cell)| (*at, cell))
    }

    pub fn cells_owned_by(&self, player: PlayerId) -> impl Iterator<Item = (Coord, &Cell)> + '_ {
        self.cells().filter(move |(_, c)| c.owner == Some(player))
    }

    #[must_use]
    pub fn cells_in_row(&self, y: i32) -> usize {
        self.cells.keys().filter(|at| at.y == y).count()
    }

    #[must_use]
    pub fn cells_in_column(&self, x: i32) -> usize {
        self.cells.keys().filter(|at| at.x == x).count()
    }

    #[must_use]
    pub fn piece(&self, id: PieceId) -> Option<&ChessPiece> {
        self.pieces.get(&id)
    }

    pub fn piece_mut(&mut self, id: PieceId) -> Option<&mut ChessPiece> {
        self.pieces.get_mut(&id)
    }

    #[must_use]
    pub fn piece_at(&self, at: Coord) -> Option<&ChessPiece> {
        let id = self.cells.get(&at)?.piece?;
        self.pieces.get(&id)
    }

    pub fn pieces(&self) -> impl Iterator<Item = &ChessPiece> + '_ {
        self.pieces.values()
    }

    pub fn pieces_of(&self, player: PlayerId) -> impl Iterator<Item = &ChessPiece> + '_ {
        self.pieces.values().filter(move |p| p.owner == player)
    }

    /// Puts a new piece on the empty cell at its position.
    pub fn insert_piece(&mut self, piece: ChessPiece) -> Result<(), BoardError> {
        let at = piece.position;
        let cell = self.cells.get_mut(&at).ok_or(BoardError::NoCell { at })?;
        if cell.piece.is_some() {
            return Err(BoardError::Occupied { at });
        }
        cell.piece = Some(piece.id);
        self.pieces.insert(piece.id, piece);
        Ok(())
    }

    /// Takes a piece off the board, leaving its cell in place.
    pub fn remove_piece(&mut self, id: PieceId) -> Option<ChessPiece> {
        let piece = self.pieces.remove(&id)?;
        if let Some(cell) = self.cells.get_mut(&piece.position) {
            cell.piece = None;
        }
        Some(piece)
    }

    /// Moves a piece to `to`, removing and returning any piece standing there.
    ///
    /// No rule checks are made beyond the existence of the destination cell.
    pub fn move_piece(
        &mut self,
        id: PieceId,
        to: Coord,
    ) -> Result<Option<ChessPiece>, BoardError> {
        if !self.cells.contains_key(&to) {
            return Err(BoardError::NoCell { at: to });
        }
        let from = self
            .pieces
            .get(&id)
            .ok_or(BoardError::UnknownPiece { piece: id })?
            .position;
        if from == to {
            return Ok(None);
        }
        let captured = self
            .cells
            .get(&to)
            .and_then(|c| c.piece)
            .and_then(|victim| self.pieces.remove(&victim));
        if let Some(cell) = self.cells.get_mut(&from) {
            cell.piece = None;
        }
        if let Some(cell) = self.cells.get_mut(&to) {
            cell.piece = Some(id);
        }
        if let Some(piece) = self.pieces.get_mut(&id) {
            piece.position = to;
        }
        Ok(captured)
    }

    /// Builds a board from ASCII art, for tests and examples.
    ///
    /// - `.`: cell without a piece
    /// - `_` or space: no cell
    /// - uppercase piece letter (`PRNBQK`): piece of [`PlayerId`] 1, pawns advance up
    /// - lowercase piece letter: piece of [`PlayerId`] 2, pawns advance down
    ///
    /// Cells are owned by nobody; piece ids are assigned in reading order.
    ///
    /// # Panics
    ///
    /// Panics on characters outside the alphabet above.
    #[must_use]
    pub fn from_ascii(art: &str) -> Self {
        let lines: Vec<&str> = art
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .map(str::trim_start)
            .collect();
        let height = u32::try_from(lines.len()).unwrap_or(u32::MAX);
        let width = lines
            .iter()
            .map(|l| u32::try_from(l.chars().count()).unwrap_or(u32::MAX))
            .max()
            .unwrap_or(0);
        let mut board = Self::new(width, height);
        let mut next_id = 0;
        for (y, line) in (0..).zip(&lines) {
            for (x, ch) in (0..).zip(line.chars()) {
                let at = Coord::new(x, y);
                match ch {
                    '_' | ' ' => {}
                    '.' => {
                        board.set_cell(at, Cell::default());
                    }
                    _ => {
                        let kind = PieceKind::from_char(ch)
                            .unwrap_or_else(|| panic!("invalid board character {ch:?} at {at}"));
                        let (owner, forward) = if ch.is_ascii_uppercase() {
                            (PlayerId(1), Direction::Up)
                        } else {
                            (PlayerId(2), Direction::Down)
                        };
                        next_id += 1;
                        board.set_cell(at, Cell::default());
                        board
                            .insert_piece(ChessPiece::new(
                                PieceId(next_id),
                                kind,
                                owner,
                                at,
                                forward,
                            ))
                            .expect("fresh cell cannot be occupied");
                    }
                }
            }
        }
        board
    }
}

impl Occupancy for Board {
    fn is_in_bounds(&self, at: Coord) -> bool {
        Board::is_in_bounds(self, at)
    }

    fn has_cell(&self, at: Coord) -> bool {
        Board::has_cell(self, at)
    }

    fn piece_at(&self, at: Coord) -> Option<&ChessPiece> {
        Board::piece_at(self, at)
    }

    fn pieces(&self) -> impl Iterator<Item = &ChessPiece> {
        self.pieces.values()
    }
}

/// A board with one move applied virtually.
///
/// Used to ask "would this move leave the king attacked?" without copying
/// the board: lookups at the origin see nothing, lookups at the destination
/// see the moved piece, and a captured piece disappears.
#[derive(Debug)]
pub struct SimulatedMove<'a, B> {
    base: &'a B,
    from: Coord,
    moved: ChessPiece,
}

impl<'a, B: Occupancy> SimulatedMove<'a, B> {
    #[must_use]
    pub fn new(base: &'a B, piece: &ChessPiece, to: Coord) -> Self {
        let mut moved = piece.clone();
        moved.position = to;
        Self {
            base,
            from: piece.position,
            moved,
        }
    }
}

impl<B: Occupancy> Occupancy for SimulatedMove<'_, B> {
    fn is_in_bounds(&self, at: Coord) -> bool {
        self.base.is_in_bounds(at)
    }

    fn has_cell(&self, at: Coord) -> bool {
        self.base.has_cell(at)
    }

    fn piece_at(&self, at: Coord) -> Option<&ChessPiece> {
        if at == self.moved.position {
            Some(&self.moved)
        } else if at == self.from {
            None
        } else {
            self.base.piece_at(at)
        }
    }

    fn pieces(&self) -> impl Iterator<Item = &ChessPiece> {
        let to = self.moved.position;
        let id = self.moved.id;
        self.base
            .pieces()
            .filter(move |p| p.id != id && p.position != to)
            .chain(std::iter::once(&self.moved))
    }
}
