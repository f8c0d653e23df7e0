//! Turn/Phase Controller.
//!
//! A [`Game`] owns the whole shared state and applies one action at a time.
//! Each player runs an independent cycle: in the tetris phase they place a
//! tetromino (always advancing to chess, even when it explodes), in the chess
//! phase they make one legal move (a rejected move never advances). There is
//! no global turn order.

use std::collections::BTreeMap;

use rand::Rng as _;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::{
    ConcurrencyConflict, GameError, NotFoundError, ValidationError,
    core::{
        self, Board, ChessPiece, Coord, Destination, Direction, HomeZone, IdAllocator, MoveKind,
        MoveOptions, PieceId, PieceKind, PlayerId, Potion, PotionId, Rotation, Tetromino,
        TetrominoShape,
    },
};

use super::{
    clearing::{self, ClearReport},
    config::{ConfigError, GameConfig},
    effects::{self, EffectTarget, PotionEffect},
    events::GameEvent,
    falling::{self, FallingTetromino, TetrominoState},
    history::SnapshotHistory,
    player::{Phase, Player},
    seed::GameSeed,
    snapshot::{CellEntry, FallingView, GameSnapshot, PlayerStatus},
    zones::{self, ZoneChange},
};

/// Result of a tetromino placement.
///
/// Both variants consume the player's tetris phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(tag = "outcome", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PlacementOutcome {
    Locked {
        cells: Vec<Coord>,
        potion: Option<Potion>,
        cleared: ClearReport,
    },
    /// The placement failed its adjacency check; the board is unchanged.
    Exploded { cells: Vec<Coord> },
}

impl PlacementOutcome {
    /// The terminal state the resolved tetromino ended in.
    #[must_use]
    pub fn state(&self) -> TetrominoState {
        match self {
            Self::Locked { .. } => TetrominoState::Locked,
            Self::Exploded { .. } => TetrominoState::Exploded,
        }
    }
}

/// Result of an accepted chess move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    pub piece: PieceId,
    pub from: Coord,
    pub to: Coord,
    pub kind: MoveKind,
    pub captured: Option<ChessPiece>,
    pub potion: Option<PotionEffect>,
    pub promoted: bool,
}

/// The shared game state and the rules that mutate it.
///
/// Every method is a single read-validate-mutate step; a rejected action
/// leaves the state untouched. Callers serialize access (one action at a
/// time).
#[derive(Debug, Clone)]
pub struct Game {
    config: GameConfig,
    seed: GameSeed,
    rng: Pcg32,
    ids: IdAllocator,
    clock_ms: u64,
    version: u64,
    board: Board,
    players: BTreeMap<PlayerId, Player>,
    zones: Vec<HomeZone>,
    potions: BTreeMap<PotionId, Potion>,
    falling: BTreeMap<PlayerId, FallingTetromino>,
    fall_elapsed_ms: u64,
    degradation_elapsed_ms: u64,
    events: Vec<GameEvent>,
    history: SnapshotHistory,
}

impl Game {
    /// Creates a game with a random seed.
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        Self::with_seed(config, rand::rng().random())
    }

    pub fn with_seed(config: GameConfig, seed: GameSeed) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            board: Board::new(config.board_width, config.board_height),
            history: SnapshotHistory::with_capacity(config.history_size),
            config,
            seed,
            rng: seed.rng(),
            ids: IdAllocator::default(),
            clock_ms: 0,
            version: 0,
            players: BTreeMap::new(),
            zones: Vec::new(),
            potions: BTreeMap::new(),
            falling: BTreeMap::new(),
            fall_elapsed_ms: 0,
            degradation_elapsed_ms: 0,
            events: Vec::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub fn seed(&self) -> GameSeed {
        self.seed
    }

    #[must_use]
    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    /// Incremented by every accepted mutation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> + '_ {
        self.players.values()
    }

    #[must_use]
    pub fn zone(&self, owner: PlayerId) -> Option<&HomeZone> {
        self.zones.iter().find(|zone| zone.owner == owner)
    }

    #[must_use]
    pub fn zones(&self) -> &[HomeZone] {
        &self.zones
    }

    pub fn potions(&self) -> impl Iterator<Item = &Potion> + '_ {
        self.potions.values()
    }

    #[must_use]
    pub fn falling_tetromino(&self, player: PlayerId) -> Option<&FallingTetromino> {
        self.falling.get(&player)
    }

    #[must_use]
    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    /// Events recorded since the last drain.
    #[must_use]
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Rejects an action validated against another version of the game.
    pub fn check_version(&self, expected: Option<u64>) -> Result<(), ConcurrencyConflict> {
        match expected {
            Some(expected) if expected != self.version => Err(ConcurrencyConflict {
                expected,
                actual: self.version,
            }),
            _ => Ok(()),
        }
    }

    /// Joins a new player: allocates and seeds a home zone, then spawns the
    /// player's first tetromino.
    pub fn add_player(&mut self, name: impl Into<String>) -> Result<PlayerId, GameError> {
        // Draw from a copy so a rejected join leaves the rng where it was.
        let mut rng = self.rng.clone();
        let mut zone =
            zones::place_zone(&self.board, &self.zones, PlayerId(0), &self.config, &mut rng)?;
        self.rng = rng;
        let id = self.ids.player();
        zone.owner = id;

        let now = self.clock_ms;
        let facing = zones::zone_facing(&zone, self.board.height());
        let pieces = zones::seed_zone(&mut self.board, &zone, facing, &mut self.ids, now);
        self.prune_potions();

        let name = name.into();
        let mut player = Player::new(id, name.clone(), facing, self.config.starting_resources);
        player.pieces.extend(pieces.iter().map(|p| p.id));
        self.players.insert(id, player);
        self.events.push(GameEvent::PlayerJoined {
            at_ms: now,
            player: id,
            name,
            zone: zone.clone(),
        });
        self.zones.push(zone);
        self.spawn_tetromino(id);
        self.commit();
        Ok(id)
    }

    /// Removes a player. Their falling tetromino and pieces go away; their
    /// cells and home zone stay and the zone degrades like any empty zone.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<(), GameError> {
        if self.players.remove(&id).is_none() {
            return Err(NotFoundError::Player { player: id }.into());
        }
        self.falling.remove(&id);
        self.remove_pieces_of(id);
        self.events.push(GameEvent::PlayerLeft {
            at_ms: self.clock_ms,
            player: id,
        });
        self.commit();
        Ok(())
    }

    /// Moves the falling tetromino one cell sideways.
    pub fn shift_tetromino(&mut self, player: PlayerId, direction: Direction) -> Result<(), GameError> {
        self.active_player(player)?;
        let falling = self
            .falling
            .get_mut(&player)
            .ok_or(ValidationError::NoFallingTetromino { player })?;
        let next = falling.tetromino.stepped(direction);
        if falling::collides(&self.board, &next) {
            return Err(ValidationError::TetrominoBlocked { player }.into());
        }
        falling.tetromino = next;
        Ok(())
    }

    pub fn rotate_tetromino(&mut self, player: PlayerId) -> Result<(), GameError> {
        self.active_player(player)?;
        let falling = self
            .falling
            .get_mut(&player)
            .ok_or(ValidationError::NoFallingTetromino { player })?;
        let next = falling.tetromino.rotated_right();
        if falling::collides(&self.board, &next) {
            return Err(ValidationError::TetrominoBlocked { player }.into());
        }
        falling.tetromino = next;
        Ok(())
    }

    /// Drops the falling tetromino straight to its ghost position and
    /// resolves the placement.
    pub fn hard_drop(&mut self, player: PlayerId) -> Result<PlacementOutcome, GameError> {
        self.ensure_can_place(player)?;
        let direction = self.drop_direction(player);
        let mut falling = self
            .falling
            .remove(&player)
            .ok_or(ValidationError::NoFallingTetromino { player })?;
        falling.tetromino = falling::drop_position(&self.board, falling.tetromino, direction);
        let outcome = self.resolve_placement(falling);
        self.commit();
        Ok(outcome)
    }

    /// Locks a tetromino of `shape` at `position`/`rotation` for `player`.
    ///
    /// The player must be in the tetris phase, or in the chess phase with no
    /// legal move (tetromino-only play). A placement that fails the adjacency
    /// rule explodes: the board is untouched, the result is
    /// [`PlacementOutcome::Exploded`] and the phase still advances to chess.
    pub fn place_tetromino(
        &mut self,
        player: PlayerId,
        shape: TetrominoShape,
        position: Coord,
        rotation: Rotation,
    ) -> Result<PlacementOutcome, GameError> {
        self.ensure_can_place(player)?;
        let tetromino = Tetromino::new(shape, rotation, position);
        if tetromino.checked_blocks().is_none() {
            return Err(ValidationError::PositionOutOfRange { at: position }.into());
        }
        let falling = match self.falling.remove(&player) {
            Some(falling) if falling.tetromino.shape == shape => FallingTetromino {
                tetromino,
                ..falling
            },
            _ => FallingTetromino {
                owner: player,
                tetromino,
                fall_height: 0,
                sponsor: None,
                potion: None,
                state: TetrominoState::Falling,
            },
        };
        let outcome = self.resolve_placement(falling);
        self.commit();
        Ok(outcome)
    }

    /// Moves one of `player`'s pieces from `from` to `to`.
    ///
    /// Rejected without advancing the phase when the player is not in the
    /// chess phase, has no legal move at all, or names an illegal move.
    pub fn move_chess_piece(
        &mut self,
        player: PlayerId,
        from: Coord,
        to: Coord,
    ) -> Result<MoveOutcome, GameError> {
        let phase = self.active_player(player)?.phase;
        if !phase.is_chess() {
            return Err(ValidationError::WrongPhase {
                player,
                expected: Phase::Chess,
                actual: phase,
            }
            .into());
        }
        if !self.has_legal_move(player) {
            return Err(ValidationError::NoLegalMoves { player }.into());
        }
        let piece = self
            .board
            .piece_at(from)
            .ok_or(NotFoundError::Piece { at: from })?;
        if piece.owner != player {
            return Err(ValidationError::NotOwner {
                player,
                piece: piece.id,
            }
            .into());
        }
        let options = self.move_options()(player);
        let destination = core::generate_moves(&self.board, piece, options)
            .into_iter()
            .find(|d| d.at == to)
            .ok_or(ValidationError::IllegalMove { from, to })?;
        let id = piece.id;

        let now = self.clock_ms;
        let captured = self
            .board
            .move_piece(id, to)
            .map_err(|_| ValidationError::IllegalMove { from, to })?;
        self.events.push(GameEvent::PieceMoved {
            at_ms: now,
            player,
            piece: id,
            from,
            to,
        });

        if let Some(victim) = &captured {
            if let Some(owner) = self.players.get_mut(&victim.owner) {
                owner.pieces.remove(&victim.id);
            }
            let reward = self.config.piece_prices.price(victim.kind).unwrap_or(0);
            if let Some(mover) = self.players.get_mut(&player) {
                mover.resources = mover.resources.saturating_add(reward);
                mover.score += u64::from(reward);
            }
            self.events.push(GameEvent::PieceCaptured {
                at_ms: now,
                player,
                captured: victim.clone(),
            });
        }

        let potion = self.pick_up_potion(player, to);
        let promoted = self.promote_if_due(player, id);

        if let Some(p) = self.players.get_mut(&player) {
            p.phase = Phase::Tetris;
        }
        self.spawn_tetromino(player);
        self.eliminate_kingless_players();
        self.commit();

        Ok(MoveOutcome {
            piece: id,
            from,
            to,
            kind: destination.kind,
            captured,
            potion,
            promoted,
        })
    }

    /// Buys a non-king piece and puts it on an empty cell the player owns or
    /// that lies inside their home zone. The phase does not change.
    pub fn purchase_piece(
        &mut self,
        player: PlayerId,
        kind: PieceKind,
        at: Coord,
    ) -> Result<PieceId, GameError> {
        let buyer = self.active_player(player)?;
        let price = self
            .config
            .piece_prices
            .price(kind)
            .ok_or(ValidationError::KingNotPurchasable)?;
        if buyer.resources < price {
            return Err(ValidationError::InsufficientResources {
                player,
                kind,
                price,
                available: buyer.resources,
            }
            .into());
        }
        let in_zone = self.zone(player).is_some_and(|zone| zone.contains(at));
        let placeable = self
            .board
            .get_cell(at)
            .is_some_and(|cell| cell.piece.is_none() && (cell.owner == Some(player) || in_zone));
        if !placeable {
            return Err(ValidationError::InvalidPurchaseSquare { player, at }.into());
        }

        let facing = buyer.facing;
        let piece = ChessPiece::new(self.ids.piece(), kind, player, at, facing);
        let id = piece.id;
        self.board
            .insert_piece(piece)
            .map_err(|_| ValidationError::InvalidPurchaseSquare { player, at })?;
        if let Some(buyer) = self.players.get_mut(&player) {
            buyer.resources -= price;
            buyer.pieces.insert(id);
        }
        self.events.push(GameEvent::PiecePurchased {
            at_ms: self.clock_ms,
            player,
            piece: id,
            kind,
            at,
        });
        self.commit();
        Ok(id)
    }

    /// Every legal move of `player`, pieces in id order.
    pub fn legal_moves(&self, player: PlayerId) -> Result<Vec<(PieceId, Destination)>, GameError> {
        if !self.players.contains_key(&player) {
            return Err(NotFoundError::Player { player }.into());
        }
        Ok(core::legal_moves_for_player(
            &self.board,
            player,
            self.move_options()(player),
        ))
    }

    /// Legal destinations of the piece standing on `at`.
    pub fn moves_from(&self, at: Coord) -> Result<Vec<Destination>, GameError> {
        let piece = self
            .board
            .piece_at(at)
            .ok_or(NotFoundError::Piece { at })?;
        Ok(core::generate_moves(
            &self.board,
            piece,
            self.move_options()(piece.owner),
        ))
    }

    #[must_use]
    pub fn is_in_check(&self, player: PlayerId) -> bool {
        core::is_in_check(&self.board, player, self.move_options())
    }

    #[must_use]
    pub fn is_in_checkmate(&self, player: PlayerId) -> bool {
        core::is_in_checkmate(&self.board, player, self.move_options())
    }

    /// Advances the game clock by `dt_ms` and runs every timer that came
    /// due: ability and shield expiry, fall ticks and degradation ticks.
    pub fn tick(&mut self, dt_ms: u64) {
        self.clock_ms = self.clock_ms.saturating_add(dt_ms);
        let now = self.clock_ms;

        for player in self.players.values_mut() {
            player.expire_abilities(now);
        }
        let expired: Vec<PieceId> = self
            .board
            .pieces()
            .filter(|p| p.shielded_until.is_some_and(|until| now >= until))
            .map(|p| p.id)
            .collect();
        for id in expired {
            if let Some(piece) = self.board.piece_mut(id) {
                piece.shielded_until = None;
            }
        }

        let cap = u64::from(self.config.max_catch_up_ticks);
        let mut changed = false;
        let (due, rest) = due_ticks(
            self.fall_elapsed_ms.saturating_add(dt_ms),
            self.config.fall_interval_ms,
            cap,
        );
        self.fall_elapsed_ms = rest;
        for _ in 0..due {
            changed |= self.fall_tick();
        }
        let (due, rest) = due_ticks(
            self.degradation_elapsed_ms.saturating_add(dt_ms),
            self.config.degradation_interval_ms,
            cap,
        );
        self.degradation_elapsed_ms = rest;
        for _ in 0..due {
            changed |= self.degradation_tick();
        }
        if changed {
            self.commit();
        }
    }

    /// Builds a read-only snapshot of the current state.
    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        let mut cells: Vec<CellEntry> = self
            .board
            .cells()
            .map(|(at, cell)| CellEntry {
                at,
                cell: cell.clone(),
            })
            .collect();
        cells.sort_unstable_by_key(|entry| entry.at);
        let mut pieces: Vec<ChessPiece> = self.board.pieces().cloned().collect();
        pieces.sort_unstable_by_key(|p| p.id);
        let mut zones = self.zones.clone();
        zones.sort_unstable_by_key(|zone| zone.owner);

        let players = self
            .players
            .values()
            .map(|player| PlayerStatus {
                player: player.clone(),
                in_check: self.is_in_check(player.id),
                in_checkmate: self.is_in_checkmate(player.id),
            })
            .collect();
        let falling = self
            .falling
            .values()
            .map(|falling| FallingView {
                blocks: falling.blocks(),
                ghost: falling
                    .ghost(&self.board, self.drop_direction(falling.owner))
                    .blocks(),
                falling: falling.clone(),
            })
            .collect();

        GameSnapshot {
            version: self.version,
            clock_ms: self.clock_ms,
            board_width: self.board.width(),
            board_height: self.board.height(),
            cells,
            pieces,
            zones,
            potions: self.potions.values().cloned().collect(),
            players,
            falling,
        }
    }

    fn commit(&mut self) {
        self.version += 1;
        let snapshot = self.snapshot();
        self.history.push(snapshot);
    }

    fn move_options(&self) -> impl Fn(PlayerId) -> MoveOptions + '_ {
        let now = self.clock_ms;
        move |id| MoveOptions {
            jump: self.players.get(&id).is_some_and(|p| p.can_jump(now)),
        }
    }

    fn has_legal_move(&self, player: PlayerId) -> bool {
        !core::legal_moves_for_player(&self.board, player, self.move_options()(player)).is_empty()
    }

    /// Tetrominoes grid-step toward the owner's own edge of the board.
    fn drop_direction(&self, player: PlayerId) -> Direction {
        self.players
            .get(&player)
            .map_or(Direction::Down, |p| p.facing.opposite())
    }

    fn active_player(&self, player: PlayerId) -> Result<&Player, GameError> {
        let p = self
            .players
            .get(&player)
            .ok_or(NotFoundError::Player { player })?;
        if p.eliminated {
            return Err(ValidationError::Eliminated { player }.into());
        }
        Ok(p)
    }

    fn ensure_can_place(&self, player: PlayerId) -> Result<(), GameError> {
        let phase = self.active_player(player)?.phase;
        if phase.is_tetris() || !self.has_legal_move(player) {
            return Ok(());
        }
        Err(ValidationError::WrongPhase {
            player,
            expected: Phase::Tetris,
            actual: phase,
        }
        .into())
    }

    fn spawn_tetromino(&mut self, player: PlayerId) {
        let falling = FallingTetromino::spawn(player, &self.config, &self.board, &mut self.rng);
        self.events.push(GameEvent::TetrominoSpawned {
            at_ms: self.clock_ms,
            player,
            shape: falling.tetromino.shape,
            position: falling.tetromino.position,
        });
        self.falling.insert(player, falling);
    }

    /// Locks or explodes a tetromino that has left the falling map, then
    /// moves its owner to the chess phase.
    fn resolve_placement(&mut self, falling: FallingTetromino) -> PlacementOutcome {
        let player = falling.owner;
        let now = self.clock_ms;
        let blocks = falling.blocks();
        let shape = falling.tetromino.shape;

        let outcome = if falling::placement_is_valid(&self.board, player, &blocks) {
            let potion = falling::lock(&mut self.board, &falling, &mut self.ids, now);
            self.events.push(GameEvent::TetrominoLocked {
                at_ms: now,
                player,
                shape,
                cells: blocks.to_vec(),
            });
            if let Some(potion) = &potion {
                self.potions.insert(potion.id, potion.clone());
                self.events.push(GameEvent::PotionSpawned {
                    at_ms: now,
                    potion: potion.clone(),
                });
            }
            let cleared = self.clear_lines(player);
            PlacementOutcome::Locked {
                cells: blocks.to_vec(),
                potion,
                cleared,
            }
        } else {
            self.events.push(GameEvent::TetrominoExploded {
                at_ms: now,
                player,
                shape,
                cells: blocks.to_vec(),
            });
            PlacementOutcome::Exploded {
                cells: blocks.to_vec(),
            }
        };

        if let Some(p) = self.players.get_mut(&player) {
            p.phase = Phase::Chess;
        }
        self.eliminate_kingless_players();
        if self.players.get(&player).is_some_and(|p| !p.eliminated) && !self.has_legal_move(player)
        {
            // Nothing to move: keep the player supplied with tetrominoes.
            self.spawn_tetromino(player);
        }
        outcome
    }

    fn clear_lines(&mut self, player: PlayerId) -> ClearReport {
        let report =
            clearing::clear_full_lines(&mut self.board, &self.zones, self.config.clear_threshold);
        if report.is_empty() {
            return report;
        }
        let lines = u32::try_from(report.line_count()).unwrap_or(u32::MAX);
        if let Some(p) = self.players.get_mut(&player) {
            p.resources = p
                .resources
                .saturating_add(lines.saturating_mul(self.config.clear_reward));
            p.score += u64::from(lines);
        }
        self.events.push(GameEvent::LinesCleared {
            at_ms: self.clock_ms,
            player,
            rows: report.rows.clone(),
            columns: report.columns.clone(),
            removed_cells: report.removed_cells.len(),
        });
        for piece in &report.removed_pieces {
            self.detach_piece(piece);
        }
        for id in &report.removed_potions {
            self.potions.remove(id);
        }
        report
    }

    /// Drops a piece that left the board from its owner's collection.
    fn detach_piece(&mut self, piece: &ChessPiece) {
        if let Some(owner) = self.players.get_mut(&piece.owner) {
            owner.pieces.remove(&piece.id);
        }
        self.events.push(GameEvent::PieceLost {
            at_ms: self.clock_ms,
            piece: piece.clone(),
        });
    }

    fn remove_pieces_of(&mut self, player: PlayerId) {
        let mut ids: Vec<PieceId> = self.board.pieces_of(player).map(|p| p.id).collect();
        ids.sort_unstable();
        for id in ids {
            if let Some(piece) = self.board.remove_piece(id) {
                self.detach_piece(&piece);
            }
        }
    }

    fn pick_up_potion(&mut self, player: PlayerId, at: Coord) -> Option<PotionEffect> {
        let id = self.board.get_cell_mut(at)?.potion.take()?;
        let potion = self.potions.remove(&id)?;
        let target = EffectTarget {
            player: self.players.get_mut(&player)?,
            board: &mut self.board,
            zone: self.zones.iter_mut().find(|zone| zone.owner == player),
        };
        let effect =
            effects::apply_potion(potion.kind, target, &self.config, self.clock_ms, &mut self.rng);
        self.events.push(GameEvent::PotionConsumed {
            at_ms: self.clock_ms,
            player,
            potion: id,
            effect,
        });
        Some(effect)
    }

    fn promote_if_due(&mut self, player: PlayerId, id: PieceId) -> bool {
        let distance = i32::try_from(self.config.promotion_distance).unwrap_or(i32::MAX);
        let Some(piece) = self.board.piece_mut(id) else {
            return false;
        };
        if piece.kind != PieceKind::Pawn || piece.advanced_distance() < distance {
            return false;
        }
        piece.kind = PieceKind::Queen;
        piece.promoted = true;
        self.events.push(GameEvent::PiecePromoted {
            at_ms: self.clock_ms,
            player,
            piece: id,
        });
        true
    }

    /// A player without a king on the board is out of the game.
    fn eliminate_kingless_players(&mut self) {
        let kingless: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| !p.eliminated)
            .filter(|p| {
                !self
                    .board
                    .pieces_of(p.id)
                    .any(|piece| piece.kind == PieceKind::King)
            })
            .map(|p| p.id)
            .collect();
        for id in kingless {
            self.remove_pieces_of(id);
            self.falling.remove(&id);
            if let Some(p) = self.players.get_mut(&id) {
                p.eliminated = true;
            }
            self.events.push(GameEvent::PlayerEliminated {
                at_ms: self.clock_ms,
                player: id,
            });
        }
    }

    /// Keeps the potion index in step with the cells that carry potions.
    fn prune_potions(&mut self) {
        let board = &self.board;
        self.potions.retain(|id, potion| {
            board
                .get_cell(potion.position)
                .is_some_and(|cell| cell.potion == Some(*id))
        });
    }

    /// One fall tick for every falling tetromino. Returns whether any landed.
    fn fall_tick(&mut self) -> bool {
        let now = self.clock_ms;
        let owners: Vec<PlayerId> = self.falling.keys().copied().collect();
        let mut landed = false;
        for owner in owners {
            let Some(player) = self.players.get(&owner) else {
                self.falling.remove(&owner);
                continue;
            };
            let steps = if player.is_speeding(now) { 2 } else { 1 };
            let direction = player.facing.opposite();
            let Some(falling) = self.falling.get_mut(&owner) else {
                continue;
            };
            if falling.fall(&self.board, direction, steps).is_landed()
                && let Some(falling) = self.falling.remove(&owner)
            {
                self.resolve_placement(falling);
                landed = true;
            }
        }
        landed
    }

    /// One degradation tick over every zone. Returns whether anything changed.
    fn degradation_tick(&mut self) -> bool {
        let now = self.clock_ms;
        let changes = zones::degrade_zones(&mut self.board, &mut self.zones);
        for change in &changes {
            self.events.push(match *change {
                ZoneChange::CellRemoved { owner, at } => GameEvent::ZoneCellDegraded {
                    at_ms: now,
                    owner,
                    at,
                },
                ZoneChange::Shrunk { owner, width } => GameEvent::ZoneShrunk {
                    at_ms: now,
                    owner,
                    width,
                },
                ZoneChange::Removed { owner } => GameEvent::ZoneRemoved { at_ms: now, owner },
            });
        }
        self.prune_potions();
        !changes.is_empty()
    }
}

/// Splits `elapsed` into the number of whole intervals to run, at most
/// `cap`, and the remainder carried into the next advance.
fn due_ticks(elapsed: u64, interval: u64, cap: u64) -> (u64, u64) {
    ((elapsed / interval).min(cap), elapsed % interval)
}

#[cfg(test)]
mod tests {
    use crate::core::PotionKind;

    use super::*;

    const SEED: GameSeed = GameSeed::from_bytes([1; 16]);

    fn config() -> GameConfig {
        GameConfig {
            sponsor_chance: 0.0,
            potion_chance: 0.0,
            ..GameConfig::default()
        }
    }

    fn game_with(config: GameConfig, players: usize) -> (Game, Vec<PlayerId>) {
        let mut game = Game::with_seed(config, SEED).unwrap();
        let ids = (0..players)
            .map(|i| game.add_player(format!("p{i}")).unwrap())
            .collect();
        game.drain_events();
        (game, ids)
    }

    fn game_with_players(players: usize) -> (Game, Vec<PlayerId>) {
        game_with(config(), players)
    }

    /// Replaces the board with ASCII art (uppercase pieces belong to player
    /// 1, lowercase to player 2) and drops zones, tetrominoes and potions.
    fn set_board(game: &mut Game, art: &str) {
        game.board = Board::from_ascii(art);
        game.zones.clear();
        game.falling.clear();
        game.potions.clear();
        for player in game.players.values_mut() {
            player.pieces = game.board.pieces_of(player.id).map(|p| p.id).collect();
        }
    }

    fn set_phase(game: &mut Game, player: PlayerId, phase: Phase) {
        game.players.get_mut(&player).unwrap().phase = phase;
    }

    /// Row just in front of the player's pawns, and the pawn row itself.
    fn front_and_pawn_rows(game: &Game, player: PlayerId) -> (i32, i32) {
        let zone = game.zone(player).unwrap();
        match game.player(player).unwrap().facing {
            Direction::Down => (zone.y + zone.height, zone.y + 1),
            _ => (zone.y - 1, zone.y + zone.height - 2),
        }
    }

    fn explode(game: &mut Game, player: PlayerId) {
        // Far from every seeded zone on a 32x32 board.
        let outcome = game
            .place_tetromino(player, TetrominoShape::O, Coord::new(15, 15), Rotation::default())
            .unwrap();
        assert!(outcome.is_exploded());
        assert_eq!(outcome.state(), TetrominoState::Exploded);
    }

    #[test]
    fn test_add_player_seeds_zone_and_army() {
        let (game, ids) = game_with_players(1);
        let p = ids[0];
        let zone = game.zone(p).unwrap();
        assert_eq!((zone.width, zone.height), (8, 2));

        let player = game.player(p).unwrap();
        assert_eq!(player.pieces.len(), 16);
        assert_eq!(player.resources, 10);
        assert!(player.phase.is_tetris());
        assert_eq!(game.board().cells_owned_by(p).count(), 16);
        assert!(game.falling_tetromino(p).is_some());
        assert_eq!(game.version(), 1);
    }

    #[test]
    fn test_join_events() {
        let mut game = Game::with_seed(config(), SEED).unwrap();
        let p = game.add_player("alice").unwrap();
        let events = game.drain_events();
        assert!(matches!(
            &events[0],
            GameEvent::PlayerJoined { player, name, .. } if *player == p && name == "alice"
        ));
        assert!(matches!(events[1], GameEvent::TetrominoSpawned { .. }));
        assert!(game.events().is_empty());
    }

    #[test]
    fn test_zones_do_not_overlap() {
        let (game, _) = game_with_players(4);
        let zones = game.zones();
        for (i, a) in zones.iter().enumerate() {
            assert!(a.fits_within(32, 32));
            for b in &zones[i + 1..] {
                assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_same_seed_same_game() {
        let (mut a, _) = game_with_players(2);
        let (mut b, _) = game_with_players(2);
        a.tick(1_000);
        b.tick(1_000);
        assert_eq!(a.snapshot(), b.snapshot());
        assert_eq!(a.drain_events(), b.drain_events());
    }

    #[test]
    fn test_chess_move_rejected_in_tetris_phase() {
        let (mut game, ids) = game_with_players(1);
        let p = ids[0];
        let (front, pawn_row) = front_and_pawn_rows(&game, p);
        let x = game.zone(p).unwrap().x;
        let version = game.version();

        let err = game
            .move_chess_piece(p, Coord::new(x, pawn_row), Coord::new(x, front))
            .unwrap_err();
        assert!(matches!(
            err,
            GameError::Validation(ValidationError::WrongPhase {
                expected: Phase::Chess,
                ..
            })
        ));
        assert_eq!(game.version(), version);
    }

    #[test]
    fn test_exploded_placement_leaves_board_untouched_and_advances_phase() {
        let (mut game, ids) = game_with_players(1);
        let p = ids[0];
        let cells_before = game.snapshot().cells;

        explode(&mut game, p);

        assert_eq!(game.snapshot().cells, cells_before);
        assert!(game.player(p).unwrap().phase.is_chess());
        assert!(
            game.events()
                .iter()
                .any(|e| matches!(e, GameEvent::TetrominoExploded { player, .. } if *player == p))
        );
        assert!(
            !game
                .events()
                .iter()
                .any(|e| matches!(e, GameEvent::TetrominoLocked { .. }))
        );
    }

    #[test]
    fn test_chess_move_without_legal_moves_is_rejected_and_phase_kept() {
        let (mut game, ids) = game_with_players(1);
        let p = ids[0];
        explode(&mut game, p);
        // A freshly seeded army has no floor in front of it.
        assert!(game.legal_moves(p).unwrap().is_empty());

        let (front, pawn_row) = front_and_pawn_rows(&game, p);
        let x = game.zone(p).unwrap().x;
        let version = game.version();
        let err = game
            .move_chess_piece(p, Coord::new(x, pawn_row), Coord::new(x, front))
            .unwrap_err();
        assert_eq!(
            err,
            GameError::Validation(ValidationError::NoLegalMoves { player: p })
        );
        assert!(game.player(p).unwrap().phase.is_chess());
        assert_eq!(game.version(), version);

        // Tetromino-only play is still open to the stuck player.
        assert!(game.falling_tetromino(p).is_some());
        explode(&mut game, p);
    }

    #[test]
    fn test_lock_then_move_cycles_back_to_tetris() {
        let (mut game, ids) = game_with_players(1);
        let p = ids[0];
        let (front, pawn_row) = front_and_pawn_rows(&game, p);
        let x = game.zone(p).unwrap().x;

        // Rotation 0 of the I piece sits on the second row of its grid.
        let outcome = game
            .place_tetromino(p, TetrominoShape::I, Coord::new(x, front - 1), Rotation::default())
            .unwrap();
        let PlacementOutcome::Locked { cells, cleared, .. } = outcome else {
            panic!("expected a lock, got {outcome:?}");
        };
        assert_eq!(cells, (x..x + 4).map(|cx| Coord::new(cx, front)).collect::<Vec<_>>());
        assert!(cleared.is_empty());
        assert!(game.player(p).unwrap().phase.is_chess());
        assert_eq!(game.board().cells_owned_by(p).count(), 20);

        let outcome = game
            .move_chess_piece(p, Coord::new(x, pawn_row), Coord::new(x, front))
            .unwrap();
        assert_eq!(outcome.kind, MoveKind::Move);
        assert!(outcome.captured.is_none());
        assert!(game.player(p).unwrap().phase.is_tetris());
        assert!(game.falling_tetromino(p).is_some());
        assert!(game.board().piece_at(Coord::new(x, front)).is_some());
    }

    #[test]
    fn test_illegal_destination_rejected() {
        let (mut game, ids) = game_with_players(1);
        let p = ids[0];
        set_board(&mut game, "K.R.");
        set_phase(&mut game, p, Phase::Chess);
        let err = game
            .move_chess_piece(p, Coord::new(2, 0), Coord::new(0, 0))
            .unwrap_err();
        assert_eq!(
            err,
            GameError::Validation(ValidationError::IllegalMove {
                from: Coord::new(2, 0),
                to: Coord::new(0, 0)
            })
        );
        let err = game
            .move_chess_piece(p, Coord::new(1, 0), Coord::new(0, 0))
            .unwrap_err();
        assert_eq!(
            err,
            GameError::NotFound(NotFoundError::Piece {
                at: Coord::new(1, 0)
            })
        );
    }

    #[test]
    fn test_moving_an_enemy_piece_is_rejected() {
        let (mut game, ids) = game_with_players(2);
        set_board(&mut game, "K.R.k.");
        set_phase(&mut game, ids[0], Phase::Chess);
        let err = game
            .move_chess_piece(ids[0], Coord::new(4, 0), Coord::new(5, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            GameError::Validation(ValidationError::NotOwner { .. })
        ));
    }

    #[test]
    fn test_capture_credits_price_and_detaches_piece() {
        let (mut game, ids) = game_with_players(2);
        set_board(&mut game, "K.R.nk");
        set_phase(&mut game, ids[0], Phase::Chess);
        let knight = game.board().piece_at(Coord::new(4, 0)).unwrap().id;

        let outcome = game
            .move_chess_piece(ids[0], Coord::new(2, 0), Coord::new(4, 0))
            .unwrap();
        assert_eq!(outcome.kind, MoveKind::Attack);
        assert_eq!(outcome.captured.unwrap().kind, PieceKind::Knight);
        assert_eq!(game.player(ids[0]).unwrap().resources, 13);
        assert!(!game.player(ids[1]).unwrap().pieces.contains(&knight));
        assert!(!game.player(ids[1]).unwrap().eliminated);
    }

    #[test]
    fn test_king_capture_eliminates_owner() {
        let (mut game, ids) = game_with_players(2);
        set_board(&mut game, "K.R.kp");
        set_phase(&mut game, ids[0], Phase::Chess);

        game.move_chess_piece(ids[0], Coord::new(2, 0), Coord::new(4, 0))
            .unwrap();

        let loser = game.player(ids[1]).unwrap();
        assert!(loser.eliminated);
        assert!(loser.pieces.is_empty());
        assert!(game.board().pieces_of(ids[1]).next().is_none());
        assert!(
            game.events()
                .iter()
                .any(|e| matches!(e, GameEvent::PlayerEliminated { player, .. } if *player == ids[1]))
        );

        let err = game
            .place_tetromino(ids[1], TetrominoShape::O, Coord::new(0, 0), Rotation::default())
            .unwrap_err();
        assert_eq!(
            err,
            GameError::Validation(ValidationError::Eliminated { player: ids[1] })
        );
    }

    #[test]
    fn test_shielded_piece_cannot_be_captured_until_expiry() {
        let (mut game, ids) = game_with_players(2);
        set_board(&mut game, "K.R.nk");
        set_phase(&mut game, ids[0], Phase::Chess);
        let knight = game.board().piece_at(Coord::new(4, 0)).unwrap().id;
        game.board.piece_mut(knight).unwrap().shielded_until = Some(1_000);

        let err = game
            .move_chess_piece(ids[0], Coord::new(2, 0), Coord::new(4, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            GameError::Validation(ValidationError::IllegalMove { .. })
        ));

        game.tick(1_000);
        assert!(!game.board().piece(knight).unwrap().is_shielded());
        assert!(
            game.move_chess_piece(ids[0], Coord::new(2, 0), Coord::new(4, 0))
                .is_ok()
        );
    }

    #[test]
    fn test_potion_pickup_applies_effect() {
        let (mut game, ids) = game_with_players(1);
        let p = ids[0];
        set_board(&mut game, "K.R.");
        set_phase(&mut game, p, Phase::Chess);
        let at = Coord::new(3, 0);
        game.board.get_cell_mut(at).unwrap().potion = Some(PotionId(77));
        game.potions.insert(
            PotionId(77),
            Potion {
                id: PotionId(77),
                kind: PotionKind::Jump,
                position: at,
            },
        );

        let outcome = game.move_chess_piece(p, Coord::new(2, 0), at).unwrap();
        assert_eq!(
            outcome.potion,
            Some(PotionEffect::Jump {
                until_ms: game.clock_ms() + 60_000
            })
        );
        assert!(game.potions().next().is_none());
        assert!(game.board().get_cell(at).unwrap().potion.is_none());
        assert!(game.player(p).unwrap().can_jump(game.clock_ms()));
    }

    #[test]
    fn test_unbounded_potion_duration_keeps_move_atomic() {
        let (mut game, ids) = game_with(
            GameConfig {
                jump_duration_ms: u64::MAX,
                ..config()
            },
            1,
        );
        let p = ids[0];
        game.tick(1);
        set_board(&mut game, "K.R.");
        set_phase(&mut game, p, Phase::Chess);
        let at = Coord::new(3, 0);
        game.board.get_cell_mut(at).unwrap().potion = Some(PotionId(5));
        game.potions.insert(
            PotionId(5),
            Potion {
                id: PotionId(5),
                kind: PotionKind::Jump,
                position: at,
            },
        );

        let outcome = game.move_chess_piece(p, Coord::new(2, 0), at).unwrap();
        assert_eq!(outcome.potion, Some(PotionEffect::Jump { until_ms: u64::MAX }));
        assert!(game.player(p).unwrap().phase.is_tetris());
    }

    #[test]
    fn test_failed_join_leaves_game_untouched() {
        // One zone covers the whole board.
        let (mut game, _) = game_with(
            GameConfig {
                board_width: 8,
                board_height: 4,
                home_zone_width: 8,
                home_zone_height: 4,
                min_zone_distance: 0,
                max_zone_distance: 0,
                ..config()
            },
            1,
        );
        let untouched = game.clone();

        let err = game.add_player("late").unwrap_err();
        assert!(matches!(err, GameError::ZonePlacement(_)));
        assert_eq!(game.snapshot(), untouched.snapshot());
        assert_eq!(format!("{game:?}"), format!("{untouched:?}"));
    }

    #[test]
    fn test_pawn_promotes_after_distance() {
        let (mut game, ids) = game_with(
            GameConfig {
                promotion_distance: 1,
                ..config()
            },
            1,
        );
        let p = ids[0];
        set_board(
            &mut game,
            "
            ._
            PK
            ",
        );
        set_phase(&mut game, p, Phase::Chess);

        let outcome = game
            .move_chess_piece(p, Coord::new(0, 1), Coord::new(0, 0))
            .unwrap();
        assert!(outcome.promoted);
        let piece = game.board().piece_at(Coord::new(0, 0)).unwrap();
        assert_eq!(piece.kind, PieceKind::Queen);
        assert!(piece.promoted);
    }

    #[test]
    fn test_purchase_rules() {
        let (mut game, ids) = game_with_players(1);
        let p = ids[0];
        set_board(&mut game, "K..");
        let at = Coord::new(2, 0);

        assert_eq!(
            game.purchase_piece(p, PieceKind::King, at).unwrap_err(),
            GameError::Validation(ValidationError::KingNotPurchasable)
        );
        assert!(matches!(
            game.purchase_piece(p, PieceKind::Pawn, at),
            Err(GameError::Validation(
                ValidationError::InvalidPurchaseSquare { .. }
            ))
        ));

        game.board.get_cell_mut(at).unwrap().owner = Some(p);
        game.players.get_mut(&p).unwrap().resources = 4;
        assert!(matches!(
            game.purchase_piece(p, PieceKind::Rook, at),
            Err(GameError::Validation(
                ValidationError::InsufficientResources {
                    price: 5,
                    available: 4,
                    ..
                }
            ))
        ));

        let id = game.purchase_piece(p, PieceKind::Knight, at).unwrap();
        let player = game.player(p).unwrap();
        assert_eq!(player.resources, 1);
        assert!(player.pieces.contains(&id));
        assert!(player.phase.is_tetris());
        assert_eq!(game.board().piece_at(at).unwrap().kind, PieceKind::Knight);

        assert!(matches!(
            game.purchase_piece(p, PieceKind::Pawn, at),
            Err(GameError::Validation(
                ValidationError::InvalidPurchaseSquare { .. }
            ))
        ));
    }

    #[test]
    fn test_line_clear_rewards_and_can_eliminate() {
        let (mut game, ids) = game_with_players(2);
        set_board(
            &mut game,
            "
            K_______
            ...k____
            ________
            ",
        );

        let outcome = game
            .place_tetromino(ids[0], TetrominoShape::I, Coord::new(4, 0), Rotation::default())
            .unwrap();
        let PlacementOutcome::Locked { cleared, .. } = outcome else {
            panic!("expected a lock, got {outcome:?}");
        };
        assert_eq!(cleared.rows, vec![1]);
        assert_eq!(cleared.removed_cells.len(), 8);
        assert_eq!(game.board().cells_in_row(1), 0);

        let winner = game.player(ids[0]).unwrap();
        assert_eq!(winner.resources, 11);
        assert_eq!(winner.score, 1);
        // Player 2's king stood in the cleared row.
        assert!(game.player(ids[1]).unwrap().eliminated);
        assert!(
            game.events()
                .iter()
                .any(|e| matches!(e, GameEvent::PieceLost { piece, .. } if piece.kind == PieceKind::King))
        );
    }

    #[test]
    fn test_cleared_piece_is_detached_from_owner() {
        let (mut game, ids) = game_with_players(2);
        set_board(
            &mut game,
            "
            K_______
            ..n.____
            k_______
            ",
        );
        let knight = game.board().piece_at(Coord::new(2, 1)).unwrap().id;

        let outcome = game
            .place_tetromino(ids[0], TetrominoShape::I, Coord::new(4, 0), Rotation::default())
            .unwrap();
        assert_eq!(outcome.state(), TetrominoState::Locked);

        let owner = game.player(ids[1]).unwrap();
        assert!(!owner.pieces.contains(&knight));
        assert_eq!(owner.pieces.len(), 1);
        assert!(!owner.eliminated);
        assert!(game.board().piece(knight).is_none());
    }

    #[test]
    fn test_tick_catch_up_is_bounded() {
        let (mut game, ids) = game_with(
            GameConfig {
                max_catch_up_ticks: 2,
                ..config()
            },
            1,
        );
        let p = ids[0];
        let interval = game.config().fall_interval_ms;
        assert_eq!(game.falling_tetromino(p).unwrap().fall_height, 10);

        game.tick(interval * 1_000);
        assert_eq!(game.falling_tetromino(p).unwrap().fall_height, 8);
        game.tick(interval);
        assert_eq!(game.falling_tetromino(p).unwrap().fall_height, 7);
    }

    #[test]
    fn test_tick_drives_falling_tetromino_to_resolution() {
        let (mut game, ids) = game_with(
            GameConfig {
                fall_interval_ms: 100,
                spawn_height: 2,
                ..config()
            },
            1,
        );
        let p = ids[0];
        for _ in 0..200 {
            game.tick(100);
            if game.player(p).unwrap().phase.is_chess() {
                break;
            }
        }
        assert!(game.player(p).unwrap().phase.is_chess());
        assert!(game.events().iter().any(|e| matches!(
            e,
            GameEvent::TetrominoLocked { .. } | GameEvent::TetrominoExploded { .. }
        )));
    }

    #[test]
    fn test_speed_doubles_fall_rate() {
        let (mut game, ids) = game_with_players(1);
        let p = ids[0];
        game.players.get_mut(&p).unwrap().speed_until = Some(u64::MAX);
        let height = game.falling_tetromino(p).unwrap().fall_height;

        game.tick(game.config().fall_interval_ms);
        assert_eq!(game.falling_tetromino(p).unwrap().fall_height, height - 2);
    }

    #[test]
    fn test_abandoned_zone_degrades_one_cell_per_tick() {
        let (mut game, ids) = game_with_players(1);
        let p = ids[0];
        game.remove_player(p).unwrap();
        let cells = game.board().cell_count();

        game.tick(game.config().degradation_interval_ms);
        assert_eq!(game.board().cell_count(), cells - 1);
        assert_eq!(game.zone(p).unwrap().width, 8);
        assert!(
            game.events()
                .iter()
                .any(|e| matches!(e, GameEvent::ZoneCellDegraded { owner, .. } if *owner == p))
        );
    }

    #[test]
    fn test_remove_unknown_player() {
        let (mut game, _) = game_with_players(1);
        assert_eq!(
            game.remove_player(PlayerId(99)).unwrap_err(),
            GameError::NotFound(NotFoundError::Player {
                player: PlayerId(99)
            })
        );
    }

    #[test]
    fn test_check_version() {
        let (game, _) = game_with_players(1);
        let v = game.version();
        assert!(game.check_version(None).is_ok());
        assert!(game.check_version(Some(v)).is_ok());
        assert_eq!(
            game.check_version(Some(v + 1)),
            Err(ConcurrencyConflict {
                expected: v + 1,
                actual: v
            })
        );
    }

    #[test]
    fn test_snapshot_reports_check_and_ghost() {
        let (mut game, ids) = game_with_players(1);
        let snapshot = game.snapshot();
        assert_eq!(snapshot.falling.len(), 1);
        assert!(
            snapshot.falling[0]
                .ghost
                .iter()
                .all(|&at| game.board().is_in_bounds(at))
        );

        let (mut two, ids2) = game_with_players(2);
        set_board(
            &mut two,
            "
            r
            .
            K
            ",
        );
        let status = two.snapshot();
        let status = status.player(ids2[0]).unwrap();
        assert!(status.in_check);
        assert!(status.in_checkmate);

        set_board(&mut game, "K");
        assert!(!game.snapshot().player(ids[0]).unwrap().in_check);
    }

    #[test]
    fn test_history_tracks_commits() {
        let (game, _) = game_with_players(2);
        assert_eq!(game.history().len(), 2);
        assert_eq!(game.history().latest().unwrap().version, game.version());
    }
}
