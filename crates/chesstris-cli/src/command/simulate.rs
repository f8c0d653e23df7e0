use std::path::PathBuf;

use chesstris_engine::{Command, Coord, Direction, Game, PieceKind, PlayerId};
use chrono::Utc;
use rand::{Rng, SeedableRng as _, rngs::StdRng, seq::IndexedRandom as _};

use crate::{command::GameArg, schema::record::RecordedSession, util::Output};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct SimulateArg {
    #[clap(flatten)]
    game: GameArg,
    /// Number of bot players
    #[clap(long, default_value_t = 4)]
    players: usize,
    /// Maximum number of ticks to simulate
    #[clap(long, default_value_t = 3000)]
    ticks: usize,
    /// Game time advanced per tick, in milliseconds
    #[clap(long, default_value_t = 100)]
    tick_ms: u64,
    /// Seed for the bots' decisions
    #[clap(long, default_value_t = 0)]
    bot_seed: u64,
    /// Output file path
    #[clap(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &SimulateArg) -> anyhow::Result<()> {
    let SimulateArg {
        game,
        players,
        ticks,
        tick_ms,
        bot_seed,
        output,
    } = arg;

    let mut game = game.new_game()?;
    eprintln!(
        "Simulating {players} bots for up to {ticks} ticks (seed {})",
        game.seed()
    );
    let mut rng = StdRng::seed_from_u64(*bot_seed);
    let commands = simulate(&mut game, *players, *ticks, *tick_ms, &mut rng);

    let rejected = commands.iter().filter(|(_, accepted)| !accepted).count();
    eprintln!(
        "Applied {} commands ({rejected} rejected), final version {}",
        commands.len(),
        game.version()
    );
    for player in game.players() {
        eprintln!(
            "  {} {:<8} score {:>4}  resources {:>4}  pieces {:>3}{}",
            player.id,
            player.name,
            player.score,
            player.resources,
            player.pieces.len(),
            if player.eliminated { "  (eliminated)" } else { "" }
        );
    }

    let session = RecordedSession {
        recorded_at: Utc::now(),
        seed: game.seed(),
        config: game.config().clone(),
        commands: commands.into_iter().map(|(command, _)| command).collect(),
        final_snapshot: game.snapshot(),
        history: game.history().to_vec(),
    };
    Output::save_json(&session, output.clone())
}

/// Plays `players` random bots against each other and returns every applied
/// command with whether it was accepted.
///
/// Stops early once at most one player is left standing.
fn simulate<R>(
    game: &mut Game,
    players: usize,
    ticks: usize,
    tick_ms: u64,
    rng: &mut R,
) -> Vec<(Command, bool)>
where
    R: Rng + ?Sized,
{
    let mut log = Vec::new();
    let mut apply = |game: &mut Game, command: Command| {
        let accepted = game.apply(&command).success;
        log.push((command, accepted));
    };

    for i in 0..players {
        apply(
            game,
            Command::Join {
                name: format!("bot{i}"),
            },
        );
    }
    for _ in 0..ticks {
        let ids: Vec<PlayerId> = game.players().map(|p| p.id).collect();
        for id in ids {
            if let Some(command) = bot_command(game, id, rng) {
                apply(game, command);
            }
        }
        apply(game, Command::Tick { dt_ms: tick_ms });
        game.drain_events();

        let standing = game.players().filter(|p| !p.eliminated).count();
        if players > 1 && standing <= 1 {
            break;
        }
    }
    log
}

/// Picks the next action of a random bot, or `None` to let its tetromino fall.
fn bot_command<R>(game: &Game, player: PlayerId, rng: &mut R) -> Option<Command>
where
    R: Rng + ?Sized,
{
    let me = game.player(player)?;
    if me.eliminated {
        return None;
    }
    let expected_version = Some(game.version());

    if me.phase.is_chess() {
        let moves = game.legal_moves(player).ok()?;
        if let Some((piece, destination)) = moves.choose(rng) {
            let from = game.board().piece(*piece)?.position;
            return Some(Command::MoveChessPiece {
                player_id: player,
                from_x: from.x,
                from_y: from.y,
                to_x: destination.at.x,
                to_y: destination.at.y,
                expected_version,
            });
        }
    }

    if rng.random_bool(0.05)
        && let Some(at) = purchase_square(game, player, rng)
    {
        let kind = *[PieceKind::Pawn, PieceKind::Knight, PieceKind::Bishop].choose(rng)?;
        return Some(Command::PurchasePiece {
            player_id: player,
            piece_type: kind,
            x: at.x,
            y: at.y,
            expected_version,
        });
    }

    if game.falling_tetromino(player).is_none() {
        return None;
    }
    match rng.random_range(0..8) {
        0 => Some(Command::ShiftTetromino {
            player_id: player,
            direction: if rng.random_bool(0.5) {
                Direction::Left
            } else {
                Direction::Right
            },
        }),
        1 => Some(Command::RotateTetromino { player_id: player }),
        2 => Some(Command::HardDrop {
            player_id: player,
            expected_version,
        }),
        _ => None,
    }
}

fn purchase_square<R>(game: &Game, player: PlayerId, rng: &mut R) -> Option<Coord>
where
    R: Rng + ?Sized,
{
    let mut free: Vec<Coord> = game
        .board()
        .cells_owned_by(player)
        .filter(|(_, cell)| cell.piece.is_none())
        .map(|(at, _)| at)
        .collect();
    free.sort_unstable();
    free.choose(rng).copied()
}
