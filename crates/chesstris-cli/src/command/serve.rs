use std::io::{self, BufRead as _};

use anyhow::Context;
use chesstris_engine::{ActionResponse, Command, Game, GameEvent, GameSnapshot};
use serde::Serialize;

use crate::{command::GameArg, util::Output};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ServeArg {
    #[clap(flatten)]
    game: GameArg,
    /// Attach a full snapshot to every accepted command's reply
    #[clap(long)]
    snapshots: bool,
}

/// One output line per input line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Reply {
    response: ActionResponse,
    events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<GameSnapshot>,
}

pub(crate) fn run(arg: &ServeArg) -> anyhow::Result<()> {
    let ServeArg { game, snapshots } = arg;
    let mut game = game.new_game()?;
    eprintln!("Serving game with seed {}", game.seed());

    let mut output = Output::stdout();
    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read command from stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = handle_line(&mut game, &line, *snapshots);
        output.write_json_line(&reply)?;
    }
    Ok(())
}

fn handle_line(game: &mut Game, line: &str, with_snapshot: bool) -> Reply {
    let response = match serde_json::from_str::<Command>(line) {
        Ok(command) => game.apply(&command),
        Err(err) => ActionResponse {
            success: false,
            error: Some(format!("invalid command: {err}")),
            payload: None,
            version: game.version(),
        },
    };
    let snapshot = (with_snapshot && response.success).then(|| game.snapshot());
    Reply {
        response,
        events: game.drain_events(),
        snapshot,
    }
}
