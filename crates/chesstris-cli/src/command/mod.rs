use std::path::PathBuf;

use chesstris_engine::{Game, GameSeed};
use clap::{Parser, Subcommand};

use crate::util;

use self::{
    replay::ReplayArg, serve::ServeArg, show_config::ShowConfigArg, simulate::SimulateArg,
};

mod replay;
mod serve;
mod show_config;
mod simulate;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Apply JSON-lines commands from stdin in arrival order
    Serve(#[clap(flatten)] ServeArg),
    /// Play a headless game with random bots and save the recording
    Simulate(#[clap(flatten)] SimulateArg),
    /// Re-apply a recording and check that it reproduces the same game
    Replay(#[clap(flatten)] ReplayArg),
    /// Print the effective game configuration
    #[command(name = "config")]
    ShowConfig(#[clap(flatten)] ShowConfigArg),
}

/// Options shared by every mode that starts a game.
#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct GameArg {
    /// Path to a game configuration file (JSON format)
    #[clap(long)]
    config: Option<PathBuf>,
    /// Game seed as 32 hex characters (random if omitted)
    #[clap(long)]
    seed: Option<GameSeed>,
}

impl GameArg {
    pub(crate) fn new_game(&self) -> anyhow::Result<Game> {
        let config = util::load_config(self.config.as_deref())?;
        let game = match self.seed {
            Some(seed) => Game::with_seed(config, seed)?,
            None => Game::new(config)?,
        };
        Ok(game)
    }
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Serve(arg) => serve::run(&arg)?,
        Mode::Simulate(arg) => simulate::run(&arg)?,
        Mode::Replay(arg) => replay::run(&arg)?,
        Mode::ShowConfig(arg) => show_config::run(&arg)?,
    }
    Ok(())
}
