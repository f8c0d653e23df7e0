use std::path::PathBuf;

use chesstris_engine::Game;

use crate::{schema::record::RecordedSession, util};

#[derive(Debug, Clone, clap::Args)]
pub struct ReplayArg {
    /// Path to the recording file (JSON format)
    recording_file: PathBuf,
}

pub fn run(arg: &ReplayArg) -> anyhow::Result<()> {
    let ReplayArg { recording_file } = arg;

    eprintln!("Loading recording from {}", recording_file.display());
    let session: RecordedSession = util::read_json_file("recording", recording_file)?;
    eprintln!(
        "Loaded {} commands recorded at {}",
        session.commands.len(),
        session.recorded_at
    );

    let game = replay(&session)?;
    anyhow::ensure!(
        game.snapshot() == session.final_snapshot,
        "replay diverged from the recording at version {}",
        game.version()
    );
    eprintln!("Replay matches the recording (version {})", game.version());
    Ok(())
}

fn replay(session: &RecordedSession) -> anyhow::Result<Game> {
    let mut game = Game::with_seed(session.config.clone(), session.seed)?;
    for command in &session.commands {
        game.apply(command);
    }
    Ok(game)
}
