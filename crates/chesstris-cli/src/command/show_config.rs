use std::path::PathBuf;

use crate::util::{self, Output};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ShowConfigArg {
    /// Path to a game configuration file to merge over the defaults
    #[clap(long)]
    config: Option<PathBuf>,
    /// Output file path
    #[clap(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &ShowConfigArg) -> anyhow::Result<()> {
    let ShowConfigArg { config, output } = arg;
    let config = util::load_config(config.as_deref())?;
    Output::save_json(&config, output.clone())
}
