//! Playground - run code bundles against the playground compile backend from
//! a terminal.

mod app;
mod cli;
mod logging;
mod render;

use crate::cli::{Args, Command};
use crate::logging::setup_logging;
use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let config = args.client_config()?;

    match args.command {
        Command::Run { file, id, timestamps } => {
            let source = app::BundleSource::from_args(file, id);
            app::run(config, source, timestamps).await
        }
        Command::Load { id } => app::load(config, &id).await,
        Command::Save { file } => app::save(config, &file).await,
    }
}
