mod discover;
mod test;

use anyhow::Result;
use clap::{Parser, Subcommand};
use discover::DiscoverCommand;
use test::TestCommand;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output plain JSON without color and interactivity
    #[arg(short, long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    Discover(DiscoverCommand),
    Test(TestCommand),
}

pub fn execute() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Discover(cmd) => cmd.execute(&cli),
        Commands::Test(cmd) => cmd.execute(&cli),
    }
}
