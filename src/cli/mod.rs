pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(about = "Bazaar CLI - manage the marketplace API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the API server")]
    Serve,

    #[command(about = "Seed-data management")]
    Fixture {
        #[command(subcommand)]
        cmd: commands::fixture::FixtureCommands,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve => crate::server::run().await,
        Commands::Fixture { cmd } => {
            let _ = dotenvy::dotenv();
            commands::fixture::handle(cmd).await
        }
    }
}
