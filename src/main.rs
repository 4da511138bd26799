use clap::{Parser, Subcommand};
use reqtrail::cli;
use anyhow::Result;

#[derive(Parser)]
#[command(name = "reqtrail")]
#[command(version = reqtrail::VERSION)]
#[command(about = "Correlated request logging and uniform JSON responses", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve(cli::serve::ServeArgs),

    /// Configuration management
    Config(cli::config::ConfigArgs),

    /// Log directory maintenance
    Logs(cli::logs::LogsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => cli::serve::run(args).await,
        Commands::Config(args) => cli::config::run(args).await,
        Commands::Logs(args) => cli::logs::run(args).await,
    }
}
