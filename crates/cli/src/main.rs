//! Rookery CLI, the main entry point.
//!
//! Commands:
//! - `puzzles`: Evaluate a strategy on a chess puzzle file
//! - `ask`: Answer one question with the tool-calling agent
//! - `config`: Print the default configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "rookery",
    about = "Rookery: puzzle evaluation and tool-calling agents over a decision gateway",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch of chess puzzles against the gateway
    Puzzles {
        /// Lichess-style puzzle CSV
        #[arg(short, long)]
        file: std::path::PathBuf,

        /// Only play the first N puzzles
        #[arg(short, long)]
        limit: Option<usize>,

        /// Override the configured strategy
        #[arg(short, long)]
        strategy: Option<String>,

        /// Override the admission gate size
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Seed for fallback moves
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Answer a question with the tool-calling agent
    Ask {
        /// The question
        question: String,

        /// Override the configured strategy
        #[arg(short, long)]
        strategy: Option<String>,
    },

    /// Print the default configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Puzzles {
            file,
            limit,
            strategy,
            concurrency,
            seed,
        } => {
            commands::puzzles::run(commands::puzzles::PuzzleArgs {
                file,
                limit,
                strategy,
                concurrency,
                seed,
            })
            .await?
        }
        Commands::Ask { question, strategy } => commands::ask::run(question, strategy).await?,
        Commands::Config => commands::config_cmd::show()?,
    }

    Ok(())
}
