use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "agentgen")]
#[command(about = "Ask a coding agent for a function and a test case, run them, and retry until they pass", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Enable verbose debug output")]
    verbose: bool,

    #[arg(long, global = true, help = "Show what would be sent and run without calling the agent")]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Generate, extract and run code for a single request")]
    Run {
        #[arg(help = "The request to send; read from stdin when omitted")]
        query: Option<String>,

        #[command(flatten)]
        options: cli::RunOptions,
    },

    #[command(about = "List the known response formats and their patterns")]
    Formats {
        #[arg(long, help = "Pattern registry file (defaults to agentgen/patterns.yml)")]
        patterns: Option<PathBuf>,

        #[arg(long, help = "Target language used to expand the patterns")]
        language: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info,agentgen=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli::Config {
        verbose: cli.verbose,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Run { query, options } => {
            cli::run(query, &options, &config)?;
        }
        Commands::Formats { patterns, language } => {
            cli::formats(patterns, language)?;
        }
    }

    Ok(())
}
