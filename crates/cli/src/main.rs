mod args;
mod commands;
pub mod defaults;
mod printing;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use args::{InitArgs, RunArgs};
use commands::{init, run, validate};

/// mhcevo: host/pathogen MHC coevolution simulator
///
/// Hosts carry MHC genes that present pathogen antigens; pathogens evolve to
/// escape presentation. This tool writes, checks and runs JSON
/// configurations of that arms race.
#[derive(Parser, Debug)]
#[command(name = "mhcevo")]
#[command(author, version, about = "Simulates host/pathogen coevolution at the MHC", long_about = None)]
struct Cli {
    /// Number of threads to use for parallel processing
    ///
    /// If not specified, defaults to the number of logical CPUs.
    #[arg(short = 't', long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a new configuration file.
    ///
    /// Sets up population sizes and rates but does not run anything.
    Init(Box<InitArgs>),

    /// Check that a configuration parses and is consistent.
    Validate {
        /// Configuration file
        #[arg(short, long, default_value = defaults::OUTPUT_CONFIG)]
        config: PathBuf,
    },

    /// Run a configuration.
    ///
    /// Prints one JSON summary per generation to stdout. Set RUST_LOG to see
    /// engine events on stderr.
    Run(RunArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    match cli.command {
        Commands::Init(args) => {
            init::init_config(&args)?;
        }
        Commands::Validate { config } => {
            validate::validate_config(&config)?;
        }
        Commands::Run(args) => {
            run::run_simulation(&args)?;
        }
    }

    Ok(())
}
