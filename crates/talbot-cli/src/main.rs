//! Talbot command-line interface.
//!
//! Solve interferometer geometries from TOML configuration files:
//! ```sh
//! talbot-cli solve job.toml
//! talbot-cli -vvvv solve job.toml -o results/
//! talbot-cli validate job.toml
//! ```

mod config;
mod report;
mod runner;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "talbot-cli")]
#[command(about = "Talbot: geometry solver for x-ray grating interferometers")]
#[command(version)]
struct Cli {
    /// Log verbosity: -v error, -vv warn, -vvv info, -vvvv debug (default: info).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the geometry described by a TOML configuration file.
    Solve {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without solving it.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose))
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Solve { config, output } => {
            println!("Talbot Geometry Solver");
            println!("======================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());
            println!();

            let solution = runner::run_geometry(&job)?;
            report::print_report(&solution.results);

            // An explicit output directory implies saving
            if job.output.save_json || output.is_some() {
                let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));
                runner::write_results_json(&solution.results, &out_dir)?;
            }

            println!();
            println!("Geometry complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            runner::validate_job(&job)?;
            println!("Configuration is valid: {}", config.display());
            Ok(())
        }
    }
}
