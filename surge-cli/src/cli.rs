//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about = "Synthetic load and SLA verification for the back-office API", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a load profile against the target environment
    Run(RunArgs),

    /// Inspect the available run profiles
    Profiles {
        #[command(subcommand)]
        profiles_cmd: ProfilesCommands,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct RunArgs {
    /// Profile to run (defaults to run.profile from configuration)
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Target environment name
    #[arg(long, value_name = "NAME")]
    pub environment: Option<String>,

    /// Override the profile's peak rate (iterations per time unit)
    #[arg(long, value_name = "RATE")]
    pub rate: Option<f64>,

    /// Override the profile's total duration (e.g. 90s, 5m)
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Write the JSON report to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Seed scenario draws for a reproducible request mix
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Skip the console summary
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum ProfilesCommands {
    /// List profiles with their load shape
    List,

    /// Print one profile in full
    Show {
        /// Profile name
        name: String,

        /// Output format: yaml, json
        #[arg(long, value_name = "FORMAT", default_value = "yaml")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(long, value_name = "PATH")]
        config_file: PathBuf,
    },

    /// Generate a sample configuration file
    Generate {
        /// Output file path
        #[arg(long, value_name = "PATH")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration in use
    Show {
        /// Output format: yaml, json
        #[arg(long, value_name = "FORMAT", default_value = "yaml")]
        format: String,
    },
}
