use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::data::LogLevel;
use crate::config::DEFAULT_CONFIG_FILE_NAME;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Incremental directory snapshots for file sync")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(long, short, default_value = "warn", value_enum, global = true)]
    pub log_level: LogLevel,

    /// Path to the configuration file
    #[clap(long, short, default_value = DEFAULT_CONFIG_FILE_NAME, global = true)]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Capture a directory relative to the last packed state
    Pack {
        /// The directory to capture
        root: PathBuf,
        /// Where to write the snapshot
        #[clap(long, short)]
        output: PathBuf,
        /// Ignore the recorded state and capture every file
        #[clap(long)]
        full: bool,
    },
    /// Rebuild a directory from a snapshot
    Unpack {
        /// The snapshot to read
        input: PathBuf,
        /// The directory to write into
        destination: PathBuf,
    },
    /// Print the contents of a snapshot
    Inspect {
        /// The snapshot to read
        input: PathBuf,
    },
}
