use std::path::PathBuf;

use crate::cli::{Cli, Command};

/// What the application was asked to do, stripped of presentation options.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub command: Command,
    pub config_path: PathBuf,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            command: cli.command,
            config_path: cli.config,
        }
    }
}
