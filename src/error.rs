/// Errors that end a command with a specific exit code
use std::path::PathBuf;
use thiserror::Error;

use crate::config::HOME_ENV;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Please specify one of the following commands: install, uninstall, create, list, or prolong")]
    NoCommand,

    #[error("Please set the {} environment variable", HOME_ENV)]
    MissingHome,

    #[error("Can't create a cluster due to invalid spec: {} does not exist", path.display())]
    SpecFileNotFound { path: PathBuf },

    #[error("Can't prolong cluster lifetime without both the cluster ID and the time in minutes provided")]
    MissingProlongArgs,

    #[error("Can't prolong cluster lifetime: '{0}' is not a number of minutes")]
    InvalidMinutes(String),

    #[error("{count} script invocation(s) failed")]
    ScriptsFailed { count: usize },
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoCommand | Self::MissingHome => 1,
            Self::SpecFileNotFound { .. } => 2,
            Self::MissingProlongArgs | Self::InvalidMinutes(_) => 3,
            Self::ScriptsFailed { .. } => 4,
        }
    }
}
