/// Configuration management for EKSphemeral
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CliError;

/// Environment variable naming the directory that holds the cluster scripts
pub const HOME_ENV: &str = "EKSPHEMERAL_HOME";

/// Version injected at packaging time, falling back to the crate version
pub const VERSION: &str = match option_env!("EKSPHEMERAL_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// External scripts, one per operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Install,
    Uninstall,
    Create,
    List,
    Prolong,
}

impl Script {
    /// File name of the script inside the EKSphemeral home
    pub fn file_name(self) -> &'static str {
        match self {
            Script::Install => "eksp-up.sh",
            Script::Uninstall => "eksp-down.sh",
            Script::Create => "eksp-create.sh",
            Script::List => "eksp-list.sh",
            Script::Prolong => "eksp-prolong.sh",
        }
    }
}

/// Runtime settings resolved from flags and the environment
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory containing the scripts
    pub home: PathBuf,

    /// Upper bound on a single script run
    pub timeout: Option<Duration>,

    /// Number of cluster lookups run at once when listing
    pub concurrency: usize,

    /// Turn failed script runs into a non-zero exit
    pub strict: bool,
}

impl Settings {
    /// Settings with the given home and defaults for everything else
    pub fn new(home: PathBuf) -> Self {
        Self {
            home,
            timeout: None,
            concurrency: 1,
            strict: false,
        }
    }

    /// Resolve the home directory from the flag or the environment
    pub fn resolve_home(flag: Option<PathBuf>) -> Result<PathBuf, CliError> {
        Self::home_from(flag, std::env::var_os(HOME_ENV))
    }

    fn home_from(flag: Option<PathBuf>, env: Option<OsString>) -> Result<PathBuf, CliError> {
        flag.or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from))
            .ok_or(CliError::MissingHome)
    }

    /// Full path of a script
    pub fn script_path(&self, script: Script) -> PathBuf {
        self.home.join(script.file_name())
    }
}
