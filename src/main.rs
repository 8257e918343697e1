/// EKSphemeral - ephemeral Kubernetes clusters
///
/// Command-line front-end for the EKSphemeral scripts: install and uninstall
/// the tooling, create clusters, list them and prolong their lifetime.
mod cluster;
mod config;
mod error;
mod utils;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cluster::{cluster_table, ClusterScripts};
use crate::config::{Settings, VERSION};
use crate::error::CliError;
use crate::utils::console;

#[derive(Parser)]
#[command(name = "eksphemeral", version = VERSION)]
#[command(about = "Manage ephemeral Kubernetes clusters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory containing the EKSphemeral scripts (defaults to $EKSPHEMERAL_HOME)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Kill any script that runs longer than this many seconds
    #[arg(long, global = true, env = "EKSPHEMERAL_SCRIPT_TIMEOUT")]
    timeout: Option<u64>,

    /// Number of cluster lookups to run at once when listing
    #[arg(long, global = true, default_value_t = 1,
          value_parser = clap::value_parser!(u16).range(1..))]
    concurrency: u16,

    /// Exit with a non-zero code when a script fails
    #[arg(long, global = true)]
    strict: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Install EKSphemeral
    #[command(visible_alias = "i")]
    Install,

    /// Uninstall EKSphemeral
    #[command(visible_alias = "u")]
    Uninstall,

    /// Create a new ephemeral cluster
    #[command(visible_alias = "c")]
    Create {
        /// Cluster spec file; cluster defaults are used without one
        spec_file: Option<PathBuf>,

        #[arg(hide = true)]
        ignored: Vec<String>,
    },

    /// List all clusters, or show the details of one
    #[command(visible_aliases = ["ls", "l"])]
    List {
        /// Cluster ID to show details for
        cluster_id: Option<String>,

        #[arg(hide = true)]
        ignored: Vec<String>,
    },

    /// Prolong the lifetime of a cluster
    #[command(visible_alias = "p")]
    Prolong {
        /// Cluster ID
        cluster_id: Option<String>,

        /// Minutes to add to the cluster's time to live
        #[arg(allow_hyphen_values = true)]
        minutes: Option<String>,

        #[arg(hide = true)]
        ignored: Vec<String>,
    },

    #[command(external_subcommand)]
    Unknown(Vec<String>),
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            | ErrorKind::DisplayVersion => e.exit(),
            _ => usage_error(&e),
        },
    };

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("eksphemeral={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        console::error(&e);
        let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}

/// Malformed command line: the home check still comes first, then usage guidance
fn usage_error(e: &clap::Error) -> ! {
    if let Err(err) = Settings::resolve_home(None) {
        console::error(&err);
        std::process::exit(err.exit_code());
    }
    console::error(e.to_string().trim_end());
    console::error(CliError::NoCommand);
    std::process::exit(0);
}

async fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        console::info(format!("This is EKSphemeral in version {}", VERSION));
        return Err(CliError::NoCommand.into());
    };

    let mut settings = Settings::new(Settings::resolve_home(cli.home)?);
    settings.timeout = cli.timeout.map(Duration::from_secs);
    settings.concurrency = usize::from(cli.concurrency);
    settings.strict = cli.strict;
    debug!("Using scripts in {}", settings.home.display());

    let strict = settings.strict;
    let scripts = ClusterScripts::new(settings);

    match command {
        Commands::Install => {
            console::info("Trying to install EKSphemeral ...");
            scripts.install().await;
        }
        Commands::Uninstall => {
            console::info("Trying to uninstall EKSphemeral ...");
            scripts.uninstall().await;
        }
        Commands::Create { spec_file, .. } => {
            create_cluster(&scripts, spec_file.as_deref()).await?
        }
        Commands::List {
            cluster_id: Some(cluster_id),
            ..
        } => show_cluster(&scripts, &cluster_id).await,
        Commands::List {
            cluster_id: None, ..
        } => list_clusters(&scripts).await,
        Commands::Prolong {
            cluster_id,
            minutes,
            ..
        } => prolong_cluster(&scripts, cluster_id, minutes).await?,
        Commands::Unknown(args) => {
            debug!("Unrecognized command: {:?}", args);
            console::error(CliError::NoCommand);
        }
    }

    let failures = scripts.failures();
    if strict && failures > 0 {
        return Err(CliError::ScriptsFailed { count: failures }.into());
    }

    Ok(())
}

/// Create a cluster after checking the spec file exists
async fn create_cluster(scripts: &ClusterScripts, spec_file: Option<&Path>) -> Result<()> {
    console::info("Trying to create a new ephemeral cluster ...");

    if let Some(path) = spec_file {
        console::info(format!("... using cluster spec {}", path.display()));
        match tokio::fs::metadata(path).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CliError::SpecFileNotFound {
                    path: path.to_path_buf(),
                }
                .into());
            }
            // Unreadable specs are left for the create script to report
            Err(e) => debug!("Can't stat {}: {}", path.display(), e),
            Ok(_) => {}
        }
    }

    scripts.create(spec_file).await;
    Ok(())
}

/// Show the details of a single cluster
async fn show_cluster(scripts: &ClusterScripts, cluster_id: &str) {
    match scripts.lookup(cluster_id).await {
        Ok(cs) => println!("{}", cs),
        Err(e) => {
            debug!("Lookup of {} failed: {}", cluster_id, e);
            console::error(
                "Can't render cluster details. Cluster could be gone or control plane is down :(",
            );
        }
    }
}

/// Print a table of all clusters
async fn list_clusters(scripts: &ClusterScripts) {
    let ids = match scripts.list_ids().await {
        Ok(ids) => ids,
        Err(e) => {
            console::error_cause("Can't render cluster spec due to:", e);
            return;
        }
    };

    if ids.is_empty() {
        console::info("No clusters found");
        return;
    }

    let records = scripts.lookup_all(&ids).await;
    println!("{}", cluster_table(&records));
}

/// Prolong a cluster's lifetime by the given minutes
async fn prolong_cluster(
    scripts: &ClusterScripts,
    cluster_id: Option<String>,
    minutes: Option<String>,
) -> Result<()> {
    let (Some(cluster_id), Some(minutes)) = (cluster_id, minutes) else {
        return Err(CliError::MissingProlongArgs.into());
    };
    let minutes: u32 = minutes
        .parse()
        .map_err(|_| CliError::InvalidMinutes(minutes.clone()))?;

    console::info(format!(
        "Trying to prolong cluster {} by {} minutes ...",
        cluster_id, minutes
    ));
    scripts.prolong(&cluster_id, minutes).await;
    Ok(())
}
