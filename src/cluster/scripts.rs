/// Cluster operations delegated to the EKSphemeral scripts
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use super::models::{parse_cluster, parse_cluster_ids, ClusterRecord, DecodeError};
use crate::config::{Script, Settings};
use crate::utils::command::{CommandBuilder, CommandOutput};

/// Runs the scripts found in the EKSphemeral home and keeps count of failed runs
pub struct ClusterScripts {
    settings: Settings,
    failures: AtomicUsize,
}

impl ClusterScripts {
    /// Create a new script manager
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            failures: AtomicUsize::new(0),
        }
    }

    /// Number of script runs so far that did not succeed
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    fn command(&self, script: Script) -> CommandBuilder {
        CommandBuilder::new(self.settings.script_path(script)).timeout(self.settings.timeout)
    }

    fn track(&self, output: CommandOutput) -> CommandOutput {
        if !output.success {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        output
    }

    /// Set up EKSphemeral in the target account
    pub async fn install(&self) -> CommandOutput {
        self.track(self.command(Script::Install).stream().await)
    }

    /// Tear down EKSphemeral
    pub async fn uninstall(&self) -> CommandOutput {
        self.track(self.command(Script::Uninstall).stream().await)
    }

    /// Create a cluster, from a spec file or with defaults
    pub async fn create(&self, spec_file: Option<&Path>) -> CommandOutput {
        let command = match spec_file {
            Some(path) => self.command(Script::Create).arg(path),
            None => self.command(Script::Create),
        };
        self.track(command.stream().await)
    }

    /// Extend a cluster's time to live
    pub async fn prolong(&self, cluster_id: &str, minutes: u32) -> CommandOutput {
        self.track(
            self.command(Script::Prolong)
                .arg(cluster_id)
                .arg(minutes.to_string())
                .stream()
                .await,
        )
    }

    /// Identifiers of all clusters, in the order the script reports them
    pub async fn list_ids(&self) -> Result<Vec<String>, DecodeError> {
        let output = self.track(self.command(Script::List).capture().await);
        parse_cluster_ids(&output.stdout)
    }

    /// Look up one cluster; the record's id is set to `cluster_id`
    pub async fn lookup(&self, cluster_id: &str) -> Result<ClusterRecord, DecodeError> {
        let output = self.track(self.command(Script::List).arg(cluster_id).capture().await);
        let mut cs = parse_cluster(&output.stdout)?;
        cs.id = cluster_id.to_string();
        Ok(cs)
    }

    /// Look up every cluster, skipping those that can't be decoded.
    /// Runs up to `concurrency` lookups at once; results keep the order of `ids`.
    pub async fn lookup_all(&self, ids: &[String]) -> Vec<ClusterRecord> {
        stream::iter(ids)
            .map(move |id| async move { (id, self.lookup(id).await) })
            .buffered(self.settings.concurrency.max(1))
            .filter_map(|(id, result)| async move {
                match result {
                    Ok(cs) => Some(cs),
                    Err(e) => {
                        debug!("Skipping cluster {}: {}", id, e);
                        None
                    }
                }
            })
            .collect()
            .await
    }
}
