/// Cluster metadata as emitted by the list script
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use thiserror::Error;

/// Captured script output could not be turned into cluster data
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no data received")]
    Empty,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// One ephemeral cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClusterRecord {
    /// Set by the caller to the identifier it looked up
    pub id: String,

    /// Empty when the cluster is gone or its control plane is unreachable
    pub name: String,

    #[serde(rename = "numworkers", alias = "numWorkers")]
    pub num_workers: u32,

    /// Dotted version without the leading "v"
    #[serde(rename = "kubeversion", alias = "kubeVersion")]
    pub kube_version: String,

    /// Minutes after which creation is abandoned
    #[serde(rename = "timeout", alias = "timeoutMinutes")]
    pub timeout_minutes: i64,

    /// Minutes left before the cluster is destroyed
    #[serde(rename = "ttl", alias = "ttlMinutes")]
    pub ttl_minutes: i64,

    /// Owner email address
    pub owner: String,

    /// UTC creation timestamp
    #[serde(rename = "created", alias = "createdAt")]
    pub created_at: String,

    /// status, endpoint, platformv, vpcconf and iamrole; only filled for single lookups
    #[serde(deserialize_with = "nullable_map")]
    pub details: HashMap<String, String>,
}

fn nullable_map<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ClusterRecord {
    /// The lookup found nothing usable
    pub fn is_missing(&self) -> bool {
        self.name.is_empty()
    }

    /// Detail value, empty if the key is absent
    pub fn detail(&self, key: &str) -> &str {
        self.details.get(key).map(String::as_str).unwrap_or_default()
    }
}

/// Parse a single cluster record from a lookup
pub fn parse_cluster(raw: &str) -> Result<ClusterRecord, DecodeError> {
    if raw.trim().is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(serde_json::from_str(raw)?)
}

/// Parse the list of cluster identifiers
pub fn parse_cluster_ids(raw: &str) -> Result<Vec<String>, DecodeError> {
    if raw.trim().is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(serde_json::from_str(raw)?)
}
