//! Controller configuration management

use crate::audit::AuditPolicy;
use crate::error::{ClusterError, Result};
use replset_types::{MemberId, NodeEndpoint};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Node addresses (`host:port`) tried in order when discovering the primary
    pub seed_nodes: Vec<String>,

    /// Members created non-voting on purpose; the audit reports them as OK
    #[serde(default)]
    pub non_voting_allowlist: Vec<MemberId>,

    /// Upper bound on every network call unless the caller overrides it
    pub request_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            seed_nodes: vec!["127.0.0.1:27017".to_string()],
            non_voting_allowlist: vec![],
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ControllerConfig {
    /// Build a configuration whose seeds come from connection strings
    pub fn from_connection_strings<S: AsRef<str>>(urls: &[S]) -> Result<Self> {
        let seed_nodes = urls
            .iter()
            .map(|url| NodeEndpoint::parse(url.as_ref()).map(|e| e.address()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            seed_nodes,
            ..Self::default()
        })
    }

    /// Load configuration from file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        toml::from_str(&content)
            .map_err(|e| ClusterError::configuration(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ClusterError::configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.seed_nodes.is_empty() {
            return Err(ClusterError::configuration("At least one seed node is required"));
        }

        if self.seed_nodes.iter().any(|node| node.trim().is_empty()) {
            return Err(ClusterError::configuration("Seed node address cannot be empty"));
        }

        if self.request_timeout < Duration::from_millis(100) {
            return Err(ClusterError::configuration(
                "Request timeout must be at least 100ms",
            ));
        }

        Ok(())
    }

    pub fn audit_policy(&self) -> AuditPolicy {
        AuditPolicy::with_allowlist(self.non_voting_allowlist.iter().copied())
    }
}
