//! Primary discovery from status snapshots

use crate::error::{ClusterError, Result};
use crate::snapshot::SnapshotReader;
use replset_types::{MemberStatus, ReplicaSetStatus};

/// Result of looking for the primary.
///
/// `NotFound` is expected while an election is in progress and is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryLookup {
    Found(MemberStatus),
    NotFound,
}

impl PrimaryLookup {
    pub fn member(&self) -> Option<&MemberStatus> {
        match self {
            Self::Found(member) => Some(member),
            Self::NotFound => None,
        }
    }

    pub fn host(&self) -> Option<&str> {
        self.member().map(|m| m.host.as_str())
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Exit status of a primary lookup: 0 when found, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Found(_) => 0,
            Self::NotFound => 1,
        }
    }
}

/// First member reporting PRIMARY, in status order
pub fn find_primary(status: &ReplicaSetStatus) -> PrimaryLookup {
    match status.members.iter().find(|m| m.is_primary()) {
        Some(member) => PrimaryLookup::Found(member.clone()),
        None => PrimaryLookup::NotFound,
    }
}

/// Locates the primary by reading fresh status from nodes
#[derive(Clone)]
pub struct PrimaryLocator {
    reader: SnapshotReader,
}

impl PrimaryLocator {
    pub fn new(reader: SnapshotReader) -> Self {
        Self { reader }
    }

    /// Read status from `node` and find the primary it reports
    pub async fn locate_primary(&self, node: &str) -> Result<PrimaryLookup> {
        let status = self.reader.fetch_status(node).await?;
        let lookup = find_primary(&status);
        match lookup.host() {
            Some(primary) => tracing::info!("{} reports primary {}", node, primary),
            None => tracing::warn!("Failed to locate primary via {}", node),
        }
        Ok(lookup)
    }

    /// Ask each seed in order until one reports a primary.
    ///
    /// Unreachable and slow seeds are skipped, as are seeds that reply
    /// without knowledge of the set (not initialized, command refused).
    /// When every seed fails at the transport level the last such error is
    /// returned; when at least one answered without naming a primary the
    /// result is `NotFound`. Local errors end the search immediately.
    pub async fn discover_primary<S: AsRef<str>>(&self, seeds: &[S]) -> Result<PrimaryLookup> {
        if seeds.is_empty() {
            return Err(ClusterError::configuration("No seed nodes to discover primary from"));
        }

        let mut last_error = None;
        let mut answered = false;

        for seed in seeds {
            let seed = seed.as_ref();
            match self.locate_primary(seed).await {
                Ok(PrimaryLookup::Found(member)) => return Ok(PrimaryLookup::Found(member)),
                Ok(PrimaryLookup::NotFound) => answered = true,
                // A node outside the set, or one refusing the read, still answered
                Err(e @ (ClusterError::NotInitialized { .. } | ClusterError::CommandFailed { .. })) => {
                    tracing::warn!("Seed {} reports no primary: {}", seed, e);
                    answered = true;
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!("Skipping seed {}: {}", seed, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        match last_error {
            Some(e) if !answered => Err(e),
            _ => Ok(PrimaryLookup::NotFound),
        }
    }
}
