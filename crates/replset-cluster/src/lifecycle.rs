//! Replica-set creation, expansion and teardown sequences

use crate::audit::{audit_votes, AuditPolicy, VoteAudit};
use crate::error::{ClusterError, Result};
use crate::membership::{MembershipMutator, MutationResult, Removal};
use crate::primary::{PrimaryLocator, PrimaryLookup};
use crate::snapshot::SnapshotReader;
use crate::transport::{classify_failure, reply_ok, send, StoreRequest, StoreTransport};
use replset_types::{Member, MemberId, ReplicaSetConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle state of a set as observed at one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetState {
    Uninitialized,
    SingleMember,
    SteadyState,
}

impl fmt::Display for SetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::SingleMember => write!(f, "single-member"),
            Self::SteadyState => write!(f, "steady-state"),
        }
    }
}

/// Runs multi-step membership sequences in strict program order.
///
/// Each step reads fresh state from the store; a failing step ends the
/// sequence and its error is returned unchanged.
#[derive(Clone)]
pub struct LifecycleManager {
    transport: Arc<dyn StoreTransport>,
    timeout: Duration,
    reader: SnapshotReader,
    locator: PrimaryLocator,
    mutator: MembershipMutator,
}

impl LifecycleManager {
    pub fn new(transport: Arc<dyn StoreTransport>, timeout: Duration) -> Self {
        let reader = SnapshotReader::new(transport.clone(), timeout);
        Self {
            locator: PrimaryLocator::new(reader.clone()),
            mutator: MembershipMutator::new(transport.clone(), timeout),
            reader,
            transport,
            timeout,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self::new(self.transport, timeout)
    }

    /// Current lifecycle state of the set at `node`
    pub async fn observe_state(&self, node: &str) -> Result<SetState> {
        match self.reader.fetch_config(node).await {
            Ok(config) => match config.members.len() {
                // An initiated set always has its seed
                0 => Err(ClusterError::malformed(format!(
                    "Set {} at {} has no members",
                    config.set_name, node
                ))),
                1 => Ok(SetState::SingleMember),
                _ => Ok(SetState::SteadyState),
            },
            Err(ClusterError::NotInitialized { .. }) => Ok(SetState::Uninitialized),
            Err(e) => Err(e),
        }
    }

    /// Create set `set_name` at `node` with one full voting seed member.
    ///
    /// Only valid while the node holds no configuration.
    pub async fn initiate(
        &self,
        node: &str,
        set_name: &str,
        seed_id: MemberId,
        seed_host: &str,
    ) -> Result<MutationResult> {
        match self.reader.fetch_config(node).await {
            Ok(existing) => {
                tracing::warn!(
                    "Refusing to initiate {} at {}: set {} already configured",
                    set_name,
                    node,
                    existing.set_name
                );
                return Err(ClusterError::AlreadyInitialized {
                    node: node.to_string(),
                });
            }
            Err(ClusterError::NotInitialized { .. }) => {}
            Err(e) => return Err(e),
        }

        let config = ReplicaSetConfig::with_seed(set_name, Member::new(seed_id, seed_host));
        config.validate()?;

        tracing::info!("Initiating set {} at {} with seed {}", set_name, node, seed_host);
        let request = StoreRequest::Initiate { config };
        let reply = send(&self.transport, node, request.clone(), self.timeout).await?;

        if !reply_ok(&reply) {
            return Err(classify_failure(node, &request, reply));
        }

        Ok(MutationResult::from_reply(reply))
    }

    /// Destroy the set's configuration record at `node` without draining members
    pub async fn decommission(&self, node: &str, set_name: &str) -> Result<Removal> {
        tracing::warn!("Decommissioning set {} at {}", set_name, node);
        self.mutator.remove_member(node, set_name).await
    }

    /// Discover the primary, add a non-voting secondary through it, then
    /// re-read the configuration and return the member as the store now holds it.
    pub async fn add_secondary<S: AsRef<str>>(
        &self,
        seeds: &[S],
        id: MemberId,
        host: &str,
    ) -> Result<Member> {
        let primary = match self.locator.discover_primary(seeds).await? {
            PrimaryLookup::Found(member) => member.host,
            PrimaryLookup::NotFound => {
                return Err(ClusterError::PrimaryNotFound { seeds: seeds.len() })
            }
        };

        let config = self.reader.fetch_config(&primary).await?;

        match self
            .mutator
            .add_non_voting_secondary(&primary, &config, id, host)
            .await
        {
            Ok(_) => {}
            Err(e @ ClusterError::OperationTimedOut { .. }) => {
                // The request may have been applied; only a re-read can tell
                tracing::warn!("Add of member {} unacknowledged, re-reading config", id);
                return match self.reader.fetch_config(&primary).await {
                    Ok(config) => match config.member(id) {
                        Some(member) if member.host == host && member.is_non_voting() => {
                            Ok(member.clone())
                        }
                        _ => Err(e),
                    },
                    Err(_) => Err(e),
                };
            }
            Err(e) => return Err(e),
        }

        let config = self.reader.fetch_config(&primary).await?;
        match config.member(id) {
            Some(member) if member.host == host && member.is_non_voting() => Ok(member.clone()),
            Some(member) => Err(ClusterError::malformed(format!(
                "Member {} acknowledged but configured as {}",
                id, member
            ))),
            None => Err(ClusterError::malformed(format!(
                "Member {} acknowledged but missing from config at {}",
                id, primary
            ))),
        }
    }

    /// Add several non-voting secondaries one after another, stopping at the first failure
    pub async fn expand<S: AsRef<str>>(
        &self,
        seeds: &[S],
        members: &[(MemberId, String)],
    ) -> Result<Vec<Member>> {
        let mut added = Vec::with_capacity(members.len());
        for (id, host) in members {
            added.push(self.add_secondary(seeds, *id, host).await?);
        }
        Ok(added)
    }

    /// Read the configuration at `node` and audit its voting settings
    pub async fn audit(&self, node: &str, policy: &AuditPolicy) -> Result<VoteAudit> {
        let config = self.reader.fetch_config(node).await?;
        Ok(audit_votes(&config, policy))
    }
}
