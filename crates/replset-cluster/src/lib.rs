//! Replica-Set Membership Controller
//!
//! This crate mutates the membership of a quorum-replicated store's replica
//! set: initiating a set, adding non-voting secondaries, tearing a set down,
//! locating the primary and auditing voting weights. Every mutation is driven
//! by a fresh read from the primary and checked against the store's reply.

pub mod audit;
pub mod config;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod memory;
pub mod membership;
pub mod primary;
pub mod snapshot;
pub mod transport;

#[cfg(test)]
pub mod proptest;

pub use audit::{audit_votes, AuditEntry, AuditPolicy, Verdict, VoteAudit};
pub use config::ControllerConfig;
pub use error::{ClusterError, Result};
pub use identity::is_identifier_free;
pub use lifecycle::{LifecycleManager, SetState};
pub use memory::InMemoryStore;
pub use membership::{MembershipMutator, MutationResult, Removal};
pub use primary::{find_primary, PrimaryLocator, PrimaryLookup};
pub use snapshot::SnapshotReader;
pub use transport::{StoreRequest, StoreTransport, TransportError};

use replset_types::{Member, MemberId, ReplicaSetConfig, ReplicaSetStatus};
use std::sync::Arc;
use std::time::Duration;

/// Caller-facing entry point bundling every controller operation.
///
/// Holds no replica-set state between calls; only the transport and the
/// controller configuration.
#[derive(Clone)]
pub struct ReplicaSetController {
    pub config: ControllerConfig,
    reader: SnapshotReader,
    locator: PrimaryLocator,
    mutator: MembershipMutator,
    lifecycle: LifecycleManager,
}

impl ReplicaSetController {
    /// Create a controller after validating its configuration
    pub fn new(transport: Arc<dyn StoreTransport>, config: ControllerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(transport, config))
    }

    fn build(transport: Arc<dyn StoreTransport>, config: ControllerConfig) -> Self {
        let timeout = config.request_timeout;
        let reader = SnapshotReader::new(transport.clone(), timeout);

        Self {
            locator: PrimaryLocator::new(reader.clone()),
            mutator: MembershipMutator::new(transport.clone(), timeout),
            lifecycle: LifecycleManager::new(transport, timeout),
            reader,
            config,
        }
    }

    /// Same controller with a different bound on every network call
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            config: ControllerConfig {
                request_timeout: timeout,
                ..self.config.clone()
            },
            reader: self.reader.clone().with_timeout(timeout),
            locator: PrimaryLocator::new(self.reader.clone().with_timeout(timeout)),
            mutator: self.mutator.clone().with_timeout(timeout),
            lifecycle: self.lifecycle.clone().with_timeout(timeout),
        }
    }

    pub async fn fetch_config(&self, node: &str) -> Result<ReplicaSetConfig> {
        self.reader.fetch_config(node).await
    }

    pub async fn fetch_status(&self, node: &str) -> Result<ReplicaSetStatus> {
        self.reader.fetch_status(node).await
    }

    pub fn is_identifier_free(&self, config: &ReplicaSetConfig, candidate: MemberId) -> bool {
        identity::is_identifier_free(config, candidate)
    }

    /// Audit with the allowlist from the controller configuration
    pub fn audit_votes(&self, config: &ReplicaSetConfig) -> VoteAudit {
        audit::audit_votes(config, &self.config.audit_policy())
    }

    pub fn find_primary(&self, status: &ReplicaSetStatus) -> PrimaryLookup {
        primary::find_primary(status)
    }

    /// Ask the configured seeds for the current primary
    pub async fn discover_primary(&self) -> Result<PrimaryLookup> {
        self.locator.discover_primary(self.config.seed_nodes.as_slice()).await
    }

    pub async fn add_non_voting_secondary(
        &self,
        primary: &str,
        config: &ReplicaSetConfig,
        id: MemberId,
        host: &str,
    ) -> Result<MutationResult> {
        self.mutator
            .add_non_voting_secondary(primary, config, id, host)
            .await
    }

    pub async fn remove_member(&self, node: &str, set_name: &str) -> Result<Removal> {
        self.mutator.remove_member(node, set_name).await
    }

    pub async fn initiate(
        &self,
        node: &str,
        set_name: &str,
        seed_id: MemberId,
        seed_host: &str,
    ) -> Result<MutationResult> {
        self.lifecycle.initiate(node, set_name, seed_id, seed_host).await
    }

    pub async fn decommission(&self, node: &str, set_name: &str) -> Result<Removal> {
        self.lifecycle.decommission(node, set_name).await
    }

    pub async fn observe_state(&self, node: &str) -> Result<SetState> {
        self.lifecycle.observe_state(node).await
    }

    /// Add a non-voting secondary through whichever seed-reported node is primary
    pub async fn add_secondary(&self, id: MemberId, host: &str) -> Result<Member> {
        self.lifecycle
            .add_secondary(self.config.seed_nodes.as_slice(), id, host)
            .await
    }

    pub async fn expand(&self, members: &[(MemberId, String)]) -> Result<Vec<Member>> {
        self.lifecycle.expand(self.config.seed_nodes.as_slice(), members).await
    }

    /// Fetch the configuration at `node` and audit it with the configured policy
    pub async fn audit(&self, node: &str) -> Result<VoteAudit> {
        self.lifecycle.audit(node, &self.config.audit_policy()).await
    }
}
