//! Membership mutations issued against the primary

use crate::error::{ClusterError, Result};
use crate::identity::conflicting_member;
use crate::transport::{classify_failure, reply_ok, send, StoreRequest, StoreTransport};
use replset_types::{Member, MemberId, ReplicaSetConfig};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Acknowledgement of a mutation, consumed by the operation that issued it
#[derive(Debug, Clone, PartialEq)]
pub struct MutationResult {
    pub ok: bool,

    /// Reply document exactly as the store returned it
    pub raw: Value,

    /// Records deleted, reported by record removal only
    pub n_removed: Option<u64>,
}

impl MutationResult {
    pub(crate) fn from_reply(reply: Value) -> Self {
        Self {
            ok: reply_ok(&reply),
            n_removed: reply.get("nRemoved").and_then(Value::as_u64),
            raw: reply,
        }
    }
}

/// Outcome of deleting a set's configuration record
#[derive(Debug, Clone, PartialEq)]
pub enum Removal {
    Removed(MutationResult),
    /// The node held no record for the set; not a failure
    NothingRemoved { set_name: String },
}

impl Removal {
    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed(_))
    }

    /// Exit status of a teardown: 0 when a record was deleted, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Removed(_) => 0,
            Self::NothingRemoved { .. } => 1,
        }
    }
}

/// Issues membership changes and checks their acknowledgements.
///
/// Nothing is retried here. If a call times out after the request left,
/// whether the change landed is unknown until the configuration is read again.
#[derive(Clone)]
pub struct MembershipMutator {
    transport: Arc<dyn StoreTransport>,
    timeout: Duration,
}

impl MembershipMutator {
    pub fn new(transport: Arc<dyn StoreTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a votes=0, priority=0 secondary through `primary`.
    ///
    /// `config` must be a fresh read from that primary. A colliding
    /// identifier fails before anything is sent.
    pub async fn add_non_voting_secondary(
        &self,
        primary: &str,
        config: &ReplicaSetConfig,
        id: MemberId,
        host: &str,
    ) -> Result<MutationResult> {
        if let Some(existing) = conflicting_member(config, id) {
            tracing::warn!("Member ID is in use: {}", existing);
            return Err(ClusterError::DuplicateIdentifier {
                id,
                host: existing.host.clone(),
            });
        }

        let member = Member::non_voting(id, host);
        member.validate()?;

        tracing::info!(
            "Adding non-voting secondary {} to set {} via {}",
            member,
            config.set_name,
            primary
        );

        let request = StoreRequest::AddMember { member };
        let reply = send(&self.transport, primary, request.clone(), self.timeout).await?;

        if !reply_ok(&reply) {
            tracing::warn!("{} rejected {}: {}", primary, request, reply);
            return Err(classify_failure(primary, &request, reply));
        }

        Ok(MutationResult::from_reply(reply))
    }

    /// Delete the configuration record of `set_name` held by `node`.
    ///
    /// This tears down the whole set at that node; it is not a per-member removal.
    pub async fn remove_member(&self, node: &str, set_name: &str) -> Result<Removal> {
        let request = StoreRequest::RemoveConfigRecord {
            set_name: set_name.to_string(),
        };
        let reply = send(&self.transport, node, request.clone(), self.timeout).await?;

        if !reply_ok(&reply) {
            return Err(classify_failure(node, &request, reply));
        }

        let result = MutationResult::from_reply(reply);
        match result.n_removed {
            Some(0) => {
                tracing::warn!("No record of set {} at {}", set_name, node);
                Ok(Removal::NothingRemoved {
                    set_name: set_name.to_string(),
                })
            }
            Some(n) => {
                tracing::info!("Removed {} record(s) of set {} at {}", n, set_name, node);
                Ok(Removal::Removed(result))
            }
            None => Err(ClusterError::malformed(format!(
                "{} reply from {} has no nRemoved: {}",
                request, node, result.raw
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::snapshot::SnapshotReader;
    use replset_types::MemberState;

    async fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .install_config(ReplicaSetConfig::with_seed("rs0", Member::new(0, "a:27017")))
            .await;
        store
    }

    fn mutator(store: &InMemoryStore) -> MembershipMutator {
        MembershipMutator::new(Arc::new(store.clone()), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_add_non_voting_secondary() {
        let store = seeded_store().await;
        let config = store.current_config().await.unwrap();

        let result = mutator(&store)
            .add_non_voting_secondary("a:27017", &config, MemberId(1), "b:27017")
            .await
            .unwrap();
        assert!(result.ok);
        assert_eq!(result.n_removed, None);

        let config = store.current_config().await.unwrap();
        let added = config.member(MemberId(1)).unwrap();
        assert_eq!(added.host, "b:27017");
        assert!(added.is_non_voting());
    }

    #[tokio::test]
    async fn test_duplicate_identifier_sends_nothing() {
        let store = seeded_store().await;
        let config = store.current_config().await.unwrap();

        let result = mutator(&store)
            .add_non_voting_secondary("a:27017", &config, MemberId(0), "b:27017")
            .await;
        assert!(matches!(
            result,
            Err(ClusterError::DuplicateIdentifier { id: MemberId(0), ref host }) if host == "a:27017"
        ));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_store_rejection_is_authoritative() {
        let store = seeded_store().await;
        let stale = store.current_config().await.unwrap();

        // Another actor adds member 1 after our read
        let reader = SnapshotReader::new(Arc::new(store.clone()), Duration::from_secs(1));
        let fresh = reader.fetch_config("a:27017").await.unwrap();
        mutator(&store)
            .add_non_voting_secondary("a:27017", &fresh, MemberId(1), "b:27017")
            .await
            .unwrap();

        let result = mutator(&store)
            .add_non_voting_secondary("a:27017", &stale, MemberId(1), "c:27017")
            .await;
        match result {
            Err(ClusterError::MutationRejected { raw }) => assert_eq!(raw["code"], 103),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_add_through_secondary_is_rejected() {
        let store = seeded_store().await;
        store.set_member_state("a:27017", MemberState::Secondary).await;
        let config = store.current_config().await.unwrap();

        let result = mutator(&store)
            .add_non_voting_secondary("a:27017", &config, MemberId(1), "b:27017")
            .await;
        assert!(matches!(result, Err(ClusterError::MutationRejected { .. })));
    }

    #[tokio::test]
    async fn test_empty_host_is_invalid() {
        let store = seeded_store().await;
        let config = store.current_config().await.unwrap();

        let result = mutator(&store)
            .add_non_voting_secondary("a:27017", &config, MemberId(1), "")
            .await;
        assert!(matches!(result, Err(ClusterError::Types(_))));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_member_record() {
        let store = seeded_store().await;

        let removal = mutator(&store).remove_member("a:27017", "rs0").await.unwrap();
        match removal {
            Removal::Removed(result) => {
                assert!(result.ok);
                assert_eq!(result.n_removed, Some(1));
            }
            other => panic!("expected removal, got {:?}", other),
        }
        assert!(store.current_config().await.is_none());
    }

    #[tokio::test]
    async fn test_remove_missing_set_is_nothing_removed() {
        let store = InMemoryStore::new();

        let removal = mutator(&store).remove_member("a:27017", "rs0").await.unwrap();
        assert_eq!(
            removal,
            Removal::NothingRemoved {
                set_name: "rs0".to_string()
            }
        );
        assert_eq!(removal.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_remove_unreachable_node() {
        let store = InMemoryStore::new();
        store.set_reachable("a:27017", false).await;

        let result = mutator(&store).remove_member("a:27017", "rs0").await;
        assert!(matches!(result, Err(ClusterError::UnreachableNode { .. })));
    }
}
