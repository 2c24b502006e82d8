//! Point-in-time reads of replica-set configuration and status

use crate::error::{ClusterError, Result};
use crate::transport::{classify_failure, reply_ok, send, StoreRequest, StoreTransport};
use replset_types::{ReplicaSetConfig, ReplicaSetStatus};
use std::sync::Arc;
use std::time::Duration;

/// Reads configuration and status documents from a node.
///
/// Nothing is cached: every call goes to the node. A configuration that
/// will drive a mutation must be read from the current primary.
#[derive(Clone)]
pub struct SnapshotReader {
    transport: Arc<dyn StoreTransport>,
    timeout: Duration,
}

impl SnapshotReader {
    pub fn new(transport: Arc<dyn StoreTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch the membership configuration held by `node`
    pub async fn fetch_config(&self, node: &str) -> Result<ReplicaSetConfig> {
        let request = StoreRequest::GetConfig;
        let reply = send(&self.transport, node, request.clone(), self.timeout).await?;

        if !reply_ok(&reply) {
            return Err(classify_failure(node, &request, reply));
        }

        let document = reply
            .get("config")
            .cloned()
            .ok_or_else(|| ClusterError::malformed(format!("{} reply from {} has no config", request, node)))?;

        let config = ReplicaSetConfig::from_document(document)?;
        tracing::debug!(
            "Read config of set {} from {} ({} members)",
            config.set_name,
            node,
            config.members.len()
        );
        Ok(config)
    }

    /// Fetch the member states as currently seen by `node`
    pub async fn fetch_status(&self, node: &str) -> Result<ReplicaSetStatus> {
        let request = StoreRequest::GetStatus;
        let reply = send(&self.transport, node, request.clone(), self.timeout).await?;

        if !reply_ok(&reply) {
            return Err(classify_failure(node, &request, reply));
        }

        Ok(ReplicaSetStatus::from_document(reply)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use replset_types::{Member, MemberState};

    fn reader(store: &InMemoryStore) -> SnapshotReader {
        SnapshotReader::new(Arc::new(store.clone()), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_fetch_config_and_status() {
        let store = InMemoryStore::new();
        store
            .install_config(ReplicaSetConfig::with_seed("rs0", Member::new(0, "a:27017")))
            .await;

        let reader = reader(&store);
        let config = reader.fetch_config("a:27017").await.unwrap();
        assert_eq!(config.set_name, "rs0");
        assert_eq!(config.members, vec![Member::new(0, "a:27017")]);

        let status = reader.fetch_status("a:27017").await.unwrap();
        assert_eq!(status.members.len(), 1);
        assert_eq!(status.members[0].state, MemberState::Primary);
    }

    #[tokio::test]
    async fn test_uninitialized_node() {
        let store = InMemoryStore::new();
        let reader = reader(&store);

        assert!(matches!(
            reader.fetch_config("a:27017").await,
            Err(ClusterError::NotInitialized { node }) if node == "a:27017"
        ));
        assert!(matches!(
            reader.fetch_status("a:27017").await,
            Err(ClusterError::NotInitialized { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_node() {
        let store = InMemoryStore::new();
        store.set_reachable("a:27017", false).await;

        let result = reader(&store).fetch_config("a:27017").await;
        assert!(matches!(result, Err(ClusterError::UnreachableNode { .. })));
    }

    #[tokio::test]
    async fn test_slow_node_times_out() {
        let store = InMemoryStore::new().with_latency(Duration::from_millis(500));
        let reader = reader(&store).with_timeout(Duration::from_millis(20));

        let result = reader.fetch_status("a:27017").await;
        assert!(matches!(
            result,
            Err(ClusterError::OperationTimedOut { operation, .. }) if operation == "replSetGetStatus"
        ));
    }
}
