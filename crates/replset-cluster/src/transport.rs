//! Request/response channel to store nodes

use crate::error::{ClusterError, Result};
use async_trait::async_trait;
use replset_types::{Member, ReplicaSetConfig};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Store error code for a node that has no replica-set configuration yet
pub const CODE_NOT_YET_INITIALIZED: i64 = 94;

/// Store error code for initiating a node that already has a configuration
pub const CODE_ALREADY_INITIALIZED: i64 = 23;

/// Store error code for a configuration change the store refuses to apply
pub const CODE_INCOMPATIBLE_CONFIG: i64 = 103;

/// Store error code for a write sent to a node that is not primary
pub const CODE_NOT_PRIMARY: i64 = 10107;

/// Operations a store node accepts from the controller
#[derive(Debug, Clone, PartialEq)]
pub enum StoreRequest {
    GetConfig,
    GetStatus,
    Initiate { config: ReplicaSetConfig },
    AddMember { member: Member },
    /// Delete the set's record from the node's internal bookkeeping collection
    RemoveConfigRecord { set_name: String },
}

impl StoreRequest {
    /// Store command name, used in logs and timeout errors
    pub fn operation(&self) -> &'static str {
        match self {
            Self::GetConfig => "replSetGetConfig",
            Self::GetStatus => "replSetGetStatus",
            Self::Initiate { .. } => "replSetInitiate",
            Self::AddMember { .. } => "replSetAddMember",
            Self::RemoveConfigRecord { .. } => "removeReplSetRecord",
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::GetConfig | Self::GetStatus)
    }
}

impl fmt::Display for StoreRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation())
    }
}

/// Failures below the store protocol
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Unreachable(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Channel used to reach store nodes.
///
/// Implementations return the store's reply document. Command failures are
/// replies with `ok: 0`; only failures to exchange a reply at all are errors.
#[async_trait]
pub trait StoreTransport: Send + Sync {
    async fn call(
        &self,
        node: &str,
        request: StoreRequest,
        timeout: Duration,
    ) -> std::result::Result<Value, TransportError>;
}

/// Whether a reply document reports success
pub fn reply_ok(reply: &Value) -> bool {
    match reply.get("ok") {
        Some(Value::Bool(ok)) => *ok,
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        _ => false,
    }
}

pub fn reply_code(reply: &Value) -> Option<i64> {
    reply.get("code").and_then(Value::as_i64)
}

/// Send one request, bounded by `timeout`, and return the raw reply.
///
/// Failed replies are returned as-is; callers classify them with
/// [`classify_failure`]. Nothing here retries.
pub(crate) async fn send(
    transport: &Arc<dyn StoreTransport>,
    node: &str,
    request: StoreRequest,
    timeout: Duration,
) -> Result<Value> {
    let operation = request.operation();
    tracing::debug!("Sending {} to {} (timeout {:?})", operation, node, timeout);

    match tokio::time::timeout(timeout, transport.call(node, request, timeout)).await {
        Ok(Ok(reply)) => Ok(reply),
        Ok(Err(TransportError::Unreachable(reason))) => {
            tracing::warn!("{} unreachable for {}: {}", node, operation, reason);
            Err(ClusterError::unreachable(node, reason))
        }
        Ok(Err(TransportError::Protocol(reason))) => Err(ClusterError::malformed(format!(
            "{} reply from {}: {}",
            operation, node, reason
        ))),
        Err(_) => {
            tracing::warn!("{} against {} timed out after {:?}", operation, node, timeout);
            Err(ClusterError::timed_out(node, operation, timeout))
        }
    }
}

/// Map a failed reply onto the controller's error taxonomy
pub(crate) fn classify_failure(node: &str, request: &StoreRequest, reply: Value) -> ClusterError {
    match reply_code(&reply) {
        Some(CODE_NOT_YET_INITIALIZED) => ClusterError::NotInitialized {
            node: node.to_string(),
        },
        Some(CODE_ALREADY_INITIALIZED) => ClusterError::AlreadyInitialized {
            node: node.to_string(),
        },
        _ if request.is_mutation() => ClusterError::MutationRejected { raw: reply },
        _ => ClusterError::CommandFailed {
            operation: request.operation().to_string(),
            raw: reply,
        },
    }
}
