//! Controller error types

use replset_types::{CommonError, MemberId};
use serde_json::Value;
use std::time::Duration;

/// Result type for controller operations
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Failures reported by controller operations
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Node {node} is unreachable: {reason}")]
    UnreachableNode { node: String, reason: String },

    #[error("{operation} against {node} timed out after {timeout:?}")]
    OperationTimedOut {
        node: String,
        operation: String,
        timeout: Duration,
    },

    #[error("No replica set initialized at {node}")]
    NotInitialized { node: String },

    #[error("Replica set already initialized at {node}")]
    AlreadyInitialized { node: String },

    #[error("Member ID is in use: {id} ({host})")]
    DuplicateIdentifier { id: MemberId, host: String },

    #[error("No primary reported by any of {seeds} seed node(s)")]
    PrimaryNotFound { seeds: usize },

    #[error("Store rejected mutation: {raw}")]
    MutationRejected { raw: Value },

    #[error("{operation} failed: {raw}")]
    CommandFailed { operation: String, raw: Value },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Document error: {0}")]
    Types(#[from] CommonError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClusterError {
    pub fn unreachable<N: Into<String>, R: Into<String>>(node: N, reason: R) -> Self {
        Self::UnreachableNode {
            node: node.into(),
            reason: reason.into(),
        }
    }

    pub fn timed_out<N: Into<String>, O: Into<String>>(node: N, operation: O, timeout: Duration) -> Self {
        Self::OperationTimedOut {
            node: node.into(),
            operation: operation.into(),
            timeout,
        }
    }

    pub fn malformed<T: Into<String>>(msg: T) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        Self::Configuration(msg.into())
    }

    /// Failures the caller may retry with backoff: transport failures and
    /// an election in progress.
    ///
    /// A timed-out mutation may still have been applied; callers must
    /// re-read the configuration before retrying one.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UnreachableNode { .. } | Self::OperationTimedOut { .. } | Self::PrimaryNotFound { .. }
        )
    }

    /// Process exit status the invoking shell layer reports for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MutationRejected { .. } => 1,
            Self::DuplicateIdentifier { .. } => 3,
            Self::NotInitialized { .. } => 4,
            Self::AlreadyInitialized { .. } => 5,
            Self::PrimaryNotFound { .. } => 6,
            Self::UnreachableNode { .. } => 10,
            Self::OperationTimedOut { .. } => 11,
            Self::CommandFailed { .. } => 12,
            Self::MalformedResponse(_) => 13,
            Self::Configuration(_) | Self::Types(_) | Self::Serialization(_) | Self::Io(_) => 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_transport_failures_are_retryable() {
        assert!(ClusterError::unreachable("a:27017", "connection refused").is_retryable());
        assert!(ClusterError::timed_out("a:27017", "replSetGetConfig", Duration::from_secs(1)).is_retryable());

        assert!(!ClusterError::DuplicateIdentifier {
            id: MemberId(1),
            host: "b:27017".to_string()
        }
        .is_retryable());
        assert!(!ClusterError::MutationRejected { raw: json!({"ok": 0}) }.is_retryable());
        assert!(!ClusterError::NotInitialized { node: "a:27017".to_string() }.is_retryable());
    }

    #[test]
    fn test_exit_codes_are_non_zero() {
        let errors = vec![
            ClusterError::unreachable("a", "down"),
            ClusterError::timed_out("a", "op", Duration::from_millis(5)),
            ClusterError::NotInitialized { node: "a".into() },
            ClusterError::AlreadyInitialized { node: "a".into() },
            ClusterError::MutationRejected { raw: json!({}) },
            ClusterError::malformed("missing ok"),
            ClusterError::configuration("no seeds"),
        ];
        for error in errors {
            assert_ne!(error.exit_code(), 0, "{}", error);
        }
    }
}
