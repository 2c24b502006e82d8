//! Common types for replica-set membership control
//!
//! This crate holds the configuration and status documents exchanged with
//! store nodes, the vote/priority resolution rules, and node endpoints
//! parsed from connection strings.

pub mod endpoint;
pub mod error;
pub mod member;
pub mod replica_set;

#[cfg(test)]
pub mod proptest;

pub use endpoint::{NodeEndpoint, TlsMode, DEFAULT_STORE_PORT};
pub use error::{CommonError, Result};
pub use member::{Member, MemberId, Setting, DEFAULT_SETTING};
pub use replica_set::{MemberState, MemberStatus, ReplicaSetConfig, ReplicaSetStatus};
