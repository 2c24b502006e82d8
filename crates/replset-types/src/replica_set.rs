//! Replica-set configuration and status documents

use crate::error::{CommonError, Result};
use crate::member::{Member, MemberId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Membership configuration of a replica set.
///
/// Member order follows the configuration document, not election order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaSetConfig {
    #[serde(rename = "_id")]
    pub set_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,

    #[serde(default)]
    pub members: Vec<Member>,
}

impl ReplicaSetConfig {
    /// Configuration used to initiate a set from a single seed member
    pub fn with_seed(set_name: impl Into<String>, seed: Member) -> Self {
        Self {
            set_name: set_name.into(),
            version: None,
            members: vec![seed],
        }
    }

    /// Decode a configuration document as returned by the store
    pub fn from_document(document: Value) -> Result<Self> {
        let config: Self = serde_json::from_value(document)
            .map_err(|e| CommonError::malformed(format!("Replica set config: {}", e)))?;
        Ok(config)
    }

    pub fn to_document(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn voting_member_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_voting()).count()
    }

    /// Strict majority of voting members
    pub fn majority(&self) -> usize {
        self.voting_member_count() / 2 + 1
    }

    /// Validate the whole document: name, member rules and identifier uniqueness
    pub fn validate(&self) -> Result<()> {
        if self.set_name.trim().is_empty() {
            return Err(CommonError::validation("Replica set name cannot be empty"));
        }

        let mut seen = HashSet::new();
        for member in &self.members {
            member.validate()?;
            if !seen.insert(member.id) {
                return Err(CommonError::validation(format!(
                    "Duplicate member identifier {} in set {}",
                    member.id, self.set_name
                )));
            }
        }

        Ok(())
    }
}

/// State a member reports in a status document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MemberState {
    Primary,
    Secondary,
    Arbiter,
    Down,
    Other(String),
}

impl From<String> for MemberState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "PRIMARY" => Self::Primary,
            "SECONDARY" => Self::Secondary,
            "ARBITER" => Self::Arbiter,
            "DOWN" => Self::Down,
            _ => Self::Other(state),
        }
    }
}

impl From<MemberState> for String {
    fn from(state: MemberState) -> Self {
        state.to_string()
    }
}

impl fmt::Display for MemberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "PRIMARY"),
            Self::Secondary => write!(f, "SECONDARY"),
            Self::Arbiter => write!(f, "ARBITER"),
            Self::Down => write!(f, "DOWN"),
            Self::Other(state) => write!(f, "{}", state),
        }
    }
}

/// One entry of a status document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberStatus {
    #[serde(rename = "_id")]
    pub id: MemberId,

    #[serde(rename = "name")]
    pub host: String,

    #[serde(rename = "stateStr")]
    pub state: MemberState,
}

impl MemberStatus {
    pub fn is_primary(&self) -> bool {
        self.state == MemberState::Primary
    }
}

/// Point-in-time status of a replica set as seen by one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaSetStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<String>,

    #[serde(default)]
    pub members: Vec<MemberStatus>,
}

impl ReplicaSetStatus {
    pub fn from_document(document: Value) -> Result<Self> {
        let status: Self = serde_json::from_value(document)
            .map_err(|e| CommonError::malformed(format!("Replica set status: {}", e)))?;
        Ok(status)
    }
}
