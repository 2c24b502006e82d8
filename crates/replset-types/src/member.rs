//! Replica-set member records and vote/priority resolution

use crate::error::{CommonError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Value the store assumes for `votes` and `priority` when it does not report them
pub const DEFAULT_SETTING: i64 = 1;

/// Identifier of a member, unique within one replica set
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub i64);

impl MemberId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MemberId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A member setting as reported by the store.
///
/// Older stores leave `votes` and `priority` out of the configuration
/// document when they hold the default, and some report them as `null`.
/// Both cases resolve to the default; only `Explicit` carries a value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Setting<T> {
    /// The store reported a concrete value
    Explicit(T),

    /// The field was present but carried no value.
    ///
    /// Resolves to the default like `Absent`: the store applies a `null`
    /// setting as unset, so the audit reports such a member as OK rather
    /// than treating `null` as a deviating value.
    DefaultImplied,

    /// The field was missing from the document
    #[default]
    Absent,
}

impl<T: Copy> Setting<T> {
    /// Resolve the setting, falling back to `default` when not explicit
    pub fn resolve(&self, default: T) -> T {
        match self {
            Self::Explicit(value) => *value,
            Self::DefaultImplied | Self::Absent => default,
        }
    }

    pub fn explicit(&self) -> Option<T> {
        match self {
            Self::Explicit(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_implicit(&self) -> bool {
        !matches!(self, Self::Explicit(_))
    }
}

impl<T: Serialize> Serialize for Setting<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Explicit(value) => value.serialize(serializer),
            Self::DefaultImplied | Self::Absent => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Setting<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // A missing field never reaches this point; `#[serde(default)]` yields `Absent`.
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Self::Explicit(value),
            None => Self::DefaultImplied,
        })
    }
}

/// A member entry of a replica-set configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(rename = "_id")]
    pub id: MemberId,

    /// Network address (`host:port`) of the member
    pub host: String,

    #[serde(default, skip_serializing_if = "Setting::is_implicit")]
    pub votes: Setting<i64>,

    #[serde(default, skip_serializing_if = "Setting::is_implicit")]
    pub priority: Setting<f64>,
}

impl Member {
    /// Create a full voting member with store defaults for votes and priority
    pub fn new(id: impl Into<MemberId>, host: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            votes: Setting::Absent,
            priority: Setting::Absent,
        }
    }

    /// Create a secondary that replicates but neither votes nor stands for election
    pub fn non_voting(id: impl Into<MemberId>, host: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            votes: Setting::Explicit(0),
            priority: Setting::Explicit(0.0),
        }
    }

    pub fn effective_votes(&self) -> i64 {
        self.votes.resolve(DEFAULT_SETTING)
    }

    pub fn effective_priority(&self) -> f64 {
        self.priority.resolve(DEFAULT_SETTING as f64)
    }

    /// True when both votes and priority are the default or exactly 1
    pub fn has_default_voting(&self) -> bool {
        self.effective_votes() == DEFAULT_SETTING
            && self.effective_priority() == DEFAULT_SETTING as f64
    }

    /// True for the votes=0, priority=0 secondary role
    pub fn is_non_voting(&self) -> bool {
        self.effective_votes() == 0 && self.effective_priority() == 0.0
    }

    pub fn is_voting(&self) -> bool {
        self.effective_votes() > 0
    }

    /// Check the member against the store's own acceptance rules
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(CommonError::validation(format!(
                "Member {} has an empty host",
                self.id
            )));
        }

        let votes = self.effective_votes();
        if votes != 0 && votes != 1 {
            return Err(CommonError::validation(format!(
                "Member {} has votes {}, expected 0 or 1",
                self.id, votes
            )));
        }

        let priority = self.effective_priority();
        if !priority.is_finite() || priority < 0.0 {
            return Err(CommonError::validation(format!(
                "Member {} has invalid priority {}",
                self.id, priority
            )));
        }

        if votes == 0 && priority != 0.0 {
            return Err(CommonError::validation(format!(
                "Non-voting member {} must have priority 0",
                self.id
            )));
        }

        Ok(())
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{_id: {}, host: {}, votes: {}, priority: {}}}",
            self.id,
            self.host,
            self.effective_votes(),
            self.effective_priority()
        )
    }
}
