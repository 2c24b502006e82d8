//! Property-based tests for replica-set documents
//!
//! Strategies here are reused by the document round-trip properties below.

use crate::member::{Member, MemberId, Setting};
use crate::replica_set::ReplicaSetConfig;
use proptest::prelude::*;

/// Strategy for member hosts
pub fn host_strategy() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9-]{0,15}", 1024u16..65535u16).prop_map(|(name, port)| format!("{}:{}", name, port))
}

/// Strategy for a vote setting, covering every tri-state variant
pub fn votes_strategy() -> impl Strategy<Value = Setting<i64>> {
    prop_oneof![
        Just(Setting::Absent),
        Just(Setting::DefaultImplied),
        (0i64..=1).prop_map(Setting::Explicit),
    ]
}

/// Strategy for a priority setting
pub fn priority_strategy() -> impl Strategy<Value = Setting<f64>> {
    prop_oneof![
        Just(Setting::Absent),
        Just(Setting::DefaultImplied),
        (0u8..=10).prop_map(|p| Setting::Explicit(p as f64)),
    ]
}

pub fn member_strategy() -> impl Strategy<Value = Member> {
    (0i64..50, host_strategy(), votes_strategy(), priority_strategy()).prop_map(
        |(id, host, votes, priority)| Member {
            id: MemberId(id),
            host,
            votes,
            priority,
        },
    )
}

/// Strategy for configurations with unique member identifiers
pub fn config_strategy() -> impl Strategy<Value = ReplicaSetConfig> {
    ("[a-z][a-z0-9]{0,7}", prop::collection::vec(member_strategy(), 0..8)).prop_map(
        |(set_name, members)| {
            let mut seen = std::collections::HashSet::new();
            let members = members
                .into_iter()
                .filter(|m| seen.insert(m.id))
                .collect();
            ReplicaSetConfig {
                set_name,
                version: None,
                members,
            }
        },
    )
}

proptest! {
    #[test]
    fn prop_implicit_settings_resolve_to_default(member in member_strategy()) {
        if member.votes.is_implicit() {
            prop_assert_eq!(member.effective_votes(), 1);
        }
        if member.priority.is_implicit() {
            prop_assert_eq!(member.effective_priority(), 1.0);
        }
    }

    #[test]
    fn prop_document_preserves_effective_settings(config in config_strategy()) {
        let document = config.to_document().unwrap();
        let decoded = ReplicaSetConfig::from_document(document).unwrap();

        prop_assert_eq!(decoded.members.len(), config.members.len());
        for (before, after) in config.members.iter().zip(decoded.members.iter()) {
            prop_assert_eq!(before.id, after.id);
            prop_assert_eq!(before.effective_votes(), after.effective_votes());
            prop_assert_eq!(before.effective_priority(), after.effective_priority());
        }
    }
}
