//! Property-based tests for identity checks, vote audits and primary lookup

use crate::audit::{audit_votes, AuditPolicy, Verdict};
use crate::identity::is_identifier_free;
use crate::primary::{find_primary, PrimaryLookup};
use proptest::prelude::*;
use replset_types::{
    Member, MemberId, MemberState, MemberStatus, ReplicaSetConfig, ReplicaSetStatus, Setting,
};
use std::collections::HashSet;

/// Strategy for settings as the store may report them
pub fn setting_strategy() -> impl Strategy<Value = (Setting<i64>, Setting<f64>)> {
    let votes = prop_oneof![
        Just(Setting::Absent),
        Just(Setting::DefaultImplied),
        (0i64..=1).prop_map(Setting::Explicit),
    ];
    let priority = prop_oneof![
        Just(Setting::Absent),
        Just(Setting::DefaultImplied),
        (0u8..=3).prop_map(|p| Setting::Explicit(p as f64)),
    ];
    (votes, priority)
}

/// Strategy for configurations with unique identifiers drawn from 0..20
pub fn config_strategy() -> impl Strategy<Value = ReplicaSetConfig> {
    prop::collection::vec((0i64..20, setting_strategy()), 0..10).prop_map(|entries| {
        let mut seen = HashSet::new();
        let members = entries
            .into_iter()
            .filter(|(id, _)| seen.insert(*id))
            .map(|(id, (votes, priority))| Member {
                id: MemberId(id),
                host: format!("node{}:27017", id),
                votes,
                priority,
            })
            .collect();
        ReplicaSetConfig {
            set_name: "rs0".to_string(),
            version: None,
            members,
        }
    })
}

pub fn state_strategy() -> impl Strategy<Value = MemberState> {
    prop_oneof![
        Just(MemberState::Primary),
        Just(MemberState::Secondary),
        Just(MemberState::Arbiter),
        Just(MemberState::Down),
        Just(MemberState::Other("RECOVERING".to_string())),
    ]
}

pub fn status_strategy() -> impl Strategy<Value = ReplicaSetStatus> {
    prop::collection::vec(state_strategy(), 0..8).prop_map(|states| ReplicaSetStatus {
        set: Some("rs0".to_string()),
        members: states
            .into_iter()
            .enumerate()
            .map(|(i, state)| MemberStatus {
                id: MemberId(i as i64),
                host: format!("node{}:27017", i),
                state,
            })
            .collect(),
    })
}

proptest! {
    #[test]
    fn prop_identifier_free_iff_absent(config in config_strategy(), candidate in 0i64..25) {
        let present = config.members.iter().any(|m| m.id == MemberId(candidate));
        prop_assert_eq!(is_identifier_free(&config, MemberId(candidate)), !present);
    }

    #[test]
    fn prop_audit_ok_iff_default_or_one(config in config_strategy()) {
        let audit = audit_votes(&config, &AuditPolicy::default());
        for entry in &audit.entries {
            let votes_default = entry.member.votes.explicit().map_or(true, |v| v == 1);
            let priority_default = entry.member.priority.explicit().map_or(true, |p| p == 1.0);
            let expected = if votes_default && priority_default {
                Verdict::Ok
            } else {
                Verdict::Misconfigured
            };
            prop_assert_eq!(entry.verdict, expected);
        }
        prop_assert_eq!(
            audit.passed(),
            audit.entries.iter().all(|e| e.verdict == Verdict::Ok)
        );
    }

    #[test]
    fn prop_first_primary_wins(status in status_strategy()) {
        let first = status.members.iter().find(|m| m.state == MemberState::Primary);
        match (find_primary(&status), first) {
            (PrimaryLookup::Found(found), Some(expected)) => prop_assert_eq!(&found, expected),
            (PrimaryLookup::NotFound, None) => {}
            (lookup, expected) => prop_assert!(false, "{:?} vs {:?}", lookup, expected),
        }
    }
}
