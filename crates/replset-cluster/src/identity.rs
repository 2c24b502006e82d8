//! Member identifier collision checks

use replset_types::{Member, MemberId, ReplicaSetConfig};

/// Whether `candidate` is unused by every member of `config`.
///
/// Only identifiers collide; a host already in the set with a different
/// identifier passes. The answer is advisory: another actor may change the
/// configuration before a mutation lands, and the store's own rejection is
/// authoritative.
pub fn is_identifier_free(config: &ReplicaSetConfig, candidate: MemberId) -> bool {
    conflicting_member(config, candidate).is_none()
}

/// First member already using `candidate`, if any
pub fn conflicting_member(config: &ReplicaSetConfig, candidate: MemberId) -> Option<&Member> {
    config.members.iter().find(|member| member.id == candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ReplicaSetConfig {
        let mut config = ReplicaSetConfig::with_seed("rs0", Member::new(0, "a:27017"));
        config.members.push(Member::non_voting(4, "b:27017"));
        config
    }

    #[test]
    fn test_used_identifiers_are_not_free() {
        let config = config();
        assert!(!is_identifier_free(&config, MemberId(0)));
        assert!(!is_identifier_free(&config, MemberId(4)));
        assert_eq!(conflicting_member(&config, MemberId(4)).unwrap().host, "b:27017");
    }

    #[test]
    fn test_unused_identifier_is_free_even_with_reused_host() {
        let config = config();
        assert!(is_identifier_free(&config, MemberId(1)));
        assert!(is_identifier_free(&config, MemberId(-1)));
    }

    #[test]
    fn test_empty_config() {
        let config = ReplicaSetConfig {
            set_name: "rs0".to_string(),
            version: None,
            members: vec![],
        };
        assert!(is_identifier_free(&config, MemberId(0)));
    }
}
