//! Voting weight and priority audit

use replset_types::{Member, MemberId, ReplicaSetConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Outcome for a single member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Ok,
    Misconfigured,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Misconfigured => write!(f, "MISCONFIGURED"),
        }
    }
}

/// Which deviations from the all-voting baseline are expected.
///
/// The default policy has an empty allowlist, so every non-voting member
/// is flagged, including ones this controller created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditPolicy {
    non_voting_allowlist: HashSet<MemberId>,
}

impl AuditPolicy {
    pub fn with_allowlist<I: IntoIterator<Item = MemberId>>(ids: I) -> Self {
        Self {
            non_voting_allowlist: ids.into_iter().collect(),
        }
    }

    pub fn is_allowlisted(&self, id: MemberId) -> bool {
        self.non_voting_allowlist.contains(&id)
    }

    fn verdict(&self, member: &Member) -> Verdict {
        if member.has_default_voting() {
            return Verdict::Ok;
        }
        // Allowlisting only excuses the exact non-voting shape
        if self.is_allowlisted(member.id) && member.is_non_voting() {
            return Verdict::Ok;
        }
        Verdict::Misconfigured
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub member: Member,
    pub verdict: Verdict,
}

/// Per-member verdicts in configuration order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteAudit {
    pub entries: Vec<AuditEntry>,
}

impl VoteAudit {
    /// True iff every member is OK
    pub fn passed(&self) -> bool {
        self.entries.iter().all(|e| e.verdict == Verdict::Ok)
    }

    pub fn misconfigured(&self) -> impl Iterator<Item = &Member> {
        self.entries
            .iter()
            .filter(|e| e.verdict == Verdict::Misconfigured)
            .map(|e| &e.member)
    }

    pub fn verdict_for(&self, id: MemberId) -> Option<Verdict> {
        self.entries
            .iter()
            .find(|e| e.member.id == id)
            .map(|e| e.verdict)
    }

    /// Exit status of the audit: 0 when passed, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }
}

/// Flag every member whose votes or priority is not the default (or 1)
pub fn audit_votes(config: &ReplicaSetConfig, policy: &AuditPolicy) -> VoteAudit {
    let entries = config
        .members
        .iter()
        .map(|member| {
            let verdict = policy.verdict(member);
            match verdict {
                Verdict::Ok => tracing::info!("OK: {}", member.host),
                Verdict::Misconfigured => tracing::warn!("MISCONFIGURED: {}", member),
            }
            AuditEntry {
                member: member.clone(),
                verdict,
            }
        })
        .collect();

    VoteAudit { entries }
}
