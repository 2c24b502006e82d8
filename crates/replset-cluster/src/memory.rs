//! In-memory store nodes (for testing)

use crate::transport::{
    StoreRequest, StoreTransport, TransportError, CODE_ALREADY_INITIALIZED, CODE_INCOMPATIBLE_CONFIG,
    CODE_NOT_PRIMARY, CODE_NOT_YET_INITIALIZED,
};
use async_trait::async_trait;
use replset_types::{Member, MemberState, ReplicaSetConfig, Setting};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Voting members the simulated store accepts in one set
pub const MAX_VOTING_MEMBERS: usize = 7;

/// Error code the store uses for a configuration it cannot accept
const CODE_INVALID_CONFIG: i64 = 93;

#[derive(Debug, Default)]
struct StoreState {
    config: Option<ReplicaSetConfig>,
    states: HashMap<String, MemberState>,
    unreachable: HashSet<String>,
    detached: HashSet<String>,
    requests: Vec<(String, &'static str)>,
}

/// A replica set simulated in memory.
///
/// All nodes share one configuration document. Replies follow the store's
/// reporting format: `votes` and `priority` equal to 1 are left out.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
    calls: Arc<AtomicUsize>,
    latency: Option<Duration>,
    mutation_reply_delay: Option<Duration>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every request before the store looks at it
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Apply mutations immediately but hold back their acknowledgement
    pub fn with_mutation_reply_delay(mut self, delay: Duration) -> Self {
        self.mutation_reply_delay = Some(delay);
        self
    }

    /// Replace the configuration document; the first member becomes primary
    pub async fn install_config(&self, config: ReplicaSetConfig) {
        let mut state = self.state.write().await;
        state.states = initial_states(&config);
        state.config = Some(config);
    }

    pub async fn current_config(&self) -> Option<ReplicaSetConfig> {
        self.state.read().await.config.clone()
    }

    pub async fn set_reachable(&self, node: &str, reachable: bool) {
        let mut state = self.state.write().await;
        if reachable {
            state.unreachable.remove(node);
        } else {
            state.unreachable.insert(node.to_string());
        }
    }

    /// Make `node` answer as a fresh node that holds no configuration
    pub async fn detach_node(&self, node: &str) {
        self.state.write().await.detached.insert(node.to_string());
    }

    pub async fn set_member_state(&self, host: &str, member_state: MemberState) {
        self.state
            .write()
            .await
            .states
            .insert(host.to_string(), member_state);
    }

    /// Number of requests received, including ones that failed
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(node, operation)` for every request received, in arrival order
    pub async fn requests(&self) -> Vec<(String, &'static str)> {
        self.state.read().await.requests.clone()
    }

    async fn handle(&self, node: &str, request: StoreRequest) -> Result<Value, TransportError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.requests.push((node.to_string(), request.operation()));

        if state.unreachable.contains(node) {
            return Err(TransportError::Unreachable(format!("{}: connection refused", node)));
        }

        if state.detached.contains(node) {
            return match request {
                StoreRequest::RemoveConfigRecord { .. } => Ok(json!({"nRemoved": 0, "ok": 1})),
                _ => Ok(not_initialized()),
            };
        }

        match request {
            StoreRequest::GetConfig => match &state.config {
                Some(config) => Ok(json!({"config": document(config)?, "ok": 1})),
                None => Ok(not_initialized()),
            },
            StoreRequest::GetStatus => match &state.config {
                Some(config) => {
                    let members: Vec<Value> = config
                        .members
                        .iter()
                        .map(|m| {
                            let member_state = state
                                .states
                                .get(&m.host)
                                .cloned()
                                .unwrap_or(MemberState::Secondary);
                            json!({"_id": m.id, "name": m.host, "stateStr": member_state})
                        })
                        .collect();
                    Ok(json!({"set": config.set_name, "members": members, "ok": 1}))
                }
                None => Ok(not_initialized()),
            },
            StoreRequest::Initiate { config } => {
                if state.config.is_some() {
                    return Ok(failure(CODE_ALREADY_INITIALIZED, "already initialized"));
                }
                if let Err(e) = config.validate() {
                    return Ok(failure(CODE_INVALID_CONFIG, &e.to_string()));
                }
                if !config.members.iter().any(|m| m.host == node) {
                    return Ok(failure(
                        CODE_INVALID_CONFIG,
                        &format!("{} is not a member of the proposed config", node),
                    ));
                }

                let mut config = config;
                config.version = Some(1);
                config.members = config.members.into_iter().map(normalize).collect();
                state.states = initial_states(&config);
                state.config = Some(config);
                Ok(json!({"ok": 1}))
            }
            StoreRequest::AddMember { member } => {
                if state.states.get(node) != Some(&MemberState::Primary) {
                    if state.config.is_none() {
                        return Ok(not_initialized());
                    }
                    return Ok(failure(CODE_NOT_PRIMARY, "not primary"));
                }
                let Some(config) = state.config.as_mut() else {
                    return Ok(not_initialized());
                };

                if let Some(existing) = config
                    .members
                    .iter()
                    .find(|m| m.id == member.id || m.host == member.host)
                {
                    let reason = format!(
                        "found two member configurations with same _id or host: {} and {}",
                        existing, member
                    );
                    return Ok(failure(CODE_INCOMPATIBLE_CONFIG, &reason));
                }
                if member.is_voting() && config.voting_member_count() >= MAX_VOTING_MEMBERS {
                    return Ok(failure(
                        CODE_INCOMPATIBLE_CONFIG,
                        &format!("replica set may not have more than {} voting members", MAX_VOTING_MEMBERS),
                    ));
                }

                let host = member.host.clone();
                config.members.push(normalize(member));
                config.version = Some(config.version.unwrap_or(0) + 1);
                state.states.insert(host, MemberState::Secondary);
                Ok(json!({"ok": 1}))
            }
            StoreRequest::RemoveConfigRecord { set_name } => {
                let matches = state
                    .config
                    .as_ref()
                    .map(|c| c.set_name == set_name)
                    .unwrap_or(false);
                if !matches {
                    return Ok(json!({"nRemoved": 0, "ok": 1}));
                }
                state.config = None;
                state.states.clear();
                Ok(json!({"nRemoved": 1, "ok": 1}))
            }
        }
    }
}

#[async_trait]
impl StoreTransport for InMemoryStore {
    async fn call(
        &self,
        node: &str,
        request: StoreRequest,
        _timeout: Duration,
    ) -> Result<Value, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let is_mutation = request.is_mutation();
        let reply = self.handle(node, request).await?;

        if let (true, Some(delay)) = (is_mutation, self.mutation_reply_delay) {
            tokio::time::sleep(delay).await;
        }

        Ok(reply)
    }
}

fn initial_states(config: &ReplicaSetConfig) -> HashMap<String, MemberState> {
    config
        .members
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let member_state = if i == 0 {
                MemberState::Primary
            } else {
                MemberState::Secondary
            };
            (m.host.clone(), member_state)
        })
        .collect()
}

/// Drop settings equal to the default, as the store does when reporting
fn normalize(mut member: Member) -> Member {
    if member.votes.explicit() == Some(1) {
        member.votes = Setting::Absent;
    }
    if member.priority.explicit() == Some(1.0) {
        member.priority = Setting::Absent;
    }
    member
}

fn document(config: &ReplicaSetConfig) -> Result<Value, TransportError> {
    config
        .to_document()
        .map_err(|e| TransportError::Protocol(e.to_string()))
}

fn failure(code: i64, errmsg: &str) -> Value {
    json!({"ok": 0, "code": code, "errmsg": errmsg})
}

fn not_initialized() -> Value {
    failure(CODE_NOT_YET_INITIALIZED, "no replset config has been received")
}
