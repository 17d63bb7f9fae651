//! # Sync Session
//!
//! Per (topic, peer) state machine and the report it produces.
//!
//! ```text
//! INIT ──→ HANDSHAKE ──→ NODE_EXCHANGE ──→ VALIDATE ──→ COMMIT
//!              │           ↑    │              │          │
//!              │           │    └──────────────┴──→ DISCARD
//!              │           └── next graph ───────────────┘
//!              └──────────────────→ REPLY ←── (after the last graph)
//! ```
//!
//! REPLY is the push half: the initiator offers the peer what it lacks.

use serde::{Deserialize, Serialize};
use shared_types::Outpoint;
use uuid::Uuid;

use crate::domain::errors::SyncError;

/// Where a session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Init,
    Handshake,
    NodeExchange,
    Validate,
    Commit,
    Discard,
    Reply,
}

impl SessionState {
    /// Is `next` a legal successor?
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Init, Handshake)
                | (Handshake, NodeExchange)
                | (NodeExchange, Validate)
                | (NodeExchange, Discard)
                | (Validate, Commit)
                | (Validate, Discard)
                | (Commit, NodeExchange)
                | (Discard, NodeExchange)
                | (Handshake, Reply)
                | (NodeExchange, Reply)
                | (Commit, Reply)
                | (Discard, Reply)
        )
    }
}

/// A running sync session.
#[derive(Debug)]
pub struct SyncSession {
    pub id: Uuid,
    pub topic: String,
    pub peer: String,
    state: SessionState,
}

impl SyncSession {
    pub fn new(topic: impl Into<String>, peer: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            peer: peer.into(),
            state: SessionState::Init,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `next`, rejecting illegal transitions.
    pub fn advance(&mut self, next: SessionState) -> Result<(), SyncError> {
        if !self.state.can_transition_to(next) {
            return Err(SyncError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!(session = %self.id, "[ov-03] {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(())
    }
}

/// A graph that could not be synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphFailure {
    pub graph_id: Outpoint,
    pub reason: String,
}

/// Outcome of one (topic, peer) session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub session_id: Uuid,
    pub topic: String,
    pub peer: String,
    /// Graphs validated and committed.
    pub committed: usize,
    /// Peer UTXOs already held.
    pub skipped: usize,
    /// Graphs another session was building; offered again next session.
    pub deferred: usize,
    /// Graphs discarded.
    pub failures: Vec<GraphFailure>,
    /// Graphs the peer committed from our reply.
    pub pushed: usize,
    /// Graphs the peer refused or could not take.
    pub push_failures: Vec<GraphFailure>,
    /// Pull watermark stored for the next session, if any.
    pub watermark: Option<u64>,
    /// Reply watermark stored for the next session, if any.
    pub push_watermark: Option<u64>,
    pub final_state: SessionState,
}

impl SyncReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Did every pulled and pushed graph land?
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.push_failures.is_empty() && self.deferred == 0
    }
}
