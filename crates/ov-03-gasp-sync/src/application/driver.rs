//! # Sync Driver
//!
//! Initiator side of the protocol. One session per (topic, peer):
//!
//! 1. Handshake with the watermark stored for the pair
//! 2. For each UTXO the peer lists that we don't hold, fetch it as a graph
//!    root, then keep fetching whatever inputs graph storage still needs
//! 3. Validate the graph's anchor; commit it or discard it
//! 4. Reply: offer the peer each of our UTXOs since our reply watermark
//!    that it did not list, answering its input requests until it commits
//!    or refuses the graph
//! 5. Store each watermark after a phase in which every graph landed
//!
//! A failing graph is discarded and reported; the session moves on to the
//! next UTXO. A graph another session is already building is deferred: it
//! is not a failure, but it holds the watermark back so the next session
//! lists it again. Only handshake failures end a session early.

use async_trait::async_trait;
use dashmap::DashMap;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::topics::TopicStorages;
use crate::config::{SyncConfig, SyncStrategy};
use crate::domain::{
    FinishGraph, GaspNode, GraphFailure, InitialRequest, NodeRequest, NodeResponse,
    NodeSubmission, SessionState, SubmitOutcome, SyncError, SyncReport, SyncSession,
};
use crate::ports::{GaspRemote, PeerConnector, PeerResolver, SyncApi};
use ov_02_graph_storage::{GraphError, GraphStorageApi, KnownUtxo};
use shared_types::Outpoint;

/// How one graph of a session ended.
enum GraphOutcome {
    Committed(usize),
    /// Another session is already building this graph.
    Busy,
    /// The peer already holds it.
    Known,
}

/// Tally of the reply phase.
#[derive(Default)]
struct ReplyTally {
    pushed: usize,
    deferred: usize,
    failures: Vec<GraphFailure>,
    watermark: Option<u64>,
}

/// Sync Driver - pulls unfamiliar topic state from peers.
///
/// ## Thread Safety
///
/// Sessions share nothing but graph storage and the watermark table, so
/// any number may run concurrently.
pub struct SyncDriver {
    config: SyncConfig,
    storages: TopicStorages,
    connector: Arc<dyn PeerConnector>,
    resolver: Option<Arc<dyn PeerResolver>>,
    /// Last pull watermark per (topic, peer), in the peer's scores.
    watermarks: DashMap<(String, String), u64>,
    /// Last reply watermark per (topic, peer), in our scores.
    push_watermarks: DashMap<(String, String), u64>,
}

impl SyncDriver {
    pub fn new(config: SyncConfig, connector: Arc<dyn PeerConnector>) -> Self {
        Self {
            config,
            storages: TopicStorages::new(),
            connector,
            resolver: None,
            watermarks: DashMap::new(),
            push_watermarks: DashMap::new(),
        }
    }

    /// Sync `storage`'s topic.
    pub fn with_storage(mut self, storage: Arc<dyn GraphStorageApi>) -> Self {
        self.storages.insert(storage);
        self
    }

    /// Resolver used by topics with the tracker strategy.
    pub fn with_resolver(mut self, resolver: Arc<dyn PeerResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Pull watermark stored for the pair, if a clean pull has completed.
    pub fn watermark(&self, topic: &str, peer: &str) -> Option<u64> {
        self.watermarks
            .get(&(topic.to_string(), peer.to_string()))
            .map(|w| *w)
    }

    /// Reply watermark stored for the pair, if a clean reply has completed.
    pub fn push_watermark(&self, topic: &str, peer: &str) -> Option<u64> {
        self.push_watermarks
            .get(&(topic.to_string(), peer.to_string()))
            .map(|w| *w)
    }

    /// Peers to sync `topic` with, never including this node.
    pub async fn peers_for(&self, topic: &str) -> Result<Vec<String>, SyncError> {
        let is_self = |peer: &str| self.config.self_url.as_deref() == Some(peer);

        match self.config.strategy(topic) {
            SyncStrategy::Disabled => Ok(Vec::new()),
            SyncStrategy::Peers(peers) => Ok(peers
                .iter()
                .filter(|p| !is_self(p.as_str()))
                .cloned()
                .collect()),
            SyncStrategy::Tracker => {
                let resolver = self
                    .resolver
                    .as_ref()
                    .ok_or_else(|| SyncError::Resolver("no peer resolver configured".to_string()))?;
                let mut seen = HashSet::new();
                let mut peers: Vec<String> = resolver
                    .resolve(topic)
                    .await?
                    .into_iter()
                    .filter(|p| !is_self(p.as_str()) && seen.insert(p.clone()))
                    .collect();
                peers.shuffle(&mut rand::thread_rng());
                Ok(peers)
            }
        }
    }

    async fn run_graph(
        &self,
        session: &mut SyncSession,
        storage: &Arc<dyn GraphStorageApi>,
        remote: &Arc<dyn GaspRemote>,
        graph_id: Outpoint,
    ) -> Result<GraphOutcome, SyncError> {
        let peer = session.peer.clone();
        let root = self.fetch(remote, &peer, graph_id, graph_id, true).await?;
        match storage.append_to_graph(&root, None).await {
            Err(GraphError::SessionActive(_)) => return Ok(GraphOutcome::Busy),
            other => other?,
        }

        let staged = match self.fetch_ancestry(storage, remote, &peer, root).await {
            Ok(()) => {
                session.advance(SessionState::Validate)?;
                storage.validate_graph_anchor(graph_id).await.map_err(SyncError::from)
            }
            Err(e) => Err(e),
        };
        if let Err(e) = staged {
            session.advance(SessionState::Discard)?;
            let released = storage.discard_graph(graph_id).await;
            debug!(
                session = %session.id,
                "[ov-03] Discarded graph {} ({} nodes)",
                graph_id,
                released
            );
            return Err(e);
        }

        session.advance(SessionState::Commit)?;
        let committed = storage.finalize_graph(graph_id).await?;
        Ok(GraphOutcome::Committed(committed))
    }

    /// Request whatever storage still needs, breadth first from the root.
    async fn fetch_ancestry(
        &self,
        storage: &Arc<dyn GraphStorageApi>,
        remote: &Arc<dyn GaspRemote>,
        peer: &str,
        root: GaspNode,
    ) -> Result<(), SyncError> {
        let graph_id = root.graph_id;
        let mut fetched: HashMap<Outpoint, GaspNode> = HashMap::new();
        let mut pending = VecDeque::from([root]);

        while let Some(node) = pending.pop_front() {
            let Some(needed) = storage.find_needed_inputs(&node).await? else {
                continue;
            };
            let spent_by = node.outpoint()?;
            for (outpoint, metadata) in needed.requests()? {
                if let Some(known) = fetched.get(&outpoint) {
                    // Diamond: link the node we already have.
                    storage.append_to_graph(known, Some(spent_by)).await?;
                    continue;
                }
                let child = self.fetch(remote, peer, graph_id, outpoint, metadata).await?;
                storage.append_to_graph(&child, Some(spent_by)).await?;
                fetched.insert(outpoint, child.clone());
                pending.push_back(child);
            }
        }
        Ok(())
    }

    /// Offer the peer every UTXO since the reply watermark it did not list.
    async fn reply(
        &self,
        session: &SyncSession,
        storage: &Arc<dyn GraphStorageApi>,
        remote: &Arc<dyn GaspRemote>,
        listed: &[KnownUtxo],
    ) -> Result<ReplyTally, SyncError> {
        let since = self
            .push_watermark(&session.topic, &session.peer)
            .unwrap_or(0);
        let peer_holds: HashSet<Outpoint> = listed.iter().map(|u| u.outpoint).collect();
        let ours = storage.find_known_utxos(since).await?;
        let offered: Vec<&KnownUtxo> = ours
            .iter()
            .filter(|u| !peer_holds.contains(&u.outpoint))
            .collect();
        debug!(
            session = %session.id,
            since,
            "[ov-03] Offering {} of {} UTXOs",
            offered.len(),
            ours.len()
        );

        let mut tally = ReplyTally::default();
        for utxo in offered {
            match self.push_graph(storage, remote, &session.peer, utxo.outpoint).await {
                Ok(GraphOutcome::Committed(count)) => {
                    debug!(
                        session = %session.id,
                        "[ov-03] Peer committed graph {} ({} txs)",
                        utxo.outpoint,
                        count
                    );
                    tally.pushed += 1;
                }
                Ok(GraphOutcome::Known) => {}
                Ok(GraphOutcome::Busy) => tally.deferred += 1,
                Err(e) => {
                    warn!(session = %session.id, "[ov-03] Offer of {} failed: {}", utxo.outpoint, e);
                    tally.failures.push(GraphFailure {
                        graph_id: utxo.outpoint,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if tally.failures.is_empty() && tally.deferred == 0 {
            let reached = ours.iter().map(|u| u.score).max().unwrap_or(since);
            tally.watermark = Some(reached);
        }
        Ok(tally)
    }

    async fn push_graph(
        &self,
        storage: &Arc<dyn GraphStorageApi>,
        remote: &Arc<dyn GaspRemote>,
        peer: &str,
        graph_id: Outpoint,
    ) -> Result<GraphOutcome, SyncError> {
        let root = storage.hydrate_graph_node(graph_id, graph_id, true).await?;
        let needed = match remote
            .submit_node(&NodeSubmission {
                node: root,
                spent_by: None,
            })
            .await?
        {
            SubmitOutcome::AlreadyKnown => return Ok(GraphOutcome::Known),
            SubmitOutcome::Busy => return Ok(GraphOutcome::Busy),
            SubmitOutcome::Staged => None,
            SubmitOutcome::Needs(needed) => Some(needed),
        };

        if let Some(needed) = needed {
            if let Err(e) = self.push_ancestry(storage, remote, peer, graph_id, needed).await {
                // The peer drops the graph on its own errors; this covers ours.
                let abandon = FinishGraph {
                    graph_id,
                    commit: false,
                };
                if let Err(abandon_err) = remote.finish_graph(&abandon).await {
                    debug!("[ov-03] Abandoning {} at {}: {}", graph_id, peer, abandon_err);
                }
                return Err(e);
            }
        }

        let finished = remote
            .finish_graph(&FinishGraph {
                graph_id,
                commit: true,
            })
            .await?;
        Ok(GraphOutcome::Committed(finished.committed))
    }

    /// Answer the peer's input requests breadth first from the root.
    async fn push_ancestry(
        &self,
        storage: &Arc<dyn GraphStorageApi>,
        remote: &Arc<dyn GaspRemote>,
        peer: &str,
        graph_id: Outpoint,
        needed: NodeResponse,
    ) -> Result<(), SyncError> {
        let mut sent: HashMap<Outpoint, GaspNode> = HashMap::new();
        let mut pending = VecDeque::from([(graph_id, needed)]);

        while let Some((spent_by, needed)) = pending.pop_front() {
            for (outpoint, metadata) in needed.requests()? {
                let node = match sent.get(&outpoint) {
                    // Diamond: the peer only needs the second link.
                    Some(known) => known.clone(),
                    None => storage.hydrate_graph_node(graph_id, outpoint, metadata).await?,
                };
                let outcome = remote
                    .submit_node(&NodeSubmission {
                        node: node.clone(),
                        spent_by: Some(spent_by),
                    })
                    .await?;
                if sent.insert(outpoint, node).is_some() {
                    continue;
                }
                match outcome {
                    SubmitOutcome::Needs(more) => pending.push_back((outpoint, more)),
                    SubmitOutcome::Staged => {}
                    other => {
                        return Err(SyncError::Remote {
                            peer: peer.to_string(),
                            reason: format!("answered {other:?} for ancestor {outpoint}"),
                        })
                    }
                }
            }
        }
        Ok(())
    }

    async fn fetch(
        &self,
        remote: &Arc<dyn GaspRemote>,
        peer: &str,
        graph_id: Outpoint,
        outpoint: Outpoint,
        metadata: bool,
    ) -> Result<GaspNode, SyncError> {
        let node = remote
            .request_node(&NodeRequest {
                graph_id,
                outpoint,
                metadata,
            })
            .await?;
        if node.graph_id != graph_id {
            return Err(SyncError::ForeignNode {
                peer: peer.to_string(),
                expected: graph_id.to_string(),
                got: node.graph_id.to_string(),
            });
        }
        let described = node.outpoint()?;
        if described != outpoint {
            return Err(SyncError::Remote {
                peer: peer.to_string(),
                reason: format!("asked for {outpoint}, got {described}"),
            });
        }
        Ok(node)
    }
}

#[async_trait]
impl SyncApi for SyncDriver {
    async fn sync_with_peer(&self, topic: &str, peer: &str) -> Result<SyncReport, SyncError> {
        let storage = self.storages.get(topic)?;
        let mut session = SyncSession::new(topic, peer);
        session.advance(SessionState::Handshake)?;

        let remote = self.connector.connect(peer, topic)?;
        let since = self.watermark(topic, peer).unwrap_or(0);
        let response = remote
            .initial_request(&InitialRequest {
                version: self.config.protocol_version,
                since,
            })
            .await?;
        if response.version != self.config.protocol_version {
            return Err(SyncError::VersionMismatch {
                expected: self.config.protocol_version,
                got: response.version,
            });
        }
        info!(
            session = %session.id,
            topic,
            peer,
            since,
            "[ov-03] Peer lists {} UTXOs",
            response.utxo_list.len()
        );

        let mut committed = 0;
        let mut skipped = 0;
        let mut deferred = 0;
        let mut failures = Vec::new();

        for utxo in &response.utxo_list {
            if session.state() != SessionState::NodeExchange {
                session.advance(SessionState::NodeExchange)?;
            }
            if storage.is_known(&utxo.outpoint).await? {
                skipped += 1;
                continue;
            }
            match self.run_graph(&mut session, storage, &remote, utxo.outpoint).await {
                Ok(GraphOutcome::Committed(count)) => {
                    debug!(
                        session = %session.id,
                        "[ov-03] Committed graph {} ({} txs)",
                        utxo.outpoint,
                        count
                    );
                    committed += 1;
                }
                Ok(GraphOutcome::Busy) => {
                    debug!(session = %session.id, "[ov-03] Graph {} busy, deferred", utxo.outpoint);
                    deferred += 1;
                }
                Ok(GraphOutcome::Known) => skipped += 1,
                Err(e) => {
                    warn!(session = %session.id, "[ov-03] Graph {} failed: {}", utxo.outpoint, e);
                    failures.push(GraphFailure {
                        graph_id: utxo.outpoint,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let watermark = (failures.is_empty() && deferred == 0).then_some(response.since);
        if let Some(w) = watermark {
            self.watermarks.insert((topic.to_string(), peer.to_string()), w);
        }

        let tally = if self.config.unidirectional {
            ReplyTally::default()
        } else {
            session.advance(SessionState::Reply)?;
            let tally = self.reply(&session, storage, &remote, &response.utxo_list).await?;
            if let Some(w) = tally.watermark {
                self.push_watermarks.insert((topic.to_string(), peer.to_string()), w);
            }
            tally
        };

        let report = SyncReport {
            session_id: session.id,
            topic: topic.to_string(),
            peer: peer.to_string(),
            committed,
            skipped,
            deferred: deferred + tally.deferred,
            failures,
            pushed: tally.pushed,
            push_failures: tally.failures,
            watermark,
            push_watermark: tally.watermark,
            final_state: session.state(),
        };
        info!(
            session = %report.session_id,
            "[ov-03] Sync {}@{} done: {} committed, {} skipped, {} deferred, {} failed, {} pushed",
            topic,
            peer,
            report.committed,
            report.skipped,
            report.deferred,
            report.failed(),
            report.pushed
        );
        Ok(report)
    }

    async fn sync_topic(&self, topic: &str) -> Result<Vec<SyncReport>, SyncError> {
        self.storages.get(topic)?;
        let mut reports = Vec::new();
        for peer in self.peers_for(topic).await? {
            match self.sync_with_peer(topic, &peer).await {
                Ok(report) => reports.push(report),
                Err(e) => warn!(topic, peer = %peer, "[ov-03] Sync failed: {}", e),
            }
        }
        Ok(reports)
    }

    async fn sync_all(&self) -> Result<Vec<SyncReport>, SyncError> {
        let mut reports = Vec::new();
        for (topic, strategy) in &self.config.strategies {
            if *strategy == SyncStrategy::Disabled {
                continue;
            }
            if !self.storages.contains(topic) {
                warn!(topic = %topic, "[ov-03] No graph storage for configured topic");
                continue;
            }
            reports.extend(self.sync_topic(topic).await?);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LocalPeerConnector;
    use crate::application::GaspResponder;
    use crate::ports::StaticPeerResolver;
    use crate::test_support::{chain, node, tx, ScriptedStorage};

    const PEER: &str = "local://peer";

    struct Net {
        local: Arc<ScriptedStorage>,
        remote: Arc<ScriptedStorage>,
        connector: Arc<LocalPeerConnector>,
    }

    impl Net {
        fn new(max_nodes: usize) -> Self {
            let local = Arc::new(ScriptedStorage::new("T", max_nodes));
            let remote = Arc::new(ScriptedStorage::new("T", max_nodes));
            let connector = Arc::new(LocalPeerConnector::new());
            connector.register(PEER, Arc::new(GaspResponder::default().with_storage(remote.clone())));
            Self {
                local,
                remote,
                connector,
            }
        }

        fn driver(&self) -> SyncDriver {
            let config = SyncConfig::for_testing()
                .with_strategy("T", SyncStrategy::Peers(vec![PEER.to_string()]));
            SyncDriver::new(config, self.connector.clone()).with_storage(self.local.clone())
        }
    }

    #[tokio::test]
    async fn test_pulls_missing_chain() {
        let net = Net::new(16);
        let txs = chain(3, 1);
        // Only the tip is advertised; its ancestors come from node requests.
        net.remote.hold_tip_only(&txs);
        let driver = net.driver();

        let report = driver.sync_with_peer("T", PEER).await.unwrap();
        assert_eq!(report.failed(), 0);
        assert_eq!(report.committed, 1);
        assert_eq!(net.local.held_count(), 3);
        assert!(net.local.holds(&txs[0].outpoint(0)));
        assert_eq!(report.final_state, SessionState::Reply);
        assert_eq!(driver.watermark("T", PEER), Some(3));
        assert_eq!(net.local.staged_sessions(), 0);
        // The pulled ancestors are offered back; the peer already has them.
        assert_eq!(report.pushed, 0);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_already_held_outputs_skipped() {
        let net = Net::new(16);
        let txs = chain(2, 1);
        net.remote.hold(&txs);
        net.local.hold(&txs);

        let report = net.driver().sync_with_peer("T", PEER).await.unwrap();
        assert_eq!(report.skipped, 2);
        assert_eq!(report.committed, 0);
        assert_eq!(report.pushed, 0);
        assert_eq!(report.final_state, SessionState::Reply);
    }

    #[tokio::test]
    async fn test_watermark_sent_next_time() {
        let net = Net::new(16);
        net.remote.hold(&chain(1, 1));
        let driver = net.driver();
        driver.sync_with_peer("T", PEER).await.unwrap();
        assert_eq!(driver.watermark("T", PEER), Some(1));

        net.remote.hold(&chain(1, 2));
        let report = driver.sync_with_peer("T", PEER).await.unwrap();
        // Score 1 is listed again (inclusive) and skipped; score 2 is new.
        assert_eq!(report.skipped, 1);
        assert_eq!(report.committed, 1);
        assert_eq!(report.watermark, Some(2));
    }

    #[tokio::test]
    async fn test_failed_anchor_discards_and_keeps_watermark() {
        let net = Net::new(16);
        let good = chain(1, 1);
        let bad = chain(1, 2);
        net.remote.hold(&good);
        net.remote.hold(&bad);
        net.local.reject(bad[0].outpoint(0));
        let driver = net.driver();

        let report = driver.sync_with_peer("T", PEER).await.unwrap();
        assert_eq!(report.committed, 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].graph_id, bad[0].outpoint(0));
        assert_eq!(report.watermark, None);
        assert_eq!(driver.watermark("T", PEER), None);
        assert_eq!(*net.local.discarded.lock(), vec![bad[0].outpoint(0)]);
        assert!(!net.local.holds(&bad[0].outpoint(0)));
        assert_eq!(report.final_state, SessionState::Reply);
    }

    #[tokio::test]
    async fn test_busy_graph_deferred_and_watermark_held() {
        let net = Net::new(16);
        let txs = chain(1, 1);
        net.remote.hold(&txs);
        let root = txs[0].outpoint(0);
        // Another session is already building the root.
        net.local.append_to_graph(&node(&txs[0], root), None).await.unwrap();
        let driver = net.driver();

        let report = driver.sync_with_peer("T", PEER).await.unwrap();
        assert_eq!(report.deferred, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.failed(), 0);
        assert!(!report.is_clean());
        assert_eq!(report.watermark, None);
        assert_eq!(driver.watermark("T", PEER), None);

        net.local.discard_graph(root).await;
        let again = driver.sync_with_peer("T", PEER).await.unwrap();
        assert_eq!(again.committed, 1);
        assert_eq!(again.deferred, 0);
        assert_eq!(again.watermark, Some(1));
        assert!(net.local.holds(&root));
    }

    #[tokio::test]
    async fn test_reply_offers_what_peer_lacks() {
        let net = Net::new(16);
        let theirs = chain(1, 1);
        net.remote.hold(&theirs);
        let ours = chain(3, 0x40);
        net.local.hold_tip_only(&ours);
        let driver = net.driver();

        let report = driver.sync_with_peer("T", PEER).await.unwrap();
        assert_eq!(report.committed, 1);
        assert_eq!(report.pushed, 1);
        assert!(report.is_clean());
        for tx in ours.iter().chain(theirs.iter()) {
            assert!(net.remote.holds(&tx.outpoint(0)));
            assert!(net.local.holds(&tx.outpoint(0)));
        }
        assert_eq!(net.remote.staged_sessions(), 0);
        // Our scores 1..=3 went to `ours`; the pulled root got 4.
        assert_eq!(report.push_watermark, Some(4));
        assert_eq!(driver.push_watermark("T", PEER), Some(4));
        assert_eq!(report.final_state, SessionState::Reply);
    }

    #[tokio::test]
    async fn test_unidirectional_never_offers() {
        let net = Net::new(16);
        net.local.hold(&chain(1, 0x40));
        let mut config = SyncConfig::for_testing()
            .with_strategy("T", SyncStrategy::Peers(vec![PEER.to_string()]));
        config.unidirectional = true;
        let driver = SyncDriver::new(config, net.connector.clone()).with_storage(net.local.clone());

        let report = driver.sync_with_peer("T", PEER).await.unwrap();
        assert_eq!(report.pushed, 0);
        assert_eq!(report.push_watermark, None);
        assert_eq!(net.remote.held_count(), 0);
        assert_eq!(report.final_state, SessionState::Handshake);
    }

    #[tokio::test]
    async fn test_refused_offer_holds_reply_watermark() {
        let net = Net::new(16);
        let ours = chain(1, 0x50);
        let root = ours[0].outpoint(0);
        net.local.hold(&ours);
        net.remote.reject(root);
        let driver = net.driver();

        let report = driver.sync_with_peer("T", PEER).await.unwrap();
        assert_eq!(report.pushed, 0);
        assert_eq!(report.push_failures.len(), 1);
        assert_eq!(report.push_failures[0].graph_id, root);
        assert_eq!(report.push_watermark, None);
        assert_eq!(driver.push_watermark("T", PEER), None);
        assert!(!net.remote.holds(&root));
        assert_eq!(net.remote.staged_sessions(), 0);
        // The pull half was clean.
        assert_eq!(report.failed(), 0);
        assert!(driver.watermark("T", PEER).is_some());
    }

    #[tokio::test]
    async fn test_offer_abandoned_when_ancestor_unavailable() {
        let net = Net::new(16);
        let txs = chain(2, 0x60);
        // We hold the tip but not the ancestor the peer will ask for.
        net.local.hold(&txs[1..]);
        let root = txs[1].outpoint(0);

        let report = net.driver().sync_with_peer("T", PEER).await.unwrap();
        assert_eq!(report.push_failures.len(), 1);
        assert!(report.push_failures[0].reason.contains("Unknown output"));
        assert_eq!(net.remote.staged_sessions(), 0);
        assert_eq!(*net.remote.discarded.lock(), vec![root]);
        assert!(!net.remote.holds(&root));
    }

    #[tokio::test]
    async fn test_graph_full_discards() {
        let net = Net::new(2);
        let txs = chain(4, 1);
        net.remote.hold_tip_only(&txs);

        let driver = net.driver();
        let report = driver.sync_with_peer("T", PEER).await.unwrap();
        let tip = txs[3].outpoint(0);
        assert!(report.failures.iter().any(|f| f.graph_id == tip));
        assert!(net.local.discarded.lock().contains(&tip));
        assert_eq!(net.local.staged_sessions(), 0);
    }

    #[tokio::test]
    async fn test_diamond_fetched_once() {
        let net = Net::new(16);
        let base = chain(1, 1);
        let left = tx(&[base[0].outpoint(0)], 0x10);
        let right = tx(&[base[0].outpoint(0)], 0x20);
        let top = tx(&[left.outpoint(0), right.outpoint(0)], 0x30);
        net.remote
            .hold_tip_only(&[base[0].clone(), left.clone(), right.clone(), top.clone()]);

        let report = net.driver().sync_with_peer("T", PEER).await.unwrap();
        assert_eq!(report.failed(), 0);
        assert_eq!(report.committed, 1);
        assert_eq!(net.local.held_count(), 4);
        assert!(net.local.holds(&base[0].outpoint(0)));
    }

    #[tokio::test]
    async fn test_version_mismatch_is_fatal() {
        let net = Net::new(16);
        let mut config = SyncConfig::for_testing();
        config.protocol_version = 7;
        let driver = SyncDriver::new(config, net.connector.clone()).with_storage(net.local.clone());

        let err = driver.sync_with_peer("T", PEER).await.unwrap_err();
        assert!(matches!(err, SyncError::VersionMismatch { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_unknown_topic() {
        let net = Net::new(16);
        let err = net.driver().sync_with_peer("U", PEER).await.unwrap_err();
        assert!(matches!(err, SyncError::UnknownTopic(_)));
    }

    #[tokio::test]
    async fn test_peer_selection_drops_self() {
        let net = Net::new(16);
        let config = SyncConfig::for_testing()
            .with_strategy(
                "T",
                SyncStrategy::Peers(vec!["local://self".into(), PEER.into()]),
            )
            .with_strategy("R", SyncStrategy::Tracker);
        let resolver = StaticPeerResolver::new().with_topic(
            "R",
            vec![
                "local://self".into(),
                "local://b".into(),
                "local://c".into(),
                "local://b".into(),
            ],
        );
        let driver = SyncDriver::new(config, net.connector.clone()).with_resolver(Arc::new(resolver));

        assert_eq!(driver.peers_for("T").await.unwrap(), vec![PEER.to_string()]);
        let mut tracked = driver.peers_for("R").await.unwrap();
        tracked.sort();
        assert_eq!(tracked, vec!["local://b".to_string(), "local://c".to_string()]);
        assert!(driver.peers_for("Z").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tracker_without_resolver() {
        let net = Net::new(16);
        let config = SyncConfig::for_testing().with_strategy("T", SyncStrategy::Tracker);
        let driver = SyncDriver::new(config, net.connector.clone()).with_storage(net.local.clone());
        assert!(matches!(driver.peers_for("T").await, Err(SyncError::Resolver(_))));
    }

    #[tokio::test]
    async fn test_sync_topic_skips_unreachable_peer() {
        let net = Net::new(16);
        net.remote.hold(&chain(1, 1));
        let config = SyncConfig::for_testing().with_strategy(
            "T",
            SyncStrategy::Peers(vec!["local://gone".into(), PEER.into()]),
        );
        let driver = SyncDriver::new(config, net.connector.clone()).with_storage(net.local.clone());

        let reports = driver.sync_topic("T").await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].peer, PEER);
        assert_eq!(reports[0].committed, 1);
    }

    #[tokio::test]
    async fn test_sync_all_ignores_disabled_topics() {
        let net = Net::new(16);
        net.remote.hold(&chain(1, 1));
        let config = SyncConfig::for_testing()
            .with_strategy("T", SyncStrategy::Peers(vec![PEER.into()]))
            .with_strategy("Off", SyncStrategy::Disabled)
            .with_strategy("Unserved", SyncStrategy::Peers(vec![PEER.into()]));
        let driver = SyncDriver::new(config, net.connector.clone()).with_storage(net.local.clone());

        let reports = driver.sync_all().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].topic, "T");
        assert_eq!(net.local.held_count(), 1);
    }
}
