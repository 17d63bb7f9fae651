//! # Two-Node Sync
//!
//! Node "alpha" admits transactions through its pipeline; node "beta" pulls
//! them over GASP and offers back what alpha lacks. Both share one chain
//! (one tracker) unless a test needs them to disagree about it.

use std::sync::Arc;

use anyhow::Result;
use ov_01_admission::AdmissionRule;
use ov_02_graph_storage::{GraphConfig, GraphError, GraphStorageApi};
use ov_03_gasp_sync::{
    LocalPeerConnector, SessionState, StaticPeerResolver, SyncApi, SyncConfig, SyncDriver,
    SyncStrategy,
};
use shared_types::{MerklePath, Outpoint, StaticChainTracker, Transaction, Txid};

use super::support::{bundle, init_logger, mine, tx, OverlayNode};

const ALPHA: &str = "local://alpha";
const BETA: &str = "local://beta";

struct Net {
    tracker: Arc<StaticChainTracker>,
    alpha: OverlayNode,
    beta: OverlayNode,
    connector: Arc<LocalPeerConnector>,
}

fn net(topics: &[&str], beta_graph: GraphConfig) -> Net {
    init_logger();
    let tracker = Arc::new(StaticChainTracker::new());
    let alpha = OverlayNode::new(
        ALPHA,
        topics,
        AdmissionRule::AdmitAll,
        tracker.clone(),
        GraphConfig::for_testing(),
    );
    let beta = OverlayNode::new(BETA, topics, AdmissionRule::AdmitAll, tracker.clone(), beta_graph);
    let connector = Arc::new(LocalPeerConnector::new());
    connector.register(ALPHA, alpha.responder.clone());
    connector.register(BETA, beta.responder.clone());
    Net {
        tracker,
        alpha,
        beta,
        connector,
    }
}

/// Mined `a`, unmined `b` spending it, unmined `c` spending `b`.
struct Lineage {
    a: Transaction,
    a_proof: MerklePath,
    b: Transaction,
    c: Transaction,
}

impl Lineage {
    fn new(tracker: &StaticChainTracker, tag: u8, height: u32) -> Result<Self> {
        let a = tx(&[Outpoint::new(Txid([tag; 32]), 0)], 1, tag);
        let a_proof = mine(tracker, &a, height)?;
        let b = tx(&[a.outpoint(0)], 1, tag.wrapping_add(1));
        let c = tx(&[b.outpoint(0)], 1, tag.wrapping_add(2));
        Ok(Self { a, a_proof, b, c })
    }

    fn beef(&self) -> Result<Vec<u8>> {
        bundle(&[
            (self.a.clone(), Some(self.a_proof.clone())),
            (self.b.clone(), None),
            (self.c.clone(), None),
        ])
    }

    fn tip(&self) -> Outpoint {
        self.c.outpoint(0)
    }
}

#[tokio::test]
async fn test_beta_pulls_unproven_lineage_from_alpha() -> Result<()> {
    let n = net(&["T"], GraphConfig::for_testing());
    let lineage = Lineage::new(&n.tracker, 0x10, 100)?;
    let steak = n.alpha.submit(lineage.beef()?, &["T"]).await?;
    assert_eq!(steak["T"].outputs_to_admit, vec![0]);
    assert_eq!(n.alpha.broadcaster.broadcast_count(), 1);

    let driver = n.beta.driver("T", &[ALPHA], n.connector.clone());
    let report = driver.sync_with_peer("T", ALPHA).await?;

    assert_eq!(report.committed, 1);
    assert_eq!(report.failed(), 0);
    assert_eq!(report.pushed, 0);
    assert_eq!(report.final_state, SessionState::Reply);
    assert!(n.beta.holds_unspent(&lineage.tip(), "T"));
    // Ancestors were committed before the tip, so the tip consumed them.
    let b = n.beta.store.output(&lineage.b.outpoint(0), "T").expect("b stored");
    assert!(b.spent);
    assert_eq!(b.consumed_by, vec![lineage.tip()]);
    // Historical commits never reach the network.
    assert_eq!(n.beta.broadcaster.broadcast_count(), 0);
    assert_eq!(n.beta.graphs.session_count(), 0);
    assert_eq!(n.beta.graphs.total_nodes(), 0);

    let tip_score = n.alpha.store.output(&lineage.tip(), "T").expect("tip").score;
    assert_eq!(report.watermark, Some(tip_score));
    assert_eq!(driver.watermark("T", ALPHA), Some(tip_score));
    Ok(())
}

#[tokio::test]
async fn test_second_sync_skips_what_beta_holds() -> Result<()> {
    let n = net(&["T"], GraphConfig::for_testing());
    let lineage = Lineage::new(&n.tracker, 0x20, 200)?;
    n.alpha.submit(lineage.beef()?, &["T"]).await?;

    let driver = n.beta.driver("T", &[ALPHA], n.connector.clone());
    driver.sync_with_peer("T", ALPHA).await?;
    let stored = n.beta.store.output_count();

    let again = driver.sync_with_peer("T", ALPHA).await?;
    assert_eq!(again.committed, 0);
    assert_eq!(again.skipped, 1);
    assert_eq!(n.beta.store.output_count(), stored);
    Ok(())
}

#[tokio::test]
async fn test_one_session_updates_both_nodes() -> Result<()> {
    let n = net(&["T"], GraphConfig::for_testing());
    let from_alpha = Lineage::new(&n.tracker, 0x30, 300)?;
    let from_beta = Lineage::new(&n.tracker, 0x40, 301)?;
    n.alpha.submit(from_alpha.beef()?, &["T"]).await?;
    n.beta.submit(from_beta.beef()?, &["T"]).await?;

    let driver = n.beta.driver("T", &[ALPHA], n.connector.clone());
    let report = driver.sync_with_peer("T", ALPHA).await?;

    assert_eq!(report.committed, 1);
    assert_eq!(report.pushed, 1);
    assert!(report.is_clean());
    for node in [&n.alpha, &n.beta] {
        assert!(node.holds_unspent(&from_alpha.tip(), "T"));
        assert!(node.holds_unspent(&from_beta.tip(), "T"));
    }
    // Alpha re-validated beta's lineage itself and committed it historically.
    let b = n.alpha.store.output(&from_beta.b.outpoint(0), "T").expect("b on alpha");
    assert_eq!(b.consumed_by, vec![from_beta.tip()]);
    assert_eq!(n.alpha.broadcaster.broadcast_count(), 1);
    assert_eq!(n.alpha.graphs.total_nodes(), 0);
    assert!(driver.push_watermark("T", ALPHA).is_some());

    // Nothing left to exchange.
    let again = driver.sync_with_peer("T", ALPHA).await?;
    assert_eq!(again.committed, 0);
    assert_eq!(again.pushed, 0);
    Ok(())
}

#[tokio::test]
async fn test_unidirectional_sync_only_pulls() -> Result<()> {
    let n = net(&["T"], GraphConfig::for_testing());
    let from_alpha = Lineage::new(&n.tracker, 0x38, 310)?;
    let from_beta = Lineage::new(&n.tracker, 0x48, 311)?;
    n.alpha.submit(from_alpha.beef()?, &["T"]).await?;
    n.beta.submit(from_beta.beef()?, &["T"]).await?;

    let config = SyncConfig {
        self_url: Some(BETA.to_string()),
        unidirectional: true,
        ..SyncConfig::for_testing()
    }
    .with_strategy("T", SyncStrategy::Peers(vec![ALPHA.to_string()]));
    let storage: Arc<dyn GraphStorageApi> = n.beta.storages[0].clone();
    let driver = SyncDriver::new(config, n.connector.clone()).with_storage(storage);
    let report = driver.sync_with_peer("T", ALPHA).await?;

    assert_eq!(report.committed, 1);
    assert_eq!(report.pushed, 0);
    assert!(n.beta.holds_unspent(&from_alpha.tip(), "T"));
    assert!(!n.alpha.holds_unspent(&from_beta.tip(), "T"));

    // Alpha learns it by pulling for itself.
    n.alpha
        .driver("T", &[BETA], n.connector.clone())
        .sync_with_peer("T", BETA)
        .await?;
    assert!(n.alpha.holds_unspent(&from_beta.tip(), "T"));
    Ok(())
}

#[tokio::test]
async fn test_graph_in_flight_for_one_topic_does_not_block_another() -> Result<()> {
    let n = net(&["T", "U"], GraphConfig::for_testing());
    let first = Lineage::new(&n.tracker, 0xA0, 800)?;
    let later = Lineage::new(&n.tracker, 0xB0, 801)?;
    n.alpha.submit(first.beef()?, &["T", "U"]).await?;
    n.alpha.submit(later.beef()?, &["U"]).await?;

    // Beta is midway through pulling `first` into T.
    let beta_t = &n.beta.storages[0];
    let root = n.alpha.storages[0]
        .hydrate_graph_node(first.tip(), first.tip(), true)
        .await?;
    beta_t.append_to_graph(&root, None).await?;

    let report = n
        .beta
        .driver("U", &[ALPHA], n.connector.clone())
        .sync_with_peer("U", ALPHA)
        .await?;
    assert_eq!(report.committed, 2);
    assert_eq!(report.deferred, 0);
    assert!(report.is_clean());
    assert!(n.beta.holds_unspent(&first.tip(), "U"));
    assert!(n.beta.holds_unspent(&later.tip(), "U"));

    // The T session is untouched and still completes.
    assert_eq!(beta_t.node_count(&first.tip()), 1);
    assert!(n.beta.store.output(&first.tip(), "T").is_none());
    beta_t.discard_graph(first.tip()).await;
    let t_report = n
        .beta
        .driver("T", &[ALPHA], n.connector.clone())
        .sync_with_peer("T", ALPHA)
        .await?;
    assert_eq!(t_report.committed, 1);
    assert!(n.beta.holds_unspent(&first.tip(), "T"));
    Ok(())
}

#[tokio::test]
async fn test_topics_sync_independently() -> Result<()> {
    let n = net(&["T", "U"], GraphConfig::for_testing());
    let in_t = Lineage::new(&n.tracker, 0x50, 400)?;
    let in_u = Lineage::new(&n.tracker, 0x60, 401)?;
    n.alpha.submit(in_t.beef()?, &["T"]).await?;
    n.alpha.submit(in_u.beef()?, &["U"]).await?;

    let driver = n.beta.driver("T", &[ALPHA], n.connector.clone());
    let reports = driver.sync_all().await?;

    assert_eq!(reports.len(), 1);
    assert!(n.beta.holds_unspent(&in_t.tip(), "T"));
    assert!(n.beta.store.output(&in_u.tip(), "U").is_none());
    assert!(n.beta.store.output(&in_t.tip(), "U").is_none());
    Ok(())
}

#[tokio::test]
async fn test_unanchored_graph_is_discarded() -> Result<()> {
    init_logger();
    // Alpha trusts a block beta's chain has never seen.
    let alpha_chain = Arc::new(StaticChainTracker::new());
    let beta_chain = Arc::new(StaticChainTracker::new());
    let alpha = OverlayNode::new(
        ALPHA,
        &["T"],
        AdmissionRule::AdmitAll,
        alpha_chain.clone(),
        GraphConfig::for_testing(),
    );
    let beta = OverlayNode::new(
        BETA,
        &["T"],
        AdmissionRule::AdmitAll,
        beta_chain,
        GraphConfig::for_testing(),
    );
    let connector = Arc::new(LocalPeerConnector::new());
    connector.register(ALPHA, alpha.responder.clone());

    let lineage = Lineage::new(&alpha_chain, 0x70, 500)?;
    alpha.submit(lineage.beef()?, &["T"]).await?;

    let driver = beta.driver("T", &[ALPHA], connector);
    let report = driver.sync_with_peer("T", ALPHA).await?;

    assert_eq!(report.committed, 0);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].graph_id, lineage.tip());
    assert_eq!(report.final_state, SessionState::Reply);
    assert_eq!(report.watermark, None);
    assert_eq!(beta.store.output_count(), 0);
    assert_eq!(beta.graphs.total_nodes(), 0);
    Ok(())
}

#[tokio::test]
async fn test_graph_ceiling_discards_deep_lineage() -> Result<()> {
    // The three-transaction lineage doesn't fit in two nodes.
    let n = net(&["T"], GraphConfig { max_nodes: 2 });
    let lineage = Lineage::new(&n.tracker, 0x80, 600)?;
    n.alpha.submit(lineage.beef()?, &["T"]).await?;

    let report = n
        .beta
        .driver("T", &[ALPHA], n.connector.clone())
        .sync_with_peer("T", ALPHA)
        .await?;

    assert_eq!(report.failed(), 1);
    assert!(report.failures[0].reason.contains("full"));
    assert_eq!(n.beta.graphs.total_nodes(), 0);
    assert!(!n.beta.holds_unspent(&lineage.tip(), "T"));
    Ok(())
}

#[tokio::test]
async fn test_tracker_strategy_skips_self_and_dead_peers() -> Result<()> {
    let n = net(&["T"], GraphConfig::for_testing());
    let lineage = Lineage::new(&n.tracker, 0x90, 700)?;
    n.alpha.submit(lineage.beef()?, &["T"]).await?;

    let config = SyncConfig {
        self_url: Some(BETA.to_string()),
        ..SyncConfig::for_testing()
    }
    .with_strategy("T", SyncStrategy::Tracker);
    let resolver = StaticPeerResolver::new().with_topic(
        "T",
        vec![BETA.into(), "local://gone".into(), ALPHA.into()],
    );
    let storage: Arc<dyn GraphStorageApi> = n.beta.storages[0].clone();
    let driver = SyncDriver::new(config, n.connector.clone())
        .with_storage(storage)
        .with_resolver(Arc::new(resolver));

    let reports = driver.sync_topic("T").await?;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].peer, ALPHA);
    assert!(n.beta.holds_unspent(&lineage.tip(), "T"));
    Ok(())
}

#[tokio::test]
async fn test_responder_refuses_unknown_output() -> Result<()> {
    let n = net(&["T"], GraphConfig::for_testing());
    let storage = &n.alpha.storages[0];
    let unknown = Outpoint::new(Txid([0xEE; 32]), 0);
    let result = storage.hydrate_graph_node(unknown, unknown, true).await;
    assert!(matches!(result, Err(GraphError::UnknownOutput(_))));
    Ok(())
}
