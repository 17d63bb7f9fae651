//! Fixtures for multi-node tests.

use anyhow::{Context, Result};
use std::sync::{Arc, OnceLock};
use tracing::info;

use ov_01_admission::{
    AdmissionApi, AdmissionConfig, AdmissionRule, AdmissionService, InMemoryOutputStore,
    MockTopicManager, RecordingBroadcaster, TopicRegistry,
};
use ov_02_graph_storage::{GaspStorage, GraphConfig, TemporaryGraphStore};
use ov_03_gasp_sync::{GaspResponder, LocalPeerConnector, SyncConfig, SyncDriver, SyncStrategy};
use shared_types::{
    build_merkle_path, compute_merkle_root, Beef, MerklePath, Outpoint, StaticChainTracker, Steak,
    SubmitMode, TaggedBundle, Transaction, TxInput, TxOutput,
};

static INIT_LOGGER: OnceLock<()> = OnceLock::new();

/// Route `tracing` output through the test harness. `RUST_LOG` overrides.
pub fn init_logger() {
    INIT_LOGGER.get_or_init(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(filter)
            .try_init();
    });
}

/// Transaction spending `sources`, with `outputs` outputs tagged by `tag`.
pub fn tx(sources: &[Outpoint], outputs: usize, tag: u8) -> Transaction {
    Transaction {
        version: 1,
        inputs: sources.iter().copied().map(TxInput::spending).collect(),
        outputs: (0..outputs)
            .map(|i| TxOutput {
                satoshis: 1_000,
                locking_script: vec![tag, i as u8],
            })
            .collect(),
        lock_time: 0,
    }
}

/// Mine `tx` alone in a block at `height` known to `tracker`.
pub fn mine(tracker: &StaticChainTracker, tx: &Transaction, height: u32) -> Result<MerklePath> {
    let proof = build_merkle_path(&[tx.txid()], 0, height).context("building merkle path")?;
    tracker.add_root(height, compute_merkle_root(&[tx.txid()]));
    Ok(proof)
}

/// Bundle of `txs` (ancestors first) with the last one as subject.
pub fn bundle(txs: &[(Transaction, Option<MerklePath>)]) -> Result<Vec<u8>> {
    let mut beef = Beef::new();
    for (tx, proof) in txs {
        beef.add_transaction(tx.clone(), proof.clone());
    }
    let (subject, _) = txs.last().context("empty bundle")?;
    beef.set_subject(subject.txid());
    Ok(beef.to_bytes())
}

/// One overlay node: admission, graph storage and responder for its topics.
pub struct OverlayNode {
    pub url: String,
    pub store: Arc<InMemoryOutputStore>,
    pub broadcaster: Arc<RecordingBroadcaster>,
    pub admission: Arc<AdmissionService>,
    pub graphs: Arc<TemporaryGraphStore>,
    pub storages: Vec<Arc<GaspStorage>>,
    pub responder: Arc<GaspResponder>,
}

impl OverlayNode {
    /// A node hosting `topics`, each admitting with `rule`.
    pub fn new(
        url: &str,
        topics: &[&str],
        rule: AdmissionRule,
        tracker: Arc<StaticChainTracker>,
        graph_config: GraphConfig,
    ) -> Self {
        let store = Arc::new(InMemoryOutputStore::new());
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let registry = topics
            .iter()
            .fold(TopicRegistry::builder(), |builder, topic| {
                builder.topic(*topic, Arc::new(MockTopicManager::new(rule.clone())))
            })
            .build();
        let admission = Arc::new(AdmissionService::new(
            AdmissionConfig::for_testing(),
            Arc::new(registry),
            store.clone(),
            tracker,
            broadcaster.clone(),
        ));
        let graphs = Arc::new(TemporaryGraphStore::from_config(&graph_config));
        let storages: Vec<Arc<GaspStorage>> = topics
            .iter()
            .map(|topic| Arc::new(GaspStorage::new(*topic, admission.clone(), graphs.clone())))
            .collect();
        let responder = Arc::new(
            storages
                .iter()
                .fold(GaspResponder::default(), |responder, storage| {
                    responder.with_storage(storage.clone())
                }),
        );

        info!(url, topics = ?topics, "[tests] Node up");
        Self {
            url: url.to_string(),
            store,
            broadcaster,
            admission,
            graphs,
            storages,
            responder,
        }
    }

    /// Submit a bundle to `topics` in `Current` mode.
    pub async fn submit(&self, beef: Vec<u8>, topics: &[&str]) -> Result<Steak> {
        let tagged = TaggedBundle::new(beef, topics.iter().map(|t| t.to_string()).collect());
        self.admission
            .submit(tagged, SubmitMode::Current, None)
            .await
            .context("submit")
    }

    /// A driver syncing `topic` with `peers` through `connector`.
    pub fn driver(&self, topic: &str, peers: &[&str], connector: Arc<LocalPeerConnector>) -> SyncDriver {
        let config = SyncConfig {
            self_url: Some(self.url.clone()),
            ..SyncConfig::for_testing()
        }
        .with_strategy(
            topic,
            SyncStrategy::Peers(peers.iter().map(|p| p.to_string()).collect()),
        );
        self.storages
            .iter()
            .fold(SyncDriver::new(config, connector), |driver, storage| {
                driver.with_storage(storage.clone())
            })
    }

    /// Is `outpoint` held unspent in `topic`?
    pub fn holds_unspent(&self, outpoint: &Outpoint, topic: &str) -> bool {
        self.store
            .output(outpoint, topic)
            .map(|o| !o.spent)
            .unwrap_or(false)
    }
}
