//! # Inbound Ports
//!
//! API trait defining what the Admission Pipeline can do.

use crate::domain::{AdmissionError, LookupAnswer, LookupQuestion};
use async_trait::async_trait;
use shared_types::{MerklePath, Steak, SubmitMode, TaggedBundle, Txid};

/// Callback receiving the STEAK once a submission is committed.
pub type SteakCallback = Box<dyn FnOnce(&Steak) + Send + 'static>;

/// Admission Pipeline API - inbound port.
#[async_trait]
pub trait AdmissionApi: Send + Sync {
    /// Submit a tagged bundle.
    ///
    /// Topics are independent units of work: a failure part-way through may
    /// leave earlier topics committed.
    async fn submit(
        &self,
        tagged: TaggedBundle,
        mode: SubmitMode,
        on_steak_ready: Option<SteakCallback>,
    ) -> Result<Steak, AdmissionError>;

    /// Answer a lookup question, hydrating formula answers.
    async fn lookup(&self, question: LookupQuestion) -> Result<LookupAnswer, AdmissionError>;

    /// Merge a newly available Merkle proof into the stored outputs of `txid`.
    ///
    /// Returns the number of outputs updated.
    async fn handle_new_merkle_proof(
        &self,
        txid: Txid,
        proof: MerklePath,
    ) -> Result<usize, AdmissionError>;

    /// Names of registered topic managers.
    fn list_topic_managers(&self) -> Vec<String>;

    /// Names of registered lookup services.
    fn list_lookup_services(&self) -> Vec<String>;
}
