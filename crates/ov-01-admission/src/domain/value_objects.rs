//! # Domain Value Objects
//!
//! Lookup questions and answers, broadcast receipts.

use serde::{Deserialize, Serialize};
use shared_types::{Outpoint, Txid};

/// A structured query addressed to one lookup service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupQuestion {
    /// Name of the lookup service.
    pub service: String,
    /// Service-specific query.
    pub query: serde_json::Value,
}

/// A pointer to an output the engine must hydrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupFormula {
    /// Output to return.
    pub outpoint: Outpoint,
}

/// An output returned from a lookup, with the bundle proving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupOutput {
    /// The output.
    pub outpoint: Outpoint,
    /// BEEF of the transaction that created it.
    pub beef: Vec<u8>,
}

/// What a lookup service answers.
///
/// Services may answer with `Formulas`; the engine never returns them and
/// hydrates them into an `OutputList` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LookupAnswer {
    /// Service-defined payload.
    Freeform(serde_json::Value),
    /// Outputs with their bundles.
    OutputList(Vec<LookupOutput>),
    /// Outputs for the engine to hydrate.
    Formulas(Vec<LookupFormula>),
}

/// Confirmation that the base network accepted a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastReceipt {
    /// Broadcast transaction.
    pub txid: Txid,
    /// Network-provided message.
    pub message: String,
}
