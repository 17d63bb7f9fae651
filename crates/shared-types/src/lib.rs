//! # Shared Types Crate
//!
//! This crate contains the overlay data model used by every subsystem:
//! outpoints, transactions, BEEF bundles, Merkle paths, stored outputs and
//! the STEAK returned from a submission.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Opaque Bundles**: Subsystems pass BEEF around as bytes and only parse
//!   it through [`Beef`], so the encoding lives in one place.
//! - **Canonical Keys**: Outpoints render as `"<txid>.<index>"`, the form
//!   used for every map key in the node.

pub mod beef;
pub mod chain;
pub mod entities;
pub mod errors;
pub mod merkle;
pub mod steak;

pub use beef::{Beef, BeefTx};
pub use chain::{ChainTracker, StaticChainTracker};
pub use entities::*;
pub use errors::*;
pub use merkle::{build_merkle_path, compute_merkle_root, MerklePath, Position, ProofNode};
pub use steak::*;
