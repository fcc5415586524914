//! # Staking Registry
//!
//! Answers whether an address is an active sequencer and submits the staking
//! transaction that admits a node to the sequencer set.
//!
//! ## Architecture
//!
//! Hexagonal Architecture with:
//! - Domain: stake entries, staking call encoding, errors
//! - Ports: chain, state executor, stake ledger, bootstrap writer
//! - Adapters: in-memory chain and state executor
//!
//! ## Rules
//!
//! - The active set is read from chain state on every query, never cached.
//! - A snapshot that cannot be loaded is an error, not "not staked".

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod querier;
pub mod transaction;

pub use domain::*;
pub use ports::*;
pub use querier::ActiveSequencersQuerier;
pub use transaction::{build_staking_transaction, sign_transaction, stake, StakeRequest};
