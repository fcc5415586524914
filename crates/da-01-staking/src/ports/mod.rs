//! Ports for the staking crate
//!
//! The chain and the state execution engine are owned by the host node.
//! Consensus only reads and writes through these traits.

mod outbound;

pub use outbound::*;
