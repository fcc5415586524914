//! # Genesis Module
//!
//! The genesis block carries:
//!
//! - Height 0 and a zero parent hash
//! - The state root of the initial balances and stakes
//! - The gas limit every later block inherits

pub mod builder;

pub use builder::{GenesisBuilder, GenesisConfig, GenesisError};
