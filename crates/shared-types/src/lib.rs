//! # Shared Types Crate
//!
//! Domain entities shared by the staking, consensus and runtime crates.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every cross-crate type is defined here.
//! - **Sealing is one-way**: a [`PendingBlock`] becomes an immutable
//!   [`SealedBlock`] once its hash is computed.

pub mod block;
pub mod entities;
pub mod errors;

pub use block::*;
pub use entities::*;
pub use errors::*;
