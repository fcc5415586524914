//! Domain layer for the staking crate

mod error;
mod stake;

pub use error::*;
pub use stake::*;
