//! Domain layer for the consensus crate

mod error;
mod role;

pub use error::*;
pub use role::*;
