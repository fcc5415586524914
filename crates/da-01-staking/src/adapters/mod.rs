//! Adapters layer (Hexagonal Architecture)

mod memory_chain;
mod memory_state;

pub use memory_chain::*;
pub use memory_state::*;
