//! Adapters layer (Hexagonal Architecture)

mod da;
mod secrets;
mod syncer;
mod txpool;

pub use da::*;
pub use secrets::*;
pub use syncer::*;
pub use txpool::*;
