//! # Shared Crypto
//!
//! secp256k1 key material for node identities and recoverable signatures.
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `ecdsa` | secp256k1 | Block authorship, transaction signing and signer recovery |
//!
//! - **secp256k1**: RFC 6979 deterministic signing, low-s recoverable
//!   signatures, Keccak-256 addresses

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;

// Re-exports
pub use ecdsa::{Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature, SIGNATURE_LENGTH};
pub use errors::CryptoError;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
