//! # Error Types
//!
//! Errors shared across crates.

use thiserror::Error;

/// Errors produced when parsing a hex address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    /// The address does not have 40 hex digits.
    #[error("Invalid address length: expected 40 hex digits, got {0}")]
    InvalidLength(usize),

    /// The address contains non-hex characters.
    #[error("Invalid address hex: {0}")]
    InvalidHex(String),
}
