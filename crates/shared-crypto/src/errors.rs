//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Invalid signature
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature `s` value is in the upper half of the curve order
    #[error("Signature s value is not normalized")]
    HighS,

    /// Recovery byte is not 0, 1, 27 or 28
    #[error("Invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// No public key could be recovered from the signature
    #[error("Public key recovery failed")]
    RecoveryFailed,

    /// The signer rejected the prehash
    #[error("Signing failed")]
    SigningFailed,
}
