//! # ECDSA Signatures (secp256k1)
//!
//! Node identity keys and recoverable transaction signatures.
//!
//! Signatures are 65 bytes, `r || s || v`, produced over a 32-byte prehash
//! (a transaction's signing hash). The signer's address is recovered from the
//! signature rather than carried next to it, so execution can check a
//! transaction's `from` field without a public key lookup.
//!
//! ## Rules
//!
//! - RFC 6979 deterministic nonces
//! - `s` must be in the lower half of the curve order (EIP-2)
//! - `v` is 0 or 1; the legacy 27/28 encoding is accepted on input
//! - Secret key material is zeroized on drop
//!
//! ## Addresses
//!
//! An address is the last 20 bytes of the Keccak-256 hash of the
//! uncompressed public key without its `0x04` prefix.

use crate::CryptoError;
use k256::ecdsa::{
    signature::hazmat::PrehashVerifier, RecoveryId, Signature, SigningKey, VerifyingKey,
};
use sha3::{Digest, Keccak256};
use zeroize::Zeroize;

/// Length of a recoverable signature in bytes.
pub const SIGNATURE_LENGTH: usize = 65;

/// n/2 for secp256k1, big-endian. Signatures with a larger `s` are rejected.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// Compressed secp256k1 public key (33 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1PublicKey([u8; 33]);

impl Secp256k1PublicKey {
    /// Create from compressed bytes (33 bytes, starting with 0x02 or 0x03).
    pub fn from_bytes(bytes: [u8; 33]) -> Result<Self, CryptoError> {
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Get raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// Check `signature` over `prehash` against this key.
    pub fn verify(
        &self,
        prehash: &[u8; 32],
        signature: &Secp256k1Signature,
    ) -> Result<(), CryptoError> {
        let verifying_key = self.verifying_key()?;
        let (sig, _) = signature.parts()?;
        verifying_key
            .verify_prehash(prehash, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }

    /// Derive the 20-byte account address.
    pub fn to_address(&self) -> Result<[u8; 20], CryptoError> {
        Ok(address_from_verifying_key(&self.verifying_key()?))
    }

    fn verifying_key(&self) -> Result<VerifyingKey, CryptoError> {
        VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)
    }

    fn from_verifying_key(verifying_key: &VerifyingKey) -> Self {
        let point = verifying_key.to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(point.as_bytes());
        Self(bytes)
    }
}

/// Recoverable ECDSA signature (`r || s || v`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1Signature([u8; SIGNATURE_LENGTH]);

impl Secp256k1Signature {
    /// Wrap raw bytes. Validity is checked on use.
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    /// Recover the public key that signed `prehash`.
    pub fn recover(&self, prehash: &[u8; 32]) -> Result<Secp256k1PublicKey, CryptoError> {
        let (sig, recovery_id) = self.parts()?;
        let verifying_key = VerifyingKey::recover_from_prehash(prehash, &sig, recovery_id)
            .map_err(|_| CryptoError::RecoveryFailed)?;
        Ok(Secp256k1PublicKey::from_verifying_key(&verifying_key))
    }

    /// Recover the address of the key that signed `prehash`.
    pub fn recover_address(&self, prehash: &[u8; 32]) -> Result<[u8; 20], CryptoError> {
        self.recover(prehash)?.to_address()
    }

    fn parts(&self) -> Result<(Signature, RecoveryId), CryptoError> {
        let s: &[u8] = &self.0[32..64];
        if s > &SECP256K1_HALF_ORDER[..] {
            return Err(CryptoError::HighS);
        }
        let sig = Signature::from_slice(&self.0[..64]).map_err(|_| CryptoError::InvalidSignature)?;

        let v = self.0[64];
        let id = match v {
            0 | 27 => 0,
            1 | 28 => 1,
            _ => return Err(CryptoError::InvalidRecoveryId(v)),
        };
        let recovery_id = RecoveryId::try_from(id).map_err(|_| CryptoError::InvalidRecoveryId(v))?;
        Ok((sig, recovery_id))
    }
}

/// secp256k1 ECDSA keypair.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Create from a secret of arbitrary length, as handed out by a secrets
    /// store. Anything other than 32 bytes is rejected.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Self::from_bytes(array)
    }

    /// Get public key (compressed, 33 bytes).
    pub fn public_key(&self) -> Secp256k1PublicKey {
        Secp256k1PublicKey::from_verifying_key(self.signing_key.verifying_key())
    }

    /// Account address of this key.
    pub fn address(&self) -> [u8; 20] {
        address_from_verifying_key(self.signing_key.verifying_key())
    }

    /// Sign a 32-byte prehash. The result has a low `s` and `v` in {0, 1}.
    pub fn sign_prehash(&self, prehash: &[u8; 32]) -> Result<Secp256k1Signature, CryptoError> {
        let (sig, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(prehash)
            .map_err(|_| CryptoError::SigningFailed)?;

        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes[..64].copy_from_slice(&sig.to_bytes());
        bytes[64] = recovery_id.to_byte();
        Ok(Secp256k1Signature(bytes))
    }

    /// Get secret key bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}

impl std::fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secp256k1KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl Drop for Secp256k1KeyPair {
    fn drop(&mut self) {
        let mut bytes: [u8; 32] = self.signing_key.to_bytes().into();
        bytes.zeroize();
    }
}

fn address_from_verifying_key(verifying_key: &VerifyingKey) -> [u8; 20] {
    let point = verifying_key.to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prehash(message: &[u8]) -> [u8; 32] {
        Keccak256::digest(message).into()
    }

    #[test]
    fn test_recovered_address_matches_signer() {
        let keypair = Secp256k1KeyPair::generate();
        let hash = prehash(b"transfer 5 ETH");

        let signature = keypair.sign_prehash(&hash).unwrap();

        assert_eq!(signature.recover_address(&hash).unwrap(), keypair.address());
        assert_eq!(signature.recover(&hash).unwrap(), keypair.public_key());
        assert!(keypair.public_key().verify(&hash, &signature).is_ok());
    }

    #[test]
    fn test_other_message_recovers_other_address() {
        let keypair = Secp256k1KeyPair::generate();
        let signature = keypair.sign_prehash(&prehash(b"message1")).unwrap();

        let other = prehash(b"message2");
        assert!(keypair.public_key().verify(&other, &signature).is_err());
        // Recovery succeeds, but yields some unrelated key.
        if let Ok(address) = signature.recover_address(&other) {
            assert_ne!(address, keypair.address());
        }
    }

    #[test]
    fn test_zero_signature_is_rejected() {
        let signature = Secp256k1Signature::from_bytes([0u8; SIGNATURE_LENGTH]);
        assert!(signature.recover_address(&prehash(b"anything")).is_err());
    }

    #[test]
    fn test_recovery_id_encodings() {
        let keypair = Secp256k1KeyPair::from_bytes([0x11u8; 32]).unwrap();
        let hash = prehash(b"legacy v");
        let mut bytes = *keypair.sign_prehash(&hash).unwrap().as_bytes();
        assert!(bytes[64] <= 1);

        bytes[64] += 27;
        let legacy = Secp256k1Signature::from_bytes(bytes);
        assert_eq!(legacy.recover_address(&hash).unwrap(), keypair.address());

        bytes[64] = 2;
        let err = Secp256k1Signature::from_bytes(bytes)
            .recover_address(&hash)
            .unwrap_err();
        assert!(matches!(err, CryptoError::InvalidRecoveryId(2)));
    }

    #[test]
    fn test_high_s_is_rejected() {
        let keypair = Secp256k1KeyPair::generate();
        let hash = prehash(b"malleable");
        let mut bytes = *keypair.sign_prehash(&hash).unwrap().as_bytes();
        bytes[32] = 0xFF;

        let err = Secp256k1Signature::from_bytes(bytes)
            .recover_address(&hash)
            .unwrap_err();
        assert!(matches!(err, CryptoError::HighS));
    }

    #[test]
    fn test_deterministic_signatures() {
        let keypair = Secp256k1KeyPair::from_bytes([0xABu8; 32]).unwrap();
        let hash = prehash(b"deterministic test");

        let sig1 = keypair.sign_prehash(&hash).unwrap();
        let sig2 = keypair.sign_prehash(&hash).unwrap();

        assert_eq!(sig1, sig2);
    }

    #[test]
    fn test_known_address_derivation() {
        // Secret key 1 is the generator point; its address is well known.
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let keypair = Secp256k1KeyPair::from_bytes(secret).unwrap();

        assert_eq!(
            hex::encode(keypair.address()),
            "7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
        assert_eq!(keypair.public_key().to_address().unwrap(), keypair.address());
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        let err = Secp256k1KeyPair::from_slice(&[1u8; 31]).unwrap_err();
        assert!(matches!(
            err,
            CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 31
            }
        ));
    }

    #[test]
    fn test_roundtrip_bytes() {
        let original = Secp256k1KeyPair::generate();
        let restored = Secp256k1KeyPair::from_bytes(original.to_bytes()).unwrap();

        assert_eq!(original.public_key(), restored.public_key());
        assert_eq!(original.address(), restored.address());
    }
}
