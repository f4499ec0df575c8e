//! Generate tagged P-256 keys, sign arbitrary messages, and verify ECDSA signatures.
//!
//! Keys live in a [KeyStore], addressed by caller-chosen [KeyTag]s. A [KeyGenerator] draws
//! private scalars from a cryptographically secure RNG, the [KeyStore] owns the resulting
//! material (private scalars never leave it except for the duration of a single signing
//! call), and a [SignatureEngine] signs with stored private keys and verifies against stored
//! or caller-supplied public keys.
//!
//! # Encodings
//!
//! * Public keys cross the API boundary as [EncodedPublicKey]s: SEC 1 points (compressed
//!   `02/03 || X` or uncompressed `04 || X || Y`), hex encoded, validated on decode.
//! * [Signature]s are the fixed-width big-endian `r || s` pair (64 bytes), hex encoded.
//!   Messages are hashed with SHA-256, signatures are deterministic
//!   ([RFC 6979](https://datatracker.ietf.org/doc/html/rfc6979)) and `s` is normalized to
//!   the lower half of the curve order
//!   ([BIP 62](https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki#low-s-values-in-signatures)).
//!   Verification accepts either form of `s`.
//! * [address] renders a public key as a Base58Check Bitcoin or Ripple address.
//!
//! # Example
//! ```rust
//! use keysafe_cryptography::{store::Memory, KeyStore, SignatureEngine};
//! use std::sync::Arc;
//!
//! // Generate a pair and store both halves
//! let store = Arc::new(KeyStore::new(Memory::default()));
//! store.generate_and_store("priv1", "pub1").unwrap();
//!
//! // Sign with the private half
//! let engine = SignatureEngine::new(store.clone());
//! let signature = engine.sign("priv1", b"hello").unwrap();
//!
//! // Verify with the public half
//! assert!(engine.verify_with_tag("pub1", b"hello", &signature.to_hex()).unwrap());
//! assert!(!engine.verify_with_tag("pub1", b"hellp", &signature.to_hex()).unwrap());
//! ```
//!
//! # Status
//!
//! `keysafe-cryptography` is **ALPHA** software and is not yet recommended for production use.
//! Developers should expect breaking changes and occasional instability.

use thiserror::Error;

pub mod address;
pub use address::AddressKind;
pub mod engine;
pub use engine::SignatureEngine;
pub mod generator;
pub use generator::KeyGenerator;
pub mod keys;
pub use keys::{Curve, EncodedPublicKey, KeyPair, PointFormat};
pub mod secret;
pub use secret::Secret;
pub mod sha256;
pub use sha256::{hash, HashAlgorithm, Sha256};
pub mod signature;
pub use signature::Signature;
pub mod store;
pub use store::{Backing, KeyStore, KeyTag, StoredKey, Visibility};
pub mod utils;

/// Errors that can occur when generating, storing, or using keys.
#[derive(Debug, Error)]
pub enum Error {
    #[error("tag already in use: {0}")]
    TagCollision(KeyTag),
    #[error("tag not found: {0}")]
    TagNotFound(KeyTag),
    #[error("not a private key: {0}")]
    NotAPrivateKey(KeyTag),
    #[error("invalid tag: {0}")]
    InvalidTag(&'static str),
    #[error("public key {public} does not belong to private key {private}")]
    PairMismatch { private: KeyTag, public: KeyTag },
    #[error("no valid scalar after {0} attempts")]
    KeyGenerationFailure(usize),
    #[error("insufficient entropy: {0}")]
    InsufficientEntropy(rand::Error),
    #[error("signing failed: {0}")]
    SigningFailure(p256::ecdsa::Error),
    #[error("malformed key encoding: {0}")]
    MalformedKeyEncoding(&'static str),
    #[error("malformed signature encoding: {0}")]
    MalformedSignatureEncoding(&'static str),
    #[error("malformed digest: {0}")]
    MalformedDigest(&'static str),
    #[error("key store unavailable: {0}")]
    KeyStoreUnavailable(#[from] std::io::Error),
}
