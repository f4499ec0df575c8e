//! ECDSA signatures and their wire format.
//!
//! # Format
//!
//! ```text
//! +---+---+---+---+---+---+---+---+---+---+---+---+
//! | 0 | 1 |  ...  |31 |32 |33 |  ...  |63 |
//! +---+---+---+---+---+---+---+---+---+---+---+---+
//! |     r (big-endian)    |     s (big-endian)    |
//! +---+---+---+---+---+---+---+---+---+---+---+---+
//! ```
//!
//! Both scalars are left-padded to the 32-byte coordinate width of P-256, so the encoding is
//! always exactly [SIGNATURE_LENGTH] bytes. Externally the bytes are hex encoded.
//!
//! Signing always emits the low-s form. Verification accepts either form of `s`.

use crate::{sha256::HashAlgorithm, utils, Error};
use core::fmt::{Debug, Display, Formatter};
use p256::elliptic_curve::scalar::IsHigh;

/// Width of each scalar in a signature.
pub const SCALAR_LENGTH: usize = 32;

/// Length of an encoded signature.
pub const SIGNATURE_LENGTH: usize = 2 * SCALAR_LENGTH; // R || S

/// An immutable `(r, s)` pair together with the hash algorithm applied to the signed message.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    bytes: [u8; SIGNATURE_LENGTH],
    hash: HashAlgorithm,
}

impl Signature {
    pub(crate) fn from_ecdsa(signature: p256::ecdsa::Signature, hash: HashAlgorithm) -> Self {
        // Reject malleable signatures by always emitting the low-s form
        let signature = signature.normalize_s().unwrap_or(signature);
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes.copy_from_slice(&signature.to_bytes());
        Self { bytes, hash }
    }

    /// Decode a signature from its fixed-width binary form.
    ///
    /// Only the layout is checked here. Scalars that are out of range simply fail
    /// verification.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; SIGNATURE_LENGTH] = bytes
            .try_into()
            .map_err(|_| Error::MalformedSignatureEncoding("unexpected signature length"))?;
        Ok(Self {
            bytes,
            hash: HashAlgorithm::Sha256,
        })
    }

    /// Decode a hex encoded signature.
    pub fn from_hex(hex: &str) -> Result<Self, Error> {
        let bytes = utils::from_hex_formatted(hex)
            .ok_or(Error::MalformedSignatureEncoding("invalid hex"))?;
        Self::from_bytes(&bytes)
    }

    /// Big-endian `r` scalar.
    pub fn r(&self) -> &[u8] {
        &self.bytes[..SCALAR_LENGTH]
    }

    /// Big-endian `s` scalar.
    pub fn s(&self) -> &[u8] {
        &self.bytes[SCALAR_LENGTH..]
    }

    /// Hash algorithm applied to the message before signing.
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash
    }

    /// The `r || s` encoding.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.bytes
    }

    /// The `r || s` encoding as lowercase hex.
    pub fn to_hex(&self) -> String {
        utils::hex(&self.bytes)
    }

    /// Whether `s` lies in the upper half of the curve order.
    ///
    /// Signatures produced by this crate never do, but other signers may emit either form.
    pub fn is_high_s(&self) -> bool {
        p256::ecdsa::Signature::from_slice(&self.bytes)
            .map(|signature| bool::from(signature.s().is_high()))
            .unwrap_or(false)
    }

    /// Convert to the low-s form expected by the verifier.
    ///
    /// `(r, s)` and `(r, n - s)` satisfy the same verification equation, so a high `s` is
    /// normalized rather than rejected. Returns `None` if either scalar is zero or not less
    /// than the curve order.
    pub(crate) fn to_ecdsa(&self) -> Option<p256::ecdsa::Signature> {
        let signature = p256::ecdsa::Signature::from_slice(&self.bytes).ok()?;
        Some(signature.normalize_s().unwrap_or(signature))
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "Signature({}, {})", self.hash, self.to_hex())
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.to_hex())
    }
}
