//! Bitcoin and Ripple style addresses of a public key.
//!
//! An address is the Base58Check encoding of `0x00 || RIPEMD-160(SHA-256(point))`,
//! where `point` is the SEC 1 encoding of the key. Bitcoin and Ripple differ only
//! in the Base58 alphabet.
//!
//! # Example
//!
//! ```rust
//! use keysafe_cryptography::{address::{derive, AddressKind}, Curve, KeyPair, PointFormat};
//!
//! let pair = KeyPair::from_bytes(Curve::P256, &[0x24; 32]).unwrap();
//! let address = derive(AddressKind::Bitcoin, pair.public_key(), PointFormat::Compressed);
//! assert!(address.starts_with('1'));
//! ```

use crate::{keys::EncodedPublicKey, keys::PointFormat, sha256};
use core::fmt::{Display, Formatter};
use ripemd::{Digest as _, Ripemd160};

/// Version byte prefixed to the key hash.
pub const VERSION: u8 = 0x00;

/// Number of double SHA-256 bytes appended as a checksum.
pub const CHECKSUM_LENGTH: usize = 4;

/// Size of the RIPEMD-160 key hash.
pub const KEY_HASH_LENGTH: usize = 20;

/// Address flavor, selecting the Base58 alphabet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AddressKind {
    #[default]
    Bitcoin,
    Ripple,
}

impl AddressKind {
    fn alphabet(&self) -> &'static bs58::Alphabet {
        match self {
            Self::Bitcoin => bs58::Alphabet::BITCOIN,
            Self::Ripple => bs58::Alphabet::RIPPLE,
        }
    }
}

impl Display for AddressKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bitcoin => write!(f, "bitcoin"),
            Self::Ripple => write!(f, "ripple"),
        }
    }
}

/// `RIPEMD-160(SHA-256(bytes))`.
pub fn key_hash(bytes: &[u8]) -> [u8; KEY_HASH_LENGTH] {
    let mut hasher = Ripemd160::new();
    hasher.update(sha256::hash(bytes));
    hasher.finalize().into()
}

/// Encode the address of an already serialized SEC 1 point.
///
/// The bytes are hashed as given, so the compressed and uncompressed forms of one
/// key yield different addresses.
pub fn encode(kind: AddressKind, sec1: &[u8]) -> String {
    let mut payload = Vec::with_capacity(1 + KEY_HASH_LENGTH + CHECKSUM_LENGTH);
    payload.push(VERSION);
    payload.extend_from_slice(&key_hash(sec1));
    let checksum = sha256::hash(&sha256::hash(&payload));
    payload.extend_from_slice(&checksum[..CHECKSUM_LENGTH]);
    bs58::encode(payload)
        .with_alphabet(kind.alphabet())
        .into_string()
}

/// Address of `public_key` serialized in `format`.
pub fn derive(kind: AddressKind, public_key: &EncodedPublicKey, format: PointFormat) -> String {
    encode(kind, &public_key.to_bytes(format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        keys::{Curve, KeyPair},
        utils::from_hex,
    };
    use keysafe_macros::test_traced;
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    // Worked example of a version 1 Bitcoin address (a secp256k1 point, so it only
    // goes through the byte-level encoder).
    const UNCOMPRESSED: &str = "0450863ad64a87ae8a2fe83c1af1a8403cb53f53e486d8511dad8a04887e5b23522cd470243453a299fa9e77237716103abc11a1df38855ed6f2ee187e9c582ba6";
    const COMPRESSED: &str = "0250863ad64a87ae8a2fe83c1af1a8403cb53f53e486d8511dad8a04887e5b2352";

    /// Decode an address and check its version byte and checksum.
    fn decode(kind: AddressKind, address: &str) -> [u8; KEY_HASH_LENGTH] {
        let payload = bs58::decode(address)
            .with_alphabet(kind.alphabet())
            .into_vec()
            .unwrap();
        assert_eq!(payload.len(), 1 + KEY_HASH_LENGTH + CHECKSUM_LENGTH);
        assert_eq!(payload[0], VERSION);
        let (body, checksum) = payload.split_at(1 + KEY_HASH_LENGTH);
        assert_eq!(checksum, &sha256::hash(&sha256::hash(body))[..CHECKSUM_LENGTH]);
        body[1..].try_into().unwrap()
    }

    #[test]
    fn test_bitcoin_vectors() {
        let uncompressed = from_hex(UNCOMPRESSED).unwrap();
        assert_eq!(
            key_hash(&uncompressed),
            from_hex("010966776006953d5567439e5e39f86a0d273bee")
                .unwrap()
                .as_slice()
        );
        assert_eq!(
            encode(AddressKind::Bitcoin, &uncompressed),
            "16UwLL9Risc3QfPqBUvKofHmBQ7wMtjvM"
        );
        let compressed = from_hex(COMPRESSED).unwrap();
        assert_eq!(
            encode(AddressKind::Bitcoin, &compressed),
            "1PMycacnJaSqwwJqjawXBErnLsZ7RkXUAs"
        );
    }

    #[test]
    fn test_ripple_vectors() {
        let uncompressed = from_hex(UNCOMPRESSED).unwrap();
        assert_eq!(
            encode(AddressKind::Ripple, &uncompressed),
            "ra7ALL9R51csQCPqB7vKoCHmBQfAMtjvM"
        );
        let compressed = from_hex(COMPRESSED).unwrap();
        assert_eq!(
            encode(AddressKind::Ripple, &compressed),
            "rPMyc2c8J2SqAAJqj2AXBNi8L1ZfRkX7w1"
        );
    }

    #[test_traced]
    fn test_derive_p256() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..16 {
            let mut scalar = [0u8; 32];
            rng.fill_bytes(&mut scalar);
            scalar[0] &= 0x7f;
            let pair = KeyPair::from_bytes(Curve::P256, &scalar).unwrap();
            let public = pair.public_key();
            for format in [PointFormat::Compressed, PointFormat::Uncompressed] {
                let bitcoin = derive(AddressKind::Bitcoin, public, format);
                let ripple = derive(AddressKind::Ripple, public, format);
                assert!(bitcoin.starts_with('1'));
                assert!(ripple.starts_with('r'));

                // Same payload under both alphabets
                let hash = key_hash(&public.to_bytes(format));
                assert_eq!(decode(AddressKind::Bitcoin, &bitcoin), hash);
                assert_eq!(decode(AddressKind::Ripple, &ripple), hash);
            }
            assert_ne!(
                derive(AddressKind::Bitcoin, public, PointFormat::Compressed),
                derive(AddressKind::Bitcoin, public, PointFormat::Uncompressed)
            );
        }
    }

    #[test]
    fn test_checksum_detects_typo() {
        let address = encode(AddressKind::Bitcoin, &from_hex(COMPRESSED).unwrap());
        let mut typo = address.into_bytes();
        let last = typo.len() - 1;
        typo[last] = if typo[last] == b'2' { b'3' } else { b'2' };
        let payload = bs58::decode(typo).into_vec().unwrap();
        let (body, checksum) = payload.split_at(1 + KEY_HASH_LENGTH);
        assert_ne!(checksum, &sha256::hash(&sha256::hash(body))[..CHECKSUM_LENGTH]);
    }
}
