//! SHA-256 digests for signing and record naming.

use core::fmt::{Display, Formatter};
use sha2::{Digest as _, Sha256 as ISha256};

/// Size of a SHA-256 digest in bytes.
pub const DIGEST_LENGTH: usize = 32;

/// A SHA-256 digest.
pub type Digest = [u8; DIGEST_LENGTH];

/// Hash algorithm applied to a message before it is signed.
///
/// The algorithm is fixed per deployment; it travels with each
/// [crate::Signature] so verifiers never have to guess.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum HashAlgorithm {
    #[default]
    Sha256,
}

impl HashAlgorithm {
    /// Digest `message` with this algorithm.
    pub fn digest(&self, message: &[u8]) -> Digest {
        match self {
            Self::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(message);
                hasher.finalize()
            }
        }
    }

    /// Length of the digest produced by this algorithm.
    pub const fn output_len(&self) -> usize {
        match self {
            Self::Sha256 => DIGEST_LENGTH,
        }
    }
}

impl Display for HashAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Sha256 => f.write_str("sha256"),
        }
    }
}

/// Incremental SHA-256 hasher.
#[derive(Clone, Default)]
pub struct Sha256 {
    hasher: ISha256,
}

impl Sha256 {
    /// Create a new hasher.
    pub fn new() -> Self {
        Self {
            hasher: ISha256::new(),
        }
    }

    /// Append message to previously recorded data.
    pub fn update(&mut self, message: &[u8]) {
        self.hasher.update(message);
    }

    /// Hash all recorded data and reset the hasher to the initial state.
    pub fn finalize(&mut self) -> Digest {
        self.hasher.finalize_reset().into()
    }

    /// Reset the hasher without generating a hash.
    pub fn reset(&mut self) {
        self.hasher = ISha256::new();
    }
}

/// Hash `message` with SHA-256.
pub fn hash(message: &[u8]) -> Digest {
    HashAlgorithm::Sha256.digest(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::hex;

    #[test]
    fn test_sha256() {
        let message = b"hello world";

        // Generate initial hash
        let mut hasher = Sha256::new();
        hasher.update(message);
        let digest = hasher.finalize();
        assert_eq!(
            hex(&digest),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );

        // Reuse hasher without reset
        hasher.update(message);
        assert_eq!(hasher.finalize(), digest);

        // Reuse hasher with reset
        hasher.update(b"hello mars");
        hasher.reset();
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(hasher.finalize(), digest);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(
            hex(&hash(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_algorithm() {
        let algorithm = HashAlgorithm::default();
        assert_eq!(algorithm, HashAlgorithm::Sha256);
        assert_eq!(algorithm.output_len(), DIGEST_LENGTH);
        assert_eq!(algorithm.to_string(), "sha256");
        assert_eq!(algorithm.digest(b"hello world"), hash(b"hello world"));
    }
}
