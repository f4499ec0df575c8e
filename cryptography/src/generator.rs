//! Key pair generation.
//!
//! Private scalars are drawn by rejection sampling: 32 bytes are read from the RNG and
//! interpreted as a big-endian integer, and any candidate that is zero or not less than
//! the curve order is discarded and redrawn. This yields a uniform scalar in `[1, n - 1]`.

use crate::{
    keys::{Curve, KeyPair, PRIVATE_KEY_LENGTH},
    Error,
};
use p256::{FieldBytes, NonZeroScalar};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

/// Maximum number of candidates drawn before giving up.
///
/// For P-256 a candidate is rejected with probability below `2^-32`, so exhausting
/// this budget indicates a broken RNG rather than bad luck.
pub const MAX_ATTEMPTS: usize = 64;

/// Produces [KeyPair]s from a cryptographically secure RNG.
///
/// The generator never retains the keys it produces.
pub struct KeyGenerator<R = OsRng> {
    rng: Mutex<R>,
}

impl KeyGenerator<OsRng> {
    /// Create a generator backed by the operating system's RNG.
    pub fn new() -> Self {
        Self::from_rng(OsRng)
    }
}

impl Default for KeyGenerator<OsRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore + CryptoRng + Send> KeyGenerator<R> {
    /// Create a generator that draws from the supplied RNG.
    pub fn from_rng(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Generate a fresh key pair on `curve`.
    ///
    /// Fails with [Error::InsufficientEntropy] if the RNG cannot be read and with
    /// [Error::KeyGenerationFailure] if no valid scalar is found within [MAX_ATTEMPTS].
    pub fn generate(&self, curve: Curve) -> Result<KeyPair, Error> {
        // A poisoned RNG is still usable
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let mut candidate = Zeroizing::new([0u8; PRIVATE_KEY_LENGTH]);
        for attempt in 1..=MAX_ATTEMPTS {
            if let Err(err) = rng.try_fill_bytes(&mut candidate[..]) {
                warn!(?err, "failed to read from rng");
                return Err(Error::InsufficientEntropy(err));
            }
            let scalar = match curve {
                Curve::P256 => Option::<NonZeroScalar>::from(NonZeroScalar::from_repr(
                    *FieldBytes::from_slice(&candidate[..]),
                )),
            };
            match scalar {
                Some(scalar) => {
                    debug!(%curve, attempt, "generated key pair");
                    return Ok(KeyPair::from_scalar(curve, scalar));
                }
                None => trace!(attempt, "rejected scalar outside [1, n - 1]"),
            }
        }
        warn!(%curve, attempts = MAX_ATTEMPTS, "exhausted scalar candidates");
        Err(Error::KeyGenerationFailure(MAX_ATTEMPTS))
    }
}
