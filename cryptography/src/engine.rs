//! Sign with stored keys and verify ECDSA signatures.
//!
//! A [SignatureEngine] holds a shared handle to a [KeyStore] and no key material of its own.
//! Signing fetches the private record for a tag, builds a signing key for the duration of a
//! single call, and discards it. Verification needs no private material and can run against
//! a stored public key or any caller-supplied [EncodedPublicKey].
//!
//! Signing is deterministic: the same key, message, and hash algorithm always produce the
//! same [Signature]. Verification is total: any well-formed signature yields `true` or
//! `false`, and only structurally malformed input is an error.

use crate::{
    keys::EncodedPublicKey,
    sha256::HashAlgorithm,
    signature::Signature,
    store::{Backing, KeyStore, Memory},
    utils, Error,
};
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use std::sync::Arc;
use tracing::{debug, trace};

/// Signs and verifies on behalf of a shared [KeyStore].
pub struct SignatureEngine<B: Backing = Memory, R = OsRng> {
    store: Arc<KeyStore<B, R>>,
    hash: HashAlgorithm,
}

impl<B: Backing, R> Clone for SignatureEngine<B, R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            hash: self.hash,
        }
    }
}

impl<B: Backing, R: RngCore + CryptoRng + Send> SignatureEngine<B, R> {
    /// Create an engine over `store` that hashes messages with SHA-256.
    pub fn new(store: Arc<KeyStore<B, R>>) -> Self {
        Self {
            store,
            hash: HashAlgorithm::Sha256,
        }
    }

    /// The store this engine signs from.
    pub fn store(&self) -> &Arc<KeyStore<B, R>> {
        &self.store
    }

    /// Hash algorithm applied to messages before signing and verifying.
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash
    }

    /// Sign `message` with the private key stored under `tag`.
    ///
    /// Fails with [Error::TagNotFound] if nothing is stored under `tag` and with
    /// [Error::NotAPrivateKey] if the record is public-only.
    pub fn sign(&self, tag: &str, message: &[u8]) -> Result<Signature, Error> {
        let digest = self.hash.digest(message);
        self.sign_prehashed(tag, &digest)
    }

    /// Sign a hex encoded digest that was computed by the caller with [Self::hash_algorithm].
    pub fn sign_digest(&self, tag: &str, digest: &str) -> Result<Signature, Error> {
        let digest = self.decode_digest(digest)?;
        self.sign_prehashed(tag, &digest)
    }

    fn sign_prehashed(&self, tag: &str, digest: &[u8]) -> Result<Signature, Error> {
        let record = self.store.load(tag)?;
        let signature = record.with_signing_key(|key| {
            PrehashSigner::<p256::ecdsa::Signature>::sign_prehash(key, digest)
                .map_err(Error::SigningFailure)
        })?;
        debug!(tag, hash = %self.hash, "signed message");
        Ok(Signature::from_ecdsa(signature, self.hash))
    }

    fn decode_digest(&self, digest: &str) -> Result<Vec<u8>, Error> {
        let digest =
            utils::from_hex_formatted(digest).ok_or(Error::MalformedDigest("invalid hex"))?;
        if digest.len() != self.hash.output_len() {
            return Err(Error::MalformedDigest("unexpected digest length"));
        }
        Ok(digest)
    }

    /// Decode a hex encoded SEC 1 public key (compressed or uncompressed).
    pub fn decode_public_key(&self, public_key: &str) -> Result<EncodedPublicKey, Error> {
        EncodedPublicKey::from_hex(public_key)
    }

    /// Verify a hex encoded signature over `message` against `public_key`.
    ///
    /// Returns `Ok(false)` for any well-formed signature that does not verify (including
    /// scalars out of range) and [Error::MalformedSignatureEncoding] if the signature cannot
    /// be decoded. Both `(r, s)` and `(r, n - s)` are accepted.
    pub fn verify(
        &self,
        public_key: &EncodedPublicKey,
        message: &[u8],
        signature: &str,
    ) -> Result<bool, Error> {
        let signature = Signature::from_hex(signature)?;
        Ok(self.verify_signature(public_key, message, &signature))
    }

    /// Verify a hex encoded signature over `message` against the public key stored under `tag`.
    pub fn verify_with_tag(&self, tag: &str, message: &[u8], signature: &str) -> Result<bool, Error> {
        let public_key = self.store.public_key(tag)?;
        self.verify(&public_key, message, signature)
    }

    /// Verify a hex encoded signature over a hex encoded digest.
    pub fn verify_digest(
        &self,
        public_key: &EncodedPublicKey,
        digest: &str,
        signature: &str,
    ) -> Result<bool, Error> {
        let digest = self.decode_digest(digest)?;
        let signature = Signature::from_hex(signature)?;
        Ok(self.verify_prehashed(public_key, &digest, &signature))
    }

    /// Verify a decoded [Signature] over `message` against `public_key`.
    pub fn verify_signature(
        &self,
        public_key: &EncodedPublicKey,
        message: &[u8],
        signature: &Signature,
    ) -> bool {
        if signature.hash_algorithm() != self.hash {
            return false;
        }
        let digest = self.hash.digest(message);
        self.verify_prehashed(public_key, &digest, signature)
    }

    fn verify_prehashed(
        &self,
        public_key: &EncodedPublicKey,
        digest: &[u8],
        signature: &Signature,
    ) -> bool {
        let Some(signature) = signature.to_ecdsa() else {
            trace!("signature scalars out of range");
            return false;
        };
        let valid = public_key
            .verifying_key()
            .verify_prehash(digest, &signature)
            .is_ok();
        trace!(valid, "verified signature");
        valid
    }
}
