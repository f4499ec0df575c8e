//! Tagged storage of key material.
//!
//! [KeyStore] is the sole owner of private scalars. It maps caller-chosen [KeyTag]s to
//! [StoredKey] records held by a [Backing], which may be in-memory ([Memory]) or
//! persistent ([directory::Directory]).
//!
//! # Concurrency
//!
//! The backing sits behind a read-write lock: [KeyStore::generate_and_store],
//! [KeyStore::import], and [KeyStore::delete] take the write side, so each mutation is a
//! single atomic transition (either every record of an operation is stored, or none is).
//! Lookups take the read side and return an [Arc] to the record, so signing proceeds
//! without holding the lock.
//!
//! # Deletion
//!
//! [KeyStore::delete] is idempotent: deleting a tag that does not exist is not an error.
//! The private scalar of a deleted record is zeroized once the last in-flight user of the
//! record drops it.

use crate::{
    generator::KeyGenerator,
    keys::{Curve, EncodedPublicKey, KeyPair, PRIVATE_KEY_LENGTH},
    secret::Secret,
    Error,
};
use core::fmt::{Display, Formatter};
use p256::ecdsa::SigningKey;
use rand::{rngs::OsRng, CryptoRng, RngCore};
use std::{
    io,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::{debug, error, trace, warn};

pub mod directory;
mod memory;
pub use memory::Memory;

/// Maximum length of a [KeyTag] in bytes.
pub const MAX_TAG_LENGTH: usize = 1024;

/// Opaque, caller-chosen name of a stored key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyTag(String);

impl KeyTag {
    /// Create a tag, rejecting empty and oversized names.
    pub fn new(tag: impl Into<String>) -> Result<Self, Error> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(Error::InvalidTag("empty"));
        }
        if tag.len() > MAX_TAG_LENGTH {
            return Err(Error::InvalidTag("too long"));
        }
        Ok(Self(tag))
    }

    /// The tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for KeyTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for KeyTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for KeyTag {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Which halves of a key pair a record exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// The private half of a generated pair. Its public counterpart is stored under a
    /// separate tag, but the point is derived here too so the record can verify.
    Private,
    /// A public point only.
    Public,
    /// A full pair stored under one tag.
    Both,
}

impl Visibility {
    /// Whether records with this visibility hold a private scalar.
    pub const fn has_private(&self) -> bool {
        matches!(self, Self::Private | Self::Both)
    }

    pub(crate) const fn to_u8(self) -> u8 {
        match self {
            Self::Private => 0,
            Self::Public => 1,
            Self::Both => 2,
        }
    }

    pub(crate) const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Private),
            1 => Some(Self::Public),
            2 => Some(Self::Both),
            _ => None,
        }
    }
}

/// A record held by a [KeyStore].
#[derive(Debug)]
pub struct StoredKey {
    tag: KeyTag,
    visibility: Visibility,
    secret: Option<Secret<[u8; PRIVATE_KEY_LENGTH]>>,
    public: EncodedPublicKey,
}

impl StoredKey {
    fn from_pair(tag: KeyTag, pair: KeyPair, visibility: Visibility) -> Self {
        let (secret, public) = pair.into_parts();
        Self {
            tag,
            visibility,
            secret: Some(secret),
            public,
        }
    }

    fn from_public(tag: KeyTag, public: EncodedPublicKey) -> Self {
        Self {
            tag,
            visibility: Visibility::Public,
            secret: None,
            public,
        }
    }

    /// Rebuild a record read back from a persistent [Backing].
    ///
    /// Fails if the visibility disagrees with the presence of a scalar or if the stored
    /// point is not the one derived from the scalar.
    pub(crate) fn from_parts(
        tag: KeyTag,
        visibility: Visibility,
        secret: Option<Secret<[u8; PRIVATE_KEY_LENGTH]>>,
        public: EncodedPublicKey,
    ) -> Result<Self, Error> {
        match (&secret, visibility.has_private()) {
            (Some(secret), true) => {
                let pair = KeyPair::from_bytes(public.curve(), secret.expose())?;
                if pair.public_key() != &public {
                    return Err(Error::MalformedKeyEncoding("point does not match scalar"));
                }
            }
            (None, false) => {}
            _ => return Err(Error::MalformedKeyEncoding("visibility does not match record")),
        }
        Ok(Self {
            tag,
            visibility,
            secret,
            public,
        })
    }

    /// Tag of the record.
    pub fn tag(&self) -> &KeyTag {
        &self.tag
    }

    /// Visibility of the record.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Public point of the record (derived from the scalar for private records).
    pub fn public_key(&self) -> &EncodedPublicKey {
        &self.public
    }

    pub(crate) fn secret(&self) -> Option<&Secret<[u8; PRIVATE_KEY_LENGTH]>> {
        self.secret.as_ref()
    }

    /// Run `f` with a signing key built from the record's private scalar.
    ///
    /// The signing key lives only on the calling thread for the duration of `f` and is
    /// zeroized when it is dropped, including when `f` fails.
    pub(crate) fn with_signing_key<T>(
        &self,
        f: impl FnOnce(&SigningKey) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let secret = self
            .secret
            .as_ref()
            .ok_or_else(|| Error::NotAPrivateKey(self.tag.clone()))?;
        let key = SigningKey::from_slice(secret.expose()).map_err(Error::SigningFailure)?;
        f(&key)
    }
}

/// Storage behind a [KeyStore].
///
/// Implementations need not be internally synchronized: the [KeyStore] serializes every
/// mutation and only shares `&self` between concurrent readers. Persistent implementations
/// report I/O failures as [Error::KeyStoreUnavailable].
pub trait Backing: Send + Sync + 'static {
    /// Fetch the record stored under `tag`.
    fn load(&self, tag: &KeyTag) -> Result<Option<Arc<StoredKey>>, Error>;

    /// Whether a record is stored under `tag`.
    fn contains(&self, tag: &KeyTag) -> Result<bool, Error> {
        Ok(self.load(tag)?.is_some())
    }

    /// Store `record`, replacing any record with the same tag.
    fn insert(&mut self, record: StoredKey) -> Result<(), Error>;

    /// Remove the record stored under `tag`, returning whether one existed.
    fn remove(&mut self, tag: &KeyTag) -> Result<bool, Error>;

    /// All stored tags, in no particular order.
    fn tags(&self) -> Result<Vec<KeyTag>, Error>;
}

/// Owner of all key material, keyed by [KeyTag].
pub struct KeyStore<B: Backing = Memory, R = OsRng> {
    backing: RwLock<B>,
    generator: KeyGenerator<R>,
    curve: Curve,
}

impl<B: Backing> KeyStore<B, OsRng> {
    /// Create a store over `backing` that generates P-256 keys from the operating system's RNG.
    pub fn new(backing: B) -> Self {
        Self::with_generator(backing, KeyGenerator::new())
    }
}

impl<B: Backing, R: RngCore + CryptoRng + Send> KeyStore<B, R> {
    /// Create a store over `backing` that generates P-256 keys with `generator`.
    pub fn with_generator(backing: B, generator: KeyGenerator<R>) -> Self {
        Self {
            backing: RwLock::new(backing),
            generator,
            curve: Curve::P256,
        }
    }

    /// Curve of every key generated by this store.
    pub fn curve(&self) -> Curve {
        self.curve
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, B>, Error> {
        self.backing
            .read()
            .map_err(|_| Error::KeyStoreUnavailable(io::Error::other("lock poisoned")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, B>, Error> {
        self.backing
            .write()
            .map_err(|_| Error::KeyStoreUnavailable(io::Error::other("lock poisoned")))
    }

    /// Generate a key pair, storing the private half under `private_tag` and a public-only
    /// record under `public_tag`.
    ///
    /// Fails with [Error::TagCollision] (leaving existing records untouched) if either tag is
    /// already in use or if both tags are equal.
    pub fn generate_and_store(
        &self,
        private_tag: &str,
        public_tag: &str,
    ) -> Result<(KeyTag, KeyTag), Error> {
        let private_tag = KeyTag::new(private_tag)?;
        let public_tag = KeyTag::new(public_tag)?;
        if private_tag == public_tag {
            return Err(Error::TagCollision(public_tag));
        }

        let mut backing = self.write()?;
        for tag in [&private_tag, &public_tag] {
            if backing.contains(tag)? {
                warn!(%tag, "tag already in use");
                return Err(Error::TagCollision(tag.clone()));
            }
        }

        let pair = self.generator.generate(self.curve)?;
        let public = pair.public_key().clone();
        backing.insert(StoredKey::from_pair(
            private_tag.clone(),
            pair,
            Visibility::Private,
        ))?;
        if let Err(err) = backing.insert(StoredKey::from_public(public_tag.clone(), public)) {
            warn!(%private_tag, %public_tag, ?err, "failed to store public key, rolling back");
            if let Err(rollback) = backing.remove(&private_tag) {
                error!(%private_tag, err = ?rollback, "failed to roll back private key");
            }
            return Err(err);
        }
        debug!(%private_tag, %public_tag, curve = %self.curve, "stored key pair");
        Ok((private_tag, public_tag))
    }

    /// Store an existing private scalar (and its derived point) under a single tag.
    pub fn import(&self, tag: &str, private_key: &[u8]) -> Result<EncodedPublicKey, Error> {
        let tag = KeyTag::new(tag)?;
        let pair = KeyPair::from_bytes(self.curve, private_key)?;
        let public = pair.public_key().clone();

        let mut backing = self.write()?;
        if backing.contains(&tag)? {
            warn!(%tag, "tag already in use");
            return Err(Error::TagCollision(tag));
        }
        backing.insert(StoredKey::from_pair(tag.clone(), pair, Visibility::Both))?;
        debug!(%tag, "imported key pair");
        Ok(public)
    }

    /// Fetch the record stored under `tag`.
    pub fn load(&self, tag: &str) -> Result<Arc<StoredKey>, Error> {
        let tag = KeyTag::new(tag)?;
        let record = self.read()?.load(&tag)?;
        match record {
            Some(record) => {
                trace!(%tag, visibility = ?record.visibility(), "loaded key");
                Ok(record)
            }
            None => Err(Error::TagNotFound(tag)),
        }
    }

    /// Fetch both halves of a generated pair, checking that they belong together.
    pub fn load_pair(
        &self,
        private_tag: &str,
        public_tag: &str,
    ) -> Result<(Arc<StoredKey>, Arc<StoredKey>), Error> {
        let private = self.load(private_tag)?;
        if !private.visibility().has_private() {
            return Err(Error::NotAPrivateKey(private.tag().clone()));
        }
        let public = self.load(public_tag)?;
        if private.public_key() != public.public_key() {
            warn!(private_tag, public_tag, "public key does not match private key");
            return Err(Error::PairMismatch {
                private: private.tag().clone(),
                public: public.tag().clone(),
            });
        }
        Ok((private, public))
    }

    /// Public key of the record stored under `tag`.
    pub fn public_key(&self, tag: &str) -> Result<EncodedPublicKey, Error> {
        Ok(self.load(tag)?.public_key().clone())
    }

    /// Whether a record is stored under `tag`.
    pub fn contains(&self, tag: &str) -> Result<bool, Error> {
        let tag = KeyTag::new(tag)?;
        self.read()?.contains(&tag)
    }

    /// Remove the record stored under `tag`.
    ///
    /// Returns whether a record was removed; an absent tag is not an error.
    pub fn delete(&self, tag: &str) -> Result<bool, Error> {
        let tag = KeyTag::new(tag)?;
        let removed = self.write()?.remove(&tag)?;
        if removed {
            debug!(%tag, "deleted key");
        } else {
            trace!(%tag, "delete of absent key");
        }
        Ok(removed)
    }

    /// All stored tags, sorted.
    pub fn tags(&self) -> Result<Vec<KeyTag>, Error> {
        let mut tags = self.read()?.tags()?;
        tags.sort();
        Ok(tags)
    }
}
