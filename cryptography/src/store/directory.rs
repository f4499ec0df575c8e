//! A [Backing] that persists sealed records in a directory.
//!
//! Each record is written to its own file, named by the hex SHA-256 of its tag so that tags
//! never appear on disk. The file holds a fresh random nonce followed by the record sealed
//! with ChaCha20-Poly1305 under a caller-supplied key, with the file stem as associated data
//! (moving a record to another name fails authentication).
//!
//! # Record Format
//!
//! ```text
//! +---------+------------+---------+-----+------------------+----------------------+
//! | version | visibility | tag_len | tag | scalar (32, opt) | compressed point (33)|
//! +---------+------------+---------+-----+------------------+----------------------+
//!     u8         u8        u32 BE
//! ```
//!
//! The scalar is present unless the record is public-only. Files are replaced atomically
//! (write to a temporary file, sync, rename).

use super::{Backing, KeyTag, StoredKey, Visibility, MAX_TAG_LENGTH};
use crate::{
    keys::{EncodedPublicKey, PointFormat, COMPRESSED_PUBLIC_KEY_LENGTH, PRIVATE_KEY_LENGTH},
    secret::Secret,
    sha256, utils, Error,
};
use bytes::{Buf, BufMut};
use chacha20poly1305::{
    aead::{Aead, Payload},
    ChaCha20Poly1305, Key, KeyInit, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Version of the record format.
const VERSION: u8 = 1;

/// Extension of sealed record files.
const RECORD_EXTENSION: &str = "key";

/// Extension of records that are still being written.
const TMP_EXTENSION: &str = "tmp";

const NONCE_LENGTH: usize = 12;

/// Configuration for [Directory].
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory records are stored in. Created if missing.
    pub path: PathBuf,

    /// Key used to seal every record.
    pub sealing_key: Secret<[u8; 32]>,
}

/// A [Backing] that stores each record as a sealed file under a directory.
pub struct Directory {
    path: PathBuf,
    cipher: ChaCha20Poly1305,
}

impl Directory {
    /// Open (creating if necessary) the directory described by `cfg`.
    pub fn init(cfg: Config) -> Result<Self, Error> {
        fs::create_dir_all(&cfg.path)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&cfg.sealing_key.expose()[..]));
        debug!(path = %cfg.path.display(), "opened key directory");
        Ok(Self {
            path: cfg.path,
            cipher,
        })
    }

    fn stem(tag: &KeyTag) -> String {
        utils::hex(&sha256::hash(tag.as_str().as_bytes()))
    }

    fn record_path(&self, stem: &str) -> PathBuf {
        self.path.join(stem).with_extension(RECORD_EXTENSION)
    }

    fn seal(&self, stem: &str, record: &StoredKey) -> Result<Vec<u8>, Error> {
        let tag = record.tag().as_str().as_bytes();
        let mut plaintext = Zeroizing::new(Vec::with_capacity(
            2 + 4 + tag.len() + PRIVATE_KEY_LENGTH + COMPRESSED_PUBLIC_KEY_LENGTH,
        ));
        plaintext.put_u8(VERSION);
        plaintext.put_u8(record.visibility().to_u8());
        plaintext.put_u32(tag.len() as u32);
        plaintext.put_slice(tag);
        if let Some(secret) = record.secret() {
            plaintext.put_slice(secret.expose());
        }
        plaintext.put_slice(&record.public_key().to_bytes(PointFormat::Compressed));

        let mut nonce = [0u8; NONCE_LENGTH];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(Error::InsufficientEntropy)?;
        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &plaintext,
                    aad: stem.as_bytes(),
                },
            )
            .map_err(|_| invalid_data("failed to seal record"))?;

        let mut sealed = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn open(&self, stem: &str, sealed: &[u8]) -> Result<StoredKey, Error> {
        if sealed.len() < NONCE_LENGTH {
            return Err(invalid_data("record truncated"));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LENGTH);
        let plaintext = Zeroizing::new(
            self.cipher
                .decrypt(
                    Nonce::from_slice(nonce),
                    Payload {
                        msg: ciphertext,
                        aad: stem.as_bytes(),
                    },
                )
                .map_err(|_| invalid_data("record failed authentication"))?,
        );

        let mut buf = &plaintext[..];
        if buf.remaining() < 2 + 4 {
            return Err(invalid_data("record truncated"));
        }
        if buf.get_u8() != VERSION {
            return Err(invalid_data("unsupported record version"));
        }
        let visibility =
            Visibility::from_u8(buf.get_u8()).ok_or_else(|| invalid_data("invalid visibility"))?;
        let tag_len = buf.get_u32() as usize;
        if tag_len > MAX_TAG_LENGTH || buf.remaining() < tag_len {
            return Err(invalid_data("invalid tag length"));
        }
        let tag = String::from_utf8(buf[..tag_len].to_vec())
            .map_err(|_| invalid_data("tag is not utf-8"))?;
        buf.advance(tag_len);
        let tag = KeyTag::new(tag)?;
        if Self::stem(&tag) != stem {
            return Err(invalid_data("record stored under wrong name"));
        }

        let expected = if visibility.has_private() {
            PRIVATE_KEY_LENGTH + COMPRESSED_PUBLIC_KEY_LENGTH
        } else {
            COMPRESSED_PUBLIC_KEY_LENGTH
        };
        if buf.remaining() != expected {
            return Err(invalid_data("unexpected record length"));
        }
        let secret = if visibility.has_private() {
            let mut scalar = Zeroizing::new([0u8; PRIVATE_KEY_LENGTH]);
            buf.copy_to_slice(&mut scalar[..]);
            Some(Secret::new(*scalar))
        } else {
            None
        };
        let public = EncodedPublicKey::from_sec1(buf)?;
        StoredKey::from_parts(tag, visibility, secret, public)
    }

    fn read(&self, stem: &str) -> Result<Option<StoredKey>, Error> {
        let sealed = match fs::read(self.record_path(stem)) {
            Ok(sealed) => sealed,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match self.open(stem, &sealed) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                warn!(stem, ?err, "failed to open record");
                Err(err)
            }
        }
    }

    /// Replace the record named `stem`. A failed write leaves no temporary file behind.
    fn write(&self, stem: &str, sealed: &[u8]) -> io::Result<()> {
        let path = self.record_path(stem);
        let tmp = path.with_extension(TMP_EXTENSION);
        let result = Self::write_tmp(&tmp, sealed).and_then(|()| fs::rename(&tmp, &path));
        if let Err(err) = &result {
            warn!(stem, ?err, "failed to write record");
            if let Err(err) = fs::remove_file(&tmp) {
                if err.kind() != io::ErrorKind::NotFound {
                    warn!(stem, ?err, "failed to remove temporary file");
                }
            }
        }
        result
    }

    fn write_tmp(tmp: &Path, sealed: &[u8]) -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(tmp)?;
        file.write_all(sealed)?;
        file.sync_all()
    }
}

fn invalid_data(msg: &'static str) -> Error {
    Error::KeyStoreUnavailable(io::Error::new(io::ErrorKind::InvalidData, msg))
}

fn is_record(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION)
}

impl Backing for Directory {
    fn load(&self, tag: &KeyTag) -> Result<Option<Arc<StoredKey>>, Error> {
        Ok(self.read(&Self::stem(tag))?.map(Arc::new))
    }

    fn contains(&self, tag: &KeyTag) -> Result<bool, Error> {
        Ok(self.record_path(&Self::stem(tag)).try_exists()?)
    }

    fn insert(&mut self, record: StoredKey) -> Result<(), Error> {
        let stem = Self::stem(record.tag());
        let sealed = self.seal(&stem, &record)?;
        self.write(&stem, &sealed)?;
        debug!(tag = %record.tag(), stem, "wrote record");
        Ok(())
    }

    fn remove(&mut self, tag: &KeyTag) -> Result<bool, Error> {
        match fs::remove_file(self.record_path(&Self::stem(tag))) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Tags of every readable record.
    ///
    /// Records that cannot be read or fail to unseal (wrong key, corruption) are skipped
    /// with a warning so one bad file does not hide the rest. Loading such a tag directly
    /// still returns the error.
    fn tags(&self) -> Result<Vec<KeyTag>, Error> {
        let mut tags = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            if !is_record(&path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match self.read(stem) {
                Ok(Some(record)) => tags.push(record.tag().clone()),
                Ok(None) => {}
                Err(err) => warn!(stem, ?err, "skipping unreadable record"),
            }
        }
        Ok(tags)
    }
}
