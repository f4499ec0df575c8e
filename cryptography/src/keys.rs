//! Curve identifiers, key pairs, and validated public keys.
//!
//! Public keys use the SEC 1 (Version 2.0, Section 2.3.3) point encodings. Decoding always
//! checks the tag byte, the coordinate range, the curve equation, and rejects the identity,
//! so an [EncodedPublicKey] can never hold an invalid-curve point.

use crate::{secret::Secret, utils, Error};
use core::fmt::{Debug, Display, Formatter};
use p256::{
    ecdsa::{SigningKey, VerifyingKey},
    elliptic_curve::{sec1::FromEncodedPoint, PrimeField},
    AffinePoint, EncodedPoint, FieldBytes, NonZeroScalar,
};
use zeroize::{Zeroize, Zeroizing};

/// Length of a serialized private scalar.
pub const PRIVATE_KEY_LENGTH: usize = 32;

/// Length of a compressed public key.
pub const COMPRESSED_PUBLIC_KEY_LENGTH: usize = 33; // Y-Parity || X

/// Length of an uncompressed public key.
pub const UNCOMPRESSED_PUBLIC_KEY_LENGTH: usize = 65; // 0x04 || X || Y

/// Elliptic curve a key lives on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Curve {
    /// NIST P-256 (secp256r1).
    #[default]
    P256,
}

impl Display for Curve {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::P256 => f.write_str("P-256"),
        }
    }
}

/// SEC 1 point encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PointFormat {
    #[default]
    Compressed,
    Uncompressed,
}

/// A public key that has been validated as a point on its curve.
#[derive(Clone)]
pub struct EncodedPublicKey {
    curve: Curve,
    key: VerifyingKey,
}

impl EncodedPublicKey {
    /// Decode a SEC 1 encoded point (compressed or uncompressed).
    pub fn from_sec1(bytes: &[u8]) -> Result<Self, Error> {
        match (bytes.len(), bytes.first()) {
            (COMPRESSED_PUBLIC_KEY_LENGTH, Some(0x02 | 0x03)) => {}
            (UNCOMPRESSED_PUBLIC_KEY_LENGTH, Some(0x04)) => {}
            (COMPRESSED_PUBLIC_KEY_LENGTH | UNCOMPRESSED_PUBLIC_KEY_LENGTH, _) => {
                return Err(Error::MalformedKeyEncoding("unexpected point tag"));
            }
            _ => return Err(Error::MalformedKeyEncoding("unexpected point length")),
        }
        let point = EncodedPoint::from_bytes(bytes)
            .map_err(|_| Error::MalformedKeyEncoding("invalid point encoding"))?;

        // Rejects coordinates outside the field and points off the curve
        let affine: Option<AffinePoint> = AffinePoint::from_encoded_point(&point).into();
        let affine = affine.ok_or(Error::MalformedKeyEncoding("point not on curve"))?;
        let key = VerifyingKey::from_affine(affine)
            .map_err(|_| Error::MalformedKeyEncoding("identity point"))?;
        Ok(Self {
            curve: Curve::P256,
            key,
        })
    }

    /// Decode a hex encoded SEC 1 point.
    pub fn from_hex(hex: &str) -> Result<Self, Error> {
        let bytes = utils::from_hex_formatted(hex)
            .ok_or(Error::MalformedKeyEncoding("invalid hex"))?;
        Self::from_sec1(&bytes)
    }

    /// Curve of the key.
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// Serialize the point in the given format.
    pub fn to_bytes(&self, format: PointFormat) -> Vec<u8> {
        let compress = format == PointFormat::Compressed;
        self.key.to_encoded_point(compress).as_bytes().to_vec()
    }

    /// Serialize the point in the given format as lowercase hex.
    pub fn to_hex(&self, format: PointFormat) -> String {
        utils::hex(&self.to_bytes(format))
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.key
    }
}

impl PartialEq for EncodedPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.curve == other.curve
            && self.key.to_encoded_point(true) == other.key.to_encoded_point(true)
    }
}

impl Eq for EncodedPublicKey {}

impl Debug for EncodedPublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "EncodedPublicKey({})", self)
    }
}

impl Display for EncodedPublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.to_hex(PointFormat::Compressed))
    }
}

/// An elliptic-curve key pair.
///
/// Both halves are always derived together: the only constructors take a private scalar and
/// compute the public point from it.
#[derive(Debug)]
pub struct KeyPair {
    curve: Curve,
    secret: Secret<[u8; PRIVATE_KEY_LENGTH]>,
    public: EncodedPublicKey,
}

impl KeyPair {
    pub(crate) fn from_scalar(curve: Curve, scalar: NonZeroScalar) -> Self {
        let bytes = scalar_bytes(&scalar);
        let signer = SigningKey::from(scalar);
        let public = EncodedPublicKey {
            curve,
            key: signer.verifying_key().to_owned(),
        };
        Self {
            curve,
            secret: Secret::new(*bytes),
            public,
        }
    }

    /// Rebuild a key pair from a big-endian private scalar.
    ///
    /// The scalar must lie in `[1, n - 1]`.
    pub fn from_bytes(curve: Curve, private_key: &[u8]) -> Result<Self, Error> {
        if private_key.len() != PRIVATE_KEY_LENGTH {
            return Err(Error::MalformedKeyEncoding("unexpected private key length"));
        }
        let scalar: Option<NonZeroScalar> =
            NonZeroScalar::from_repr(*FieldBytes::from_slice(private_key)).into();
        let scalar = scalar.ok_or(Error::MalformedKeyEncoding("private scalar out of range"))?;
        Ok(Self::from_scalar(curve, scalar))
    }

    /// Curve of the pair.
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// Public half of the pair.
    pub fn public_key(&self) -> &EncodedPublicKey {
        &self.public
    }

    pub(crate) fn into_parts(self) -> (Secret<[u8; PRIVATE_KEY_LENGTH]>, EncodedPublicKey) {
        (self.secret, self.public)
    }
}

/// Big-endian bytes of `scalar`, with the intermediate representation wiped.
fn scalar_bytes(scalar: &NonZeroScalar) -> Zeroizing<[u8; PRIVATE_KEY_LENGTH]> {
    let mut bytes = Zeroizing::new([0u8; PRIVATE_KEY_LENGTH]);
    let mut repr = scalar.to_repr();
    bytes.copy_from_slice(&repr);
    repr[..].zeroize();
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uncompressed(qx: &str, qy: &str) -> String {
        format!("04{}{}", qx, qy)
    }

    #[test]
    fn test_keypairs() {
        // FIPS 186-4 key pair vectors
        let cases = [
            (
                "c9806898a0334916c860748880a541f093b579a9b1f32934d86c363c39800357",
                "d0720dc691aa80096ba32fed1cb97c2b620690d06de0317b8618d5ce65eb728f",
                "9681b517b1cda17d0d83d335d9c4a8a9a9b0b1b3c7106d8f3c72bc5093dc275f",
            ),
            (
                "710735c8388f48c684a97bd66751cc5f5a122d6b9a96a2dbe73662f78217446d",
                "f6836a8add91cb182d8d258dda6680690eb724a66dc3bb60d2322565c39e4ab9",
                "1f837aa32864870cb8e8d0ac2ff31f824e7beddc4bb7ad72c173ad974b289dc2",
            ),
            (
                "01b965b45ff386f28c121c077f1d7b2710acc6b0cb58d8662d549391dcf5a883",
                "1f038c5422e88eec9e88b815e8f6b3e50852333fc423134348fc7d79ef8e8a10",
                "43a047cb20e94b4ffb361ef68952b004c0700b2962e0c0635a70269bc789b849",
            ),
            (
                "d40b07b1ea7b86d4709ef9dc634c61229feb71abd63dc7fc85ef46711a87b210",
                "fbcea7c2827e0e8085d7707b23a3728823ea6f4878b24747fb4fd2842d406c73",
                "2393c85f1f710c5afc115a39ba7e18abe03f19c9d4bb3d47d19468b818efa535",
            ),
        ];

        for (index, (private_key, qx, qy)) in cases.into_iter().enumerate() {
            let private_key = utils::from_hex(private_key).unwrap();
            let pair = KeyPair::from_bytes(Curve::P256, &private_key).unwrap();
            assert_eq!(
                pair.public_key().to_hex(PointFormat::Uncompressed),
                uncompressed(qx, qy),
                "vector_keypair_{}",
                index + 1
            );

            // The compressed form decodes to the same point
            let compressed = pair.public_key().to_bytes(PointFormat::Compressed);
            assert_eq!(compressed.len(), COMPRESSED_PUBLIC_KEY_LENGTH);
            assert_eq!(&compressed[1..], &utils::from_hex(qx).unwrap()[..]);
            let decoded = EncodedPublicKey::from_sec1(&compressed).unwrap();
            assert_eq!(&decoded, pair.public_key());
        }
    }

    #[test]
    fn test_public_key_validation() {
        // FIPS 186-4 public key validation vectors (uncompressed form)
        let cases = [
            (
                "e0f7449c5588f24492c338f2bc8f7865f755b958d48edb0f2d0056e50c3fd5b7",
                "86d7e9255d0f4b6f44fa2cd6f8ba3c0aa828321d6d8cc430ca6284ce1d5b43a0",
                true,
            ),
            (
                "17875397ae87369365656d490e8ce956911bd97607f2aff41b56f6f3a61989826",
                "980a3c4f61b9692633fbba5ef04c9cb546dd05cdec9fa8428b8849670e2fba92",
                false, // x out of range
            ),
            (
                "f2d1c0dc0852c3d8a2a2500a23a44813ccce1ac4e58444175b440469ffc12273",
                "32bfe992831b305d8c37b9672df5d29fcb5c29b4a40534683e3ace23d24647dd",
                false, // point not on the curve
            ),
            (
                "2c1052f25360a15062d204a056274e93cbe8fc4c4e9b9561134ad5c15ce525da",
                "ced9783713a8a2a09eff366987639c625753295d9a85d0f5325e32dedbcada0b",
                true,
            ),
            (
                "a40d077a87dae157d93dcccf3fe3aca9c6479a75aa2669509d2ef05c7de6782f",
                "503d86b87d743ba20804fd7e7884aa017414a7b5b5963e0d46e3a9611419ddf3",
                false, // point not on the curve
            ),
            (
                "2633d398a3807b1895548adbb0ea2495ef4b930f91054891030817df87d4ac0a",
                "d6b2f738e3873cc8364a2d364038ce7d0798bb092e3dd77cbdae7c263ba618d2",
                true,
            ),
            (
                "2fa74931ae816b426f484180e517f5050c92decfc8daf756cd91f54d51b302f1",
                "5b994346137988c58c14ae2152ac2f6ad96d97decb33099bd8a0210114cd1141",
                true,
            ),
            (
                "7a81a7e0b015252928d8b36e4ca37e92fdc328eb25c774b4f872693028c4be38",
                "08862f7335147261e7b1c3d055f9a316e4cab7daf99cc09d1c647f5dd6e7d5bb",
                false, // point not on the curve
            ),
        ];

        for (index, (qx, qy, exp_valid)) in cases.into_iter().enumerate() {
            let result = EncodedPublicKey::from_hex(&uncompressed(qx, qy));
            assert_eq!(
                exp_valid,
                result.is_ok(),
                "vector_public_key_validation_{}",
                index + 1
            );
            if !exp_valid {
                assert!(matches!(result, Err(Error::MalformedKeyEncoding(_))));
            }
        }
    }

    #[test]
    fn test_public_key_wrong_length() {
        let pair = KeyPair::from_bytes(Curve::P256, &[0x11; PRIVATE_KEY_LENGTH]).unwrap();
        let mut bytes = pair.public_key().to_bytes(PointFormat::Compressed);

        // Too long
        bytes.push(0x01);
        assert!(matches!(
            EncodedPublicKey::from_sec1(&bytes),
            Err(Error::MalformedKeyEncoding("unexpected point length"))
        ));

        // Too short
        bytes.truncate(COMPRESSED_PUBLIC_KEY_LENGTH - 1);
        assert!(matches!(
            EncodedPublicKey::from_sec1(&bytes),
            Err(Error::MalformedKeyEncoding("unexpected point length"))
        ));

        // Empty
        assert!(matches!(
            EncodedPublicKey::from_hex(""),
            Err(Error::MalformedKeyEncoding("unexpected point length"))
        ));
    }

    #[test]
    fn test_public_key_wrong_tag() {
        let pair = KeyPair::from_bytes(Curve::P256, &[0x22; PRIVATE_KEY_LENGTH]).unwrap();

        let mut compressed = pair.public_key().to_bytes(PointFormat::Compressed);
        compressed[0] = 0x04;
        assert!(matches!(
            EncodedPublicKey::from_sec1(&compressed),
            Err(Error::MalformedKeyEncoding("unexpected point tag"))
        ));

        let mut uncompressed = pair.public_key().to_bytes(PointFormat::Uncompressed);
        uncompressed[0] = 0x02;
        assert!(matches!(
            EncodedPublicKey::from_sec1(&uncompressed),
            Err(Error::MalformedKeyEncoding("unexpected point tag"))
        ));
    }

    #[test]
    fn test_public_key_off_curve() {
        let pair = KeyPair::from_bytes(Curve::P256, &[0x33; PRIVATE_KEY_LENGTH]).unwrap();
        let mut bytes = pair.public_key().to_bytes(PointFormat::Uncompressed);
        bytes[UNCOMPRESSED_PUBLIC_KEY_LENGTH - 1] ^= 0x01;
        assert!(matches!(
            EncodedPublicKey::from_sec1(&bytes),
            Err(Error::MalformedKeyEncoding("point not on curve"))
        ));
    }

    #[test]
    fn test_public_key_invalid_hex() {
        assert!(matches!(
            EncodedPublicKey::from_hex("02zz"),
            Err(Error::MalformedKeyEncoding("invalid hex"))
        ));
    }

    #[test]
    fn test_public_key_hex_formats() {
        let pair = KeyPair::from_bytes(Curve::P256, &[0x44; PRIVATE_KEY_LENGTH]).unwrap();
        let public_key = pair.public_key();
        for format in [PointFormat::Compressed, PointFormat::Uncompressed] {
            let hex = public_key.to_hex(format);
            assert_eq!(&EncodedPublicKey::from_hex(&hex).unwrap(), public_key);
            let prefixed = format!("0x{}", hex.to_uppercase());
            assert_eq!(&EncodedPublicKey::from_hex(&prefixed).unwrap(), public_key);
        }
        assert_eq!(
            public_key.to_string(),
            public_key.to_hex(PointFormat::Compressed)
        );
    }

    #[test]
    fn test_private_key_out_of_range() {
        // Zero
        assert!(matches!(
            KeyPair::from_bytes(Curve::P256, &[0u8; PRIVATE_KEY_LENGTH]),
            Err(Error::MalformedKeyEncoding("private scalar out of range"))
        ));

        // Curve order
        let order = utils::from_hex(
            "ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551",
        )
        .unwrap();
        assert!(matches!(
            KeyPair::from_bytes(Curve::P256, &order),
            Err(Error::MalformedKeyEncoding("private scalar out of range"))
        ));

        // Wrong length
        assert!(matches!(
            KeyPair::from_bytes(Curve::P256, &[1u8; 31]),
            Err(Error::MalformedKeyEncoding("unexpected private key length"))
        ));
    }

    #[test]
    fn test_scalar_bytes() {
        let private_key =
            utils::from_hex("c9806898a0334916c860748880a541f093b579a9b1f32934d86c363c39800357")
                .unwrap();
        let scalar: Option<NonZeroScalar> =
            NonZeroScalar::from_repr(*FieldBytes::from_slice(&private_key)).into();
        let bytes = scalar_bytes(&scalar.unwrap());
        assert_eq!(&bytes[..], &private_key[..]);

        let (secret, _) = KeyPair::from_bytes(Curve::P256, &private_key)
            .unwrap()
            .into_parts();
        assert_eq!(&secret.expose()[..], &private_key[..]);
    }

    #[test]
    fn test_keypair_debug_redacted() {
        let private_key = [0x55; PRIVATE_KEY_LENGTH];
        let pair = KeyPair::from_bytes(Curve::P256, &private_key).unwrap();
        let debug = format!("{:?}", pair);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(&utils::hex(&private_key)));
    }
}
