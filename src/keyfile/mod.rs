//! Keyfile codec: the fixed 102-byte `.gkey` format.
//!
//! ```text
//! Offset  Size  Field
//! 0       5     Magic: b"GKEY!"
//! 5       1     Version: 0x01
//! 6       64    Key material (random)
//! 70      32    Fingerprint: SHA-256(key material)
//! ```

pub mod fingerprint;
pub mod store;

use zeroize::Zeroizing;

use crate::crypto::random_bytes;
use crate::error::{GhostError, Result};

/// Magic header bytes identifying a keyfile.
pub const KEYFILE_MAGIC: &[u8; 5] = b"GKEY!";

/// Only supported keyfile version.
pub const KEYFILE_VERSION: u8 = 0x01;

/// Length of the random key material.
pub const KEY_MATERIAL_LEN: usize = 64;

/// Length of the SHA-256 fingerprint.
pub const FINGERPRINT_LEN: usize = 32;

/// Serialized keyfile length.
pub const KEYFILE_LEN: usize = 6 + KEY_MATERIAL_LEN + FINGERPRINT_LEN;

const MATERIAL_OFFSET: usize = 6;
const FINGERPRINT_OFFSET: usize = MATERIAL_OFFSET + KEY_MATERIAL_LEN;

/// Raw keyfile secret, wiped on drop.
pub type KeyMaterial = Zeroizing<[u8; KEY_MATERIAL_LEN]>;

/// A parsed or freshly generated keyfile.
#[derive(Clone)]
pub struct Keyfile {
    material: KeyMaterial,
    fingerprint: [u8; FINGERPRINT_LEN],
}

impl Keyfile {
    /// Build a keyfile around existing material, computing its fingerprint.
    pub fn from_material(material: KeyMaterial) -> Self {
        let fingerprint = fingerprint::compute(&material);
        Keyfile {
            material,
            fingerprint,
        }
    }

    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    pub fn fingerprint(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.fingerprint
    }

    /// Serialize to the 102-byte on-disk layout.
    ///
    /// The buffer holds key material, so it is returned in a zeroizing wrapper.
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::with_capacity(KEYFILE_LEN));
        out.extend_from_slice(KEYFILE_MAGIC);
        out.push(KEYFILE_VERSION);
        out.extend_from_slice(&self.material[..]);
        out.extend_from_slice(&self.fingerprint);
        out
    }

    /// Check the stored fingerprint against the key material.
    ///
    /// This catches accidental corruption only; anyone can recompute a fingerprint.
    pub fn verify_fingerprint(&self) -> Result<()> {
        if fingerprint::compute(&self.material) == self.fingerprint {
            Ok(())
        } else {
            Err(GhostError::FingerprintMismatch)
        }
    }

    /// First 8 fingerprint bytes as lowercase hex, for display.
    pub fn short_fingerprint(&self) -> String {
        fingerprint::short_fingerprint(&self.fingerprint)
    }
}

impl std::fmt::Debug for Keyfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyfile")
            .field("material", &"<redacted>")
            .field("fingerprint", &self.short_fingerprint())
            .finish()
    }
}

/// Generate a keyfile from 64 fresh random bytes.
///
/// Returns the keyfile and a separate copy of its raw material.
pub fn generate() -> (Keyfile, KeyMaterial) {
    let material: KeyMaterial = Zeroizing::new(random_bytes());
    let keyfile = Keyfile::from_material(material.clone());
    (keyfile, material)
}

/// Parse a serialized keyfile.
///
/// Validates length, magic and version. The fingerprint is read but not
/// re-checked; call `Keyfile::verify_fingerprint` for that. Bytes past the
/// 102-byte layout are ignored.
pub fn parse(bytes: &[u8]) -> Result<Keyfile> {
    if bytes.len() < KEYFILE_LEN {
        return Err(GhostError::TooSmall {
            what: ".gkey file",
            len: bytes.len(),
            min: KEYFILE_LEN,
        });
    }

    if &bytes[..5] != KEYFILE_MAGIC {
        return Err(GhostError::BadMagic { what: ".gkey file" });
    }

    if bytes[5] != KEYFILE_VERSION {
        return Err(GhostError::UnsupportedVersion {
            what: ".gkey file",
            version: bytes[5],
        });
    }

    let mut material: KeyMaterial = Zeroizing::new([0u8; KEY_MATERIAL_LEN]);
    material.copy_from_slice(&bytes[MATERIAL_OFFSET..FINGERPRINT_OFFSET]);
    let mut fingerprint = [0u8; FINGERPRINT_LEN];
    fingerprint.copy_from_slice(&bytes[FINGERPRINT_OFFSET..KEYFILE_LEN]);

    Ok(Keyfile {
        material,
        fingerprint,
    })
}

/// Cheap prefix check used to pick a decoder; does not validate anything else.
pub fn looks_like_keyfile(bytes: &[u8]) -> bool {
    bytes.starts_with(KEYFILE_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_layout() {
        let (keyfile, material) = generate();
        let bytes = keyfile.to_bytes();
        assert_eq!(bytes.len(), 102, "keyfile must be exactly 102 bytes");
        assert_eq!(&bytes[..5], b"GKEY!");
        assert_eq!(bytes[5], 1);
        assert_eq!(&bytes[6..70], &material[..]);
        assert_eq!(&bytes[70..102], &fingerprint::compute(&material)[..]);
    }

    #[test]
    fn test_parse_round_trip() {
        let (keyfile, material) = generate();
        let parsed = parse(&keyfile.to_bytes()).expect("parse should succeed");
        assert_eq!(&parsed.material()[..], &material[..]);
        assert_eq!(parsed.fingerprint(), keyfile.fingerprint());
        parsed
            .verify_fingerprint()
            .expect("fresh keyfile fingerprint must verify");
    }

    #[test]
    fn test_generate_produces_unique_material() {
        let (_, a) = generate();
        let (_, b) = generate();
        assert_ne!(&a[..], &b[..]);
    }

    #[test]
    fn test_parse_too_small() {
        let err = parse(&[0u8; 101]).unwrap_err();
        assert_eq!(err.code(), "TOO_SMALL");
    }

    #[test]
    fn test_parse_bad_magic() {
        let (keyfile, _) = generate();
        let mut bytes = keyfile.to_bytes();
        bytes[0] = b'X';
        assert_eq!(parse(&bytes).unwrap_err().code(), "BAD_MAGIC");
    }

    #[test]
    fn test_parse_unsupported_version() {
        let (keyfile, _) = generate();
        let mut bytes = keyfile.to_bytes();
        bytes[5] = 2;
        assert_eq!(
            parse(&bytes).unwrap_err(),
            GhostError::UnsupportedVersion {
                what: ".gkey file",
                version: 2
            }
        );
    }

    #[test]
    fn test_parse_ignores_trailing_bytes() {
        let (keyfile, material) = generate();
        let mut bytes = keyfile.to_bytes().to_vec();
        bytes.extend_from_slice(b"\n");
        let parsed = parse(&bytes).expect("trailing bytes are ignored");
        assert_eq!(&parsed.material()[..], &material[..]);
    }

    #[test]
    fn test_corrupted_fingerprint_still_parses_but_fails_verify() {
        let (keyfile, _) = generate();
        let mut bytes = keyfile.to_bytes();
        bytes[80] ^= 0xff;
        let parsed = parse(&bytes).expect("fingerprint is not checked on parse");
        assert_eq!(
            parsed.verify_fingerprint().unwrap_err(),
            GhostError::FingerprintMismatch
        );
    }

    #[test]
    fn test_looks_like_keyfile() {
        let (keyfile, _) = generate();
        assert!(looks_like_keyfile(&keyfile.to_bytes()));
        assert!(!looks_like_keyfile(b"GHOST\x01"));
    }
}
