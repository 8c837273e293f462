//! Envelope codec: the `.ghost` container.
//!
//! ```text
//! Offset  Size  Field
//! 0       5     Magic: b"GHOST"
//! 5       1     Version: 0x01
//! 6       32    Salt
//! 38      16    AES-CBC IV
//! 54      12    ChaCha20 nonce
//! 66      N     Ciphertext (N >= 1, derived from total length)
//! 66+N    64    HMAC-SHA512 tag
//! ```
//!
//! The ciphertext length is never stored. A truncated or extended file parses
//! as a different ciphertext length and is caught by tag verification.

use crate::crypto::{
    AuthenticatedFields, CIPHER_IV_LEN, SALT_LEN, STREAM_NONCE_LEN, TAG_LEN,
};
use crate::error::{GhostError, Result};

/// Magic header bytes identifying a ghost envelope.
pub const ENVELOPE_MAGIC: &[u8; 5] = b"GHOST";

/// Only supported envelope version.
pub const ENVELOPE_VERSION: u8 = 0x01;

/// Fixed header: 5 magic + 1 version + 32 salt + 16 IV + 12 nonce = 66 bytes.
pub const HEADER_LEN: usize = 5 + 1 + SALT_LEN + CIPHER_IV_LEN + STREAM_NONCE_LEN;

/// Smallest parseable envelope: header, one ciphertext byte, tag.
pub const MIN_ENVELOPE_LEN: usize = HEADER_LEN + 1 + TAG_LEN;

const SALT_OFFSET: usize = 6;
const IV_OFFSET: usize = SALT_OFFSET + SALT_LEN;
const NONCE_OFFSET: usize = IV_OFFSET + CIPHER_IV_LEN;

const WHAT: &str = ".ghost file";

/// A parsed envelope borrowing from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub salt: &'a [u8; SALT_LEN],
    pub cipher_iv: &'a [u8; CIPHER_IV_LEN],
    pub stream_nonce: &'a [u8; STREAM_NONCE_LEN],
    pub ciphertext: &'a [u8],
    pub tag: &'a [u8; TAG_LEN],
}

impl<'a> Envelope<'a> {
    /// The fields covered by the tag.
    pub fn authenticated_fields(&self) -> AuthenticatedFields<'a> {
        AuthenticatedFields {
            salt: self.salt,
            cipher_iv: self.cipher_iv,
            stream_nonce: self.stream_nonce,
            ciphertext: self.ciphertext,
        }
    }

    /// Total serialized length.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.ciphertext.len() + TAG_LEN
    }
}

/// Concatenate the envelope fields in their fixed order.
pub fn build(
    salt: &[u8; SALT_LEN],
    cipher_iv: &[u8; CIPHER_IV_LEN],
    stream_nonce: &[u8; STREAM_NONCE_LEN],
    ciphertext: &[u8],
    tag: &[u8; TAG_LEN],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len() + TAG_LEN);
    out.extend_from_slice(ENVELOPE_MAGIC);
    out.push(ENVELOPE_VERSION);
    out.extend_from_slice(salt);
    out.extend_from_slice(cipher_iv);
    out.extend_from_slice(stream_nonce);
    out.extend_from_slice(ciphertext);
    out.extend_from_slice(tag);
    out
}

/// Parse and validate an envelope.
///
/// Checks run in a fixed order: size, magic, version, ciphertext presence,
/// tag completeness. Nothing cryptographic happens here.
pub fn parse(bytes: &[u8]) -> Result<Envelope<'_>> {
    if bytes.len() < MIN_ENVELOPE_LEN {
        return Err(GhostError::TooSmall {
            what: WHAT,
            len: bytes.len(),
            min: MIN_ENVELOPE_LEN,
        });
    }

    if &bytes[..5] != ENVELOPE_MAGIC {
        return Err(GhostError::BadMagic { what: WHAT });
    }

    if bytes[5] != ENVELOPE_VERSION {
        return Err(GhostError::UnsupportedVersion {
            what: WHAT,
            version: bytes[5],
        });
    }

    let ciphertext_len = bytes.len().saturating_sub(HEADER_LEN + TAG_LEN);
    if ciphertext_len < 1 {
        return Err(GhostError::NoCiphertext);
    }

    let tag_offset = HEADER_LEN + ciphertext_len;
    let tag_bytes = &bytes[tag_offset..];
    if tag_bytes.len() < TAG_LEN {
        return Err(GhostError::IncompleteTag);
    }

    Ok(Envelope {
        salt: fixed(&bytes[SALT_OFFSET..IV_OFFSET])?,
        cipher_iv: fixed(&bytes[IV_OFFSET..NONCE_OFFSET])?,
        stream_nonce: fixed(&bytes[NONCE_OFFSET..HEADER_LEN])?,
        ciphertext: &bytes[HEADER_LEN..tag_offset],
        tag: fixed(&tag_bytes[..TAG_LEN])?,
    })
}

/// Cheap prefix check used to pick a decoder; does not validate anything else.
pub fn looks_like_envelope(bytes: &[u8]) -> bool {
    bytes.starts_with(ENVELOPE_MAGIC)
}

fn fixed<const N: usize>(slice: &[u8]) -> Result<&[u8; N]> {
    slice.try_into().map_err(|_| GhostError::IncompleteTag)
}
