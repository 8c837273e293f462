//! Dual-layer cipher engine: AES-256-CBC (layer 1) wrapped in ChaCha20 (layer 2).
//!
//! Encryption applies CBC first and the stream cipher last, so the stream layer
//! is outermost in the stored ciphertext and decryption strips it first.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use chacha20::cipher::StreamCipher;
use chacha20::ChaCha20;
use zeroize::Zeroizing;

use super::kdf::{DerivedKeySet, KEY_LEN};
use crate::error::{GhostError, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES block size; layer 1 output is always a non-zero multiple of it.
pub const BLOCK_LEN: usize = 16;

/// CBC initialization vector length.
pub const CIPHER_IV_LEN: usize = 16;

/// ChaCha20 (RFC 8439) nonce length.
pub const STREAM_NONCE_LEN: usize = 12;

/// Per-operation IV and nonce. Random on encryption, read from the envelope on decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IvSet {
    pub cipher_iv: [u8; CIPHER_IV_LEN],
    pub stream_nonce: [u8; STREAM_NONCE_LEN],
}

impl IvSet {
    /// Draw a fresh IV and nonce from the OS CSPRNG.
    pub fn generate() -> Self {
        IvSet {
            cipher_iv: super::random_bytes(),
            stream_nonce: super::random_bytes(),
        }
    }
}

/// Layer 1: AES-256-CBC with PKCS#7 padding.
///
/// Padding is always added, so a block-aligned input grows by one full block
/// and an empty input becomes exactly one block.
pub fn cbc_encrypt(
    key: &[u8; KEY_LEN],
    iv: &[u8; CIPHER_IV_LEN],
    plaintext: &[u8],
) -> Vec<u8> {
    Aes256CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Undo layer 1 and strip the PKCS#7 padding.
///
/// Fails with `DecryptionFailed` when the input is empty, not block-aligned,
/// or the padding bytes are malformed.
pub fn cbc_decrypt(
    key: &[u8; KEY_LEN],
    iv: &[u8; CIPHER_IV_LEN],
    layer1: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    if layer1.is_empty() || layer1.len() % BLOCK_LEN != 0 {
        return Err(GhostError::DecryptionFailed);
    }
    // Decrypt in place so the full-length buffer is wiped on every path.
    let mut buf = Zeroizing::new(layer1.to_vec());
    let plaintext_len = Aes256CbcDec::new(key.into(), iv.into())
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| GhostError::DecryptionFailed)?
        .len();
    buf.truncate(plaintext_len);
    Ok(buf)
}

/// Layer 2: XOR `data` in place with the ChaCha20 keystream.
///
/// The same call with the same key and nonce reverses itself.
pub fn stream_xor(key: &[u8; KEY_LEN], nonce: &[u8; STREAM_NONCE_LEN], data: &mut [u8]) {
    let mut cipher = ChaCha20::new(key.into(), nonce.into());
    cipher.apply_keystream(data);
}

/// Apply both layers in encryption order.
pub fn encrypt_layers(keys: &DerivedKeySet, ivs: &IvSet, plaintext: &[u8]) -> Vec<u8> {
    let mut ciphertext = cbc_encrypt(keys.cipher_key(), &ivs.cipher_iv, plaintext);
    stream_xor(keys.stream_key(), &ivs.stream_nonce, &mut ciphertext);
    ciphertext
}

/// Remove both layers in decryption order: stream first, then CBC.
pub fn decrypt_layers(
    keys: &DerivedKeySet,
    ivs: &IvSet,
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let mut layer1 = Zeroizing::new(ciphertext.to_vec());
    stream_xor(keys.stream_key(), &ivs.stream_nonce, &mut layer1);
    cbc_decrypt(keys.cipher_key(), &ivs.cipher_iv, &layer1)
}
