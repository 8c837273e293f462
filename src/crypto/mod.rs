//! Crypto module: Argon2id key derivation, the AES-256-CBC + ChaCha20 cipher
//! layers, and the HMAC-SHA512 envelope tag.
//!
//! Key boundaries are raw fixed-size arrays wrapped in `Zeroizing` so every
//! derived key and intermediate secret buffer is wiped when it goes out of scope.

pub mod cipher;
pub mod kdf;
pub mod mac;

use rand::{rngs::OsRng, RngCore};

pub use cipher::{IvSet, BLOCK_LEN, CIPHER_IV_LEN, STREAM_NONCE_LEN};
pub use kdf::{
    derive, derive_with, spawn_derive, CancelToken, DerivationHandle, DerivedKeySet, KdfParams,
    Secret, KEY_LEN, SALT_LEN,
};
pub use mac::{AuthenticatedFields, TAG_LEN};

/// Fill a fixed-size array from the operating system CSPRNG.
///
/// Every salt, IV, nonce and keyfile draws from `OsRng` directly; there is no
/// process-wide generator whose state could correlate two operations.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    buf
}
