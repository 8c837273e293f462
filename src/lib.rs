/// ghostcrypt library crate: layered file encryption into `.ghost` envelopes.
///
/// Modules are public so the binary and `tests/` integration tests share one
/// implementation via `use ghostcrypt::...`.
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod keyfile;
pub mod pipeline;

use zeroize::Zeroizing;

pub use crypto::Secret;
pub use error::{GhostError, Result};
pub use pipeline::{Pipeline, Silent, Stage};

/// Encrypt `plaintext` under `secret` with the standard parameters.
pub fn encrypt(plaintext: &[u8], secret: Secret) -> Result<Vec<u8>> {
    Pipeline::new().encrypt(plaintext, secret, &mut Silent)
}

/// Decrypt a `.ghost` envelope with the standard parameters.
pub fn decrypt(ghost: &[u8], secret: Secret) -> Result<Zeroizing<Vec<u8>>> {
    Pipeline::new().decrypt(ghost, secret, &mut Silent)
}

/// Generate a new keyfile. Returns the serialized `.gkey` bytes and the raw material.
pub fn generate_keyfile() -> (Zeroizing<Vec<u8>>, keyfile::KeyMaterial) {
    let (keyfile, material) = keyfile::generate();
    (keyfile.to_bytes(), material)
}
