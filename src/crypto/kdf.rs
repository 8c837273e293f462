//! Key Derivation Unit: one Argon2id call turns a secret and a 32-byte salt
//! into three independent 32-byte keys.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use zeroize::Zeroizing;

use crate::error::{GhostError, Result};
use crate::keyfile::KeyMaterial;

/// Salt length carried in every envelope.
pub const SALT_LEN: usize = 32;

/// Length of each derived key.
pub const KEY_LEN: usize = 32;

/// Argon2id output: cipher key ‖ stream key ‖ MAC key.
const OUTPUT_LEN: usize = 3 * KEY_LEN;

/// How often a waiting caller re-checks its cancel token.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Argon2id cost parameters.
///
/// Envelopes do not record these, so anything other than `KdfParams::default()`
/// produces files that only the same non-default configuration can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Iteration count.
    pub t_cost: u32,
    /// Lanes.
    pub p_cost: u32,
}

impl Default for KdfParams {
    /// 64 MiB, 3 passes, 4 lanes.
    fn default() -> Self {
        KdfParams {
            m_cost: 65536,
            t_cost: 3,
            p_cost: 4,
        }
    }
}

impl KdfParams {
    /// Minimal-cost parameters for tests. Never use for real files.
    pub const fn insecure_fast() -> Self {
        KdfParams {
            m_cost: 256,
            t_cost: 1,
            p_cost: 4,
        }
    }
}

/// The secret an operation is keyed with: a password or keyfile material.
pub enum Secret {
    Password(Zeroizing<String>),
    Keyfile(KeyMaterial),
}

impl Secret {
    pub fn password(password: &str) -> Self {
        Secret::Password(Zeroizing::new(password.to_string()))
    }

    pub fn keyfile(material: KeyMaterial) -> Self {
        Secret::Keyfile(material)
    }

    /// Bytes fed to Argon2id.
    ///
    /// Keyfile material enters as its standard base64 encoding, which keeps
    /// `.gkey`-protected files compatible with earlier ghostcrypt releases.
    pub fn kdf_input(&self) -> Zeroizing<Vec<u8>> {
        match self {
            Secret::Password(password) => Zeroizing::new(password.as_bytes().to_vec()),
            Secret::Keyfile(material) => Zeroizing::new(
                base64::engine::general_purpose::STANDARD
                    .encode(&material[..])
                    .into_bytes(),
            ),
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Secret::Password(_) => f.write_str("Secret::Password(<redacted>)"),
            Secret::Keyfile(_) => f.write_str("Secret::Keyfile(<redacted>)"),
        }
    }
}

/// The three keys derived for one operation, plus the salt they came from.
///
/// Key fields are wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKeySet {
    cipher_key: Zeroizing<[u8; KEY_LEN]>,
    stream_key: Zeroizing<[u8; KEY_LEN]>,
    mac_key: Zeroizing<[u8; KEY_LEN]>,
    salt: [u8; SALT_LEN],
}

impl DerivedKeySet {
    pub fn cipher_key(&self) -> &[u8; KEY_LEN] {
        &self.cipher_key
    }

    pub fn stream_key(&self) -> &[u8; KEY_LEN] {
        &self.stream_key
    }

    pub fn mac_key(&self) -> &[u8; KEY_LEN] {
        &self.mac_key
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }
}

impl fmt::Debug for DerivedKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKeySet")
            .field("keys", &"<redacted>")
            .field("salt", &self.salt)
            .finish()
    }
}

/// Derive the key set for `secret` and `salt` with the standard parameters.
///
/// Deterministic: the same secret and salt always give the same keys. A wrong
/// secret is not detectable here; it only shows up as a tag mismatch later.
pub fn derive(secret: &[u8], salt: &[u8; SALT_LEN]) -> Result<DerivedKeySet> {
    derive_with(&KdfParams::default(), secret, salt)
}

/// Derive the key set with explicit Argon2id parameters.
pub fn derive_with(
    params: &KdfParams,
    secret: &[u8],
    salt: &[u8; SALT_LEN],
) -> Result<DerivedKeySet> {
    if secret.is_empty() {
        return Err(GhostError::EmptySecret);
    }

    let argon2_params = Params::new(params.m_cost, params.t_cost, params.p_cost, Some(OUTPUT_LEN))
        .map_err(|e| GhostError::KeyDerivation(format!("argon2 params error: {}", e)))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut output = Zeroizing::new([0u8; OUTPUT_LEN]);
    argon2
        .hash_password_into(secret, salt, output.as_mut())
        .map_err(|e| GhostError::KeyDerivation(format!("argon2 hash error: {}", e)))?;

    // Positional split: [0,32) cipher, [32,64) stream, [64,96) MAC
    let mut cipher_key = Zeroizing::new([0u8; KEY_LEN]);
    let mut stream_key = Zeroizing::new([0u8; KEY_LEN]);
    let mut mac_key = Zeroizing::new([0u8; KEY_LEN]);
    cipher_key.copy_from_slice(&output[..KEY_LEN]);
    stream_key.copy_from_slice(&output[KEY_LEN..2 * KEY_LEN]);
    mac_key.copy_from_slice(&output[2 * KEY_LEN..]);

    Ok(DerivedKeySet {
        cipher_key,
        stream_key,
        mac_key,
        salt: *salt,
    })
}

/// Shared flag a caller trips to abandon an in-flight operation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A derivation running on its own worker thread.
pub struct DerivationHandle {
    rx: mpsc::Receiver<Result<DerivedKeySet>>,
}

/// Start a derivation on a dedicated thread.
///
/// The worker owns its copies of the secret and salt. If the caller stops
/// waiting, the worker still runs to completion and its result is dropped
/// (and zeroized) when the send fails.
pub fn spawn_derive(
    secret: Zeroizing<Vec<u8>>,
    salt: [u8; SALT_LEN],
    params: KdfParams,
) -> Result<DerivationHandle> {
    let (tx, rx) = mpsc::sync_channel(1);
    std::thread::Builder::new()
        .name("ghostcrypt-kdf".to_string())
        .spawn(move || {
            let result = derive_with(&params, &secret, &salt);
            let _ = tx.send(result);
        })
        .map_err(|e| GhostError::KeyDerivation(format!("failed to start worker: {}", e)))?;
    Ok(DerivationHandle { rx })
}

impl DerivationHandle {
    /// Block until the keys are ready, the token is cancelled, or `timeout` elapses.
    pub fn wait(self, cancel: &CancelToken, timeout: Option<Duration>) -> Result<DerivedKeySet> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if cancel.is_cancelled() {
                return Err(GhostError::Cancelled);
            }
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(GhostError::TimedOut);
                    }
                    (deadline - now).min(POLL_INTERVAL)
                }
                None => POLL_INTERVAL,
            };
            match self.rx.recv_timeout(slice) {
                Ok(result) => return result,
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(GhostError::KeyDerivation(
                        "derivation worker exited without a result".to_string(),
                    ))
                }
            }
        }
    }
}
