//! Pipeline orchestrator: drives `EncryptState` / `DecryptState` through their
//! steps and exposes a single request/response entry point.
//!
//! A `Pipeline` holds configuration only. Every call builds its own state
//! value, so one `Pipeline` can serve concurrent requests from many threads.

pub mod progress;
pub mod state;

use std::time::Duration;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::{
    derive_with, spawn_derive, CancelToken, DerivedKeySet, KdfParams, Secret,
};
use crate::error::{GhostError, Result};
use crate::keyfile::{self, KeyMaterial};

pub use progress::{ChannelSink, ProgressSink, Silent, Stage};
pub use state::{DecryptStage, DecryptState, EncryptStage, EncryptState, KdfInput};

/// Where the secret for an operation comes from.
pub enum KeySource {
    Password(Zeroizing<String>),
    /// Serialized `.gkey` file contents; parsed inside the pipeline.
    KeyfileBytes(Zeroizing<Vec<u8>>),
    /// Key material already extracted from a keyfile.
    Material(KeyMaterial),
}

/// Key choice for an encrypt request.
pub enum EncryptKey {
    Use(KeySource),
    /// Generate a fresh keyfile, encrypt with it, and return it in the response.
    NewKeyfile,
}

/// One operation to run.
pub enum Request {
    Encrypt {
        plaintext: Zeroizing<Vec<u8>>,
        key: EncryptKey,
    },
    Decrypt {
        envelope: Vec<u8>,
        key: KeySource,
    },
    GenerateKeyfile,
}

/// The result of a successful `Request`.
pub enum Response {
    Envelope {
        ghost: Vec<u8>,
        /// Serialized keyfile, present when the request asked for `NewKeyfile`.
        keyfile: Option<Zeroizing<Vec<u8>>>,
    },
    Plaintext(Zeroizing<Vec<u8>>),
    Keyfile {
        bytes: Zeroizing<Vec<u8>>,
        material: KeyMaterial,
    },
}

/// Encrypt/decrypt orchestrator configuration.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    kdf: KdfParams,
    cancel: Option<CancelToken>,
    derive_timeout: Option<Duration>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the Argon2id parameters. Files written with anything other
    /// than the defaults cannot be opened by a default pipeline.
    pub fn with_kdf_params(mut self, params: KdfParams) -> Self {
        self.kdf = params;
        self
    }

    /// Abort at the next step boundary (or while waiting on key derivation)
    /// once `token` is cancelled.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Give up on key derivation after `timeout`.
    pub fn with_derive_timeout(mut self, timeout: Duration) -> Self {
        self.derive_timeout = Some(timeout);
        self
    }

    /// Run one request to completion.
    pub fn execute(&self, request: Request, progress: &mut dyn ProgressSink) -> Result<Response> {
        match request {
            Request::Encrypt { plaintext, key } => {
                let (secret, keyfile) = match key {
                    EncryptKey::Use(source) => (self.load_secret(source, progress)?, None),
                    EncryptKey::NewKeyfile => {
                        progress.report(Stage::GeneratingKeyfile);
                        let (keyfile, material) = keyfile::generate();
                        info!(fingerprint = %keyfile.short_fingerprint(), "generated keyfile for encryption");
                        (Secret::keyfile(material), Some(keyfile.to_bytes()))
                    }
                };
                let ghost = self.encrypt(&plaintext, secret, progress)?;
                Ok(Response::Envelope { ghost, keyfile })
            }
            Request::Decrypt { envelope, key } => {
                let plaintext = self.decrypt_with_source(&envelope, key, progress)?;
                Ok(Response::Plaintext(plaintext))
            }
            Request::GenerateKeyfile => {
                progress.report(Stage::GeneratingKeyfile);
                let (keyfile, material) = keyfile::generate();
                info!(fingerprint = %keyfile.short_fingerprint(), "generated keyfile");
                Ok(Response::Keyfile {
                    bytes: keyfile.to_bytes(),
                    material,
                })
            }
        }
    }

    /// Encrypt `plaintext` into a complete ghost envelope.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        secret: Secret,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<u8>> {
        let mut state = EncryptState::new(plaintext, secret);
        debug!(plaintext_len = plaintext.len(), "encrypt: start");

        self.checkpoint()?;
        progress.report(Stage::DerivingKeys);
        let keys = self.derive_keys(state.kdf_input()?)?;
        state.keys_derived(keys)?;

        self.checkpoint()?;
        progress.report(Stage::GeneratingIvs);
        state.generate_ivs()?;

        self.checkpoint()?;
        progress.report(Stage::EncryptingLayer1);
        state.encrypt_layer1()?;

        progress.report(Stage::EncryptingLayer2);
        state.encrypt_layer2()?;

        progress.report(Stage::ComputingTag);
        state.compute_tag()?;

        progress.report(Stage::BuildingEnvelope);
        state.build_envelope()?;

        let ghost = state.into_envelope()?;
        progress.report(Stage::EnvelopeReady);
        debug!(envelope_len = ghost.len(), "encrypt: envelope ready");
        Ok(ghost)
    }

    /// Decrypt a ghost envelope. Plaintext is released only after the tag verifies.
    pub fn decrypt(
        &self,
        ghost: &[u8],
        secret: Secret,
        progress: &mut dyn ProgressSink,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let mut state = DecryptState::new();
        self.parse_stage(&mut state, ghost, progress)?;
        state.set_secret(secret)?;
        self.finish_decrypt(state, progress)
    }

    fn decrypt_with_source(
        &self,
        ghost: &[u8],
        source: KeySource,
        progress: &mut dyn ProgressSink,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let mut state = DecryptState::new();
        self.parse_stage(&mut state, ghost, progress)?;
        match source {
            KeySource::Password(password) => state.set_secret(Secret::Password(password))?,
            KeySource::Material(material) => state.set_secret(Secret::keyfile(material))?,
            KeySource::KeyfileBytes(bytes) => {
                progress.report(Stage::LoadingKeyfile);
                state.load_keyfile(&bytes)?;
            }
        }
        self.finish_decrypt(state, progress)
    }

    fn parse_stage<'e>(
        &self,
        state: &mut DecryptState<'e>,
        ghost: &'e [u8],
        progress: &mut dyn ProgressSink,
    ) -> Result<()> {
        debug!(envelope_len = ghost.len(), "decrypt: start");
        self.checkpoint()?;
        progress.report(Stage::ParsingEnvelope);
        state.parse_envelope(ghost)
    }

    fn finish_decrypt(
        &self,
        mut state: DecryptState<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<Zeroizing<Vec<u8>>> {
        self.checkpoint()?;
        progress.report(Stage::DerivingKeys);
        let keys = self.derive_keys(state.kdf_input()?)?;
        state.keys_derived(keys)?;

        self.checkpoint()?;
        progress.report(Stage::VerifyingTag);
        if let Err(e) = state.verify_tag() {
            warn!("decrypt: tag mismatch, rejecting envelope");
            return Err(e);
        }

        progress.report(Stage::DecryptingLayer2);
        state.decrypt_layer2()?;

        progress.report(Stage::DecryptingLayer1);
        state.decrypt_layer1()?;

        let plaintext = state.into_plaintext()?;
        progress.report(Stage::PlaintextReady);
        debug!(plaintext_len = plaintext.len(), "decrypt: plaintext ready");
        Ok(plaintext)
    }

    fn load_secret(&self, source: KeySource, progress: &mut dyn ProgressSink) -> Result<Secret> {
        match source {
            KeySource::Password(password) => Ok(Secret::Password(password)),
            KeySource::Material(material) => Ok(Secret::keyfile(material)),
            KeySource::KeyfileBytes(bytes) => {
                progress.report(Stage::LoadingKeyfile);
                let keyfile = keyfile::parse(&bytes)?;
                Ok(Secret::keyfile(keyfile.material().clone()))
            }
        }
    }

    /// Derive inline, or on a worker thread when cancellation or a timeout is configured.
    fn derive_keys(&self, (input, salt): KdfInput) -> Result<DerivedKeySet> {
        if input.is_empty() {
            return Err(GhostError::EmptySecret);
        }
        if self.cancel.is_none() && self.derive_timeout.is_none() {
            return derive_with(&self.kdf, &input, &salt);
        }
        let token = self.cancel.clone().unwrap_or_default();
        spawn_derive(input, salt, self.kdf)?.wait(&token, self.derive_timeout)
    }

    fn checkpoint(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(GhostError::Cancelled),
            _ => Ok(()),
        }
    }
}
