//! Per-operation state for the encrypt and decrypt pipelines.
//!
//! Each value is owned by exactly one call. A step checks that the state is at
//! its predecessor stage before running and fails with
//! `PipelineOrderViolation` otherwise, so keys, IVs and buffers can never be
//! consumed before they exist or reused after the pipeline has moved on.

use zeroize::Zeroizing;

use crate::crypto::{
    cipher, kdf::Secret, mac, random_bytes, DerivedKeySet, IvSet, SALT_LEN, TAG_LEN,
};
use crate::envelope::{self, Envelope};
use crate::error::{GhostError, Result};
use crate::keyfile;

/// Inputs for one key derivation: the secret bytes and the salt.
pub type KdfInput = (Zeroizing<Vec<u8>>, [u8; SALT_LEN]);

fn require<'a, T>(slot: &'a Option<T>, step: &'static str, missing: &'static str) -> Result<&'a T> {
    slot.as_ref()
        .ok_or(GhostError::PipelineOrderViolation { step, missing })
}

// ── Encrypt ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptStage {
    Start,
    KeysDerived,
    IvsGenerated,
    Layer1Encrypted,
    Layer2Encrypted,
    TagComputed,
    EnvelopeReady,
}

impl EncryptStage {
    fn name(self) -> &'static str {
        match self {
            EncryptStage::Start => "Start",
            EncryptStage::KeysDerived => "KeysDerived",
            EncryptStage::IvsGenerated => "IvsGenerated",
            EncryptStage::Layer1Encrypted => "Layer1Encrypted",
            EncryptStage::Layer2Encrypted => "Layer2Encrypted",
            EncryptStage::TagComputed => "TagComputed",
            EncryptStage::EnvelopeReady => "EnvelopeReady",
        }
    }
}

/// Everything one encryption carries between steps.
pub struct EncryptState<'p> {
    stage: EncryptStage,
    plaintext: &'p [u8],
    secret: Option<Secret>,
    keys: Option<DerivedKeySet>,
    ivs: Option<IvSet>,
    layer1: Option<Zeroizing<Vec<u8>>>,
    layer2: Option<Vec<u8>>,
    tag: Option<[u8; TAG_LEN]>,
    envelope: Option<Vec<u8>>,
}

impl<'p> EncryptState<'p> {
    pub fn new(plaintext: &'p [u8], secret: Secret) -> Self {
        EncryptState {
            stage: EncryptStage::Start,
            plaintext,
            secret: Some(secret),
            keys: None,
            ivs: None,
            layer1: None,
            layer2: None,
            tag: None,
            envelope: None,
        }
    }

    pub fn stage(&self) -> EncryptStage {
        self.stage
    }

    fn expect_stage(&self, step: &'static str, from: EncryptStage) -> Result<()> {
        if self.stage == from {
            Ok(())
        } else {
            Err(GhostError::PipelineOrderViolation {
                step,
                missing: from.name(),
            })
        }
    }

    /// Secret bytes plus a fresh random salt for this encryption.
    pub fn kdf_input(&self) -> Result<KdfInput> {
        self.expect_stage("kdf_input", EncryptStage::Start)?;
        let secret = require(&self.secret, "kdf_input", "secret")?;
        Ok((secret.kdf_input(), random_bytes()))
    }

    /// Start → KeysDerived. The secret is dropped once keys exist.
    pub fn keys_derived(&mut self, keys: DerivedKeySet) -> Result<()> {
        self.expect_stage("keys_derived", EncryptStage::Start)?;
        self.secret = None;
        self.keys = Some(keys);
        self.stage = EncryptStage::KeysDerived;
        Ok(())
    }

    /// KeysDerived → IvsGenerated with a fresh random IV and nonce.
    pub fn generate_ivs(&mut self) -> Result<()> {
        self.expect_stage("generate_ivs", EncryptStage::KeysDerived)?;
        self.ivs = Some(IvSet::generate());
        self.stage = EncryptStage::IvsGenerated;
        Ok(())
    }

    /// IvsGenerated → Layer1Encrypted (AES-256-CBC).
    pub fn encrypt_layer1(&mut self) -> Result<()> {
        const STEP: &str = "encrypt_layer1";
        self.expect_stage(STEP, EncryptStage::IvsGenerated)?;
        let keys = require(&self.keys, STEP, "keys")?;
        let ivs = require(&self.ivs, STEP, "ivs")?;
        self.layer1 = Some(Zeroizing::new(cipher::cbc_encrypt(
            keys.cipher_key(),
            &ivs.cipher_iv,
            self.plaintext,
        )));
        self.stage = EncryptStage::Layer1Encrypted;
        Ok(())
    }

    /// Layer1Encrypted → Layer2Encrypted (ChaCha20 over the CBC output).
    pub fn encrypt_layer2(&mut self) -> Result<()> {
        const STEP: &str = "encrypt_layer2";
        self.expect_stage(STEP, EncryptStage::Layer1Encrypted)?;
        let keys = require(&self.keys, STEP, "keys")?;
        let ivs = require(&self.ivs, STEP, "ivs")?;
        let layer1 = self
            .layer1
            .take()
            .ok_or(GhostError::PipelineOrderViolation {
                step: STEP,
                missing: "layer1",
            })?;
        let mut data = layer1.to_vec();
        cipher::stream_xor(keys.stream_key(), &ivs.stream_nonce, &mut data);
        self.layer2 = Some(data);
        self.stage = EncryptStage::Layer2Encrypted;
        Ok(())
    }

    /// Layer2Encrypted → TagComputed.
    pub fn compute_tag(&mut self) -> Result<()> {
        const STEP: &str = "compute_tag";
        self.expect_stage(STEP, EncryptStage::Layer2Encrypted)?;
        let keys = require(&self.keys, STEP, "keys")?;
        let ivs = require(&self.ivs, STEP, "ivs")?;
        let ciphertext = require(&self.layer2, STEP, "layer2")?;
        let fields = mac::AuthenticatedFields {
            salt: keys.salt(),
            cipher_iv: &ivs.cipher_iv,
            stream_nonce: &ivs.stream_nonce,
            ciphertext,
        };
        self.tag = Some(mac::compute(keys.mac_key(), &fields));
        self.stage = EncryptStage::TagComputed;
        Ok(())
    }

    /// TagComputed → EnvelopeReady. Keys are dropped once the envelope exists.
    pub fn build_envelope(&mut self) -> Result<()> {
        const STEP: &str = "build_envelope";
        self.expect_stage(STEP, EncryptStage::TagComputed)?;
        let keys = require(&self.keys, STEP, "keys")?;
        let ivs = require(&self.ivs, STEP, "ivs")?;
        let ciphertext = require(&self.layer2, STEP, "layer2")?;
        let tag = require(&self.tag, STEP, "tag")?;
        self.envelope = Some(envelope::build(
            keys.salt(),
            &ivs.cipher_iv,
            &ivs.stream_nonce,
            ciphertext,
            tag,
        ));
        self.keys = None;
        self.stage = EncryptStage::EnvelopeReady;
        Ok(())
    }

    /// Take the finished envelope.
    pub fn into_envelope(mut self) -> Result<Vec<u8>> {
        self.expect_stage("into_envelope", EncryptStage::EnvelopeReady)?;
        self.envelope
            .take()
            .ok_or(GhostError::PipelineOrderViolation {
                step: "into_envelope",
                missing: "envelope",
            })
    }
}

// ── Decrypt ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptStage {
    Start,
    EnvelopeParsed,
    KeyfileLoaded,
    KeysDerived,
    TagVerified,
    Rejected,
    Layer2Decrypted,
    PlaintextReady,
}

impl DecryptStage {
    fn name(self) -> &'static str {
        match self {
            DecryptStage::Start => "Start",
            DecryptStage::EnvelopeParsed => "EnvelopeParsed",
            DecryptStage::KeyfileLoaded => "KeyfileLoaded",
            DecryptStage::KeysDerived => "KeysDerived",
            DecryptStage::TagVerified => "TagVerified",
            DecryptStage::Rejected => "Rejected",
            DecryptStage::Layer2Decrypted => "Layer2Decrypted",
            DecryptStage::PlaintextReady => "PlaintextReady",
        }
    }
}

/// Everything one decryption carries between steps.
///
/// Plaintext only exists after `verify_tag` succeeds; a rejected state cannot
/// advance further.
pub struct DecryptState<'e> {
    stage: DecryptStage,
    envelope: Option<Envelope<'e>>,
    secret: Option<Secret>,
    keys: Option<DerivedKeySet>,
    layer1: Option<Zeroizing<Vec<u8>>>,
    plaintext: Option<Zeroizing<Vec<u8>>>,
}

impl Default for DecryptState<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'e> DecryptState<'e> {
    pub fn new() -> Self {
        DecryptState {
            stage: DecryptStage::Start,
            envelope: None,
            secret: None,
            keys: None,
            layer1: None,
            plaintext: None,
        }
    }

    pub fn stage(&self) -> DecryptStage {
        self.stage
    }

    fn expect_stage(&self, step: &'static str, from: &[DecryptStage]) -> Result<()> {
        if from.contains(&self.stage) {
            Ok(())
        } else {
            Err(GhostError::PipelineOrderViolation {
                step,
                missing: from[0].name(),
            })
        }
    }

    /// Start → EnvelopeParsed.
    pub fn parse_envelope(&mut self, bytes: &'e [u8]) -> Result<()> {
        self.expect_stage("parse_envelope", &[DecryptStage::Start])?;
        self.envelope = Some(envelope::parse(bytes)?);
        self.stage = DecryptStage::EnvelopeParsed;
        Ok(())
    }

    /// Supply a password or already-loaded key material. Stays at EnvelopeParsed.
    pub fn set_secret(&mut self, secret: Secret) -> Result<()> {
        self.expect_stage("set_secret", &[DecryptStage::EnvelopeParsed])?;
        self.secret = Some(secret);
        Ok(())
    }

    /// EnvelopeParsed → KeyfileLoaded from serialized `.gkey` bytes.
    pub fn load_keyfile(&mut self, keyfile_bytes: &[u8]) -> Result<()> {
        self.expect_stage("load_keyfile", &[DecryptStage::EnvelopeParsed])?;
        let keyfile = keyfile::parse(keyfile_bytes)?;
        self.secret = Some(Secret::keyfile(keyfile.material().clone()));
        self.stage = DecryptStage::KeyfileLoaded;
        Ok(())
    }

    /// Secret bytes plus the salt read from the envelope.
    pub fn kdf_input(&self) -> Result<KdfInput> {
        const STEP: &str = "kdf_input";
        self.expect_stage(
            STEP,
            &[DecryptStage::EnvelopeParsed, DecryptStage::KeyfileLoaded],
        )?;
        let envelope = require(&self.envelope, STEP, "envelope")?;
        let secret = require(&self.secret, STEP, "secret")?;
        Ok((secret.kdf_input(), *envelope.salt))
    }

    /// EnvelopeParsed | KeyfileLoaded → KeysDerived. The secret is dropped.
    pub fn keys_derived(&mut self, keys: DerivedKeySet) -> Result<()> {
        self.expect_stage(
            "keys_derived",
            &[DecryptStage::EnvelopeParsed, DecryptStage::KeyfileLoaded],
        )?;
        self.secret = None;
        self.keys = Some(keys);
        self.stage = DecryptStage::KeysDerived;
        Ok(())
    }

    /// KeysDerived → TagVerified, or → Rejected with `WrongKeyOrCorrupted`.
    pub fn verify_tag(&mut self) -> Result<()> {
        const STEP: &str = "verify_tag";
        self.expect_stage(STEP, &[DecryptStage::KeysDerived])?;
        let envelope = require(&self.envelope, STEP, "envelope")?;
        let keys = require(&self.keys, STEP, "keys")?;
        if mac::verify(keys.mac_key(), &envelope.authenticated_fields(), envelope.tag) {
            self.stage = DecryptStage::TagVerified;
            Ok(())
        } else {
            self.keys = None;
            self.stage = DecryptStage::Rejected;
            Err(GhostError::WrongKeyOrCorrupted)
        }
    }

    /// TagVerified → Layer2Decrypted (strip ChaCha20).
    pub fn decrypt_layer2(&mut self) -> Result<()> {
        const STEP: &str = "decrypt_layer2";
        self.expect_stage(STEP, &[DecryptStage::TagVerified])?;
        let envelope = require(&self.envelope, STEP, "envelope")?;
        let keys = require(&self.keys, STEP, "keys")?;
        let mut data = Zeroizing::new(envelope.ciphertext.to_vec());
        cipher::stream_xor(keys.stream_key(), envelope.stream_nonce, &mut data);
        self.layer1 = Some(data);
        self.stage = DecryptStage::Layer2Decrypted;
        Ok(())
    }

    /// Layer2Decrypted → PlaintextReady (AES-256-CBC and padding check).
    pub fn decrypt_layer1(&mut self) -> Result<()> {
        const STEP: &str = "decrypt_layer1";
        self.expect_stage(STEP, &[DecryptStage::Layer2Decrypted])?;
        let envelope = require(&self.envelope, STEP, "envelope")?;
        let keys = require(&self.keys, STEP, "keys")?;
        let layer1 = require(&self.layer1, STEP, "layer1")?;
        let plaintext = cipher::cbc_decrypt(keys.cipher_key(), envelope.cipher_iv, layer1)?;
        self.plaintext = Some(plaintext);
        self.layer1 = None;
        self.keys = None;
        self.stage = DecryptStage::PlaintextReady;
        Ok(())
    }

    /// Take the recovered plaintext.
    pub fn into_plaintext(mut self) -> Result<Zeroizing<Vec<u8>>> {
        self.expect_stage("into_plaintext", &[DecryptStage::PlaintextReady])?;
        self.plaintext
            .take()
            .ok_or(GhostError::PipelineOrderViolation {
                step: "into_plaintext",
                missing: "plaintext",
            })
    }
}
