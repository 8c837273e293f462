//! Progress events emitted by the pipeline as it moves between steps.

use std::sync::mpsc;

/// A pipeline step that is about to run, or a terminal result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    GeneratingKeyfile,
    DerivingKeys,
    GeneratingIvs,
    EncryptingLayer1,
    EncryptingLayer2,
    ComputingTag,
    BuildingEnvelope,
    EnvelopeReady,
    ParsingEnvelope,
    LoadingKeyfile,
    VerifyingTag,
    DecryptingLayer2,
    DecryptingLayer1,
    PlaintextReady,
}

impl Stage {
    /// Stable machine-readable status.
    pub fn name(self) -> &'static str {
        match self {
            Stage::GeneratingKeyfile => "GENERATING_KEYFILE",
            Stage::DerivingKeys => "KEY_DERIVATION",
            Stage::GeneratingIvs => "GENERATING_IVS",
            Stage::EncryptingLayer1 => "ENCRYPTING_AES",
            Stage::EncryptingLayer2 => "ENCRYPTING_CHACHA",
            Stage::ComputingTag => "CALCULATING_HMAC",
            Stage::BuildingEnvelope => "BUILDING_GHOST",
            Stage::EnvelopeReady => "GHOST_BUILT",
            Stage::ParsingEnvelope => "PARSING_GHOST",
            Stage::LoadingKeyfile => "LOADING_KEYFILE",
            Stage::VerifyingTag => "VERIFYING_HMAC",
            Stage::DecryptingLayer2 => "DECRYPTING_CHACHA",
            Stage::DecryptingLayer1 => "DECRYPTING_AES",
            Stage::PlaintextReady => "DECRYPTION_COMPLETE",
        }
    }

    /// Short status line for people watching a progress display.
    pub fn message(self) -> &'static str {
        match self {
            Stage::GeneratingKeyfile => "Forging keyfile...",
            Stage::DerivingKeys => "Deriving keys...",
            Stage::GeneratingIvs => "Initializing...",
            Stage::EncryptingLayer1 => "Ghost is emerging...",
            Stage::EncryptingLayer2 => "Ghost is being reinforced...",
            Stage::ComputingTag => "Ghost is being sealed...",
            Stage::BuildingEnvelope => "Ghost is materializing...",
            Stage::EnvelopeReady => "Ghost is ready",
            Stage::ParsingEnvelope => "Reading ghost...",
            Stage::LoadingKeyfile => "Reading keyfile...",
            Stage::VerifyingTag => "Verifying seal...",
            Stage::DecryptingLayer2 => "Ghost is being freed...",
            Stage::DecryptingLayer1 => "Ghost is being revealed...",
            Stage::PlaintextReady => "Ghost decrypted",
        }
    }
}

/// Receives stage events from a running pipeline.
pub trait ProgressSink {
    fn report(&mut self, stage: Stage);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl ProgressSink for Silent {
    fn report(&mut self, _stage: Stage) {}
}

impl<F: FnMut(Stage)> ProgressSink for F {
    fn report(&mut self, stage: Stage) {
        self(stage)
    }
}

/// Forwards events over a channel. A closed receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelSink(pub mpsc::Sender<Stage>);

impl ProgressSink for ChannelSink {
    fn report(&mut self, stage: Stage) {
        let _ = self.0.send(stage);
    }
}
