use thiserror::Error;

/// Every way a ghostcrypt operation can fail.
///
/// Messages are safe to show to a user: none of them carry key material,
/// passwords or plaintext. `code()` gives a stable machine-readable kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GhostError {
    #[error("Password or keyfile is empty")]
    EmptySecret,

    #[error("Invalid {what}: too small ({len} bytes, need at least {min})")]
    TooSmall {
        what: &'static str,
        len: usize,
        min: usize,
    },

    #[error("Invalid {what}: wrong magic number")]
    BadMagic { what: &'static str },

    #[error("Unsupported {what} version {version}")]
    UnsupportedVersion { what: &'static str, version: u8 },

    #[error("Invalid .ghost file: no encrypted data")]
    NoCiphertext,

    #[error("Invalid .ghost file: incomplete authentication tag")]
    IncompleteTag,

    #[error("Wrong password or keyfile, or the file is corrupted")]
    WrongKeyOrCorrupted,

    #[error("Decryption failed: ciphertext structure is invalid")]
    DecryptionFailed,

    #[error("Pipeline step `{step}` ran before `{missing}` was available")]
    PipelineOrderViolation {
        step: &'static str,
        missing: &'static str,
    },

    #[error("Keyfile fingerprint does not match its key material")]
    FingerprintMismatch,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Key derivation timed out")]
    TimedOut,
}

impl GhostError {
    /// Stable identifier for the error kind, for callers that dispatch on it.
    pub fn code(&self) -> &'static str {
        match self {
            GhostError::EmptySecret => "EMPTY_SECRET",
            GhostError::TooSmall { .. } => "TOO_SMALL",
            GhostError::BadMagic { .. } => "BAD_MAGIC",
            GhostError::UnsupportedVersion { .. } => "UNSUPPORTED_VERSION",
            GhostError::NoCiphertext => "NO_CIPHERTEXT",
            GhostError::IncompleteTag => "INCOMPLETE_TAG",
            GhostError::WrongKeyOrCorrupted => "WRONG_KEY_OR_CORRUPTED",
            GhostError::DecryptionFailed => "DECRYPTION_FAILED",
            GhostError::PipelineOrderViolation { .. } => "PIPELINE_ORDER_VIOLATION",
            GhostError::FingerprintMismatch => "FINGERPRINT_MISMATCH",
            GhostError::KeyDerivation(_) => "KEY_DERIVATION",
            GhostError::Cancelled => "CANCELLED",
            GhostError::TimedOut => "TIMED_OUT",
        }
    }
}

pub type Result<T> = std::result::Result<T, GhostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_key_message_is_user_facing() {
        let msg = GhostError::WrongKeyOrCorrupted.to_string();
        assert!(
            msg.contains("Wrong password or keyfile"),
            "message should tell the user what to retry, got: {}",
            msg
        );
        assert_eq!(GhostError::WrongKeyOrCorrupted.code(), "WRONG_KEY_OR_CORRUPTED");
    }

    #[test]
    fn test_too_small_message_names_sizes() {
        let err = GhostError::TooSmall {
            what: ".ghost file",
            len: 50,
            min: 131,
        };
        let msg = err.to_string();
        assert!(msg.contains("50") && msg.contains("131"), "got: {}", msg);
        assert_eq!(err.code(), "TOO_SMALL");
    }
}
