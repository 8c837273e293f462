/// Plaintext leak and tamper detection tests.
///
/// Verify that envelopes never carry the plaintext or the secret in readable
/// form, and that any modification of an envelope is caught before a single
/// plaintext byte is released.

use base64::Engine;
use ghostcrypt::crypto::KdfParams;
use ghostcrypt::error::GhostError;
use ghostcrypt::pipeline::{Pipeline, Silent, Stage};
use ghostcrypt::Secret;

const KNOWN_TEXT: &str = "KNOWN-PLAINTEXT-ghost-abc123-MUST-NOT-APPEAR";

fn fast() -> Pipeline {
    Pipeline::new().with_kdf_params(KdfParams::insecure_fast())
}

fn contains_window(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn sealed() -> Vec<u8> {
    fast()
        .encrypt(KNOWN_TEXT.as_bytes(), Secret::password("hunter2"), &mut Silent)
        .expect("encrypt should succeed")
}

// ── Test 1: Envelope contains no plaintext ─────────────────────────────────

#[test]
fn test_envelope_contains_no_plaintext() {
    let ghost = sealed();

    let lossy = String::from_utf8_lossy(&ghost);
    assert!(
        !lossy.contains(KNOWN_TEXT),
        "envelope (UTF-8 lossy) must not contain the plaintext"
    );
    assert!(
        !contains_window(&ghost, KNOWN_TEXT.as_bytes()),
        "no byte window of the envelope may match the plaintext"
    );

    let b64 = base64::engine::general_purpose::STANDARD.encode(KNOWN_TEXT.as_bytes());
    assert!(
        !contains_window(&ghost, b64.as_bytes()),
        "envelope must not contain the base64 plaintext"
    );
}

#[test]
fn test_envelope_contains_no_password() {
    let password = "a-very-recognizable-password-0123456789";
    let ghost = fast()
        .encrypt(b"data", Secret::password(password), &mut Silent)
        .expect("encrypt should succeed");
    assert!(!contains_window(&ghost, password.as_bytes()));
}

#[test]
fn test_envelope_contains_no_keyfile_material() {
    let (_, material) = ghostcrypt::keyfile::generate();
    let probe = material[..16].to_vec();
    let ghost = fast()
        .encrypt(b"data", Secret::keyfile(material), &mut Silent)
        .expect("encrypt should succeed");
    assert!(!contains_window(&ghost, &probe));
}

// ── Test 2: Single bit flips in every region ───────────────────────────────

/// Flip one bit at `offset` and return the decrypt error.
fn flip_and_decrypt(ghost: &[u8], offset: usize) -> GhostError {
    let mut tampered = ghost.to_vec();
    tampered[offset] ^= 0x01;
    match fast().decrypt(&tampered, Secret::password("hunter2"), &mut Silent) {
        Ok(_) => panic!("bit flip at offset {} was not detected", offset),
        Err(e) => e,
    }
}

#[test]
fn test_bit_flip_in_magic_fails_parse() {
    let ghost = sealed();
    for offset in 0..5 {
        assert_eq!(flip_and_decrypt(&ghost, offset).code(), "BAD_MAGIC");
    }
}

#[test]
fn test_bit_flip_in_version_fails_parse() {
    let ghost = sealed();
    assert_eq!(flip_and_decrypt(&ghost, 5).code(), "UNSUPPORTED_VERSION");
}

#[test]
fn test_bit_flip_in_authenticated_regions_rejected() {
    let ghost = sealed();
    let tag_start = ghost.len() - 64;
    // salt, IV, nonce, first/last ciphertext byte, first/last tag byte
    let offsets = [6, 37, 38, 53, 54, 65, 66, tag_start - 1, tag_start, ghost.len() - 1];
    for offset in offsets {
        assert_eq!(
            flip_and_decrypt(&ghost, offset),
            GhostError::WrongKeyOrCorrupted,
            "offset {}",
            offset
        );
    }
}

// ── Test 3: Length changes ─────────────────────────────────────────────────

#[test]
fn test_truncated_envelope_rejected() {
    let ghost = sealed();
    let err = fast()
        .decrypt(&ghost[..ghost.len() - 1], Secret::password("hunter2"), &mut Silent)
        .unwrap_err();
    assert_eq!(err, GhostError::WrongKeyOrCorrupted);
}

#[test]
fn test_extended_envelope_rejected() {
    let mut ghost = sealed();
    ghost.push(0);
    let err = fast()
        .decrypt(&ghost, Secret::password("hunter2"), &mut Silent)
        .unwrap_err();
    assert_eq!(err, GhostError::WrongKeyOrCorrupted);
}

#[test]
fn test_tiny_input_rejected_before_derivation() {
    let mut stages = Vec::new();
    let err = fast()
        .decrypt(&[0u8; 50], Secret::password("hunter2"), &mut |s: Stage| stages.push(s))
        .unwrap_err();
    assert_eq!(
        err,
        GhostError::TooSmall {
            what: ".ghost file",
            len: 50,
            min: 131
        }
    );
    assert!(
        !stages.contains(&Stage::DerivingKeys),
        "malformed input must not reach key derivation"
    );
}

// ── Test 4: No plaintext before verification ───────────────────────────────

#[test]
fn test_tampered_envelope_never_reaches_decryption() {
    let mut ghost = sealed();
    ghost[70] ^= 0x80;
    let mut stages = Vec::new();
    let result = fast().decrypt(&ghost, Secret::password("hunter2"), &mut |s: Stage| {
        stages.push(s)
    });
    assert!(result.is_err());
    assert!(!stages.contains(&Stage::DecryptingLayer2));
    assert!(!stages.contains(&Stage::DecryptingLayer1));
    assert!(!stages.contains(&Stage::PlaintextReady));
}
