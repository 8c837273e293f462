//! Integrity verifier: HMAC-SHA512 over `salt ‖ cipher IV ‖ stream nonce ‖ ciphertext`.

use hmac::digest::{Key, KeyInit};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::cipher::{CIPHER_IV_LEN, STREAM_NONCE_LEN};
use super::kdf::{KEY_LEN, SALT_LEN};

type HmacSha512 = Hmac<Sha512>;

/// Tag length stored at the end of every envelope.
pub const TAG_LEN: usize = 64;

/// The envelope fields covered by the tag, in authentication order.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedFields<'a> {
    pub salt: &'a [u8; SALT_LEN],
    pub cipher_iv: &'a [u8; CIPHER_IV_LEN],
    pub stream_nonce: &'a [u8; STREAM_NONCE_LEN],
    pub ciphertext: &'a [u8],
}

/// Compute the tag. Fields are fed back to back with no separators or length prefixes.
pub fn compute(mac_key: &[u8; KEY_LEN], fields: &AuthenticatedFields<'_>) -> [u8; TAG_LEN] {
    // Zero-padding to the SHA-512 block size is how HMAC treats short keys.
    let mut block_key = Key::<HmacSha512>::default();
    block_key[..KEY_LEN].copy_from_slice(mac_key);
    let mut mac = <HmacSha512 as KeyInit>::new(&block_key);
    block_key.as_mut_slice().zeroize();
    mac.update(fields.salt);
    mac.update(fields.cipher_iv);
    mac.update(fields.stream_nonce);
    mac.update(fields.ciphertext);

    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    tag
}

/// Recompute the tag and compare it to `stored_tag` in constant time.
///
/// Returns `false` on any mismatch, including a wrong-length `stored_tag`.
pub fn verify(
    mac_key: &[u8; KEY_LEN],
    fields: &AuthenticatedFields<'_>,
    stored_tag: &[u8],
) -> bool {
    let expected = compute(mac_key, fields);
    bool::from(expected[..].ct_eq(stored_tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields<'a>(ciphertext: &'a [u8]) -> AuthenticatedFields<'a> {
        AuthenticatedFields {
            salt: &[1u8; 32],
            cipher_iv: &[2u8; 16],
            stream_nonce: &[3u8; 12],
            ciphertext,
        }
    }

    #[test]
    fn test_compute_matches_plain_concatenation() {
        let key = [4u8; 32];
        let ciphertext = [5u8; 20];
        let tag = compute(&key, &fields(&ciphertext));

        let mut concatenated = Vec::new();
        concatenated.extend_from_slice(&[1u8; 32]);
        concatenated.extend_from_slice(&[2u8; 16]);
        concatenated.extend_from_slice(&[3u8; 12]);
        concatenated.extend_from_slice(&ciphertext);
        let mut mac = <HmacSha512 as Mac>::new_from_slice(&key).expect("any key size");
        mac.update(&concatenated);
        let reference = mac.finalize().into_bytes();

        assert_eq!(&tag[..], &reference[..]);
    }

    #[test]
    fn test_compute_matches_variable_length_key_init() {
        let key: [u8; 32] = core::array::from_fn(|i| (i as u8).wrapping_mul(37).wrapping_add(1));
        let ciphertext = [9u8; 48];
        let tag = compute(&key, &fields(&ciphertext));

        let mut mac = <HmacSha512 as Mac>::new_from_slice(&key).expect("any key size");
        mac.update(&[1u8; 32]);
        mac.update(&[2u8; 16]);
        mac.update(&[3u8; 12]);
        mac.update(&ciphertext);
        assert_eq!(&tag[..], &mac.finalize().into_bytes()[..]);
    }

    #[test]
    fn test_verify_accepts_valid_tag() {
        let key = [4u8; 32];
        let ciphertext = [5u8; 20];
        let tag = compute(&key, &fields(&ciphertext));
        assert!(verify(&key, &fields(&ciphertext), &tag));
    }

    #[test]
    fn test_verify_rejects_any_flipped_tag_bit() {
        let key = [4u8; 32];
        let ciphertext = [5u8; 20];
        let tag = compute(&key, &fields(&ciphertext));
        for byte in [0usize, 31, 63] {
            let mut tampered = tag;
            tampered[byte] ^= 0x01;
            assert!(!verify(&key, &fields(&ciphertext), &tampered), "byte {}", byte);
        }
    }

    #[test]
    fn test_verify_rejects_wrong_key_and_ciphertext() {
        let ciphertext = [5u8; 20];
        let tag = compute(&[4u8; 32], &fields(&ciphertext));
        assert!(!verify(&[6u8; 32], &fields(&ciphertext), &tag));
        assert!(!verify(&[4u8; 32], &fields(&[5u8; 21]), &tag));
    }

    #[test]
    fn test_verify_rejects_short_tag() {
        let key = [4u8; 32];
        let ciphertext = [5u8; 20];
        let tag = compute(&key, &fields(&ciphertext));
        assert!(!verify(&key, &fields(&ciphertext), &tag[..63]));
    }
}
