use sha2::{Digest, Sha256};

use super::{FINGERPRINT_LEN, KEY_MATERIAL_LEN};

pub fn compute(material: &[u8; KEY_MATERIAL_LEN]) -> [u8; FINGERPRINT_LEN] {
    Sha256::digest(material).into()
}

pub fn short_fingerprint(fingerprint: &[u8; FINGERPRINT_LEN]) -> String {
    fingerprint[..8].iter().map(|b| format!("{:02x}", b)).collect()
}
