/// Inspect command: shows the non-secret header fields of a `.ghost` or
/// `.gkey` file without asking for any secret.
use anyhow::Context;
use serde::Serialize;

use ghostcrypt::{envelope, keyfile};

use crate::cli::InspectArgs;
use crate::util::human_bytes;

/// What `inspect` reports. Never contains key material.
#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    Envelope {
        version: u8,
        total_len: usize,
        salt: String,
        cipher_iv: String,
        stream_nonce: String,
        ciphertext_len: usize,
        tag: String,
    },
    Keyfile {
        version: u8,
        fingerprint: String,
        short_fingerprint: String,
        fingerprint_valid: bool,
    },
}

pub fn run_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let bytes = zeroize::Zeroizing::new(
        std::fs::read(&args.file)
            .with_context(|| format!("Failed to read {}", args.file.display()))?,
    );
    let report = build_report(&bytes)
        .with_context(|| format!("Failed to inspect {}", args.file.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        println!("{}", render_table(&report));
    }
    Ok(())
}

/// Pick a decoder from the magic prefix and collect the public fields.
pub fn build_report(bytes: &[u8]) -> anyhow::Result<Report> {
    if envelope::looks_like_envelope(bytes) {
        let env = envelope::parse(bytes)?;
        Ok(Report::Envelope {
            version: envelope::ENVELOPE_VERSION,
            total_len: env.encoded_len(),
            salt: hex(env.salt),
            cipher_iv: hex(env.cipher_iv),
            stream_nonce: hex(env.stream_nonce),
            ciphertext_len: env.ciphertext.len(),
            tag: hex(env.tag),
        })
    } else if keyfile::looks_like_keyfile(bytes) {
        let kf = keyfile::parse(bytes)?;
        Ok(Report::Keyfile {
            version: keyfile::KEYFILE_VERSION,
            fingerprint: hex(kf.fingerprint()),
            short_fingerprint: kf.short_fingerprint(),
            fingerprint_valid: kf.verify_fingerprint().is_ok(),
        })
    } else {
        anyhow::bail!("Not a ghost file or keyfile (unrecognized magic bytes)")
    }
}

fn render_table(report: &Report) -> comfy_table::Table {
    use comfy_table::{Cell, Color, Table};

    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    match report {
        Report::Envelope {
            version,
            total_len,
            salt,
            cipher_iv,
            stream_nonce,
            ciphertext_len,
            tag,
        } => {
            table.add_row(vec!["Type", "ghost envelope"]);
            table.add_row(vec!["Version".to_string(), version.to_string()]);
            table.add_row(vec!["Size".to_string(), human_bytes(*total_len)]);
            table.add_row(vec!["Salt", salt.as_str()]);
            table.add_row(vec!["AES-CBC IV", cipher_iv.as_str()]);
            table.add_row(vec!["ChaCha20 nonce", stream_nonce.as_str()]);
            table.add_row(vec!["Ciphertext".to_string(), human_bytes(*ciphertext_len)]);
            table.add_row(vec!["HMAC-SHA512 tag", tag.as_str()]);
        }
        Report::Keyfile {
            version,
            fingerprint,
            short_fingerprint,
            fingerprint_valid,
        } => {
            table.add_row(vec!["Type", "keyfile"]);
            table.add_row(vec!["Version".to_string(), version.to_string()]);
            table.add_row(vec!["Fingerprint", fingerprint.as_str()]);
            table.add_row(vec!["Short fingerprint", short_fingerprint.as_str()]);
            table.add_row(vec![
                Cell::new("Fingerprint check"),
                if *fingerprint_valid {
                    Cell::new("ok").fg(Color::Green)
                } else {
                    Cell::new("MISMATCH").fg(Color::Red)
                },
            ]);
        }
    }
    table
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_for_envelope() {
        let ghost = envelope::build(&[0xab; 32], &[1; 16], &[2; 12], &[9; 48], &[3; 64]);
        match build_report(&ghost).expect("envelope should inspect") {
            Report::Envelope {
                total_len,
                salt,
                ciphertext_len,
                ..
            } => {
                assert_eq!(total_len, 66 + 48 + 64);
                assert_eq!(ciphertext_len, 48);
                assert_eq!(salt, "ab".repeat(32));
            }
            other => panic!("expected envelope report, got {:?}", other),
        }
    }

    #[test]
    fn test_report_for_keyfile_has_no_material() {
        let (kf, material) = keyfile::generate();
        let report = build_report(&kf.to_bytes()).expect("keyfile should inspect");
        let json = serde_json::to_string(&report).expect("report should serialize");
        assert!(json.contains("\"kind\":\"keyfile\""), "got: {}", json);
        assert!(json.contains("\"fingerprint_valid\":true"));
        assert!(!json.contains(&hex(&material[..])), "key material must not be reported");
    }

    #[test]
    fn test_report_rejects_unknown_magic() {
        assert!(build_report(b"plain text file, nothing to see").is_err());
    }

    #[test]
    fn test_report_propagates_parse_errors() {
        let err = build_report(b"GHOST\x01short").unwrap_err();
        let root = err
            .downcast_ref::<ghostcrypt::error::GhostError>()
            .expect("root cause should be a GhostError");
        assert_eq!(root.code(), "TOO_SMALL");
    }
}
