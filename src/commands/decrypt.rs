/// Decrypt command: opens a `.ghost` envelope with a password or keyfile and
/// writes the recovered plaintext.
use anyhow::Context;
use owo_colors::{
    OwoColorize,
    Stream::{Stderr, Stdout},
};
use tracing::warn;

use ghostcrypt::error::GhostError;
use ghostcrypt::keyfile::store;
use ghostcrypt::pipeline::{KeySource, Pipeline, ProgressSink, Request, Response, Silent};

use crate::cli::DecryptArgs;
use crate::util::{self, StderrProgress};

/// Short error returned after the colored explanation has been printed.
const WRONG_SECRET_SUMMARY: &str = "Authentication failed, nothing was decrypted";

pub fn run_decrypt(args: DecryptArgs, quiet: bool) -> anyhow::Result<()> {
    // ── 1. Read and sanity-check the envelope ────────────────────────────
    let ghost = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    ghostcrypt::envelope::parse(&ghost)
        .with_context(|| format!("{} is not a valid ghost file", args.file.display()))?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| util::decrypted_output_path(&args.file));
    if !util::confirm_overwrite(&output, args.yes)? {
        println!("Aborted.");
        return Ok(());
    }

    // ── 2. Choose the secret ─────────────────────────────────────────────
    let key = match &args.keyfile {
        Some(keyfile_path) => {
            let keyfile = store::read_keyfile(keyfile_path)?;
            if keyfile.verify_fingerprint().is_err() {
                warn!(path = %keyfile_path.display(), "keyfile fingerprint mismatch");
                eprintln!(
                    "{}",
                    "Warning: keyfile fingerprint does not match its key material; the file may be damaged."
                        .if_supports_color(Stderr, |t| t.yellow())
                );
            }
            KeySource::Material(keyfile.material().clone())
        }
        None => KeySource::Password(util::prompt_password(false)?),
    };

    // ── 3. Run the pipeline ──────────────────────────────────────────────
    let mut sink: Box<dyn ProgressSink> = if quiet {
        Box::new(Silent)
    } else {
        Box::new(StderrProgress)
    };
    let request = Request::Decrypt {
        envelope: ghost,
        key,
    };
    let plaintext = match Pipeline::new().execute(request, sink.as_mut()) {
        Ok(Response::Plaintext(plaintext)) => plaintext,
        Ok(_) => anyhow::bail!("Decrypt request returned an unexpected response"),
        Err(GhostError::WrongKeyOrCorrupted) => {
            eprintln!(
                "{}",
                "Error: Wrong password or keyfile, or the file is corrupted."
                    .if_supports_color(Stderr, |t| t.red())
            );
            anyhow::bail!(WRONG_SECRET_SUMMARY);
        }
        Err(e) => return Err(e.into()),
    };

    // ── 4. Write plaintext ───────────────────────────────────────────────
    std::fs::write(&output, plaintext.as_slice())
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{}",
        "Decrypted successfully.".if_supports_color(Stdout, |t| t.green())
    );
    println!();
    println!("Output:   {} ({})", output.display(), util::human_bytes(plaintext.len()));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_secret_summary_does_not_repeat_explanation() {
        let explanation = GhostError::WrongKeyOrCorrupted.to_string();
        assert_ne!(WRONG_SECRET_SUMMARY, explanation);
        assert!(!WRONG_SECRET_SUMMARY.contains("password"));
        assert!(!explanation.contains(WRONG_SECRET_SUMMARY));
    }
}
