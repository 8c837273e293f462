/// Encrypt command: reads a file, seals it into a `.ghost` envelope, and
/// optionally writes a freshly generated keyfile next to it.
use anyhow::Context;
use owo_colors::{
    OwoColorize,
    Stream::{Stderr, Stdout},
};
use tracing::warn;
use zeroize::Zeroizing;

use ghostcrypt::keyfile::store;
use ghostcrypt::pipeline::{
    EncryptKey, KeySource, Pipeline, ProgressSink, Request, Response, Silent,
};

use crate::cli::EncryptArgs;
use crate::util::{self, StderrProgress};

pub fn run_encrypt(args: EncryptArgs, quiet: bool) -> anyhow::Result<()> {
    // ── 1. Resolve output paths ──────────────────────────────────────────
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| util::ghost_output_path(&args.file));
    if !util::confirm_overwrite(&output, args.yes)? {
        println!("Aborted.");
        return Ok(());
    }

    let new_keyfile_path = if args.new_keyfile {
        let path = util::keyfile_output_path(&args.file);
        if !util::confirm_overwrite(&path, args.yes)? {
            println!("Aborted.");
            return Ok(());
        }
        Some(path)
    } else {
        None
    };

    // ── 2. Read plaintext ────────────────────────────────────────────────
    let plaintext = Zeroizing::new(
        std::fs::read(&args.file)
            .with_context(|| format!("Failed to read {}", args.file.display()))?,
    );

    // ── 3. Choose the secret ─────────────────────────────────────────────
    let key = if let Some(keyfile_path) = &args.keyfile {
        let keyfile = store::read_keyfile(keyfile_path)?;
        if keyfile.verify_fingerprint().is_err() {
            warn!(path = %keyfile_path.display(), "keyfile fingerprint mismatch");
            eprintln!(
                "{}",
                "Warning: keyfile fingerprint does not match its key material; the file may be damaged."
                    .if_supports_color(Stderr, |t| t.yellow())
            );
        }
        EncryptKey::Use(KeySource::Material(keyfile.material().clone()))
    } else if args.new_keyfile {
        EncryptKey::NewKeyfile
    } else {
        EncryptKey::Use(KeySource::Password(util::prompt_password(true)?))
    };

    // ── 4. Run the pipeline ──────────────────────────────────────────────
    let mut sink: Box<dyn ProgressSink> = if quiet {
        Box::new(Silent)
    } else {
        Box::new(StderrProgress)
    };
    let plaintext_len = plaintext.len();
    let response = Pipeline::new().execute(Request::Encrypt { plaintext, key }, sink.as_mut())?;
    let (ghost, keyfile) = match response {
        Response::Envelope { ghost, keyfile } => (ghost, keyfile),
        _ => anyhow::bail!("Encrypt request returned an unexpected response"),
    };

    // ── 5. Write results ─────────────────────────────────────────────────
    if let (Some(path), Some(bytes)) = (&new_keyfile_path, &keyfile) {
        store::write_keyfile_atomic(bytes, path).context("Failed to write keyfile")?;
    }
    std::fs::write(&output, &ghost)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{}",
        "Encrypted successfully.".if_supports_color(Stdout, |t| t.green())
    );
    println!();
    println!("Input:    {} ({})", args.file.display(), util::human_bytes(plaintext_len));
    println!("Output:   {} ({})", output.display(), util::human_bytes(ghost.len()));
    if let Some(path) = &new_keyfile_path {
        println!("Keyfile:  {}", path.display());
        println!();
        println!(
            "{}",
            "Keep the keyfile safe. Without it the file cannot be decrypted."
                .if_supports_color(Stdout, |t| t.yellow())
        );
    }

    Ok(())
}
