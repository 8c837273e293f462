//! Shared helpers for the command implementations.

use std::ffi::OsString;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use owo_colors::{OwoColorize, Stream::Stderr};
use zeroize::Zeroizing;

use ghostcrypt::pipeline::{ProgressSink, Stage};

/// `<input>.ghost`
pub fn ghost_output_path(input: &Path) -> PathBuf {
    append_suffix(input, ".ghost")
}

/// `<input>.gkey`
pub fn keyfile_output_path(input: &Path) -> PathBuf {
    append_suffix(input, ".gkey")
}

/// Strip a trailing `.ghost`, or append `.decrypted` when there is none.
pub fn decrypted_output_path(input: &Path) -> PathBuf {
    match input.extension() {
        Some(ext) if ext == "ghost" => input.with_extension(""),
        _ => append_suffix(input, ".decrypted"),
    }
}

fn append_suffix(input: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Convert a byte count to a short human-readable string.
///
/// < 1024 -> "N B", < 1 MiB -> "X.Y KiB", otherwise "X.Y MiB".
pub fn human_bytes(len: usize) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    let n = len as f64;
    if n >= MIB {
        format!("{:.1} MiB", n / MIB)
    } else if n >= KIB {
        format!("{:.1} KiB", n / KIB)
    } else {
        format!("{} B", len)
    }
}

/// Decide whether `path` may be written.
///
/// Missing files and `--yes` pass straight through. Otherwise the user is
/// asked on a terminal; non-interactive runs refuse.
pub fn confirm_overwrite(path: &Path, yes: bool) -> anyhow::Result<bool> {
    if yes || !path.exists() {
        return Ok(true);
    }

    if !io::stdin().is_terminal() {
        eprintln!("Use --yes to confirm overwrite in non-interactive mode");
        return Ok(false);
    }

    eprint!("{} already exists. Overwrite? [y/N]: ", path.display());
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Prompt for a password on the terminal, twice when `confirm` is set.
pub fn prompt_password(confirm: bool) -> anyhow::Result<Zeroizing<String>> {
    if !io::stdin().is_terminal() {
        anyhow::bail!("Password entry requires an interactive terminal; use --keyfile instead");
    }

    let mut prompt = dialoguer::Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords don't match");
    }
    let password = Zeroizing::new(
        prompt
            .interact()
            .map_err(|e| anyhow::anyhow!("Password prompt failed: {}", e))?,
    );
    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }
    Ok(password)
}

/// Prints each stage's status line to stderr.
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn report(&mut self, stage: Stage) {
        eprintln!("{}", stage.message().if_supports_color(Stderr, |t| t.dimmed()));
    }
}
