use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ghostcrypt", version, about = "Layered file encryption into .ghost envelopes")]
pub struct Cli {
    /// Suppress stage progress on stderr
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Log level used when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encrypt a file into a .ghost envelope
    Encrypt(EncryptArgs),
    /// Decrypt a .ghost envelope
    Decrypt(DecryptArgs),
    /// Generate a new .gkey keyfile
    Keygen(KeygenArgs),
    /// Show the non-secret header fields of a .ghost or .gkey file
    Inspect(InspectArgs),
}

#[derive(Args)]
pub struct EncryptArgs {
    /// File to encrypt
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Encrypt with an existing keyfile instead of a password
    #[arg(long, value_name = "PATH", conflicts_with = "new_keyfile")]
    pub keyfile: Option<PathBuf>,

    /// Generate a fresh keyfile, encrypt with it, and save it as <FILE>.gkey
    #[arg(long)]
    pub new_keyfile: bool,

    /// Output path (default: <FILE>.ghost)
    #[arg(long, short = 'o', value_name = "OUT")]
    pub output: Option<PathBuf>,

    /// Overwrite existing output files without asking
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args)]
pub struct DecryptArgs {
    /// .ghost file to decrypt
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Decrypt with a keyfile instead of a password
    #[arg(long, value_name = "PATH")]
    pub keyfile: Option<PathBuf>,

    /// Output path (default: <FILE> without .ghost)
    #[arg(long, short = 'o', value_name = "OUT")]
    pub output: Option<PathBuf>,

    /// Overwrite an existing output file without asking
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args)]
pub struct KeygenArgs {
    /// Where to write the keyfile
    #[arg(long, short = 'o', value_name = "PATH", default_value = "ghostcrypt-key.gkey")]
    pub output: PathBuf,

    /// Overwrite an existing keyfile without asking
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args)]
pub struct InspectArgs {
    /// .ghost or .gkey file to inspect
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}
