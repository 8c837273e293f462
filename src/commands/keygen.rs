use anyhow::Context;
use owo_colors::{OwoColorize, Stream::Stdout};

use ghostcrypt::keyfile::{store, Keyfile};
use ghostcrypt::pipeline::{Pipeline, Request, Response, Silent};

use crate::cli::KeygenArgs;
use crate::util;

pub fn run_keygen(args: KeygenArgs) -> anyhow::Result<()> {
    if !util::confirm_overwrite(&args.output, args.yes)? {
        println!("Aborted.");
        return Ok(());
    }

    let (bytes, material) = match Pipeline::new().execute(Request::GenerateKeyfile, &mut Silent)? {
        Response::Keyfile { bytes, material } => (bytes, material),
        _ => anyhow::bail!("Keygen request returned an unexpected response"),
    };
    store::write_keyfile_atomic(&bytes, &args.output).context("Failed to write keyfile")?;

    let fingerprint = Keyfile::from_material(material).short_fingerprint();

    println!(
        "{}",
        "Keyfile generated successfully.".if_supports_color(Stdout, |t| t.green())
    );
    println!();
    println!("Fingerprint: {}", fingerprint);
    println!("Key file:    {}", args.output.display());
    println!();
    println!(
        "{}",
        "Anyone holding this file can decrypt what it protects. Store it offline."
            .if_supports_color(Stdout, |t| t.yellow())
    );

    Ok(())
}
