use anyhow::Context;
use std::io::Write;
use std::path::Path;

use super::Keyfile;

/// Write keyfile bytes atomically (temp file then rename) with 0600 permissions.
///
/// The temp file is created exclusively in the destination directory under a
/// random name, already restricted to its owner, so key material is never
/// written to a pre-existing path or to a file others can open.
pub fn write_keyfile_atomic(bytes: &[u8], dest: &Path) -> anyhow::Result<()> {
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if dest.file_name().is_none() {
        anyhow::bail!("Keyfile destination {} has no file name", dest.display());
    }

    let mut tmp = tempfile::Builder::new()
        .prefix(".gkey-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .with_context(|| format!("Failed to create temp keyfile in {}", parent.display()))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .with_context(|| format!("Failed to write keyfile to {}", tmp.path().display()))?;

    // On failure the temp file is removed when the returned handle drops.
    tmp.persist(dest)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move keyfile into {}", dest.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dest, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set 0600 permissions on {}", dest.display()))?;
    }

    Ok(())
}

/// Read and parse a keyfile from disk.
pub fn read_keyfile(path: &Path) -> anyhow::Result<Keyfile> {
    let bytes = zeroize::Zeroizing::new(
        std::fs::read(path)
            .with_context(|| format!("Failed to read keyfile {}", path.display()))?,
    );
    super::parse(&bytes).with_context(|| format!("Invalid keyfile at {}", path.display()))
}
