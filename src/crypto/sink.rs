//! Output sinks for a derived key.
//!
//! Key files are owner-only (0600) on Unix, including files that already
//! existed with wider permissions.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use super::keys::DerivedKey;

/// Raw key plus its hex encoding, written as sibling files.
///
/// `KeyFiles::new("out/tkey-derived-key")` writes `out/tkey-derived-key.bin`
/// and `out/tkey-derived-key.hex`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFiles {
    base: PathBuf,
}

impl KeyFiles {
    /// Sink rooted at `base` (extension is replaced).
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Path of the raw key file.
    pub fn bin_path(&self) -> PathBuf {
        self.base.with_extension("bin")
    }

    /// Path of the hex key file.
    pub fn hex_path(&self) -> PathBuf {
        self.base.with_extension("hex")
    }

    /// Write both files, replacing existing ones.
    pub fn write(&self, key: &DerivedKey) -> io::Result<()> {
        write_private(&self.bin_path(), key.as_bytes())?;
        write_private(&self.hex_path(), key.to_hex().as_bytes())?;
        info!(bin = %self.bin_path().display(), hex = %self.hex_path().display(), "key saved");
        Ok(())
    }
}

/// Write the raw key to `path`, or to stdout when `path` is `-`.
pub fn write_raw(path: &Path, key: &DerivedKey) -> io::Result<()> {
    if path == Path::new("-") {
        let mut stdout = io::stdout().lock();
        stdout.write_all(key.as_bytes())?;
        return stdout.flush();
    }
    write_private(path, key.as_bytes())?;
    info!(path = %path.display(), "key written");
    Ok(())
}

fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = open_private(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<File> {
    use std::fs::Permissions;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation
    file.set_permissions(Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
