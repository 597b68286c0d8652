//! Scratch marker signalling that an invocation is in progress.
//!
//! This is a liveness hint, not a lock: two invocations can still race.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};

const MARKER_FILE: &str = "berth.marker";
const MARKER_CONTENTS: &str = "Nothing to see here...\n";

/// Marker file removed when dropped.
#[derive(Debug)]
pub struct SessionMarker {
    dir: Dir,
    path: Utf8PathBuf,
}

impl SessionMarker {
    /// Creates the marker in the system temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the marker cannot be written.
    pub fn create() -> io::Result<Self> {
        let dir = Utf8PathBuf::from_path_buf(std::env::temp_dir()).map_err(|path| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("temporary directory is not UTF-8: {}", path.display()),
            )
        })?;
        Self::create_in(&dir)
    }

    /// Creates the marker inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the marker cannot be written.
    pub fn create_in(dir: &Utf8Path) -> io::Result<Self> {
        let handle = Dir::open_ambient_dir(dir, ambient_authority())?;
        let path = dir.join(MARKER_FILE);
        if handle.try_exists(MARKER_FILE)? {
            tracing::warn!(%path, "another invocation may be running");
        }
        handle.write(MARKER_FILE, MARKER_CONTENTS)?;
        Ok(Self { dir: handle, path })
    }

    /// Location of the marker.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for SessionMarker {
    fn drop(&mut self) {
        if let Err(err) = self.dir.remove_file(MARKER_FILE)
            && err.kind() != io::ErrorKind::NotFound
        {
            tracing::debug!(path = %self.path, error = %err, "failed to remove session marker");
        }
    }
}
