//! Sampling whether a mount point has entries.

use std::io;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};

use super::MountError;

/// Reports whether a mount point currently has entries.
pub trait MountProbe {
    /// Returns `true` when `path` lists at least one entry.
    ///
    /// # Errors
    ///
    /// Returns [`MountError::Unreadable`] when `path` cannot be listed.
    fn is_populated(&self, path: &Utf8Path) -> Result<bool, MountError>;
}

/// Lists the mount point through `cap-std`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectoryProbe;

impl MountProbe for DirectoryProbe {
    fn is_populated(&self, path: &Utf8Path) -> Result<bool, MountError> {
        let unreadable = |err: &io::Error| MountError::Unreadable {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        let dir = Dir::open_ambient_dir(path, ambient_authority()).map_err(|err| unreadable(&err))?;
        let mut entries = dir.entries().map_err(|err| unreadable(&err))?;
        Ok(entries.next().is_some())
    }
}
