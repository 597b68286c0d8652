//! Utility functions for path manipulation and program lookup.

use std::env;

use camino::Utf8PathBuf;

/// Expands a leading `~/` prefix to the user's home directory.
///
/// If the `HOME` environment variable is not set, the input is returned
/// unchanged.
///
/// # Examples
///
/// ```
/// # use berth::process::expand_tilde;
/// let home = std::env::var("HOME").expect("HOME should be set");
/// assert_eq!(expand_tilde("~/.ssh/dev.pem"), format!("{home}/.ssh/dev.pem"));
/// assert_eq!(expand_tilde("/absolute/path"), "/absolute/path");
/// ```
#[must_use]
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = env::var_os("HOME")
    {
        return format!("{}/{rest}", home.to_string_lossy());
    }
    path.to_owned()
}

/// Searches `PATH` for an executable called `program`.
///
/// Files without an execute bit are skipped. A match whose path is not
/// UTF-8 is still reported, with the lossy form of its path.
#[must_use]
pub fn find_program(program: &str) -> Option<Utf8PathBuf> {
    match which::which(program) {
        Ok(path) => Some(Utf8PathBuf::from_path_buf(path).unwrap_or_else(|raw| {
            tracing::debug!(program, path = %raw.display(), "program path is not UTF-8");
            Utf8PathBuf::from(raw.to_string_lossy().into_owned())
        })),
        Err(err) => {
            tracing::debug!(program, error = %err, "program not found on PATH");
            None
        }
    }
}
