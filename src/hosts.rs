//! Pointing a local hosts-file entry at the workstation's address.

use std::env;
use std::fmt::Write as _;
use std::net::IpAddr;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::Deserialize;
use thiserror::Error;

/// Decides whether hosts edits are attempted on this machine.
pub trait PlatformPolicy {
    /// Whether edits are allowed on the current operating system.
    fn permits_edit(&self) -> bool;

    /// Short name used in messages.
    fn describe(&self) -> &'static str;
}

/// Built-in platform policies selectable from `berth.toml`.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HostsPlatform {
    /// Only edit on Linux.
    #[default]
    Linux,
    /// Edit on any platform.
    Any,
}

impl PlatformPolicy for HostsPlatform {
    fn permits_edit(&self) -> bool {
        match self {
            Self::Linux => env::consts::OS == "linux",
            Self::Any => true,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Any => "any",
        }
    }
}

/// How an existing file is rewritten.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HostsMode {
    /// Replace the address on lines already naming the domain.
    Gentle,
    /// Drop lines naming the domain and append a fresh entry.
    Overwrite,
}

impl HostsMode {
    /// Selects gentle mode when `gentle` is set.
    #[must_use]
    pub const fn from_gentle(gentle: bool) -> Self {
        if gentle { Self::Gentle } else { Self::Overwrite }
    }
}

/// Result of a hosts edit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HostsOutcome {
    /// The file was rewritten.
    Updated {
        /// File that was written.
        path: Utf8PathBuf,
    },
    /// The file already pointed the domain at the address.
    Unchanged,
    /// Gentle mode found no line naming the domain.
    NoEntry,
    /// The platform policy forbids edits here.
    PlatformUnsupported {
        /// Policy that refused.
        platform: &'static str,
    },
}

/// Errors raised while reading or writing the hosts file.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum HostsError {
    /// Raised when file system operations fail.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

/// Rewritten file contents plus how many entries named the domain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rewrite {
    /// New file contents.
    pub contents: String,
    /// Lines that named the domain before rewriting.
    pub matched: usize,
}

fn names_domain(line: &str, domain: &str) -> bool {
    let content = line.split('#').next().unwrap_or_default();
    content
        .split_whitespace()
        .skip(1)
        .any(|host| host.eq_ignore_ascii_case(domain))
}

fn replace_address(line: &str, address: IpAddr) -> String {
    let trimmed = line.trim_start();
    let rest = trimmed
        .find(char::is_whitespace)
        .and_then(|index| trimmed.get(index..))
        .unwrap_or_default();
    format!("{address}{rest}")
}

/// Rewrites hosts-file `contents` so `domain` resolves to `address`.
#[must_use]
pub fn rewrite(contents: &str, domain: &str, address: IpAddr, mode: HostsMode) -> Rewrite {
    let mut matched = 0;
    let mut lines = Vec::new();
    for line in contents.lines() {
        if !names_domain(line, domain) {
            lines.push(line.to_owned());
            continue;
        }
        matched += 1;
        if mode == HostsMode::Gentle {
            lines.push(replace_address(line, address));
        }
    }

    let mut rewritten = lines.join("\n");
    if mode == HostsMode::Overwrite {
        if !rewritten.is_empty() {
            rewritten.push('\n');
        }
        write!(rewritten, "{address}\t{domain}").ok();
    }
    if contents.ends_with('\n') || mode == HostsMode::Overwrite {
        rewritten.push('\n');
    }

    Rewrite {
        contents: rewritten,
        matched,
    }
}

/// Reads, rewrites, and writes back a hosts file.
#[derive(Clone, Debug)]
pub struct HostsEditor<P: PlatformPolicy> {
    path: Utf8PathBuf,
    policy: P,
}

impl<P: PlatformPolicy> HostsEditor<P> {
    /// Creates an editor for `path` governed by `policy`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, policy: P) -> Self {
        Self {
            path: path.into(),
            policy,
        }
    }

    /// Points `domain` at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::Io`] when the file cannot be read or written.
    pub fn apply(
        &self,
        domain: &str,
        address: IpAddr,
        mode: HostsMode,
    ) -> Result<HostsOutcome, HostsError> {
        if !self.policy.permits_edit() {
            return Ok(HostsOutcome::PlatformUnsupported {
                platform: self.policy.describe(),
            });
        }

        let (dir, file_name) = self.open_parent()?;
        let current = dir
            .read_to_string(file_name)
            .map_err(|err| io_error(&self.path, &err))?;
        let rewritten = rewrite(&current, domain, address, mode);

        if mode == HostsMode::Gentle && rewritten.matched == 0 {
            return Ok(HostsOutcome::NoEntry);
        }
        if rewritten.contents == current {
            return Ok(HostsOutcome::Unchanged);
        }

        dir.write(file_name, rewritten.contents)
            .map_err(|err| io_error(&self.path, &err))?;
        tracing::debug!(path = %self.path, domain, %address, "hosts file updated");
        Ok(HostsOutcome::Updated {
            path: self.path.clone(),
        })
    }

    fn open_parent(&self) -> Result<(Dir, &str), HostsError> {
        let parent = self.path.parent().unwrap_or_else(|| Utf8Path::new("/"));
        let file_name = self.path.file_name().ok_or_else(|| HostsError::Io {
            path: self.path.clone(),
            message: String::from("hosts file path is missing a filename"),
        })?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority())
            .map_err(|err| io_error(parent, &err))?;
        Ok((dir, file_name))
    }
}

fn io_error(path: &Utf8Path, err: &std::io::Error) -> HostsError {
    HostsError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
