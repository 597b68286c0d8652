//! Identifier resolution for machine ids, credentials, and mount settings.
//!
//! Each parameter kind is resolved by trying an ordered list of sources and
//! taking the first hit. Sources are plain functions over a
//! [`ResolutionContext`], so precedence can be exercised in isolation and the
//! result is a pure function of its inputs.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::config_store::{CredentialFiles, DEFAULT_CREDENTIAL_KEY, Settings};
use crate::machine::{MachineId, MachineRef};
use crate::process::expand_tilde;

/// Alias used when the operator does not name a target.
pub const DEFAULT_ALIAS: &str = "default";
/// Remote login used when nothing else is configured.
pub const DEFAULT_REMOTE_USER: &str = "ubuntu";
/// Remote directory exposed when nothing else is configured.
pub const DEFAULT_REMOTE_DIR: &str = "/var/www/html";

/// Errors raised when a required parameter has no source.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ResolveError {
    /// No source produced a machine id, and the target is not a known id.
    #[error("could not resolve machine id for '{alias}'")]
    MachineId {
        /// Alias or literal id the operator asked for.
        alias: String,
    },
    /// No source produced a credential file.
    #[error("could not load credential file for '{alias}'")]
    CredentialFile {
        /// Alias in use when resolution failed.
        alias: String,
    },
    /// No source produced a mount path.
    #[error("could not resolve mount path; set mount_path in berth.toml or pass --mount-path")]
    MountPath,
}

/// Values supplied explicitly for this invocation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Overrides {
    /// Machine id supplied by the caller.
    pub machine_id: Option<String>,
    /// Credential file supplied by the caller.
    pub credential_file: Option<String>,
    /// Mount path supplied by the caller.
    pub mount_path: Option<String>,
    /// Remote user supplied by the caller.
    pub remote_user: Option<String>,
    /// Remote directory supplied by the caller.
    pub remote_dir: Option<String>,
}

/// Values already resolved earlier in the same invocation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SessionCache {
    /// Previously resolved machine id.
    pub machine_id: Option<String>,
    /// Previously resolved credential file.
    pub credential_file: Option<String>,
    /// Previously resolved mount path.
    pub mount_path: Option<String>,
    /// Previously resolved remote user.
    pub remote_user: Option<String>,
    /// Previously resolved remote directory.
    pub remote_dir: Option<String>,
}

impl From<&ResolvedParams> for SessionCache {
    fn from(params: &ResolvedParams) -> Self {
        Self {
            machine_id: Some(params.machine_id.to_string()),
            credential_file: Some(params.credential_file.to_string()),
            mount_path: Some(params.mount_path.to_string()),
            remote_user: Some(params.remote_user.clone()),
            remote_dir: Some(params.remote_dir.clone()),
        }
    }
}

/// Fully resolved parameters for handlers that touch the file system bridge.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedParams {
    /// Target machine.
    pub machine_id: MachineId,
    /// Private key used for SSH and sshfs.
    pub credential_file: Utf8PathBuf,
    /// Local mount point.
    pub mount_path: Utf8PathBuf,
    /// Remote login.
    pub remote_user: String,
    /// Remote directory exposed at the mount point.
    pub remote_dir: String,
}

/// Everything a source may consult.
#[derive(Clone, Copy, Debug)]
pub struct ResolutionContext<'a> {
    /// Explicit values for this invocation.
    pub overrides: &'a Overrides,
    /// Values resolved earlier in this invocation.
    pub session: &'a SessionCache,
    /// Loaded settings document.
    pub settings: &'a Settings,
    /// Alias (or literal id) the operator targeted.
    pub alias: &'a str,
}

impl<'a> ResolutionContext<'a> {
    /// Builds a context.
    #[must_use]
    pub const fn new(
        overrides: &'a Overrides,
        session: &'a SessionCache,
        settings: &'a Settings,
        alias: &'a str,
    ) -> Self {
        Self {
            overrides,
            session,
            settings,
            alias,
        }
    }

    /// Resolves the machine id from explicit, cached, and alias sources.
    ///
    /// Returns `None` when the target must be validated as a literal id; see
    /// [`Self::literal_machine_id`].
    #[must_use]
    pub fn machine_id(&self) -> Option<MachineId> {
        first_match(&MACHINE_ID_SOURCES, self)
    }

    /// Accepts the target itself as a machine id when the provider lists it.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::MachineId`] when no listed machine carries the
    /// target as its id.
    pub fn literal_machine_id(&self, known: &[MachineRef]) -> Result<MachineId, ResolveError> {
        let candidate = self.alias.trim();
        known
            .iter()
            .find(|machine| machine.id == candidate)
            .and_then(|machine| MachineId::new(machine.id.as_str()))
            .ok_or_else(|| ResolveError::MachineId {
                alias: self.alias.to_owned(),
            })
    }

    /// Resolves the credential file path.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::CredentialFile`] when no source applies.
    pub fn credential_file(&self) -> Result<Utf8PathBuf, ResolveError> {
        first_match(&CREDENTIAL_SOURCES, self)
            .map(|path| Utf8PathBuf::from(expand_tilde(&path)))
            .ok_or_else(|| ResolveError::CredentialFile {
                alias: self.alias.to_owned(),
            })
    }

    /// Resolves the local mount point.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::MountPath`] when no source applies.
    pub fn mount_path(&self) -> Result<Utf8PathBuf, ResolveError> {
        first_match(&MOUNT_PATH_SOURCES, self)
            .map(|path| Utf8PathBuf::from(expand_tilde(&path)))
            .ok_or(ResolveError::MountPath)
    }

    /// Resolves the remote login, falling back to `ubuntu`.
    #[must_use]
    pub fn remote_user(&self) -> String {
        first_match(&REMOTE_USER_SOURCES, self).unwrap_or_else(|| DEFAULT_REMOTE_USER.to_owned())
    }

    /// Resolves the remote directory, falling back to `/var/www/html`.
    #[must_use]
    pub fn remote_dir(&self) -> String {
        first_match(&REMOTE_DIR_SOURCES, self).unwrap_or_else(|| DEFAULT_REMOTE_DIR.to_owned())
    }

    /// Resolves everything a file system handler needs for `machine_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the credential file or mount path cannot
    /// be resolved.
    pub fn resolve_params(&self, machine_id: MachineId) -> Result<ResolvedParams, ResolveError> {
        Ok(ResolvedParams {
            machine_id,
            credential_file: self.credential_file()?,
            mount_path: self.mount_path()?,
            remote_user: self.remote_user(),
            remote_dir: self.remote_dir(),
        })
    }
}

type Source<T> = fn(&ResolutionContext<'_>) -> Option<T>;

const MACHINE_ID_SOURCES: [Source<MachineId>; 3] =
    [explicit_machine_id, cached_machine_id, aliased_machine_id];
const CREDENTIAL_SOURCES: [Source<String>; 3] = [
    explicit_credential_file,
    cached_credential_file,
    configured_credential_file,
];
const MOUNT_PATH_SOURCES: [Source<String>; 3] =
    [explicit_mount_path, cached_mount_path, configured_mount_path];
const REMOTE_USER_SOURCES: [Source<String>; 3] = [
    explicit_remote_user,
    cached_remote_user,
    configured_remote_user,
];
const REMOTE_DIR_SOURCES: [Source<String>; 3] =
    [explicit_remote_dir, cached_remote_dir, configured_remote_dir];

fn first_match<T>(sources: &[Source<T>], ctx: &ResolutionContext<'_>) -> Option<T> {
    sources.iter().find_map(|source| source(ctx))
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|raw| raw.trim())
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_owned)
}

fn explicit_machine_id(ctx: &ResolutionContext<'_>) -> Option<MachineId> {
    ctx.overrides.machine_id.as_deref().and_then(MachineId::new)
}

fn cached_machine_id(ctx: &ResolutionContext<'_>) -> Option<MachineId> {
    ctx.session.machine_id.as_deref().and_then(MachineId::new)
}

fn aliased_machine_id(ctx: &ResolutionContext<'_>) -> Option<MachineId> {
    ctx.settings
        .machine(ctx.alias)
        .and_then(|entry| MachineId::new(entry.id.as_str()))
}

fn explicit_credential_file(ctx: &ResolutionContext<'_>) -> Option<String> {
    non_blank(ctx.overrides.credential_file.as_ref())
}

fn cached_credential_file(ctx: &ResolutionContext<'_>) -> Option<String> {
    non_blank(ctx.session.credential_file.as_ref())
}

fn configured_credential_file(ctx: &ResolutionContext<'_>) -> Option<String> {
    match ctx.settings.credential_files.as_ref()? {
        CredentialFiles::Single(path) => non_blank(Some(path)),
        CredentialFiles::Named(table) => ctx
            .settings
            .machine(ctx.alias)
            .and_then(|entry| entry.credential_file.as_ref())
            .and_then(|key| non_blank(table.get(key)))
            .or_else(|| non_blank(table.get(DEFAULT_CREDENTIAL_KEY))),
    }
}

fn explicit_mount_path(ctx: &ResolutionContext<'_>) -> Option<String> {
    non_blank(ctx.overrides.mount_path.as_ref())
}

fn cached_mount_path(ctx: &ResolutionContext<'_>) -> Option<String> {
    non_blank(ctx.session.mount_path.as_ref())
}

fn configured_mount_path(ctx: &ResolutionContext<'_>) -> Option<String> {
    non_blank(ctx.settings.mount_path.as_ref())
}

fn explicit_remote_user(ctx: &ResolutionContext<'_>) -> Option<String> {
    non_blank(ctx.overrides.remote_user.as_ref())
}

fn cached_remote_user(ctx: &ResolutionContext<'_>) -> Option<String> {
    non_blank(ctx.session.remote_user.as_ref())
}

fn configured_remote_user(ctx: &ResolutionContext<'_>) -> Option<String> {
    non_blank(ctx.settings.remote_user.as_ref())
}

fn explicit_remote_dir(ctx: &ResolutionContext<'_>) -> Option<String> {
    non_blank(ctx.overrides.remote_dir.as_ref())
}

fn cached_remote_dir(ctx: &ResolutionContext<'_>) -> Option<String> {
    non_blank(ctx.session.remote_dir.as_ref())
}

fn configured_remote_dir(ctx: &ResolutionContext<'_>) -> Option<String> {
    non_blank(ctx.settings.remote_dir.as_ref())
}
