//! Discovery, loading, and seeding of the `berth.toml` settings document.
//!
//! The document is found with `OrthoConfig`'s discovery search order, read
//! through `cap-std`, and parsed into [`Settings`]. It is loaded once per
//! invocation and treated as read-only afterwards.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use ortho_config::ConfigDiscovery;
use ortho_config::toml;
use thiserror::Error;

mod settings;

pub use settings::{
    AutoSettings, CredentialFiles, DEFAULT_CREDENTIAL_KEY, DEFAULT_HOSTS_FILE, HealthSettings,
    HostsSettings, MachineAlias, Settings,
};

const APP_NAME: &str = "berth";
const CONFIG_ENV_VAR: &str = "BERTH_CONFIG_PATH";
const CONFIG_FILE_NAME: &str = "berth.toml";
const DOTFILE_NAME: &str = ".berth.toml";
const PROJECT_FILE_NAME: &str = "berth.toml";

const STARTER_DOCUMENT: &str = r#"# berth settings
#
# Local directory the remote file system is bridged onto.
mount_path = "~/berth-dev"
remote_user = "ubuntu"
remote_dir = "/var/www/html"

# Either a single private key path, or a table of named keys with a
# `default` entry.
[credential_files]
default = "~/.berth/default.pem"

[machines.default]
id = ""
credential_file = "default"

[auto]
connect_on_start = true
disconnect_on_stop = true
hosts = false
hosts_gentle = true

[hosts]
# domain = "me.test.example.com"
file = "/etc/hosts"
platform = "linux"

[health]
processes = ["mysqld", "apache"]
"#;

/// Errors raised while locating, reading, or writing the settings document.
#[derive(Debug, Error)]
pub enum ConfigStoreError {
    /// Raised when no configuration candidates are available.
    #[error("no configuration file candidates were discovered")]
    NoCandidates,
    /// Raised when file system operations fail.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when the document is not valid TOML or has the wrong shape.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path that could not be parsed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when `setup` would replace an existing document.
    #[error("settings already exist at {path}; rerun with --force to replace them")]
    AlreadyExists {
        /// Path of the existing document.
        path: Utf8PathBuf,
    },
}

/// Where the settings document lives and whether it is present.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigLocation {
    /// Path of the first existing candidate, or the fallback candidate.
    pub path: Utf8PathBuf,
    /// Whether the file exists.
    pub exists: bool,
}

/// Loads `berth.toml` using `OrthoConfig`'s discovery search order.
#[derive(Clone, Debug)]
pub struct ConfigStore {
    discovery: ConfigDiscovery,
}

impl ConfigStore {
    /// Builds a config store using the standard discovery settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            discovery: ConfigDiscovery::builder(APP_NAME)
                .env_var(CONFIG_ENV_VAR)
                .config_file_name(CONFIG_FILE_NAME)
                .dotfile_name(DOTFILE_NAME)
                .project_file_name(PROJECT_FILE_NAME)
                .build(),
        }
    }

    /// Builds a config store using an explicit discovery configuration.
    #[must_use]
    pub const fn with_discovery(discovery: ConfigDiscovery) -> Self {
        Self { discovery }
    }

    /// Finds the settings document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigStoreError::NoCandidates`] when discovery yields no
    /// paths, or [`ConfigStoreError::Io`] when a candidate cannot be checked.
    pub fn locate(&self) -> Result<ConfigLocation, ConfigStoreError> {
        let candidates = self.discovery.utf8_candidates();
        for candidate in &candidates {
            if path_exists(candidate)? {
                return Ok(ConfigLocation {
                    path: candidate.clone(),
                    exists: true,
                });
            }
        }

        let fallback = candidates
            .last()
            .cloned()
            .ok_or(ConfigStoreError::NoCandidates)?;
        Ok(ConfigLocation {
            path: fallback,
            exists: false,
        })
    }

    /// Loads the settings document, returning defaults when none exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigStoreError`] when the document cannot be read or
    /// parsed.
    pub fn load(&self) -> Result<Settings, ConfigStoreError> {
        let location = self.locate()?;
        if !location.exists {
            tracing::warn!(path = %location.path, "settings document not found; using defaults");
            return Ok(Settings::default());
        }

        let contents = read_document(&location.path)?;
        let settings = parse_settings(&location.path, &contents)?;
        tracing::debug!(
            path = %location.path,
            machines = settings.machines.len(),
            "loaded settings document"
        );
        Ok(settings)
    }

    /// Writes the commented starter document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigStoreError::AlreadyExists`] when a document is present
    /// and `force` is false, or [`ConfigStoreError::Io`] when writing fails.
    pub fn write_starter(&self, force: bool) -> Result<Utf8PathBuf, ConfigStoreError> {
        let location = self.locate()?;
        if location.exists && !force {
            return Err(ConfigStoreError::AlreadyExists {
                path: location.path,
            });
        }
        write_document(&location.path, STARTER_DOCUMENT)?;
        Ok(location.path)
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses settings from TOML text.
///
/// # Errors
///
/// Returns [`ConfigStoreError::Parse`] when the text is not a valid settings
/// document.
pub fn parse_settings(path: &Utf8Path, contents: &str) -> Result<Settings, ConfigStoreError> {
    if contents.trim().is_empty() {
        return Ok(Settings::default());
    }

    toml::from_str(contents).map_err(|err| ConfigStoreError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

fn split_path(path: &Utf8Path) -> Result<(&Utf8Path, &str), ConfigStoreError> {
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| ConfigStoreError::Io {
        path: path.to_path_buf(),
        message: String::from("configuration file path is missing a filename"),
    })?;
    Ok((parent, file_name))
}

fn path_exists(path: &Utf8Path) -> Result<bool, ConfigStoreError> {
    let (parent, file_name) = split_path(path)?;
    match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir
            .try_exists(file_name)
            .map_err(|err| ConfigStoreError::Io {
                path: path.to_path_buf(),
                message: err.to_string(),
            }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(ConfigStoreError::Io {
            path: parent.to_path_buf(),
            message: err.to_string(),
        }),
    }
}

fn read_document(path: &Utf8Path) -> Result<String, ConfigStoreError> {
    let (parent, file_name) = split_path(path)?;
    let dir =
        Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| ConfigStoreError::Io {
            path: parent.to_path_buf(),
            message: err.to_string(),
        })?;

    dir.read_to_string(file_name)
        .map_err(|err| ConfigStoreError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}

fn write_document(path: &Utf8Path, contents: &str) -> Result<(), ConfigStoreError> {
    let (parent, file_name) = split_path(path)?;
    Dir::create_ambient_dir_all(parent, ambient_authority()).map_err(|err| {
        ConfigStoreError::Io {
            path: parent.to_path_buf(),
            message: err.to_string(),
        }
    })?;
    let dir =
        Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| ConfigStoreError::Io {
            path: parent.to_path_buf(),
            message: err.to_string(),
        })?;

    dir.write(file_name, contents)
        .map_err(|err| ConfigStoreError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}
