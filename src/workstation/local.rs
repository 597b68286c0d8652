//! Handlers that run without a provider client.

use std::env;
use std::ffi::OsString;
use std::io::Write;

use tabled::Tabled;

use crate::config::ScalewayConfig;
use crate::config_store::{ConfigStore, ConfigStoreError};
use crate::mount::{MountProbe, MountSupervisor, SSHFS_BIN, UnmountTool};
use crate::process::CommandRunner;
use crate::report::Reporter;
use crate::resolve::ResolutionContext;
use crate::router::ROUTES;

use super::{FatalError, render_rows};

#[derive(Tabled)]
struct UsageRow {
    #[tabled(rename = "COMMAND")]
    names: String,
    #[tabled(rename = "TARGET")]
    target: &'static str,
    #[tabled(rename = "DESCRIPTION")]
    description: &'static str,
}

/// Prints the verb table.
pub fn usage<W: Write>(reporter: &mut Reporter<W>) {
    reporter.info("Usage: berth [command] [<target>] [options]");
    reporter.blank();
    reporter.info("Commands:");
    let rows = ROUTES.iter().map(|route| UsageRow {
        names: route.names.join("|"),
        target: if route.requires_target { "[target]" } else { "" },
        description: route.description,
    });
    for line in render_rows(rows) {
        reporter.plain(&format!("  {line}"));
    }
}

/// Reports whether the mount point is populated.
///
/// # Errors
///
/// Returns [`FatalError::Resolve`] when no mount path is configured.
pub fn fs_status<R, M, W>(
    mounts: &MountSupervisor<R, M>,
    ctx: &ResolutionContext<'_>,
    reporter: &mut Reporter<W>,
) -> Result<(), FatalError>
where
    R: CommandRunner,
    M: MountProbe,
    W: Write,
{
    let mount_path = ctx.mount_path()?;
    match mounts.status(&mount_path) {
        Ok(true) => reporter.success("Connected!"),
        Ok(false) => reporter.error("Not connected."),
        Err(err) => {
            tracing::warn!(error = %err, "mount status unavailable");
            reporter.error("Error: Could not read from file system!");
        }
    }
    Ok(())
}

/// Checks local prerequisites.
pub fn doctor<R, W>(runner: &R, store: &ConfigStore, reporter: &mut Reporter<W>)
where
    R: CommandRunner,
    W: Write,
{
    reporter.plain(&format!("{} ({})", env::consts::OS, env::consts::ARCH));

    match store.locate() {
        Ok(location) if location.exists => {
            reporter.success(&format!("Settings found at {}", location.path));
        }
        Ok(location) => reporter.error(&format!(
            "Settings missing; run 'berth setup' to create {}",
            location.path
        )),
        Err(err) => reporter.error(&format!("Settings could not be located: {err}")),
    }

    match ScalewayConfig::load_without_cli_args().and_then(|config| config.validate()) {
        Ok(()) => reporter.success("Provider credentials loaded."),
        Err(err) => reporter.error(&format!("Provider credentials unusable: {err}")),
    }

    match runner.run(SSHFS_BIN, &[OsString::from("-V")]) {
        Ok(output) => {
            let version = output
                .stdout
                .lines()
                .chain(output.stderr.lines())
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or("unknown version")
                .to_owned();
            reporter.success(&format!("You have sshfs correctly installed ({version})"));
        }
        Err(err) => {
            tracing::debug!(error = %err, "sshfs probe failed");
            reporter.error("You do not have sshfs installed.");
        }
    }

    match UnmountTool::detect() {
        Some(tool) => reporter.success(&format!("Unmounting with {}", tool.program())),
        None => reporter.error("Neither fusermount nor umount are installed."),
    }
}

/// Writes the starter settings document.
///
/// # Errors
///
/// Returns [`FatalError::ConfigStore`] when the document cannot be written.
pub fn setup<W: Write>(
    store: &ConfigStore,
    force: bool,
    reporter: &mut Reporter<W>,
) -> Result<(), FatalError> {
    match store.write_starter(force) {
        Ok(path) => {
            reporter.success(&format!("Wrote starter settings to {path}"));
            reporter.info("Fill in the machine id and key paths, then run 'berth doctor'.");
            Ok(())
        }
        Err(ConfigStoreError::AlreadyExists { path }) => {
            reporter.error(&format!(
                "Settings already exist at {path}; rerun with --force to replace them."
            ));
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use camino::{Utf8Path, Utf8PathBuf};
    use tempfile::TempDir;

    use super::*;
    use crate::config_store::Settings;
    use crate::resolve::{Overrides, SessionCache};
    use crate::test_support::{EnvGuard, ScriptedRunner, StaticMountProbe};

    const KEPT_SETTINGS: &str = "remote_user = \"keep\"\n";

    struct Sandbox {
        _tmp: TempDir,
        root: Utf8PathBuf,
        settings: Utf8PathBuf,
    }

    fn sandbox() -> Sandbox {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
            .unwrap_or_else(|path| panic!("temp path should be utf8: {}", path.display()));
        let settings = root.join("berth.toml");
        fs::write(&settings, KEPT_SETTINGS).unwrap_or_else(|err| panic!("seed: {err}"));
        Sandbox {
            _tmp: tmp,
            root,
            settings,
        }
    }

    fn install_tool(dir: &Utf8Path, name: &str) {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap_or_else(|err| panic!("write {path}: {err}"));
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .unwrap_or_else(|err| panic!("chmod {path}: {err}"));
    }

    fn output(reporter: Reporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).unwrap_or_else(|err| panic!("utf8: {err}"))
    }

    #[test]
    fn usage_lists_every_route() {
        let mut reporter = Reporter::new(Vec::new());
        usage(&mut reporter);
        let text = output(reporter);
        for route in ROUTES {
            assert!(text.contains(route.description), "missing {}", route.name());
        }
        assert!(text.contains("cfs|mount"));
    }

    #[test]
    fn fs_status_reports_connection() {
        let mounts = MountSupervisor::new(ScriptedRunner::new(), StaticMountProbe::always(true));
        let settings = Settings {
            mount_path: Some(String::from("/mnt/dev")),
            ..Settings::default()
        };
        let overrides = Overrides::default();
        let session = SessionCache::default();
        let ctx = ResolutionContext::new(&overrides, &session, &settings, "default");
        let mut reporter = Reporter::new(Vec::new());

        fs_status(&mounts, &ctx, &mut reporter).unwrap_or_else(|err| panic!("fs status: {err}"));

        assert_eq!(output(reporter), "+ Connected!\n");
    }

    #[test]
    fn fs_status_without_mount_path_is_fatal() {
        let mounts = MountSupervisor::new(ScriptedRunner::new(), StaticMountProbe::always(true));
        let settings = Settings::default();
        let overrides = Overrides::default();
        let session = SessionCache::default();
        let ctx = ResolutionContext::new(&overrides, &session, &settings, "default");
        let mut reporter = Reporter::new(Vec::new());

        assert!(matches!(
            fs_status(&mounts, &ctx, &mut reporter),
            Err(FatalError::Resolve(_))
        ));
    }

    #[tokio::test]
    async fn doctor_reports_installed_tools() {
        let sandbox = sandbox();
        install_tool(&sandbox.root, "fusermount");
        let _guard = EnvGuard::set_vars(&[
            ("PATH", sandbox.root.as_str()),
            ("BERTH_CONFIG_PATH", sandbox.settings.as_str()),
        ])
        .await;
        let runner = ScriptedRunner::new();
        runner.push_output(Some(0), "SSHFS version 3.7.3\n", "");
        let mut reporter = Reporter::new(Vec::new());

        doctor(&runner, &ConfigStore::new(), &mut reporter);

        assert_eq!(
            runner
                .invocations()
                .first()
                .map(|invocation| invocation.command_string()),
            Some(String::from("sshfs -V"))
        );
        let text = output(reporter);
        assert!(text.contains(&format!("+ Settings found at {}", sandbox.settings)));
        assert!(text.contains("+ You have sshfs correctly installed (SSHFS version 3.7.3)"));
        assert!(text.contains("+ Unmounting with fusermount"));
    }

    #[tokio::test]
    async fn doctor_reports_missing_tools() {
        let sandbox = sandbox();
        let _guard = EnvGuard::set_vars(&[
            ("PATH", sandbox.root.as_str()),
            ("BERTH_CONFIG_PATH", sandbox.settings.as_str()),
        ])
        .await;
        let mut reporter = Reporter::new(Vec::new());

        doctor(&ScriptedRunner::new(), &ConfigStore::new(), &mut reporter);

        let text = output(reporter);
        assert!(text.contains("! You do not have sshfs installed."));
        assert!(text.contains("! Neither fusermount nor umount are installed."));
    }

    #[tokio::test]
    async fn setup_keeps_existing_settings_without_force() {
        let sandbox = sandbox();
        let _guard = EnvGuard::set_vars(&[("BERTH_CONFIG_PATH", sandbox.settings.as_str())]).await;
        let mut reporter = Reporter::new(Vec::new());

        setup(&ConfigStore::new(), false, &mut reporter)
            .unwrap_or_else(|err| panic!("setup: {err}"));

        assert_eq!(
            output(reporter),
            format!(
                "! Settings already exist at {}; rerun with --force to replace them.\n",
                sandbox.settings
            )
        );
        let contents =
            fs::read_to_string(&sandbox.settings).unwrap_or_else(|err| panic!("read: {err}"));
        assert_eq!(contents, KEPT_SETTINGS);
    }

    #[tokio::test]
    async fn setup_with_force_replaces_settings() {
        let sandbox = sandbox();
        let _guard = EnvGuard::set_vars(&[("BERTH_CONFIG_PATH", sandbox.settings.as_str())]).await;
        let mut reporter = Reporter::new(Vec::new());

        setup(&ConfigStore::new(), true, &mut reporter)
            .unwrap_or_else(|err| panic!("setup: {err}"));

        let text = output(reporter);
        assert!(text.contains(&format!("+ Wrote starter settings to {}", sandbox.settings)));
        let contents =
            fs::read_to_string(&sandbox.settings).unwrap_or_else(|err| panic!("read: {err}"));
        assert_ne!(contents, KEPT_SETTINGS);
    }
}
