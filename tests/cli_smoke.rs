//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use camino::Utf8PathBuf;
use predicates::str::contains;
use tempfile::TempDir;

fn isolated_home() -> (TempDir, Utf8PathBuf) {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .unwrap_or_else(|path| panic!("temp dir should be utf8: {}", path.display()));
    (tmp, root)
}

#[test]
fn no_command_prints_usage() {
    let (_tmp, home) = isolated_home();
    let mut cmd = cargo_bin_cmd!("berth");
    cmd.env("HOME", home.as_str()).current_dir(&home);
    cmd.assert()
        .success()
        .stdout(contains("Usage: berth [command] [<target>] [options]"))
        .stdout(contains("cfs|mount"));
}

#[test]
fn usage_lists_every_command() {
    let mut cmd = cargo_bin_cmd!("berth");
    cmd.arg("usage");
    let output = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output).unwrap_or_else(|err| panic!("utf8: {err}"));
    for verb in ["start", "stop", "dfs|unmount", "rfs|remount", "ip-clean", "list"] {
        assert!(text.contains(verb), "usage should mention {verb}: {text}");
    }
}

#[test]
fn unknown_command_is_fatal() {
    let mut cmd = cargo_bin_cmd!("berth");
    cmd.arg("frobnicate");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains(
            "Fatal error: Unknown command 'frobnicate'. Please see 'berth usage'.",
        ));
}

#[test]
fn fs_reports_empty_mount_point_as_disconnected() {
    let (_tmp, home) = isolated_home();
    let mount_point = home.join("mnt");
    std::fs::create_dir(&mount_point).unwrap_or_else(|err| panic!("create mount dir: {err}"));

    let mut cmd = cargo_bin_cmd!("berth");
    cmd.env("HOME", home.as_str())
        .env("BERTH_CONFIG_PATH", home.join("berth.toml").as_str())
        .current_dir(&home)
        .args(["fs", "--mount-path", mount_point.as_str()]);
    cmd.assert().success().stdout(contains("Not connected."));
}

#[test]
fn fs_without_mount_path_is_fatal() {
    let (_tmp, home) = isolated_home();
    let mut cmd = cargo_bin_cmd!("berth");
    cmd.env("HOME", home.as_str())
        .env("BERTH_CONFIG_PATH", home.join("berth.toml").as_str())
        .env_remove("BERTH_MOUNT_PATH")
        .current_dir(&home)
        .arg("fs");
    cmd.assert()
        .failure()
        .stderr(contains("Fatal error: could not resolve mount path"));
}
