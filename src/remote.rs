//! SSH argument construction and reachability checks for the workstation.

use std::ffi::OsString;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

/// Program used for remote shells and probes.
pub const SSH_BIN: &str = "ssh";
/// Port probed before bridging the file system.
pub const DEFAULT_SSH_PORT: u16 = 22;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Where and as whom to open an SSH session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SshTarget {
    /// Public address of the machine.
    pub address: IpAddr,
    /// Remote login.
    pub user: String,
    /// Private key used to authenticate.
    pub identity_file: Utf8PathBuf,
}

impl SshTarget {
    /// Creates a target.
    #[must_use]
    pub fn new(address: IpAddr, user: impl Into<String>, identity_file: Utf8PathBuf) -> Self {
        Self {
            address,
            user: user.into(),
            identity_file,
        }
    }

    fn destination(&self) -> OsString {
        OsString::from(format!("{}@{}", self.user, self.address))
    }

    fn common_options(&self) -> Vec<OsString> {
        vec![
            OsString::from("-i"),
            OsString::from(self.identity_file.as_str()),
            OsString::from("-o"),
            OsString::from("StrictHostKeyChecking=no"),
        ]
    }

    /// Arguments for a non-interactive command that must never prompt.
    #[must_use]
    pub fn command_args(&self, remote_command: &str) -> Vec<OsString> {
        let mut args = self.common_options();
        args.push(OsString::from("-o"));
        args.push(OsString::from("BatchMode=yes"));
        args.push(self.destination());
        args.push(OsString::from(remote_command));
        args
    }

    /// Arguments for an interactive shell with a forced TTY.
    #[must_use]
    pub fn terminal_args(&self) -> Vec<OsString> {
        let mut args = vec![OsString::from("-t"), OsString::from("-t")];
        args.extend(self.common_options());
        args.push(self.destination());
        args
    }
}

/// Waits until a TCP connection to `address:port` succeeds.
///
/// Returns `false` when `budget` elapses first.
pub async fn wait_for_ssh(
    address: IpAddr,
    port: u16,
    interval: Duration,
    budget: Duration,
) -> bool {
    let target = SocketAddr::new(address, port);
    let deadline = Instant::now() + budget;
    loop {
        let connect = timeout(CONNECT_TIMEOUT, TcpStream::connect(target)).await;
        if matches!(connect, Ok(Ok(_))) {
            return true;
        }
        if Instant::now() + interval > deadline {
            tracing::debug!(%target, "ssh port did not open within budget");
            return false;
        }
        sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn target() -> SshTarget {
        SshTarget::new(
            IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9)),
            "ubuntu",
            Utf8PathBuf::from("/keys/dev.pem"),
        )
    }

    fn joined(args: &[OsString]) -> String {
        args.iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn command_args_run_in_batch_mode() {
        assert_eq!(
            joined(&target().command_args("pgrep mysqld")),
            "-i /keys/dev.pem -o StrictHostKeyChecking=no -o BatchMode=yes ubuntu@203.0.113.9 pgrep mysqld"
        );
    }

    #[test]
    fn terminal_args_force_a_tty() {
        assert_eq!(
            joined(&target().terminal_args()),
            "-t -t -i /keys/dev.pem -o StrictHostKeyChecking=no ubuntu@203.0.113.9"
        );
    }

    #[tokio::test]
    async fn wait_for_ssh_detects_listening_port() {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0))
            .await
            .expect("bind listener");
        let port = listener.local_addr().expect("local addr").port();

        let ready = wait_for_ssh(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            Duration::from_millis(10),
            Duration::from_millis(100),
        )
        .await;

        assert!(ready);
    }

    #[tokio::test]
    async fn wait_for_ssh_gives_up_on_closed_port() {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0))
            .await
            .expect("bind listener");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let ready = wait_for_ssh(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            Duration::from_millis(10),
            Duration::from_millis(50),
        )
        .await;

        assert!(!ready);
    }
}
