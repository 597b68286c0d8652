//! The table of verbs the tool understands.

use thiserror::Error;

/// Every operation the tool can perform.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Verb {
    /// Power on, wait, then bridge the file system.
    Start,
    /// Unbridge, power off, then wait.
    Stop,
    /// Attach the sshfs bridge.
    Mount,
    /// Detach the sshfs bridge.
    Unmount,
    /// Detach then attach the bridge.
    Remount,
    /// Report whether the mount point is populated.
    FsStatus,
    /// Open an interactive remote shell.
    Terminal,
    /// Print the public address with decoration.
    Ip,
    /// Print the bare public address.
    IpClean,
    /// Point the hosts-file entry at the machine.
    Hosts,
    /// Tabulate every machine.
    List,
    /// Check local prerequisites.
    Doctor,
    /// Write a starter settings document.
    Setup,
    /// Print the verb table.
    Usage,
}

/// Verbs that run on the local host without the provider client.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LocalVerb {
    /// Report whether the mount point is populated.
    FsStatus,
    /// Check local prerequisites.
    Doctor,
    /// Write a starter settings document.
    Setup,
    /// Print the verb table.
    Usage,
}

/// Verbs that act on a machine through the provider.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MachineVerb {
    /// Power on, wait, then bridge the file system.
    Start,
    /// Unbridge, power off, then wait.
    Stop,
    /// Attach the sshfs bridge.
    Mount,
    /// Detach the sshfs bridge.
    Unmount,
    /// Detach then attach the bridge.
    Remount,
    /// Open an interactive remote shell.
    Terminal,
    /// Print the public address with decoration.
    Ip,
    /// Print the bare public address.
    IpClean,
    /// Point the hosts-file entry at the machine.
    Hosts,
    /// Tabulate every machine.
    List,
}

/// Where a verb runs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VerbKind {
    /// Handled locally, never building the provider client.
    Local(LocalVerb),
    /// Dispatched to the workstation with a provider.
    Machine(MachineVerb),
}

impl Verb {
    /// Splits the verb by whether it needs the provider client.
    #[must_use]
    pub const fn kind(self) -> VerbKind {
        match self {
            Self::Start => VerbKind::Machine(MachineVerb::Start),
            Self::Stop => VerbKind::Machine(MachineVerb::Stop),
            Self::Mount => VerbKind::Machine(MachineVerb::Mount),
            Self::Unmount => VerbKind::Machine(MachineVerb::Unmount),
            Self::Remount => VerbKind::Machine(MachineVerb::Remount),
            Self::Terminal => VerbKind::Machine(MachineVerb::Terminal),
            Self::Ip => VerbKind::Machine(MachineVerb::Ip),
            Self::IpClean => VerbKind::Machine(MachineVerb::IpClean),
            Self::Hosts => VerbKind::Machine(MachineVerb::Hosts),
            Self::List => VerbKind::Machine(MachineVerb::List),
            Self::FsStatus => VerbKind::Local(LocalVerb::FsStatus),
            Self::Doctor => VerbKind::Local(LocalVerb::Doctor),
            Self::Setup => VerbKind::Local(LocalVerb::Setup),
            Self::Usage => VerbKind::Local(LocalVerb::Usage),
        }
    }
}

/// One row of the routing table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Route {
    /// Operation performed.
    pub verb: Verb,
    /// Accepted spellings; the first is canonical.
    pub names: &'static [&'static str],
    /// One-line description for `usage`.
    pub description: &'static str,
    /// Whether the verb acts on a target machine.
    pub requires_target: bool,
}

impl Route {
    /// Canonical spelling.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.names.first().copied().unwrap_or_default()
    }
}

/// The complete vocabulary, in display order.
pub const ROUTES: &[Route] = &[
    Route {
        verb: Verb::Start,
        names: &["start"],
        description: "Start the workstation and connect its file system.",
        requires_target: true,
    },
    Route {
        verb: Verb::Stop,
        names: &["stop"],
        description: "Disconnect the file system and shut the workstation down.",
        requires_target: true,
    },
    Route {
        verb: Verb::Mount,
        names: &["cfs", "mount"],
        description: "Connect the file system through sshfs.",
        requires_target: true,
    },
    Route {
        verb: Verb::Unmount,
        names: &["dfs", "unmount"],
        description: "Disconnect the file system. Close any IDEs first.",
        requires_target: true,
    },
    Route {
        verb: Verb::Remount,
        names: &["rfs", "remount"],
        description: "Reconnect the file system (dfs + cfs).",
        requires_target: true,
    },
    Route {
        verb: Verb::FsStatus,
        names: &["fs"],
        description: "Show whether the file system is connected.",
        requires_target: false,
    },
    Route {
        verb: Verb::Terminal,
        names: &["terminal"],
        description: "Open a shell on the workstation.",
        requires_target: true,
    },
    Route {
        verb: Verb::Ip,
        names: &["ip"],
        description: "Print the workstation's public address.",
        requires_target: true,
    },
    Route {
        verb: Verb::IpClean,
        names: &["ip-clean"],
        description: "Print the workstation's public address without decoration.",
        requires_target: true,
    },
    Route {
        verb: Verb::Hosts,
        names: &["hosts"],
        description: "Point your hosts file entry at the workstation.",
        requires_target: true,
    },
    Route {
        verb: Verb::List,
        names: &["list"],
        description: "Show every machine in the account.",
        requires_target: false,
    },
    Route {
        verb: Verb::Doctor,
        names: &["doctor"],
        description: "Run diagnostics on your setup.",
        requires_target: false,
    },
    Route {
        verb: Verb::Setup,
        names: &["setup"],
        description: "Write a starter berth.toml.",
        requires_target: false,
    },
    Route {
        verb: Verb::Usage,
        names: &["usage"],
        description: "Show this list of commands.",
        requires_target: false,
    },
];

/// Routing failures.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RouteError {
    /// The verb is not in the table.
    #[error("Unknown command '{0}'. Please see 'berth usage'.")]
    UnknownCommand(String),
}

/// Finds the route for `verb`, ignoring surrounding whitespace and case.
///
/// # Errors
///
/// Returns [`RouteError::UnknownCommand`] for verbs outside the table.
pub fn route(verb: &str) -> Result<&'static Route, RouteError> {
    let wanted = verb.trim().to_lowercase();
    ROUTES
        .iter()
        .find(|candidate| candidate.names.contains(&wanted.as_str()))
        .ok_or(RouteError::UnknownCommand(wanted))
}

/// The route for a verb.
#[must_use]
pub fn route_for(verb: Verb) -> Option<&'static Route> {
    ROUTES.iter().find(|candidate| candidate.verb == verb)
}
