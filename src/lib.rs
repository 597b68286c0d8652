//! Core library for the berth workstation tool.
//!
//! The crate drives a single remote development machine: it resolves which
//! machine and key to use, powers the machine on or off through an injected
//! [`machine::MachineProvider`], waits for the requested state, and bridges
//! the remote web root onto the local file system with sshfs. Scaleway is the
//! bundled provider.

pub mod config;
pub mod config_store;
pub mod health;
pub mod hosts;
pub mod machine;
pub mod mount;
pub mod process;
pub mod remote;
pub mod report;
pub mod resolve;
pub mod router;
pub mod scaleway;
pub mod session;
pub mod test_support;
pub mod waiter;
pub mod workstation;

pub use config::ScalewayConfig;
pub use config_store::{ConfigStore, ConfigStoreError, Settings};
pub use machine::{MachineId, MachineProvider, MachineRef, MachineState};
pub use mount::{MountError, MountSupervisor};
pub use resolve::{Overrides, ResolutionContext, ResolveError, ResolvedParams};
pub use router::{LocalVerb, MachineVerb, Route, RouteError, Verb, VerbKind, route};
pub use scaleway::{ScalewayProvider, ScalewayProviderError};
pub use waiter::{StateWaiter, WaitOutcome, WaitPolicy};
pub use workstation::{FatalError, Invocation, Workstation};
