//! Binary entry point for the berth CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use berth::config::ScalewayConfig;
use berth::config_store::ConfigStore;
use berth::mount::{DirectoryProbe, MountSupervisor};
use berth::process::ProcessCommandRunner;
use berth::report::Reporter;
use berth::resolve::{Overrides, ResolutionContext, SessionCache};
use berth::router::{LocalVerb, MachineVerb, Verb, VerbKind, route};
use berth::scaleway::ScalewayProvider;
use berth::session::SessionMarker;
use berth::workstation::{FatalError, Invocation, Workstation, local, target_alias};

mod cli;

use cli::Cli;

const LOG_ENV_VAR: &str = "BERTH_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let marker = match SessionMarker::create() {
        Ok(marker) => Some(marker),
        Err(err) => {
            tracing::warn!(error = %err, "could not create session marker");
            None
        }
    };

    let exit_code = match dispatch(&cli).await {
        Ok(()) => {
            writeln!(io::stdout()).ok();
            0
        }
        Err(err) => {
            write_error(io::stderr(), &err);
            1
        }
    };

    drop(marker);
    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn overrides_from(cli: &Cli) -> Overrides {
    Overrides {
        machine_id: cli.machine_id.clone(),
        credential_file: cli.credential_file.clone(),
        mount_path: cli.mount_path.clone(),
        remote_user: cli.remote_user.clone(),
        remote_dir: cli.remote_dir.clone(),
    }
}

async fn dispatch(cli: &Cli) -> Result<(), FatalError> {
    let verb = match cli.command.as_deref() {
        Some(command) => route(command)?.verb,
        None => Verb::Usage,
    };
    match verb.kind() {
        VerbKind::Local(local_verb) => run_local(local_verb, cli),
        VerbKind::Machine(machine_verb) => run_machine(machine_verb, cli).await,
    }
}

fn run_local(verb: LocalVerb, cli: &Cli) -> Result<(), FatalError> {
    let store = ConfigStore::new();
    let mut reporter = Reporter::new(io::stdout());
    match verb {
        LocalVerb::Usage => {
            local::usage(&mut reporter);
            Ok(())
        }
        LocalVerb::Doctor => {
            local::doctor(&ProcessCommandRunner, &store, &mut reporter);
            Ok(())
        }
        LocalVerb::Setup => local::setup(&store, cli.force, &mut reporter),
        LocalVerb::FsStatus => {
            let settings = store.load()?;
            let overrides = overrides_from(cli);
            let mounts = MountSupervisor::new(ProcessCommandRunner, DirectoryProbe);
            let session = SessionCache::default();
            let alias = target_alias(cli.target.as_deref());
            let ctx = ResolutionContext::new(&overrides, &session, &settings, alias);
            local::fs_status(&mounts, &ctx, &mut reporter)
        }
    }
}

async fn run_machine(verb: MachineVerb, cli: &Cli) -> Result<(), FatalError> {
    let settings = ConfigStore::new().load()?;
    let config = ScalewayConfig::load_without_cli_args()?;
    config.validate()?;
    let provider = ScalewayProvider::new(&config).map_err(|err| FatalError::Provider {
        message: err.to_string(),
    })?;
    tracing::debug!(zone = provider.zone(), ?verb, "provider ready");

    let invocation = Invocation::new(verb, cli.target.clone()).with_processes(cli.processes);
    let mut workstation = Workstation::new(
        provider,
        ProcessCommandRunner,
        MountSupervisor::new(ProcessCommandRunner, DirectoryProbe),
        settings,
        overrides_from(cli),
        io::stdout(),
    );
    workstation.dispatch(&invocation).await
}

fn write_error(mut target: impl Write, err: &FatalError) {
    writeln!(target, "Fatal error: {err}").ok();
}
