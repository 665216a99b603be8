// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod launcher;
pub mod logging;
pub mod rpc;
pub mod store;
pub mod target;
pub mod types;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::cli::{CliArgs, Command, LaunchArgs};
use crate::config::{ConfigFile, load_or_default};
use crate::launcher::RunLauncher;
use crate::store::{JobOrigin, RunRecord};
use crate::target::{ConnectionMetadata, ServerTarget};

/// High-level entry point used by `main.rs`.
///
/// Loads the config, binds a launcher to the configured run store and runs
/// one subcommand against it.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path)?;

    if matches!(args.command, Command::ShowConfig) {
        print_config(&cfg);
        return Ok(());
    }

    if cfg.store.path.is_none() {
        warn!("no [store].path configured; run records only live as long as this process");
    }

    let launcher = RunLauncher::from_config(&cfg)?;
    execute(&launcher, args.command).await
}

async fn execute(launcher: &RunLauncher, command: Command) -> Result<()> {
    match command {
        Command::Launch(launch_args) => launch(launcher, launch_args).await,
        Command::CanTerminate { run_id } => {
            let can = launcher.can_terminate(&run_id).await?;
            println!("{can}");
            Ok(())
        }
        Command::Terminate { run_id } => {
            let sent = launcher.terminate(&run_id).await?;
            println!("{sent}");
            Ok(())
        }
        Command::Status { run_id } => print_status(launcher, &run_id),
        Command::ShowConfig => Ok(()),
    }
}

async fn launch(launcher: &RunLauncher, args: LaunchArgs) -> Result<()> {
    let store = launcher
        .store()
        .context("launcher has no run store bound")?;

    let connection = match (args.host, args.port, args.socket) {
        (Some(host), Some(port), None) => ConnectionMetadata::tcp(host, port),
        (None, None, Some(socket)) => ConnectionMetadata::socket(socket),
        _ => anyhow::bail!("pass either --host and --port, or --socket"),
    }
    .with_ssl(args.use_ssl);

    let run = match store.get_run_by_id(&args.run_id)? {
        Some(existing) => existing,
        None => {
            let run = RunRecord::new(
                args.run_id.clone(),
                JobOrigin::new(&args.location, &args.repository, &args.job),
            );
            store.add_run(run.clone())?;
            debug!(run_id = %run.run_id, "created run record");
            run
        }
    };

    let target = ServerTarget::new(args.location, connection);
    let run = launcher.launch(run, &target).await?;
    println!("{}", run.run_id);
    Ok(())
}

fn print_status(launcher: &RunLauncher, run_id: &str) -> Result<()> {
    let store = launcher
        .store()
        .context("launcher has no run store bound")?;
    let run = store
        .get_run_by_id(run_id)?
        .with_context(|| format!("run '{run_id}' not found"))?;

    println!("run {}", run.run_id);
    println!("  job: {}", run.origin.job_name);
    println!("  location: {}", run.origin.location_name);
    println!("  status: {}", run.status);
    for (key, value) in run.tags.iter() {
        println!("  tag {key} = {value}");
    }
    for event in store.events_for(run_id)? {
        println!("  event [{:?}] {}", event.kind, event.message);
    }
    Ok(())
}

fn print_config(cfg: &ConfigFile) {
    let settings = &cfg.launcher;
    println!("runlaunch config");
    match &cfg.source {
        Some(path) => println!("  source = {}", path.display()),
        None => println!("  source = (defaults)"),
    }
    println!("  launcher.wait_for_processes = {}", settings.wait_for_processes);
    println!("  launcher.join_timeout = {:?}", settings.join_timeout);
    println!("  launcher.initial_poll_interval = {:?}", settings.initial_poll_interval);
    println!("  launcher.max_poll_interval = {:?}", settings.max_poll_interval);
    println!("  launcher.can_cancel_timeout = {:?}", settings.can_cancel_timeout);
    println!("  launcher.request_timeout = {:?}", settings.request_timeout);
    match &cfg.store.path {
        Some(path) => println!("  store.path = {}", path.display()),
        None => println!("  store.path = (in memory)"),
    }
}
