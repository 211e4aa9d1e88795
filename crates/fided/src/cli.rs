//! Command-line entry point shared by the `fided` binaries.
//!
//! # Usage
//!
//! ```bash
//! # Print the companion environment a new shell would receive
//! fided env
//!
//! # Same, as JSON, pretending the companion is installed
//! fided env --json --companion-version 0.50.1
//!
//! # Launch a program as a registered session
//! fided run -- /bin/sh -c 'echo $TERMUX_API_APP__VERSION_NAME'
//!
//! # Show the effective configuration
//! fided config
//!
//! # Enable debug logging
//! RUST_LOG=fided=debug fided run -- sh
//! ```

use std::path::PathBuf;
use std::process::{self, ExitStatus};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fide_core::{
    EnvironmentComposer, EnvironmentMapping, PackageDescriptor, PackageInspector, SessionId,
    SessionProcessObserver,
};

use crate::config::FideConfig;
use crate::inspector::{CommandPackageInspector, StaticPackageInspector};
use crate::registry::{spawn_registry_with_capacity, RegistryHandle};

/// fided - session process binding and companion environment
#[derive(Parser, Debug)]
#[command(name = "fided", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to a config file (overrides FIDE_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Overrides for the package inspector.
#[derive(clap::Args, Debug, Clone, Default)]
struct CompanionArgs {
    /// Treat the companion as installed with this version instead of querying
    #[arg(long, value_name = "VERSION")]
    companion_version: Option<String>,

    /// Treat the companion as already exporting its own environment
    #[arg(long)]
    companion_active: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the companion environment for a new shell
    Env {
        /// Print JSON instead of KEY=VALUE lines
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        companion: CompanionArgs,
    },
    /// Run a program as a registered session
    Run {
        /// Session id to register (generated if omitted)
        #[arg(long)]
        session: Option<String>,

        #[command(flatten)]
        companion: CompanionArgs,

        /// Program and arguments
        #[arg(last = true, required = true)]
        program: Vec<String>,
    },
    /// Print the effective configuration
    Config,
}

/// Parses arguments and runs the selected command.
pub fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let config =
        FideConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let composer = config.composer().context("Invalid environment prefix")?;

    match args.command {
        Command::Env { json, companion } => {
            let inspector = build_inspector(&config, &composer, &companion);
            let env = composer.compose_companion_environment(inspector.as_ref());
            print_environment(env.as_ref(), json)
        }
        Command::Run {
            session,
            companion,
            program,
        } => {
            let session = match session {
                Some(id) => SessionId::parse(&id)?,
                None => SessionId::for_launch(process::id(), Utc::now()),
            };
            let inspector = build_inspector(&config, &composer, &companion);
            let code = run_session(&config, composer, inspector, session, program)?;
            process::exit(code);
        }
        Command::Config => {
            print!("{}", config.to_toml().context("Failed to render configuration")?);
            Ok(())
        }
    }
}

/// Initializes tracing to stderr so stdout stays machine readable.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("fided={default_level},fide_core={default_level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Picks the inspector: fixed answers when overridden, otherwise the package manager.
fn build_inspector(
    config: &FideConfig,
    composer: &EnvironmentComposer,
    companion: &CompanionArgs,
) -> Arc<dyn PackageInspector> {
    if companion.companion_version.is_some() || companion.companion_active {
        let descriptor = match &companion.companion_version {
            Some(version) => PackageDescriptor::installed(Some(version.clone())),
            None => PackageDescriptor::not_installed(),
        };
        return Arc::new(StaticPackageInspector {
            active: companion.companion_active,
            descriptor,
        });
    }

    Arc::new(CommandPackageInspector::from_process_env(
        config.inspector.command.clone(),
        &composer.version_variable(),
    ))
}

fn print_environment(env: Option<&EnvironmentMapping>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&env)?);
        return Ok(());
    }
    if let Some(env) = env {
        for entry in env.to_environ() {
            println!("{entry}");
        }
    }
    Ok(())
}

/// Registers a session, spawns the program in it, and waits for it to exit.
///
/// Returns the exit code the launcher should exit with.
#[tokio::main]
async fn run_session(
    config: &FideConfig,
    composer: EnvironmentComposer,
    inspector: Arc<dyn PackageInspector>,
    session: SessionId,
    program: Vec<String>,
) -> Result<i32> {
    let Some((program, program_args)) = program.split_first() else {
        bail!("No program given");
    };

    let registry = spawn_registry_with_capacity(config.max_sessions);
    registry
        .register(session.clone())
        .await
        .with_context(|| format!("Failed to register session {session}"))?;

    let env = tokio::task::spawn_blocking(move || {
        composer.compose_companion_environment(inspector.as_ref())
    })
    .await
    .context("Environment composition task failed")?;

    let mut command = tokio::process::Command::new(program);
    command.args(program_args);
    if let Some(env) = &env {
        env.apply_to(&mut command);
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            registry.unregister(session.clone()).await;
            return Err(e).with_context(|| format!("Failed to spawn {program}"));
        }
    };

    match child.id() {
        Some(pid) => report_spawn(&registry, session.clone(), pid).await,
        None => warn!(session_id = %session, "Child exited before its pid was read"),
    }

    let status = child.wait().await.context("Failed to wait for child")?;
    info!(session_id = %session, status = %status, "Session process exited");

    registry.unregister(session).await;

    Ok(exit_code(status))
}

/// Maps a child's exit status to the launcher's exit code.
///
/// A child killed by a signal yields `128 + signal`, as a shell reports it.
fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    status.code().unwrap_or(1)
}

/// Delivers the spawn notification from its own task, as a PTY layer would.
async fn report_spawn(registry: &RegistryHandle, session: SessionId, pid: u32) {
    let observer: Arc<dyn SessionProcessObserver> = Arc::new(registry.clone());
    let notify = tokio::spawn({
        let session = session.clone();
        async move { observer.on_process_spawned(session, pid).await }
    });
    if let Err(e) = notify.await {
        warn!(session_id = %session, error = %e, "Spawn notification task failed");
    }

    if let Some(record) = registry.lookup(session).await {
        info!(
            session_id = %record.session,
            pid = ?record.process_id,
            "Session running"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_program() {
        let args = Args::try_parse_from([
            "fided",
            "run",
            "--session",
            "s-1",
            "--companion-version",
            "1.2.3",
            "--",
            "sh",
            "-c",
            "true",
        ])
        .unwrap();

        match args.command {
            Command::Run {
                session,
                companion,
                program,
            } => {
                assert_eq!(session.as_deref(), Some("s-1"));
                assert_eq!(companion.companion_version.as_deref(), Some("1.2.3"));
                assert_eq!(program, vec!["sh", "-c", "true"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_run_requires_program() {
        assert!(Args::try_parse_from(["fided", "run"]).is_err());
    }

    #[test]
    fn test_build_inspector_overrides() {
        let config = FideConfig::default();
        let composer = EnvironmentComposer::default();

        let companion = CompanionArgs {
            companion_version: Some("1.2.3".to_string()),
            companion_active: false,
        };
        let inspector = build_inspector(&config, &composer, &companion);
        let env = composer
            .compose_companion_environment(inspector.as_ref())
            .unwrap();
        assert_eq!(env.get("TERMUX_API_APP__VERSION_NAME"), Some("1.2.3"));

        let companion = CompanionArgs {
            companion_version: Some("1.2.3".to_string()),
            companion_active: true,
        };
        let inspector = build_inspector(&config, &composer, &companion);
        assert!(composer
            .compose_companion_environment(inspector.as_ref())
            .is_none());
    }

    #[cfg(unix)]
    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[cfg(unix)]
    #[test]
    fn test_run_session_passes_companion_environment() {
        let code = run_session(
            &FideConfig::default(),
            EnvironmentComposer::default(),
            Arc::new(StaticPackageInspector::installed("1.2.3")),
            SessionId::new("s"),
            sh("test \"$TERMUX_API_APP__VERSION_NAME\" = 1.2.3 && exit 7"),
        );
        assert_eq!(code.unwrap(), 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_session_active_companion_adds_nothing() {
        let code = run_session(
            &FideConfig::default(),
            EnvironmentComposer::new("FIDE", "com.termux.api").unwrap(),
            Arc::new(StaticPackageInspector::installed("1.2.3").with_active(true)),
            SessionId::new("s"),
            sh("test -z \"$FIDE_API_APP__VERSION_NAME\" && exit 3"),
        );
        assert_eq!(code.unwrap(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_session_reports_signal_exit() {
        let code = run_session(
            &FideConfig::default(),
            EnvironmentComposer::default(),
            Arc::new(StaticPackageInspector::absent()),
            SessionId::new("s"),
            sh("kill -TERM $$"),
        );
        assert_eq!(code.unwrap(), 128 + 15);
    }

    #[test]
    fn test_run_session_spawn_failure_is_error() {
        let result = run_session(
            &FideConfig::default(),
            EnvironmentComposer::default(),
            Arc::new(StaticPackageInspector::absent()),
            SessionId::new("s"),
            vec!["fide-definitely-not-a-real-program".to_string()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_run_session_requires_program() {
        let result = run_session(
            &FideConfig::default(),
            EnvironmentComposer::default(),
            Arc::new(StaticPackageInspector::absent()),
            SessionId::new("s"),
            Vec::new(),
        );
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_mapping() {
        use std::os::unix::process::ExitStatusExt;

        // Raw wait statuses: exit code in the high byte, signal in the low bits
        assert_eq!(exit_code(ExitStatus::from_raw(7 << 8)), 7);
        assert_eq!(exit_code(ExitStatus::from_raw(9)), 128 + 9);
    }
}
