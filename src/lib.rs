pub mod cli;
pub mod config;
pub mod introspect;
pub mod kernel;
pub mod python;
pub mod service;
pub mod trace;

use anyhow::{Result, anyhow, bail};
use cli::CliArgs;
use config::KernelConfig;
use introspect::Introspector;
use kernel::{InputChannel, run_host_loop};
use python::{PythonSession, UserRunResult};
use service::IntrospectionService;
use std::fs;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};
use trace::SessionTrace;

/// Runs the kernel until its input ends. Must be called from the process's
/// main thread so user code can be interrupted.
pub async fn run(args: CliArgs) -> Result<ExitCode> {
    let config = KernelConfig::load_with_path(args.config.as_deref())?;
    let python = PythonSession::initialize()?;
    if args.smoke_python {
        println!("smoke-python: ok");
        return Ok(ExitCode::SUCCESS);
    }

    let session_id = generate_session_id();
    let trace = if config.trace {
        SessionTrace::create(&session_id)?
    } else {
        SessionTrace::disabled()
    };
    trace.log_kernel(&format!("session {session_id} started"));
    if !python.interrupts_enabled() {
        trace.log_kernel("interrupt requests unavailable: interpreter not on the main thread");
    }

    if let Some(path) = run_startup_script_if_configured(&python, &config)? {
        trace.log_kernel(&format!("startup file {} executed", path.display()));
    }

    let (mut input, feed) = InputChannel::pair();
    feed.spawn_reader(BufReader::new(io::stdin()))?;

    let host = python.host(feed, trace.clone());
    let introspection = IntrospectionService::spawn(Introspector::new(host), trace.clone())?;
    let listen = args.listen.unwrap_or(config.listen);
    let listener = service::bind(listen)
        .await
        .map_err(|err| anyhow!("Failed to listen on {listen}: {err}"))?;
    let addr = listener.local_addr()?;
    println!("introspection listening on {addr}");
    trace.log_kernel(&format!("introspection listening on {addr}"));

    let server_trace = trace.clone();
    tokio::spawn(async move {
        if let Err(err) = service::serve(listener, introspection, server_trace.clone()).await {
            server_trace.log_kernel(&format!("introspection server stopped: {err}"));
        }
    });

    let exit = tokio::task::block_in_place(|| {
        run_host_loop(
            &python,
            &mut input,
            &trace,
            &mut io::stdout().lock(),
            &mut io::stderr().lock(),
        )
    })?;
    trace.log_kernel(&format!("session ended with status {}", exit.code()));

    Ok(ExitCode::from(u8::try_from(exit.code()).unwrap_or(1)))
}

fn run_startup_script_if_configured(
    python: &PythonSession,
    config: &KernelConfig,
) -> Result<Option<PathBuf>> {
    let Some(path) = startup_script_path(config)? else {
        return Ok(None);
    };

    let source = fs::read_to_string(&path).map_err(|err| {
        anyhow!(
            "Failed to load startup file {}: unable to read file: {err}",
            path.display()
        )
    })?;

    match python.run_exec_input(&source, &path.display().to_string())? {
        UserRunResult::Executed => Ok(Some(path)),
        UserRunResult::Failed(exception) => {
            bail!(
                "Failed to execute startup file {}:\n{}",
                path.display(),
                exception.traceback
            )
        }
        UserRunResult::Exited { code } => {
            bail!(
                "Startup file {} exited with status {code}",
                path.display()
            )
        }
        UserRunResult::Evaluated { .. } => {
            bail!("internal error: startup script unexpectedly evaluated expression")
        }
    }
}

fn startup_script_path(config: &KernelConfig) -> Result<Option<PathBuf>> {
    if let Some(path) = &config.startup_file {
        return Ok(Some(path.clone()));
    }

    if config.config_is_explicit {
        return Ok(None);
    }

    let config_dir = config.config_path.parent().ok_or_else(|| {
        anyhow!(
            "Failed to resolve startup file path from config {}: missing parent directory",
            config.config_path.display()
        )
    })?;
    let implicit_startup = config_dir.join("startup.py");
    if is_regular_file(&implicit_startup) {
        Ok(Some(implicit_startup))
    } else {
        Ok(None)
    }
}

fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}

fn generate_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis());
    format!("{millis:x}-{:x}", std::process::id())
}
