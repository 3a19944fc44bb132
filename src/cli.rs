//! The querycheck Command-Line Interface.
//!
//! This module is the main entry point of the binary: it parses arguments,
//! layers the configuration, wires the HTTP client into the suite, installs
//! the interruption listener and turns the final tally into an exit status.

use std::process;
use std::thread::JoinHandle;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::args::QuerycheckArgs;
use crate::client::http::HttpClient;
use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::executor::Executor;
use crate::output::{write_summary, StdoutSink};
use crate::signal::listen_for_interrupt;
use crate::suite::{Flow, Suite, Tally};

pub mod args;

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// The main entry point for the CLI.
pub fn run() {
    let args = QuerycheckArgs::parse();
    init_tracing();

    let config = RunnerConfig::from_env().with_args(&args);
    match execute(&config) {
        Ok(tally) => process::exit(tally.exit_code()),
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            process::exit(1);
        }
    }
}

/// Runs the configured suite against the HTTP API and prints the summary.
///
/// Fixture-level failures are part of the returned tally; only a fixture file
/// that cannot be loaded is an error.
pub fn execute(config: &RunnerConfig) -> Result<Tally, RunnerError> {
    let client = HttpClient::new(config.base_url.clone(), config.api_key.clone(), config.timeout);
    let executor = Executor::new(client, config.executor_config());
    let mut suite = Suite::new(executor, config.suite_config());

    let tally = suite.tally_handle();
    let color = config.color;
    let listener = listen_for_interrupt(suite.cancel_flag(), move || {
        let snapshot = tally.lock().clone();
        let mut out = StdoutSink::new(color);
        write_summary(&mut out, &snapshot);
        process::exit(snapshot.exit_code());
    });
    let listener = match listener {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "could not spawn interrupt listener");
            None
        }
    };

    let mut out = StdoutSink::new(config.color);
    let flow = suite.run(&mut out)?;
    if flow == Flow::Cancelled {
        wait_for_listener(listener);
    }
    let tally = suite.tally();
    write_summary(&mut out, &tally);
    Ok(tally)
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

// A cancelled run was stopped by the listener, which prints the summary and
// exits the process itself. Only a listener that died returns here.
fn wait_for_listener(listener: Option<JoinHandle<()>>) {
    if let Some(handle) = listener {
        if handle.join().is_err() {
            tracing::warn!("interrupt listener panicked");
        }
    }
}

// Diagnostics go to stderr so they never interleave with the stdout report.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
