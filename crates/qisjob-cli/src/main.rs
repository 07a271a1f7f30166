//! qisjob command-line interface.
//!
//! ```text
//! qisjob -a --qasm-simulator -t 1024 entangle.qasm
//! qasm_simulator 2024-03-01T12:00:00.000000
//! 00;11;
//! 509;515;
//! ```
//!
//! Exit status is 0 on success, 1 for argument errors, 100 for runtime
//! errors and 200 for SDK errors.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use console::style;
use qisjob::{Defaults, QisJob, QisJobError};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;

fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let defaults = Defaults::load().context("loading defaults")?;
    debug!(?defaults, "defaults");
    let config = cli.job_config(&defaults)?;
    let outcome = QisJob::new(config).run(&cli.sources()).await?;
    if let Some(backend) = outcome.backend {
        info!(backend, records = outcome.csv.len(), "done");
    }
    Ok(())
}

fn report(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<QisJobError>() {
        Some(err) => {
            eprintln!("{}", err.report());
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
        }
        None => {
            eprintln!("{} {err:#}", style("Error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // help goes to stdout with status 0; usage errors are argument errors
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            if e.print().is_err() {
                eprintln!("{e}");
            }
            return ExitCode::from(1);
        }
    };
    init_logging(&cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}
