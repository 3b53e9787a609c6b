//! e12pack - Main entry point

use anyhow::Context;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

use e12pack::cli::Cli;
use e12pack::process_guard;
use e12pack::{CancelToken, Dispatcher, PackError, PackReport, StrategyRegistry};

/// Initialize logging to stderr; RUST_LOG overrides the default `info` level
fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .init();
}

fn main() {
    init_logger();

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed: {:?}", cli);

    let cancel = CancelToken::new();
    if let Err(e) = process_guard::init_signal_handlers(cancel.clone()) {
        // Packers still die with us through PR_SET_PDEATHSIG
        warn!("Failed to initialize signal handlers: {}", e);
    }

    let dispatcher = Dispatcher::new(StrategyRegistry::with_builtin_backends())
        .workers(cli.workers)
        .strict(cli.strict)
        .cancel_token(cancel);

    match dispatcher.pack(&cli.pack) {
        Ok(report) => {
            if let Err(e) = print_report(&report, cli.json) {
                eprintln!("✗ {:#}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("Packing failed: {}", e);
            eprintln!("✗ Error while packing: {}", e);
            std::process::exit(exit_code(&e));
        }
    }
}

fn exit_code(err: &PackError) -> i32 {
    match (err, process_guard::received_signal()) {
        (PackError::Cancelled { .. }, Some(sig)) => 128 + sig,
        _ => 1,
    }
}

fn print_report(report: &PackReport, json: bool) -> anyhow::Result<()> {
    if json {
        let out = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        println!("{}", out);
        return Ok(());
    }

    for failure in report.failures() {
        eprintln!(
            "✗ {}: {}",
            failure.job.source_dir.display(),
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!(
        "✓ Packed {} of {} director(ies), {} failed",
        report.succeeded, report.submitted, report.failed
    );
    Ok(())
}
