//! RingCopy CLI - block-level copy with a live status line
//!
//! Usage: ringcopy [-s block_size] [-b num_blocks] <INPUT> <OUTPUT>

use clap::Parser;
use ringcopy::config::{CliArgs, CopyConfig, OutputFormat};
use ringcopy::core::{BlockCopier, CopyReport, StatusDisplay};
use ringcopy::error::{Result, RingCopyError};
use tracing_subscriber::EnvFilter;

fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Logs go to stderr so they never tear the status line on stdout
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(args.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Handle result
    match run(&args) {
        Ok(report) if report.read_fault.is_some() => std::process::exit(1),
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn run(args: &CliArgs) -> Result<CopyReport> {
    // Build configuration
    let config = CopyConfig::from_cli(args).map_err(RingCopyError::InvalidConfig)?;

    if !args.quiet {
        println!(
            "Starting block-level copy from \"{}\" to \"{}\" with buffer: {} (blocks), block: {} (bytes)",
            config.source.display(),
            config.destination.display(),
            config.num_blocks,
            config.block_size
        );
    }

    let status = if args.quiet {
        StatusDisplay::Off
    } else {
        StatusDisplay::Terminal
    };

    let report = BlockCopier::new(config).with_status(status).execute()?;

    match args.output_format {
        OutputFormat::Json => {
            println!("{}", report.to_json()?);
        }
        OutputFormat::Text if !args.quiet => report.print_summary(),
        OutputFormat::Text => {}
    }

    if let Some(fault) = &report.read_fault {
        eprintln!("Error: copy stopped early: {}", fault.message);
    }
    if !report.write_faults.is_empty() {
        eprintln!(
            "Warning: {} block(s) were not fully written; the output may be incomplete",
            report.write_faults.len()
        );
    }

    Ok(report)
}
