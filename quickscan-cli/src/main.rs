// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Command-line front end for the inventory pipeline: argument parsing,
//! logger setup and report rendering. The scanning itself lives in the
//! `inventory` crate.

use std::{path::Path, process::ExitCode, time::Duration};

use clap::{Parser, ValueEnum};
use log::info;

use inventory::{parse_size, Policy};

mod filter;
mod render;

use filter::RecordFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

/// Fast parallel inventory of block storage devices
#[derive(Debug, Parser)]
#[command(name = "quickscan", version)]
struct Args {
    /// Report format for the disk inventory
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    loglevel: LogLevel,

    /// Minimum eligible device size (e.g. 10G, 512M, bytes)
    #[arg(long, default_value = "10G")]
    min_size: String,

    /// Worker pool size; defaults to min(CPU count, device count)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-device probe timeout in seconds
    #[arg(long, default_value_t = 30)]
    probe_timeout: u64,

    /// Overall scan deadline in seconds
    #[arg(long)]
    deadline: Option<u64>,

    /// Filter the devices shown by key/value (e.g. available=true,model=...)
    #[arg(long)]
    filter: Option<String>,
}

/// Preconditions for a meaningful scan, checked before any probing.
fn preflight() -> Vec<String> {
    let mut reasons = Vec::new();
    if !nix::unistd::geteuid().is_root() {
        reasons.push("must be root or run with sudo privileges".to_string());
    }
    if !Path::new("/dev/disk").exists() {
        reasons.push("/dev/disk not present - udev required".to_string());
    }
    reasons
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    pretty_env_logger::formatted_timed_builder()
        .filter_level(args.loglevel.into())
        .init();

    let reasons = preflight();
    if !reasons.is_empty() {
        eprintln!("Error: Unable to start");
        for reason in reasons {
            eprintln!("{reason}");
        }
        return ExitCode::from(4);
    }

    let min_device_size = match parse_size(&args.min_size) {
        Ok(size) => size,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let policy = Policy {
        min_device_size,
        probe_timeout: Duration::from_secs(args.probe_timeout),
        concurrency: args.concurrency,
        deadline: args.deadline.map(Duration::from_secs),
    };

    // An unusable filter is ignored, not fatal (it only narrows output)
    let filter = args.filter.as_deref().and_then(|expression| {
        RecordFilter::parse(expression)
            .map_err(|err| log::error!("invalid filter provided, ignored: {err}"))
            .ok()
    });

    info!("Starting...");
    let started = std::time::Instant::now();
    let aggregate = match inventory::run_inventory(&policy).await {
        Ok(aggregate) => aggregate,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };
    info!("Completed, runtime: {:?}", started.elapsed());

    let records = aggregate
        .iter()
        .filter(|record| filter.as_ref().map(|f| f.matches(record)).unwrap_or(true));
    let report = match args.format {
        Format::Text => render::as_text(records),
        Format::Json => match render::as_json(records) {
            Ok(json) => json,
            Err(err) => {
                eprintln!("Error: {err}");
                return ExitCode::FAILURE;
            }
        },
    };
    println!("{report}");
    ExitCode::SUCCESS
}
