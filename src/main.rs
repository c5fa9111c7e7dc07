// Copyright 2026 MelhorCarro Contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use melhorcarro::cancel::CancelToken;
use melhorcarro::events::{EventBus, RunEvent};
use melhorcarro::filters::FilterSpec;
use melhorcarro::rank::{PreferenceKey, PreferenceVector};
use melhorcarro::record::CanonicalRecord;
use melhorcarro::{aggregator, protocol, rank};

#[derive(Parser)]
#[command(
    name = "melhorcarro",
    about = "MelhorCarro — unified car-listing aggregator for Brazilian marketplaces",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the enabled portals and stream protocol lines to stdout
    Run {
        /// Filter specification as a JSON object
        filters: Option<String>,
        /// Read the filter specification from a file instead
        #[arg(long, conflicts_with = "filters")]
        filters_file: Option<PathBuf>,
    },
    /// Re-rank a records JSON array offline by preference order
    Rank {
        /// File holding a JSON array of records (e.g. a RESULTADO payload)
        input: PathBuf,
        /// Preference keys, most important first (km, potencia, portas, ano)
        #[arg(long, value_delimiter = ',', required = true)]
        prefs: Vec<String>,
        /// Detail URL of a favorite; can be repeated
        #[arg(long = "favorite")]
        favorites: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout is reserved for protocol lines.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            filters,
            filters_file,
        } => run_cmd(filters, filters_file).await,
        Commands::Rank {
            input,
            prefs,
            favorites,
        } => rank_cmd(&input, &prefs, favorites),
    }
}

async fn run_cmd(filters: Option<String>, filters_file: Option<PathBuf>) -> Result<()> {
    let raw = match filters_file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => filters.unwrap_or_else(|| "{}".to_string()),
    };

    // A malformed payload is an empty run, never a crash: the host process
    // still gets its terminal line.
    let spec = match FilterSpec::from_json(&raw) {
        Ok(spec) => spec,
        Err(e) => {
            error!(error = %e, "invalid filter payload");
            println!("{}", protocol::format_result(&[]));
            return Ok(());
        }
    };

    let bus = EventBus::new(256);
    let mut rx = bus.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(RunEvent::Finished { .. }) => {}
                Ok(RunEvent::ExportSaved { filename }) => {
                    println!("{}", protocol::format_export(&filename));
                }
                // The line carries the bare record, not the event envelope.
                Ok(RunEvent::Record { record }) => match serde_json::to_value(&record) {
                    Ok(payload) => println!("{}", protocol::format_event(&payload)),
                    Err(e) => warn!(error = %e, "record serialization failed"),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event printer lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let cancel = CancelToken::with_default_sentinel();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    let records = aggregator::run(&spec, &bus, &cancel).await;

    // Closing the bus ends the printer; waiting for it keeps the terminal
    // line last on stdout.
    drop(bus);
    let _ = printer.await;

    println!("{}", protocol::format_result(&records));
    Ok(())
}

fn rank_cmd(input: &PathBuf, prefs: &[String], favorites: Vec<String>) -> Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let records: Vec<CanonicalRecord> =
        serde_json::from_str(&raw).context("parsing records array")?;

    let mut keys = Vec::new();
    for p in prefs {
        match PreferenceKey::parse(p) {
            Some(key) => keys.push(key),
            None => anyhow::bail!("unknown preference '{p}' (try km, potencia, portas, ano)"),
        }
    }
    let vector = PreferenceVector { keys, favorites };

    let ranked = rank::rank(&records, &vector);
    let rows: Vec<serde_json::Value> = ranked
        .into_iter()
        .map(|(score, record)| serde_json::json!({ "score": score, "record": record }))
        .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
