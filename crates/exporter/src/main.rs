//! InfiniBand error exporter.
//!
//! Serves Prometheus metrics built from the output of ibqueryerrors: error
//! and traffic counters for every active port in the fabric, classified
//! warnings from the tool's error stream, and scrape metadata.

use anyhow::Result;
use clap::Parser;
use exporter_lib::{
    Collector, CollectorOptions, FixtureSource, IbQueryErrors, NameMap, PerfqueryReset,
    ReportSource, ResetRunner,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = config::Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(fmt::layer())
        .init();

    cli.validate()?;

    let names = match &cli.node_name_map {
        Some(path) => {
            let names = NameMap::load(path)?;
            info!(file = %path.display(), entries = names.len(), "node name map loaded");
            names
        }
        None => NameMap::default(),
    };

    let source: Box<dyn ReportSource> = match &cli.from_file {
        Some(path) => {
            warn!(file = %path.display(), "reading ibqueryerrors output from a file");
            Box::new(FixtureSource::new(path))
        }
        None => Box::new(IbQueryErrors::new(
            cli.node_name_map.clone(),
            cli.ca_name.clone(),
            cli.timeout(),
        )),
    };
    let reset: Box<dyn ResetRunner> = Box::new(PerfqueryReset);

    if cli.can_reset_counter {
        info!("counter auto-reset is enabled");
    }

    let collector = Collector::new(
        Arc::new(names),
        source,
        reset,
        CollectorOptions {
            auto_reset: cli.can_reset_counter,
            zero_absent_counters: cli.zero_absent_counters,
        },
    );

    let state = Arc::new(api::AppState { collector });
    api::serve(cli.port, state).await
}
