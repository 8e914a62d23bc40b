//! Collection Cycle Orchestrator.
//!
//! One cycle per scrape: fetch the raw report, classify stderr (live runs
//! only), parse stdout, evaluate the overflow policy on every parsed
//! counter value, and assemble the snapshot. Cycles are synchronous,
//! independent, and share only immutable state (the counter catalog and the
//! name map), so concurrent scrapes need no locking.

mod reset;
mod source;

#[cfg(test)]
mod tests;

pub use reset::{PerfqueryReset, ResetRunner};
pub use source::{FixtureSource, IbQueryErrors, ReportSource};

use crate::metrics::SnapshotBuilder;
use crate::names::NameMap;
use crate::overflow::{OverflowAction, OverflowPolicy};
use crate::parser;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Operator configuration consumed by the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct CollectorOptions {
    /// Issue `perfquery` resets for counters at risk of wrapping.
    pub auto_reset: bool,
    /// Emit 0 for catalog counters missing from a port's counter list
    /// instead of leaving them absent.
    pub zero_absent_counters: bool,
}

/// Outcome of one collection cycle.
#[derive(Debug)]
pub struct CycleOutcome {
    /// Prometheus text exposition of the cycle's metric families.
    pub body: String,
    /// True when any parsing or classification step failed non-fatally.
    pub degraded: bool,
}

/// Runs one isolated collection cycle per scrape.
pub struct Collector {
    names: Arc<NameMap>,
    source: Box<dyn ReportSource>,
    reset: Box<dyn ResetRunner>,
    policy: OverflowPolicy,
    options: CollectorOptions,
}

impl Collector {
    pub fn new(
        names: Arc<NameMap>,
        source: Box<dyn ReportSource>,
        reset: Box<dyn ResetRunner>,
        options: CollectorOptions,
    ) -> Self {
        Self {
            names,
            source,
            reset,
            policy: OverflowPolicy {
                auto_reset: options.auto_reset,
            },
            options,
        }
    }

    /// Run one full cycle. A fetch failure (e.g. an unreadable input file)
    /// is a cycle-level error; everything downstream degrades the cycle
    /// instead of failing it.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        debug!("start of collection cycle");
        let scrape_start = Instant::now();
        let mut builder = SnapshotBuilder::new();
        let mut degraded = false;

        let raw = self
            .source
            .fetch()
            .await
            .context("fetching ibqueryerrors report")?;

        if let Some(stderr) = raw.stderr.as_deref() {
            if !stderr.is_empty() {
                let summary = crate::stderr::scan(stderr);
                for line in &summary.unrecognized {
                    error!(line = %line, "could not classify line from ibqueryerrors stderr");
                }
                degraded |= !summary.is_clean();
                builder.observe_stderr(&summary);
            }
        }
        if let Some(duration) = raw.tool_duration {
            builder.observe_tool_duration(duration);
        }

        match parser::parse_report(&raw.stdout, &self.names) {
            Ok(parsed) => {
                degraded |= !parsed.unknown_counters.is_empty();
                self.evaluate_overflow(&parsed.devices).await;
                builder.observe_devices(&parsed.devices, self.options.zero_absent_counters);
            }
            Err(err) => {
                error!(error = %err, "failed to parse ibqueryerrors report");
                degraded = true;
            }
        }

        let body = builder.finish(scrape_start.elapsed(), !degraded)?;
        debug!(degraded = degraded, "end of collection cycle");
        Ok(CycleOutcome { body, degraded })
    }

    /// Apply the overflow policy to every parsed counter value. Reset
    /// failures are logged, never fatal; the out-of-range value is emitted
    /// as-is either way.
    async fn evaluate_overflow(&self, devices: &[crate::models::DeviceRecord]) {
        for device in devices {
            for obs in &device.ports {
                let port_name = self.names.resolve_or(&obs.guid, &obs.guid);
                for (&counter, &value) in &obs.counters {
                    match self.policy.check(counter, value) {
                        OverflowAction::None => {}
                        OverflowAction::Reset => {
                            info!(device = %port_name, port = obs.port,
                                counter = counter.name(), value = value,
                                "resetting counters");
                            if let Err(err) = self.reset.reset(&obs.guid, obs.port).await {
                                warn!(device = %port_name, port = obs.port,
                                    error = %err, "counter reset failed");
                            }
                        }
                        OverflowAction::Warn => {
                            warn!(device = %port_name, port = obs.port,
                                counter = counter.name(), value = value,
                                "counter is close to its maximum and resets are disabled");
                        }
                    }
                }
            }
        }
    }
}
