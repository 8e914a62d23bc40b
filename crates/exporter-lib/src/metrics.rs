//! Per-cycle metric-family assembly.
//!
//! Every collection cycle builds its own family vectors and its own
//! registry, so concurrent scrapes never share mutable metric state. The
//! builder registers only the families belonging to stages that actually
//! ran: device families on a successful parse (declared even when they hold
//! no samples), stderr families when stderr was classified, the tool
//! duration only for live runs. Scrape duration and the success flag are
//! always present.

use crate::catalog::{CounterKind, GaugeKind};
use crate::models::DeviceRecord;
use crate::stderr::{StderrSummary, Tally};
use anyhow::{Context, Result};
use prometheus::{Encoder, Gauge, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Label set shared by every device counter and gauge family.
pub const DEVICE_LABELS: [&str; 7] = [
    "component",
    "local_name",
    "local_guid",
    "local_port",
    "remote_guid",
    "remote_port",
    "remote_name",
];

const BAD_STATUS_LABELS: [&str; 3] = ["path", "status", "error"];
const QUERY_FAILED_LABELS: [&str; 4] = ["counter_name", "local_name", "lid", "port"];
const MAD_RPC_FAILED_LABELS: [&str; 1] = ["portid"];
const QUERY_CAP_MASK_LABELS: [&str; 4] = ["counter_name", "local_name", "portid", "port"];
const PRINT_ERROR_LABELS: [&str; 4] = ["counter_name", "local_name", "portid", "port"];

fn counter_vec(name: &str, help: &str, labels: &[&str]) -> IntCounterVec {
    IntCounterVec::new(Opts::new(name, help), labels).expect("static counter definition")
}

fn gauge_vec(name: &str, help: &str, labels: &[&str]) -> GaugeVec {
    GaugeVec::new(Opts::new(name, help), labels).expect("static gauge definition")
}

fn gauge(name: &str, help: &str) -> Gauge {
    Gauge::new(name, help).expect("static gauge definition")
}

/// Builder for one cycle's metric snapshot.
pub struct SnapshotBuilder {
    counters: Vec<(CounterKind, IntCounterVec)>,
    gauges: Vec<(GaugeKind, GaugeVec)>,
    bad_status: GaugeVec,
    query_failed: GaugeVec,
    mad_rpc_failed: GaugeVec,
    query_cap_mask: GaugeVec,
    print_error: GaugeVec,
    tool_duration: Gauge,
    scrape_duration: Gauge,
    scrape_ok: Gauge,
    emit_devices: bool,
    emit_stderr: bool,
    emit_tool_duration: bool,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        let counters = CounterKind::ALL
            .iter()
            .map(|&kind| {
                (
                    kind,
                    counter_vec(&kind.metric_name(), kind.help(), &DEVICE_LABELS),
                )
            })
            .collect();
        let gauges = GaugeKind::ALL
            .iter()
            .map(|&kind| {
                (
                    kind,
                    gauge_vec(&kind.metric_name(), kind.help(), &DEVICE_LABELS),
                )
            })
            .collect();

        Self {
            counters,
            gauges,
            bad_status: gauge_vec(
                "infiniband_bad_status_error",
                "Bad status errors reported on the ibqueryerrors error stream.",
                &BAD_STATUS_LABELS,
            ),
            query_failed: gauge_vec(
                "infiniband_query_failed_error",
                "Failed queries reported on the ibqueryerrors error stream.",
                &QUERY_FAILED_LABELS,
            ),
            mad_rpc_failed: gauge_vec(
                "infiniband_mad_rpc_failed_error",
                "MAD RPC failures reported on the ibqueryerrors error stream.",
                &MAD_RPC_FAILED_LABELS,
            ),
            query_cap_mask: gauge_vec(
                "infiniband_query_cap_mask_error",
                "Capability mask query failures reported on the ibqueryerrors error stream.",
                &QUERY_CAP_MASK_LABELS,
            ),
            print_error: gauge_vec(
                "infiniband_print_error",
                "Counter print failures reported on the ibqueryerrors error stream.",
                &PRINT_ERROR_LABELS,
            ),
            tool_duration: gauge(
                "infiniband_ibqueryerrors_duration_seconds",
                "Number of seconds taken to run ibqueryerrors.",
            ),
            scrape_duration: gauge(
                "infiniband_scrape_duration_seconds",
                "Number of seconds taken to collect and parse the stats.",
            ),
            scrape_ok: gauge(
                "infiniband_scrape_ok",
                "Indicates with a 1 if the scrape was successful and complete, \
                 otherwise 0 on any non-critical error detected, e.g. ignored \
                 lines from ibqueryerrors stderr or parsing errors.",
            ),
            emit_devices: false,
            emit_stderr: false,
            emit_tool_duration: false,
        }
    }

    /// Record every port observation of a successfully parsed report and
    /// declare the device families for this cycle. With `zero_absent`,
    /// catalog counters missing from a port's counter list are emitted as 0
    /// instead of being left out.
    pub fn observe_devices(&mut self, devices: &[DeviceRecord], zero_absent: bool) {
        self.emit_devices = true;
        for device in devices {
            for obs in &device.ports {
                let local_port = obs.port.to_string();
                let remote_port = obs.remote_port.to_string();
                let labels = [
                    device.kind.as_label(),
                    device.name.as_str(),
                    obs.guid.as_str(),
                    local_port.as_str(),
                    obs.remote_guid.as_str(),
                    remote_port.as_str(),
                    obs.remote_name.as_str(),
                ];

                for (kind, vec) in &self.gauges {
                    let value = match kind {
                        GaugeKind::Speed => obs.speed,
                        GaugeKind::Width => obs.width as f64,
                    };
                    vec.with_label_values(&labels).set(value);
                }

                for (kind, vec) in &self.counters {
                    match obs.counters.get(kind) {
                        Some(&value) => vec.with_label_values(&labels).inc_by(value),
                        None if zero_absent => vec.with_label_values(&labels).inc_by(0),
                        None => {}
                    }
                }
            }
        }
    }

    /// Record the classified stderr tallies and declare the stderr families
    /// for this cycle.
    pub fn observe_stderr(&mut self, summary: &StderrSummary) {
        self.emit_stderr = true;
        fill_tally(&self.bad_status, &summary.bad_status);
        fill_tally(&self.query_failed, &summary.query_failed);
        fill_tally(&self.mad_rpc_failed, &summary.mad_rpc_failed);
        fill_tally(&self.query_cap_mask, &summary.query_cap_mask);
        fill_tally(&self.print_error, &summary.print_error);
    }

    pub fn observe_tool_duration(&mut self, duration: Duration) {
        self.emit_tool_duration = true;
        self.tool_duration.set(duration.as_secs_f64());
    }

    /// Assemble and encode the final exposition text.
    pub fn finish(self, scrape_duration: Duration, ok: bool) -> Result<String> {
        self.scrape_duration.set(scrape_duration.as_secs_f64());
        self.scrape_ok.set(if ok { 1.0 } else { 0.0 });

        let registry = Registry::new();
        let register = |collector: Box<dyn prometheus::core::Collector>| {
            registry
                .register(collector)
                .expect("unique per-cycle family");
        };

        if self.emit_stderr {
            register(Box::new(self.bad_status.clone()));
            register(Box::new(self.query_failed.clone()));
            register(Box::new(self.mad_rpc_failed.clone()));
            register(Box::new(self.query_cap_mask.clone()));
            register(Box::new(self.print_error.clone()));
        }
        if self.emit_tool_duration {
            register(Box::new(self.tool_duration.clone()));
        }
        if self.emit_devices {
            for (_, vec) in &self.counters {
                register(Box::new(vec.clone()));
            }
            for (_, vec) in &self.gauges {
                register(Box::new(vec.clone()));
            }
        }
        register(Box::new(self.scrape_duration.clone()));
        register(Box::new(self.scrape_ok.clone()));

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .context("encoding metrics snapshot")?;
        String::from_utf8(buffer).context("metrics snapshot is not valid UTF-8")
    }
}

fn fill_tally(vec: &GaugeVec, tally: &Tally) {
    for (labels, &count) in tally {
        let values: Vec<&str> = labels.iter().map(String::as_str).collect();
        vec.with_label_values(&values).set(count as f64);
    }
}
