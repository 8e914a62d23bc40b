//! Per-cycle data model.
//!
//! Everything here is constructed fresh for one collection cycle, owned by
//! the orchestrator, and dropped when the snapshot has been emitted.

use crate::catalog::CounterKind;
use std::collections::BTreeMap;
use std::time::Duration;

/// The two device kinds ibqueryerrors reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Ca,
    Switch,
}

impl DeviceKind {
    /// Value of the `component` metric label.
    pub fn as_label(self) -> &'static str {
        match self {
            DeviceKind::Ca => "ca",
            DeviceKind::Switch => "switch",
        }
    }
}

/// One physically active port on a device, with the counters present in its
/// report line. Counters absent from the report are absent here too; they
/// are only zero-filled at emission time when the operator asks for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PortObservation {
    pub guid: String,
    pub port: u64,
    pub width: u64,
    pub speed: f64,
    /// Empty when the link line carried no remote GUID.
    pub remote_guid: String,
    pub remote_port: u64,
    pub remote_name: String,
    pub counters: BTreeMap<CounterKind, u64>,
}

/// One channel adapter or switch from a single report.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub kind: DeviceKind,
    pub name: String,
    pub ports: Vec<PortObservation>,
}

/// Raw output of one ibqueryerrors run (or fixture read).
#[derive(Debug, Clone)]
pub struct RawReport {
    pub stdout: String,
    /// `None` when reading from a fixture file: there is no error stream to
    /// classify.
    pub stderr: Option<String>,
    /// `None` when reading from a fixture file: nothing was timed.
    pub tool_duration: Option<Duration>,
}
