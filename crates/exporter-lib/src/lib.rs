//! Library for the InfiniBand error exporter.
//!
//! The pipeline turns one ibqueryerrors run into a Prometheus snapshot:
//! raw text -> parsed device records -> typed metrics -> encoded exposition.
//! Each scrape drives one isolated collection cycle.

pub mod catalog;
pub mod collector;
pub mod metrics;
pub mod models;
pub mod names;
pub mod overflow;
pub mod parser;
pub mod stderr;

pub use catalog::{CounterKind, GaugeKind, Severity};
pub use collector::{
    Collector, CollectorOptions, CycleOutcome, FixtureSource, IbQueryErrors, PerfqueryReset,
    ReportSource, ResetRunner,
};
pub use models::{DeviceKind, DeviceRecord, PortObservation, RawReport};
pub use names::NameMap;
