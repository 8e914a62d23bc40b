use super::*;
use crate::models::RawReport;
use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

const HEALTHY_REPORT: &str = "Errors for 0x1 \"sw1\"\n   \
    GUID 0x1 port ALL: [PortXmitData == 5]\n   \
    GUID 0x1 port 1:[PortXmitData == 5]\n      \
    Link info: 1 1[  ] == (4X  25.0 Gbps Active/  LinkUp) ==>      2   1[  ] \"node2\"\n";

const OVERFLOWING_REPORT: &str = "Errors for 0x1 \"sw1\"\n   \
    GUID 0x1 port ALL: [LinkDownedCounter == 200]\n   \
    GUID 0x1 port 1:[LinkDownedCounter == 200]\n      \
    Link info: 1 1[  ] == (4X  25.0 Gbps Active/  LinkUp) ==>      2   1[  ] \"node2\"\n";

struct StaticSource {
    report: RawReport,
}

impl StaticSource {
    fn new(stdout: &str, stderr: Option<&str>) -> Self {
        Self {
            report: RawReport {
                stdout: stdout.to_string(),
                stderr: stderr.map(str::to_string),
                tool_duration: stderr.is_some().then(|| Duration::from_millis(250)),
            },
        }
    }
}

#[async_trait]
impl ReportSource for StaticSource {
    async fn fetch(&self) -> Result<RawReport> {
        Ok(self.report.clone())
    }
}

struct FailingSource;

#[async_trait]
impl ReportSource for FailingSource {
    async fn fetch(&self) -> Result<RawReport> {
        Err(anyhow!("tool not found"))
    }
}

#[derive(Default)]
struct RecordingReset {
    calls: Arc<Mutex<Vec<(String, u64)>>>,
}

#[async_trait]
impl ResetRunner for RecordingReset {
    async fn reset(&self, guid: &str, port: u64) -> Result<()> {
        self.calls.lock().unwrap().push((guid.to_string(), port));
        Ok(())
    }
}

fn collector(
    source: impl ReportSource + 'static,
    options: CollectorOptions,
) -> (Collector, Arc<Mutex<Vec<(String, u64)>>>) {
    let reset = RecordingReset::default();
    let calls = Arc::clone(&reset.calls);
    let collector = Collector::new(
        Arc::new(NameMap::default()),
        Box::new(source),
        Box::new(reset),
        options,
    );
    (collector, calls)
}

const DEFAULT_OPTIONS: CollectorOptions = CollectorOptions {
    auto_reset: false,
    zero_absent_counters: false,
};

#[tokio::test]
async fn test_healthy_cycle_emits_device_families() {
    let (collector, calls) = collector(StaticSource::new(HEALTHY_REPORT, None), DEFAULT_OPTIONS);
    let outcome = collector.run_cycle().await.unwrap();

    assert!(!outcome.degraded);
    assert!(outcome.body.contains("infiniband_portxmitdata{"));
    assert!(outcome.body.contains("infiniband_scrape_ok 1"));
    assert!(outcome.body.contains("infiniband_scrape_duration_seconds"));
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_overflow_without_reset_keeps_the_value() {
    let (collector, calls) = collector(
        StaticSource::new(OVERFLOWING_REPORT, None),
        DEFAULT_OPTIONS,
    );
    let outcome = collector.run_cycle().await.unwrap();

    assert!(!outcome.degraded);
    let sample = outcome
        .body
        .lines()
        .find(|l| l.starts_with("infiniband_linkdownedcounter{"))
        .expect("linkdownedcounter sample");
    assert!(sample.ends_with(" 200"));
    assert!(outcome.body.contains("infiniband_scrape_ok 1"));
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_overflow_with_reset_enabled_resets_the_port() {
    let (collector, calls) = collector(
        StaticSource::new(OVERFLOWING_REPORT, None),
        CollectorOptions {
            auto_reset: true,
            zero_absent_counters: false,
        },
    );
    let outcome = collector.run_cycle().await.unwrap();

    assert_eq!(*calls.lock().unwrap(), vec![("0x1".to_string(), 1)]);
    // The out-of-range value is still emitted; only the next cycle sees the
    // reset counter.
    assert!(outcome.body.contains("infiniband_linkdownedcounter{"));
}

#[tokio::test]
async fn test_unclassified_stderr_degrades_but_keeps_counters() {
    let stderr = "ibwarn: [12345] mad_rpc: _do_madrpc failed; dport (Lid 41)\n\
        something completely new\n";
    let (collector, _) = collector(
        StaticSource::new(HEALTHY_REPORT, Some(stderr)),
        DEFAULT_OPTIONS,
    );
    let outcome = collector.run_cycle().await.unwrap();

    assert!(outcome.degraded);
    assert!(outcome.body.contains("infiniband_scrape_ok 0"));
    assert!(outcome
        .body
        .contains("infiniband_mad_rpc_failed_error{portid=\"Lid 41\"} 1"));
    assert!(outcome.body.contains("infiniband_portxmitdata{"));
}

#[tokio::test]
async fn test_clean_stderr_does_not_degrade() {
    let stderr = "ibwarn: [12345] mad_rpc: _do_madrpc failed; dport (Lid 41)\n";
    let (collector, _) = collector(
        StaticSource::new(HEALTHY_REPORT, Some(stderr)),
        DEFAULT_OPTIONS,
    );
    let outcome = collector.run_cycle().await.unwrap();

    assert!(!outcome.degraded);
    assert!(outcome.body.contains("infiniband_scrape_ok 1"));
    assert!(outcome
        .body
        .contains("infiniband_ibqueryerrors_duration_seconds 0.25"));
}

#[tokio::test]
async fn test_malformed_report_degrades_without_device_families() {
    let (collector, _) = collector(
        StaticSource::new("not a report at all\n", None),
        DEFAULT_OPTIONS,
    );
    let outcome = collector.run_cycle().await.unwrap();

    assert!(outcome.degraded);
    assert!(outcome.body.contains("infiniband_scrape_ok 0"));
    assert!(outcome.body.contains("infiniband_scrape_duration_seconds"));
    assert!(!outcome.body.contains("infiniband_portxmitdata"));
    assert!(!outcome.body.contains("infiniband_speed"));
}

#[tokio::test]
async fn test_unknown_counter_degrades_the_cycle() {
    let stdout = "Errors for 0x1 \"sw1\"\n   \
        GUID 0x1 port ALL: [PortXmitData == 5]\n   \
        GUID 0x1 port 1:[FutureCounter == 9] [PortXmitData == 5]\n      \
        Link info: 1 1[  ] == (4X  25.0 Gbps Active/  LinkUp) ==>      2   1[  ] \"node2\"\n";
    let (collector, _) = collector(StaticSource::new(stdout, None), DEFAULT_OPTIONS);
    let outcome = collector.run_cycle().await.unwrap();

    assert!(outcome.degraded);
    assert!(outcome.body.contains("infiniband_scrape_ok 0"));
    assert!(outcome.body.contains("infiniband_portxmitdata{"));
}

#[tokio::test]
async fn test_fetch_failure_is_a_cycle_error() {
    let (collector, _) = collector(FailingSource, DEFAULT_OPTIONS);
    assert!(collector.run_cycle().await.is_err());
}

#[tokio::test]
async fn test_cycles_are_idempotent() {
    let (collector, _) = collector(StaticSource::new(HEALTHY_REPORT, None), DEFAULT_OPTIONS);
    let first = collector.run_cycle().await.unwrap();
    let second = collector.run_cycle().await.unwrap();

    // Timing lines differ run to run and label children are emitted in hash
    // order, so compare the sorted sample lines without them.
    let stable = |body: &str| {
        let mut lines: Vec<String> = body
            .lines()
            .filter(|l| !l.contains("duration_seconds"))
            .map(str::to_string)
            .collect();
        lines.sort();
        lines
    };
    assert_eq!(stable(&first.body), stable(&second.body));
}
