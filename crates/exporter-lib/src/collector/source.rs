//! Where a cycle's raw report text comes from: the live tool or a fixture.

use crate::models::RawReport;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// Source of one cycle's raw ibqueryerrors output.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch(&self) -> Result<RawReport>;
}

/// Live invocation of ibqueryerrors with the fixed reporting flags.
pub struct IbQueryErrors {
    node_name_map: Option<PathBuf>,
    ca_name: Option<String>,
    timeout: Duration,
}

impl IbQueryErrors {
    pub const BINARY: &'static str = "ibqueryerrors";

    pub fn new(node_name_map: Option<PathBuf>, ca_name: Option<String>, timeout: Duration) -> Self {
        Self {
            node_name_map,
            ca_name,
            timeout,
        }
    }
}

#[async_trait]
impl ReportSource for IbQueryErrors {
    async fn fetch(&self) -> Result<RawReport> {
        let mut cmd = Command::new(Self::BINARY);
        cmd.args([
            "--verbose",
            "--details",
            "--suppress-common",
            "--data",
            "--report-port",
            "--switch",
            "--ca",
        ]);
        if let Some(map) = &self.node_name_map {
            cmd.arg("--node-name-map").arg(map);
        }
        if let Some(ca_name) = &self.ca_name {
            cmd.arg("--Ca").arg(ca_name);
        }

        debug!(timeout_secs = self.timeout.as_secs(), "running ibqueryerrors");
        let started = Instant::now();
        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .context("ibqueryerrors did not finish within the timeout")?
            .context("failed to run ibqueryerrors")?;
        let tool_duration = started.elapsed();

        // The tool's exit status is not a reliable failure signal; only the
        // shape of its output is.
        debug!(status = %output.status, elapsed_ms = tool_duration.as_millis() as u64,
            "ibqueryerrors finished");

        Ok(RawReport {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
            tool_duration: Some(tool_duration),
        })
    }
}

/// Static report text read from a file, for development and tests. No tool
/// runs, so there is no stderr to classify and no invocation to time.
pub struct FixtureSource {
    path: PathBuf,
}

impl FixtureSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReportSource for FixtureSource {
    async fn fetch(&self) -> Result<RawReport> {
        let stdout = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read input file {}", self.path.display()))?;
        Ok(RawReport {
            stdout,
            stderr: None,
            tool_duration: None,
        })
    }
}
