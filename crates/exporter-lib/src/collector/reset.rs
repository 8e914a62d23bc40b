//! Counter reset via the external perfquery tool.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Seam for issuing a counter reset against one port.
#[async_trait]
pub trait ResetRunner: Send + Sync {
    async fn reset(&self, guid: &str, port: u64) -> Result<()>;
}

/// Invokes `perfquery -R -G <guid> <port>`. The command's exit status and
/// output are not otherwise inspected; the cycle never waits for the
/// counter to visibly reset.
pub struct PerfqueryReset;

#[async_trait]
impl ResetRunner for PerfqueryReset {
    async fn reset(&self, guid: &str, port: u64) -> Result<()> {
        let output = Command::new("perfquery")
            .args(["-R", "-G", guid, &port.to_string()])
            .output()
            .await
            .context("failed to run perfquery")?;
        debug!(guid = %guid, port = port, status = %output.status, "perfquery finished");
        Ok(())
    }
}
