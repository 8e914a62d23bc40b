//! Operator-facing configuration.

use anyhow::{bail, Context, Result};
use clap::Parser;
use exporter_lib::IbQueryErrors;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prometheus exporter for InfiniBand fabric error counters.
#[derive(Debug, Parser)]
#[command(name = "infiniband-exporter", author, version, about, long_about = None)]
pub struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 9683)]
    pub port: u16,

    /// Reset counters that are close to overflowing with perfquery
    #[arg(long, env = "CAN_RESET_COUNTER")]
    pub can_reset_counter: bool,

    /// Read ibqueryerrors output from a file instead of running the tool
    #[arg(long, value_name = "FILE")]
    pub from_file: Option<PathBuf>,

    /// Node name map file, passed through to ibqueryerrors
    #[arg(long, env = "NODE_NAME_MAP", value_name = "FILE")]
    pub node_name_map: Option<PathBuf>,

    /// Only query the fabric reachable through this local channel adapter
    #[arg(long, value_name = "NAME")]
    pub ca_name: Option<String>,

    /// Emit 0 for known counters missing from a port's report line
    #[arg(long)]
    pub zero_absent_counters: bool,

    /// Seconds to wait for ibqueryerrors before giving up on the scrape
    #[arg(long, default_value_t = 60, value_name = "SECS")]
    pub ibqueryerrors_timeout_secs: u64,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.ibqueryerrors_timeout_secs)
    }

    /// Fail at startup on inputs the first scrape would otherwise fail on.
    pub fn validate(&self) -> Result<()> {
        match &self.from_file {
            Some(path) => {
                if !path.is_file() {
                    bail!("input file {} does not exist", path.display());
                }
            }
            None => {
                find_in_path(IbQueryErrors::BINARY).with_context(|| {
                    format!("{} not found in PATH", IbQueryErrors::BINARY)
                })?;
            }
        }
        if let Some(map) = &self.node_name_map {
            if !map.is_file() {
                bail!("node name map {} does not exist", map.display());
            }
        }
        Ok(())
    }
}

fn find_in_path(binary: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(binary))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.is_file()
        && path
            .metadata()
            .map(|meta| meta.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
