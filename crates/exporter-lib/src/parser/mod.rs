//! Report Parser: ibqueryerrors stdout to per-device records.
//!
//! The report is an unversioned text format, so the parser is deliberately
//! strict: any line that does not fit the expected grammar aborts the whole
//! report with a typed [`ParseError`] rather than risking silently wrong
//! values. The known-benign shapes (down links, the port 0 management port,
//! blank and `##` separator pairs) are skipped instead.

mod line;


pub use line::{
    is_all_ports_line, parse_counters, parse_header, parse_link_line, parse_port_line,
    ActiveLink, LinkLine, PortLine,
};

use crate::catalog::CounterKind;
use crate::models::{DeviceKind, DeviceRecord, PortObservation};
use crate::names::NameMap;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, error};

/// Structural anomalies that abort parsing of the entire report.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected content before first device header: {0:?}")]
    LeadingContent(String),
    #[error("device {device:?}: inconsistent port/link pair: {first:?} / {second:?}")]
    InconsistentPair {
        device: String,
        first: String,
        second: String,
    },
    #[error("device {device:?}: dangling line at end of record: {line:?}")]
    DanglingLine { device: String, line: String },
    #[error("device {device:?}: malformed link info line: {line:?}")]
    MalformedLinkInfo { device: String, line: String },
    #[error("device {device:?} port {port}: unexpected link state {state:?}")]
    UnexpectedLinkState {
        device: String,
        port: u64,
        state: String,
    },
}

/// Result of a successful parse. Unknown counter names do not abort the
/// parse; they are dropped from the records and reported here so the cycle
/// can be marked degraded.
#[derive(Debug, Default)]
pub struct ParsedReport {
    pub devices: Vec<DeviceRecord>,
    pub unknown_counters: Vec<String>,
}

/// Parse a full ibqueryerrors stdout blob. An empty blob parses to zero
/// devices; content before the first `Errors for` header is an anomaly.
pub fn parse_report(text: &str, names: &NameMap) -> Result<ParsedReport, ParseError> {
    let mut report = ParsedReport::default();

    let mut header: Option<(Option<&str>, &str)> = None;
    let mut body: Vec<&str> = Vec::new();

    for raw_line in text.lines() {
        if let Some(parsed) = parse_header(raw_line) {
            if let Some((guid, name)) = header.take() {
                report
                    .devices
                    .push(parse_device(guid, name, &body, names, &mut report.unknown_counters)?);
                body.clear();
            }
            header = Some(parsed);
        } else if header.is_some() {
            body.push(raw_line);
        } else if !raw_line.is_empty() {
            return Err(ParseError::LeadingContent(raw_line.to_string()));
        } else {
            // Python's re.split produced a non-empty leading segment for a
            // blank first line, so even that is an anomaly.
            return Err(ParseError::LeadingContent(String::new()));
        }
    }

    if let Some((guid, name)) = header {
        report
            .devices
            .push(parse_device(guid, name, &body, names, &mut report.unknown_counters)?);
    }

    Ok(report)
}

fn parse_device(
    guid: Option<&str>,
    name: &str,
    body: &[&str],
    names: &NameMap,
    unknown_counters: &mut Vec<String>,
) -> Result<DeviceRecord, ParseError> {
    let device_name = match guid {
        Some(guid) => names.resolve_or(guid, name).to_string(),
        None => name.to_string(),
    };

    // Leading blank lines carry no structure.
    let mut lines = body;
    while let [first, rest @ ..] = lines {
        if first.trim().is_empty() {
            lines = rest;
        } else {
            break;
        }
    }

    let kind = if lines.first().is_some_and(|l| is_all_ports_line(l)) {
        lines = &lines[1..];
        DeviceKind::Switch
    } else {
        DeviceKind::Ca
    };

    let mut ports = Vec::new();

    for pair in lines.chunks(2) {
        let [port_line, link_line] = pair else {
            // A dangling final line is only tolerated for pagination
            // markers.
            if pair[0].contains("##") {
                continue;
            }
            return Err(ParseError::DanglingLine {
                device: device_name,
                line: pair[0].to_string(),
            });
        };

        if port_line.is_empty() || port_line.contains("##") {
            if link_line.is_empty() || link_line.contains("##") {
                continue;
            }
            return Err(ParseError::InconsistentPair {
                device: device_name,
                first: port_line.to_string(),
                second: link_line.to_string(),
            });
        }

        let Some(port) = parse_port_line(port_line) else {
            return Err(ParseError::InconsistentPair {
                device: device_name,
                first: port_line.to_string(),
                second: link_line.to_string(),
            });
        };

        if port.port == 0 {
            // Internal management port: recorded for diagnostics only.
            debug!(device = %device_name, line = %port_line, "skipping management port 0");
            continue;
        }

        let link = parse_link_line(link_line).ok_or_else(|| ParseError::MalformedLinkInfo {
            device: device_name.clone(),
            line: link_line.to_string(),
        })?;

        match link {
            LinkLine::Down => continue,
            LinkLine::Other(state) => {
                return Err(ParseError::UnexpectedLinkState {
                    device: device_name,
                    port: port.port,
                    state,
                });
            }
            LinkLine::Active(active) => {
                ports.push(build_observation(&port, active, names, unknown_counters));
            }
        }
    }

    Ok(DeviceRecord {
        kind,
        name: device_name,
        ports,
    })
}

fn build_observation(
    port: &PortLine<'_>,
    link: ActiveLink,
    names: &NameMap,
    unknown_counters: &mut Vec<String>,
) -> PortObservation {
    let mut counters = BTreeMap::new();
    for (name, value) in parse_counters(port.counters) {
        match CounterKind::from_name(name) {
            Some(kind) => {
                counters.insert(kind, value);
            }
            None => {
                error!(counter = %name, guid = %port.guid, port = port.port,
                    "counter missing from catalog, dropping value");
                unknown_counters.push(name.to_string());
            }
        }
    }

    let remote_name = match &link.remote_guid {
        Some(guid) => names.resolve_or(guid, &link.remote_name).to_string(),
        None => link.remote_name.clone(),
    };

    PortObservation {
        guid: port.guid.to_string(),
        port: port.port,
        width: link.width,
        speed: link.speed,
        remote_guid: link.remote_guid.unwrap_or_default(),
        remote_port: link.remote_port,
        remote_name,
        counters,
    }
}
