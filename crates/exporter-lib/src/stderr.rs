//! Stderr Classifier: known ibqueryerrors warning lines to labeled tallies.
//!
//! The tool prints a handful of well-known warning shapes on stderr while it
//! walks the fabric. Each recognized line becomes one occurrence of a
//! labeled metric; anything unrecognized degrades the cycle so operators
//! notice new warning shapes instead of losing them.

use std::collections::BTreeMap;
use tracing::debug;

/// One classified stderr line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StderrEvent {
    /// `src/query_smp.c:<n>; mad|umad (DR path ... Attr ...) bad status <n>; <err>`
    BadStatus {
        path: String,
        status: String,
        error: String,
    },
    /// `ibwarn: [<pid>] query_and_dump: <counter> query failed on <name>, Lid <lid> port <port>`
    QueryFailed {
        counter: String,
        local_name: String,
        lid: String,
        port: String,
    },
    /// `ibwarn: [<pid>] _do_madrpc: recv failed: ...` — noise the upstream
    /// tooling already suppresses, matched only so it is not reported as
    /// unrecognized.
    MadRpcRecvFailed,
    /// `ibwarn: [<pid>] mad_rpc: _do_madrpc failed; dport (<portid>)`
    MadRpcFailed { port_id: String },
    /// `ibwarn: [<pid>] query_cap_mask: <counter> query failed on <name>, <portid> port <port>`
    QueryCapMask {
        counter: String,
        local_name: String,
        port_id: String,
        port: String,
    },
    /// `ibwarn: [<pid>] print_errors: <counter> query failed on <name>, <portid> port <port>`
    PrintError {
        counter: String,
        local_name: String,
        port_id: String,
        port: String,
    },
}

/// Occurrence counts keyed by the captured label tuple of one pattern kind.
pub type Tally = BTreeMap<Vec<String>, u64>;

/// Classified tallies for one cycle's stderr text.
#[derive(Debug, Default)]
pub struct StderrSummary {
    pub bad_status: Tally,
    pub query_failed: Tally,
    pub mad_rpc_failed: Tally,
    pub query_cap_mask: Tally,
    pub print_error: Tally,
    /// Lines matching none of the known shapes. Any entry here marks the
    /// cycle degraded.
    pub unrecognized: Vec<String>,
}

impl StderrSummary {
    pub fn is_clean(&self) -> bool {
        self.unrecognized.is_empty()
    }
}

/// Classify every non-blank line of a stderr blob.
pub fn scan(text: &str) -> StderrSummary {
    let mut summary = StderrSummary::default();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        debug!(line = %line, "classifying stderr line");
        match classify_line(line) {
            Some(StderrEvent::BadStatus {
                path,
                status,
                error,
            }) => {
                *summary.bad_status.entry(vec![path, status, error]).or_default() += 1;
            }
            Some(StderrEvent::QueryFailed {
                counter,
                local_name,
                lid,
                port,
            }) => {
                *summary
                    .query_failed
                    .entry(vec![counter, local_name, lid, port])
                    .or_default() += 1;
            }
            Some(StderrEvent::MadRpcRecvFailed) => {}
            Some(StderrEvent::MadRpcFailed { port_id }) => {
                *summary.mad_rpc_failed.entry(vec![port_id]).or_default() += 1;
            }
            Some(StderrEvent::QueryCapMask {
                counter,
                local_name,
                port_id,
                port,
            }) => {
                *summary
                    .query_cap_mask
                    .entry(vec![counter, local_name, port_id, port])
                    .or_default() += 1;
            }
            Some(StderrEvent::PrintError {
                counter,
                local_name,
                port_id,
                port,
            }) => {
                *summary
                    .print_error
                    .entry(vec![counter, local_name, port_id, port])
                    .or_default() += 1;
            }
            None => summary.unrecognized.push(line.to_string()),
        }
    }
    summary
}

/// Match one line against the known shapes in fixed priority order.
pub fn classify_line(line: &str) -> Option<StderrEvent> {
    if let Some((path, status, error)) = parse_bad_status(line) {
        return Some(StderrEvent::BadStatus {
            path,
            status,
            error,
        });
    }

    let (func, rest) = strip_ibwarn(line)?;
    match func {
        "query_and_dump" => {
            let (counter, local_name, lid, port) = parse_query_failed(rest)?;
            Some(StderrEvent::QueryFailed {
                counter,
                local_name,
                lid,
                port,
            })
        }
        "_do_madrpc" => {
            let tail = rest.strip_prefix("recv failed: ")?;
            is_word_run(tail).then_some(StderrEvent::MadRpcRecvFailed)
        }
        "mad_rpc" => {
            let tail = rest.strip_prefix("_do_madrpc failed; dport (")?;
            let port_id = tail.strip_suffix(')')?;
            is_port_id(port_id).then(|| StderrEvent::MadRpcFailed {
                port_id: port_id.to_string(),
            })
        }
        "query_cap_mask" => {
            let (counter, local_name, port_id, port) = parse_portid_failure(rest)?;
            Some(StderrEvent::QueryCapMask {
                counter,
                local_name,
                port_id,
                port,
            })
        }
        "print_errors" => {
            let (counter, local_name, port_id, port) = parse_portid_failure(rest)?;
            Some(StderrEvent::PrintError {
                counter,
                local_name,
                port_id,
                port,
            })
        }
        _ => None,
    }
}

fn parse_bad_status(line: &str) -> Option<(String, String, String)> {
    let rest = line.strip_prefix("src/query_smp.c:")?;
    let semi = rest.find("; ")?;
    if semi == 0 || !rest[..semi].bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let rest = &rest[semi + 2..];
    let rest = rest
        .strip_prefix("mad (")
        .or_else(|| rest.strip_prefix("umad ("))?;
    let close = rest.find(") bad status ")?;
    let paren = &rest[..close];
    if !paren.starts_with("DR path ") {
        return None;
    }
    let attr = paren.rfind(" Attr ")?;
    let path = &paren[..attr];
    let tail = &rest[close + ") bad status ".len()..];
    let (status, error) = tail.split_once("; ")?;
    if status.is_empty() || !status.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((path.to_string(), status.to_string(), error.to_string()))
}

/// Split off the `ibwarn: [<pid>] <func>: ` prefix.
fn strip_ibwarn(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix("ibwarn: [")?;
    let (pid, rest) = rest.split_once("] ")?;
    if pid.is_empty() || !pid.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.split_once(": ")
}

/// `<counter> query failed on <name>, Lid <lid> port <port>`
fn parse_query_failed(rest: &str) -> Option<(String, String, String, String)> {
    let (counter, rest) = rest.split_once(" query failed on ")?;
    if !is_word(counter) {
        return None;
    }
    let (local_name, rest) = rest.rsplit_once(", Lid ")?;
    let (lid, port) = rest.split_once(" port ")?;
    if !is_digits(lid) || !is_digits(port) {
        return None;
    }
    Some((
        counter.to_string(),
        local_name.to_string(),
        lid.to_string(),
        port.to_string(),
    ))
}

/// `<counter> query failed on <name>, <portid> port <port>` — shared by the
/// query_cap_mask and print_errors shapes.
fn parse_portid_failure(rest: &str) -> Option<(String, String, String, String)> {
    let (counter, rest) = rest.split_once(" query failed on ")?;
    if !is_word(counter) {
        return None;
    }
    let (head, port) = rest.rsplit_once(" port ")?;
    if !is_digits(port) {
        return None;
    }
    let (local_name, port_id) = head.rsplit_once(", ")?;
    if !is_port_id(port_id) {
        return None;
    }
    Some((
        counter.to_string(),
        local_name.to_string(),
        port_id.to_string(),
        port.to_string(),
    ))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn is_word_run(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c.is_whitespace())
}

/// Port identifiers look like `DR path slid 0` or `Lid 41`: words,
/// semicolons, and whitespace.
fn is_port_id(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == ';' || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_status_line() {
        let line = "src/query_smp.c:235; umad (DR path slid 0; dlid 0; 0,1,24 Attr 0x15:2) bad status 110; Connection timed out";
        let event = classify_line(line).unwrap();
        assert_eq!(
            event,
            StderrEvent::BadStatus {
                path: "DR path slid 0; dlid 0; 0,1,24".to_string(),
                status: "110".to_string(),
                error: "Connection timed out".to_string(),
            }
        );
    }

    #[test]
    fn test_query_failed_line() {
        let line = "ibwarn: [12345] query_and_dump: PortXmitWait query failed on node001 HCA-1, Lid 41 port 1";
        let event = classify_line(line).unwrap();
        assert_eq!(
            event,
            StderrEvent::QueryFailed {
                counter: "PortXmitWait".to_string(),
                local_name: "node001 HCA-1".to_string(),
                lid: "41".to_string(),
                port: "1".to_string(),
            }
        );
    }

    #[test]
    fn test_recv_failed_is_silently_ignored() {
        let line = "ibwarn: [12345] _do_madrpc: recv failed: Connection timed out";
        assert_eq!(classify_line(line), Some(StderrEvent::MadRpcRecvFailed));
        let summary = scan(line);
        assert!(summary.is_clean());
        assert!(summary.mad_rpc_failed.is_empty());
    }

    #[test]
    fn test_mad_rpc_failed_line() {
        let line = "ibwarn: [12345] mad_rpc: _do_madrpc failed; dport (Lid 41)";
        assert_eq!(
            classify_line(line),
            Some(StderrEvent::MadRpcFailed {
                port_id: "Lid 41".to_string()
            })
        );
    }

    #[test]
    fn test_query_cap_mask_line() {
        let line = "ibwarn: [12345] query_cap_mask: ClassPortInfo query failed on ibsw01, Lid 3 port 7";
        assert_eq!(
            classify_line(line),
            Some(StderrEvent::QueryCapMask {
                counter: "ClassPortInfo".to_string(),
                local_name: "ibsw01".to_string(),
                port_id: "Lid 3".to_string(),
                port: "7".to_string(),
            })
        );
    }

    #[test]
    fn test_print_errors_line() {
        let line = "ibwarn: [777] print_errors: PortCounters query failed on node002 HCA-1, Lid 12 port 1";
        assert_eq!(
            classify_line(line),
            Some(StderrEvent::PrintError {
                counter: "PortCounters".to_string(),
                local_name: "node002 HCA-1".to_string(),
                port_id: "Lid 12".to_string(),
                port: "1".to_string(),
            })
        );
    }

    #[test]
    fn test_unrecognized_line_is_recorded() {
        let summary = scan("something completely different\n");
        assert!(!summary.is_clean());
        assert_eq!(summary.unrecognized, vec!["something completely different"]);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let summary = scan("\n   \n");
        assert!(summary.is_clean());
    }

    #[test]
    fn test_repeated_lines_tally_up() {
        let line = "ibwarn: [12345] mad_rpc: _do_madrpc failed; dport (Lid 41)";
        let summary = scan(&format!("{line}\n{line}\n"));
        assert_eq!(
            summary.mad_rpc_failed.get(&vec!["Lid 41".to_string()]),
            Some(&2)
        );
    }

    #[test]
    fn test_priority_order_first_match_wins() {
        // An ibwarn line with an unknown function name falls through.
        let line = "ibwarn: [1] smp_query_via: some other failure";
        assert_eq!(classify_line(line), None);
    }
}
