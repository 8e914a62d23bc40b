//! Overflow Policy: decide what to do about counters close to wrapping.
//!
//! Narrow hardware counters saturate or wrap quickly on a busy fabric. Once
//! a value crosses half its range the next scrape interval may no longer be
//! trustworthy, so the policy either requests a proactive reset or warns the
//! operator. 64-bit counters are monitoring counters that are never reset.

use crate::catalog::CounterKind;

/// What the orchestrator should do for one observed counter value. The
/// value itself is always emitted unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowAction {
    /// Value is comfortably inside the counter's range.
    None,
    /// At risk and automatic resets are enabled: invoke the reset tool.
    Reset,
    /// At risk but automatic resets are disabled: warn only.
    Warn,
}

/// True when `value` has crossed into the top half of the counter's range.
/// One bit of headroom is reserved below the true maximum so the reset can
/// land before the counter actually wraps.
pub fn at_risk(counter: CounterKind, value: u64) -> bool {
    let bits = counter.bits();
    if bits >= 64 {
        return false;
    }
    value >= 1u64 << (bits - 1)
}

/// Operator-configured overflow handling.
#[derive(Debug, Clone, Copy)]
pub struct OverflowPolicy {
    pub auto_reset: bool,
}

impl OverflowPolicy {
    pub fn check(&self, counter: CounterKind, value: u64) -> OverflowAction {
        if !at_risk(counter, value) {
            OverflowAction::None
        } else if self.auto_reset {
            OverflowAction::Reset
        } else {
            OverflowAction::Warn
        }
    }
}
