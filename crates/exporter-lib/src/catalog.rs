//! Static registry of the counters and gauges reported by ibqueryerrors.
//!
//! Counter descriptions are based on the Mellanox counter documentation and
//! the InfiniBand specification release 1.3. The severity classification is
//! descriptive metadata for alert-rule authors; it gates no control flow.

/// Severity class attached to a counter for documentation purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Informative,
}

/// The closed set of per-port counters ibqueryerrors reports.
///
/// Variant names use the wire spelling so the mapping to the report text is
/// obvious. Counter names that ever show up outside this set are handled by
/// the `from_name` fallback (`None`) rather than a catch-all variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CounterKind {
    LinkDownedCounter,
    SymbolErrorCounter,
    PortXmitDiscards,
    PortSwHOQLifetimeLimitDiscards,
    PortXmitWait,
    PortXmitData,
    PortRcvData,
    PortXmitPkts,
    PortRcvPkts,
    PortRcvErrors,
    PortUnicastXmitPkts,
    PortUnicastRcvPkts,
    PortMulticastXmitPkts,
    PortMulticastRcvPkts,
    PortBufferOverrunErrors,
    PortLocalPhysicalErrors,
    PortRcvRemotePhysicalErrors,
    PortInactiveDiscards,
    PortDLIDMappingErrors,
    LinkErrorRecoveryCounter,
    LocalLinkIntegrityErrors,
    VL15Dropped,
    PortNeighborMTUDiscards,
}

impl CounterKind {
    pub const ALL: [CounterKind; 23] = [
        CounterKind::LinkDownedCounter,
        CounterKind::SymbolErrorCounter,
        CounterKind::PortXmitDiscards,
        CounterKind::PortSwHOQLifetimeLimitDiscards,
        CounterKind::PortXmitWait,
        CounterKind::PortXmitData,
        CounterKind::PortRcvData,
        CounterKind::PortXmitPkts,
        CounterKind::PortRcvPkts,
        CounterKind::PortRcvErrors,
        CounterKind::PortUnicastXmitPkts,
        CounterKind::PortUnicastRcvPkts,
        CounterKind::PortMulticastXmitPkts,
        CounterKind::PortMulticastRcvPkts,
        CounterKind::PortBufferOverrunErrors,
        CounterKind::PortLocalPhysicalErrors,
        CounterKind::PortRcvRemotePhysicalErrors,
        CounterKind::PortInactiveDiscards,
        CounterKind::PortDLIDMappingErrors,
        CounterKind::LinkErrorRecoveryCounter,
        CounterKind::LocalLinkIntegrityErrors,
        CounterKind::VL15Dropped,
        CounterKind::PortNeighborMTUDiscards,
    ];

    /// Look up a counter by its wire name. Returns `None` for names this
    /// catalog does not know, which callers report as a degraded-cycle
    /// condition instead of failing the parse.
    pub fn from_name(name: &str) -> Option<CounterKind> {
        let kind = match name {
            "LinkDownedCounter" => CounterKind::LinkDownedCounter,
            "SymbolErrorCounter" => CounterKind::SymbolErrorCounter,
            "PortXmitDiscards" => CounterKind::PortXmitDiscards,
            "PortSwHOQLifetimeLimitDiscards" => CounterKind::PortSwHOQLifetimeLimitDiscards,
            "PortXmitWait" => CounterKind::PortXmitWait,
            "PortXmitData" => CounterKind::PortXmitData,
            "PortRcvData" => CounterKind::PortRcvData,
            "PortXmitPkts" => CounterKind::PortXmitPkts,
            "PortRcvPkts" => CounterKind::PortRcvPkts,
            "PortRcvErrors" => CounterKind::PortRcvErrors,
            "PortUnicastXmitPkts" => CounterKind::PortUnicastXmitPkts,
            "PortUnicastRcvPkts" => CounterKind::PortUnicastRcvPkts,
            "PortMulticastXmitPkts" => CounterKind::PortMulticastXmitPkts,
            "PortMulticastRcvPkts" => CounterKind::PortMulticastRcvPkts,
            "PortBufferOverrunErrors" => CounterKind::PortBufferOverrunErrors,
            "PortLocalPhysicalErrors" => CounterKind::PortLocalPhysicalErrors,
            "PortRcvRemotePhysicalErrors" => CounterKind::PortRcvRemotePhysicalErrors,
            "PortInactiveDiscards" => CounterKind::PortInactiveDiscards,
            "PortDLIDMappingErrors" => CounterKind::PortDLIDMappingErrors,
            "LinkErrorRecoveryCounter" => CounterKind::LinkErrorRecoveryCounter,
            "LocalLinkIntegrityErrors" => CounterKind::LocalLinkIntegrityErrors,
            "VL15Dropped" => CounterKind::VL15Dropped,
            "PortNeighborMTUDiscards" => CounterKind::PortNeighborMTUDiscards,
            _ => return None,
        };
        Some(kind)
    }

    /// Wire name as it appears in the report text.
    pub fn name(self) -> &'static str {
        match self {
            CounterKind::LinkDownedCounter => "LinkDownedCounter",
            CounterKind::SymbolErrorCounter => "SymbolErrorCounter",
            CounterKind::PortXmitDiscards => "PortXmitDiscards",
            CounterKind::PortSwHOQLifetimeLimitDiscards => "PortSwHOQLifetimeLimitDiscards",
            CounterKind::PortXmitWait => "PortXmitWait",
            CounterKind::PortXmitData => "PortXmitData",
            CounterKind::PortRcvData => "PortRcvData",
            CounterKind::PortXmitPkts => "PortXmitPkts",
            CounterKind::PortRcvPkts => "PortRcvPkts",
            CounterKind::PortRcvErrors => "PortRcvErrors",
            CounterKind::PortUnicastXmitPkts => "PortUnicastXmitPkts",
            CounterKind::PortUnicastRcvPkts => "PortUnicastRcvPkts",
            CounterKind::PortMulticastXmitPkts => "PortMulticastXmitPkts",
            CounterKind::PortMulticastRcvPkts => "PortMulticastRcvPkts",
            CounterKind::PortBufferOverrunErrors => "PortBufferOverrunErrors",
            CounterKind::PortLocalPhysicalErrors => "PortLocalPhysicalErrors",
            CounterKind::PortRcvRemotePhysicalErrors => "PortRcvRemotePhysicalErrors",
            CounterKind::PortInactiveDiscards => "PortInactiveDiscards",
            CounterKind::PortDLIDMappingErrors => "PortDLIDMappingErrors",
            CounterKind::LinkErrorRecoveryCounter => "LinkErrorRecoveryCounter",
            CounterKind::LocalLinkIntegrityErrors => "LocalLinkIntegrityErrors",
            CounterKind::VL15Dropped => "VL15Dropped",
            CounterKind::PortNeighborMTUDiscards => "PortNeighborMTUDiscards",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            CounterKind::LinkDownedCounter => {
                "Total number of times the Port Training state machine has failed \
                 the link error recovery process and downed the link."
            }
            CounterKind::SymbolErrorCounter => {
                "Total number of minor link errors detected on one or more physical lanes."
            }
            CounterKind::PortXmitDiscards => {
                "Total number of outbound packets discarded by the port because the \
                 port is down or congested."
            }
            CounterKind::PortSwHOQLifetimeLimitDiscards => {
                "Number of packets dropped by a head-of-queue timeout, often caused \
                 by congestion, possibly by credit loops."
            }
            CounterKind::PortXmitWait => {
                "Number of ticks during which the port had data to transmit but no \
                 data was sent during the entire tick (either because of insufficient \
                 credits or because of lack of arbitration)."
            }
            CounterKind::PortXmitData => {
                "Total number of data octets, divided by 4 (lanes), transmitted on all VLs."
            }
            CounterKind::PortRcvData => {
                "Total number of data octets, divided by 4 (lanes), received on all VLs."
            }
            CounterKind::PortXmitPkts => {
                "Total number of packets transmitted on all VLs from this port. This \
                 may include packets with errors."
            }
            CounterKind::PortRcvPkts => {
                "Total number of packets received. This may include packets containing errors."
            }
            CounterKind::PortRcvErrors => {
                "Total number of packets containing an error that were received on the port."
            }
            CounterKind::PortUnicastXmitPkts => {
                "Total number of unicast packets transmitted on all VLs from the \
                 port. This may include unicast packets with errors."
            }
            CounterKind::PortUnicastRcvPkts => {
                "Total number of unicast packets, including unicast packets containing errors."
            }
            CounterKind::PortMulticastXmitPkts => {
                "Total number of multicast packets transmitted on all VLs from the \
                 port. This may include multicast packets with errors."
            }
            CounterKind::PortMulticastRcvPkts => {
                "Total number of multicast packets, including multicast packets \
                 containing errors."
            }
            CounterKind::PortBufferOverrunErrors => {
                "Total number of packets received on the port discarded due to buffer overrun."
            }
            CounterKind::PortLocalPhysicalErrors => {
                "Total number of packets received with a physical error like a CRC error."
            }
            CounterKind::PortRcvRemotePhysicalErrors => {
                "Total number of packets marked with the EBP delimiter received on the port."
            }
            CounterKind::PortInactiveDiscards => {
                "Total number of packets discarded due to the port being in the \
                 inactive state."
            }
            CounterKind::PortDLIDMappingErrors => {
                "Total number of packets on the port that could not be forwarded by \
                 the switch due to DLID mapping errors."
            }
            CounterKind::LinkErrorRecoveryCounter => {
                "Total number of times the Port Training state machine has \
                 successfully completed the link error recovery process."
            }
            CounterKind::LocalLinkIntegrityErrors => {
                "Number of times that the count of local physical errors exceeded \
                 the threshold specified by LocalPhyErrors."
            }
            CounterKind::VL15Dropped => {
                "Number of incoming VL15 packets dropped due to resource limitations \
                 (for example, lack of buffers) in the port."
            }
            CounterKind::PortNeighborMTUDiscards => {
                "Total outbound packets discarded by the port because packet length \
                 exceeded the neighbor MTU."
            }
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            CounterKind::PortXmitWait
            | CounterKind::PortXmitData
            | CounterKind::PortRcvData
            | CounterKind::PortXmitPkts
            | CounterKind::PortRcvPkts
            | CounterKind::PortRcvErrors
            | CounterKind::PortUnicastXmitPkts
            | CounterKind::PortUnicastRcvPkts
            | CounterKind::PortMulticastXmitPkts
            | CounterKind::PortMulticastRcvPkts => Severity::Informative,
            _ => Severity::Error,
        }
    }

    /// Bit width of the hardware register backing this counter.
    pub fn bits(self) -> u32 {
        match self {
            CounterKind::LocalLinkIntegrityErrors => 4,
            CounterKind::LinkDownedCounter | CounterKind::LinkErrorRecoveryCounter => 8,
            CounterKind::SymbolErrorCounter
            | CounterKind::PortXmitDiscards
            | CounterKind::PortSwHOQLifetimeLimitDiscards
            | CounterKind::PortRcvErrors
            | CounterKind::PortBufferOverrunErrors
            | CounterKind::PortLocalPhysicalErrors
            | CounterKind::PortRcvRemotePhysicalErrors
            | CounterKind::PortInactiveDiscards
            | CounterKind::PortDLIDMappingErrors
            | CounterKind::VL15Dropped
            | CounterKind::PortNeighborMTUDiscards => 16,
            CounterKind::PortXmitWait => 32,
            CounterKind::PortXmitData
            | CounterKind::PortRcvData
            | CounterKind::PortXmitPkts
            | CounterKind::PortRcvPkts
            | CounterKind::PortUnicastXmitPkts
            | CounterKind::PortUnicastRcvPkts
            | CounterKind::PortMulticastXmitPkts
            | CounterKind::PortMulticastRcvPkts => 64,
        }
    }

    /// Exposition name: `infiniband_` + lowercased wire name.
    pub fn metric_name(self) -> String {
        format!("infiniband_{}", self.name().to_lowercase())
    }
}

/// Per-link gauges derived from the link info line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GaugeKind {
    Speed,
    Width,
}

impl GaugeKind {
    pub const ALL: [GaugeKind; 2] = [GaugeKind::Speed, GaugeKind::Width];

    pub fn name(self) -> &'static str {
        match self {
            GaugeKind::Speed => "Speed",
            GaugeKind::Width => "Width",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            GaugeKind::Speed => "Link current speed per lane.",
            GaugeKind::Width => "Lanes per link.",
        }
    }

    pub fn metric_name(self) -> String {
        format!("infiniband_{}", self.name().to_lowercase())
    }
}
