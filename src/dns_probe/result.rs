/// What happened to one DNS query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsOutcome {
    /// The nameserver answered with this many A records.
    Resolved { addresses: usize },
    /// The query failed: NXDOMAIN, SERVFAIL, timeout or an unusable nameserver.
    Failed(String),
}

/// The outcome of one DNS probe.
/// `lookup_ms` is the wall time of the attempt and is populated whether or not it succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct DnsResult {
    pub lookup_ms: f64,
    pub outcome: DnsOutcome,
}
