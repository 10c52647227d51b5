/// The outcome of one ping probe.
/// Every field is `None` when the value could not be measured, never a sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PingResult {
    /// Mean round-trip time in milliseconds.
    pub latency_ms: Option<f64>,
    /// Round-trip deviation (mdev / stddev) in milliseconds.
    pub jitter_ms: Option<f64>,
    /// Packet loss as a percentage, 0 to 100.
    pub loss_pct: Option<f64>,
}

impl PingResult {
    /// A result with nothing measured.
    pub fn unmeasured() -> Self {
        Self::default()
    }

    pub fn is_unmeasured(&self) -> bool {
        self.latency_ms.is_none() && self.jitter_ms.is_none() && self.loss_pct.is_none()
    }
}
