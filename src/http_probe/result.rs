/// How far one HTTP probe got before the clock was stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpOutcome {
    /// A 2xx response delivered its first body byte.
    FirstByte { status: u16 },
    /// A 2xx response ended without a body.
    EmptyBody { status: u16 },
    /// The server answered with a non-2xx status. The body is not read.
    ErrorStatus { status: u16 },
    /// The request never produced a usable response: connect error, timeout, bad URL.
    Failed(String),
}

/// The outcome of one HTTP probe.
/// `ttfb_ms` is populated on every attempt, up to the point the attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResult {
    pub ttfb_ms: f64,
    pub outcome: HttpOutcome,
}
