//! Network quality probe agent.
//!
//! Every cycle pings a set of hosts, resolves a hostname against a set of
//! nameservers and fetches a set of URLs, then posts the measurements to the
//! collector's ingest endpoint.

pub mod agent;
pub mod config;
pub mod cycle;
pub mod dns_probe;
pub mod http_probe;
pub mod ingest;
pub mod ping_probe;

use std::fmt::Write;

/// Render an error together with its chain of sources.
pub fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, "\n\nCaused by: {}", src);
        err = src;
    }
    s
}
