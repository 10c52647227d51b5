use std::time::{Duration, Instant};

use reqwest::Client;

use crate::report;
use super::result::{HttpOutcome, HttpResult};

const USER_AGENT: &str = concat!("isp-probe/", env!("CARGO_PKG_VERSION"));

/// Fetches one URL and times the arrival of its first body byte.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    /// The timeout bounds the whole attempt, from connect to the first body chunk.
    /// Connections are not kept between probes so every measurement includes
    /// connection setup.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// GET `url` and stop reading as soon as one chunk of the body arrives.
    /// Never fails: the elapsed time up to the end of the attempt is always reported.
    pub async fn probe(&self, url: &str) -> HttpResult {
        let start = Instant::now();

        let outcome = match self.client.get(url).send().await {
            Ok(mut response) => {
                let status = response.status();
                if !status.is_success() {
                    HttpOutcome::ErrorStatus {
                        status: status.as_u16(),
                    }
                } else {
                    match response.chunk().await {
                        Ok(Some(_)) => HttpOutcome::FirstByte {
                            status: status.as_u16(),
                        },
                        Ok(None) => HttpOutcome::EmptyBody {
                            status: status.as_u16(),
                        },
                        Err(e) => HttpOutcome::Failed(report(&e)),
                    }
                }
                // Dropping the response here closes the connection without reading the rest.
            }
            Err(e) => HttpOutcome::Failed(report(&e)),
        };
        let ttfb_ms = start.elapsed().as_secs_f64() * 1000.0;

        match &outcome {
            HttpOutcome::FirstByte { status } | HttpOutcome::EmptyBody { status } => {
                log::debug!("http {url}: {status} first byte after {ttfb_ms:.1}ms")
            }
            HttpOutcome::ErrorStatus { status } => {
                log::warn!("http {url}: status {status} after {ttfb_ms:.1}ms")
            }
            HttpOutcome::Failed(reason) => {
                log::warn!("http {url}: failed after {ttfb_ms:.1}ms: {reason}")
            }
        }

        HttpResult { ttfb_ms, outcome }
    }
}
