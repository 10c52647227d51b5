use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{AcquireError, Semaphore};
use tokio::task::{JoinError, JoinSet};

use super::measurement::{Measurement, Payload};
use crate::config::{AgentConfig, TargetSet};
use crate::dns_probe::prelude::*;
use crate::http_probe::prelude::*;
use crate::ping_probe::prelude::*;

/// Measures one ping target.
pub trait PingProbe: Send + Sync + 'static {
    fn probe(&self, target: &str) -> impl Future<Output = PingResult> + Send;
}

/// Resolves the probe hostname against one nameserver.
pub trait DnsProbe: Send + Sync + 'static {
    fn probe(&self, hostname: &str, nameserver: &str) -> impl Future<Output = DnsResult> + Send;
}

/// Measures time to first byte of one URL.
pub trait HttpProbe: Send + Sync + 'static {
    fn probe(&self, url: &str) -> impl Future<Output = HttpResult> + Send;
}

impl PingProbe for PingProber {
    fn probe(&self, target: &str) -> impl Future<Output = PingResult> + Send {
        PingProber::probe(self, target)
    }
}

impl DnsProbe for DnsProber {
    fn probe(&self, hostname: &str, nameserver: &str) -> impl Future<Output = DnsResult> + Send {
        DnsProber::probe(self, hostname, nameserver)
    }
}

impl HttpProbe for HttpProber {
    fn probe(&self, url: &str) -> impl Future<Output = HttpResult> + Send {
        HttpProber::probe(self, url)
    }
}

/// Errors that abandon a whole cycle.
/// Individual probe failures are never errors, they are encoded in the measurement.
#[derive(Debug, Error)]
pub enum CycleError {
    /// A probe task panicked or was cancelled before producing its measurement.
    #[error("probe task did not complete: {0}")]
    Task(#[from] JoinError),

    #[error("probe limiter closed: {0}")]
    Limiter(#[from] AcquireError),
}

type ProbeTask = Result<(usize, Measurement), AcquireError>;

/// Runs every configured probe once and assembles the results into a payload.
///
/// Probes run as separate tasks, at most `probe_concurrency` at a time, each bounded
/// by its own timeout. Results are put back in target-list order before assembly.
pub struct CycleScheduler<P = PingProber, D = DnsProber, H = HttpProber> {
    site: String,
    probe_name: String,
    targets: TargetSet,
    ping: Arc<P>,
    dns: Arc<D>,
    http: Arc<H>,
    limiter: Arc<Semaphore>,
}

impl CycleScheduler {
    /// Setup a scheduler with the system probers configured from `config`.
    pub fn from_config(config: &AgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            config,
            PingProber::new(config.ping_count, config.ping_timeout),
            DnsProber::new(config.dns_timeout),
            HttpProber::new(config.http_timeout)?,
        ))
    }
}

impl<P, D, H> CycleScheduler<P, D, H>
where
    P: PingProbe,
    D: DnsProbe,
    H: HttpProbe,
{
    pub fn new(config: &AgentConfig, ping: P, dns: D, http: H) -> Self {
        Self {
            site: config.site_slug.clone(),
            probe_name: config.probe_name.clone(),
            targets: config.targets.clone(),
            ping: Arc::new(ping),
            dns: Arc::new(dns),
            http: Arc::new(http),
            limiter: Arc::new(Semaphore::new(config.probe_concurrency.max(1))),
        }
    }

    /// Probe every target once.
    ///
    /// All measurements share the timestamp taken when the cycle starts, and appear
    /// in the order: ping targets, DNS servers, HTTP targets, each in configured order.
    /// When one probe task fails the cycle is abandoned and the remaining tasks are
    /// aborted, which returns their limiter permits and kills any `ping` children.
    pub async fn run_cycle(&self) -> Result<Payload, CycleError> {
        let created_at = Utc::now();
        let mut tasks = self.spawn_probes(created_at);

        let mut indexed = Vec::with_capacity(self.targets.len());
        while let Some(joined) = tasks.join_next().await {
            indexed.push(joined??);
        }
        indexed.sort_unstable_by_key(|(index, _)| *index);
        let measurements: Vec<Measurement> = indexed.into_iter().map(|(_, m)| m).collect();

        log::debug!(
            "cycle {}: {} measurement(s)",
            created_at.to_rfc3339(),
            measurements.len()
        );

        Ok(Payload {
            site: self.site.clone(),
            probe_name: self.probe_name.clone(),
            measurements,
        })
    }

    fn spawn_probes(&self, created_at: DateTime<Utc>) -> JoinSet<ProbeTask> {
        let mut tasks = JoinSet::new();
        let dns_offset = self.targets.ping.len();
        let http_offset = dns_offset + self.targets.dns_servers.len();

        for (index, target) in self.targets.ping.iter().enumerate() {
            let prober = Arc::clone(&self.ping);
            let target = target.clone();
            self.spawn_limited(&mut tasks, index, async move {
                let result = prober.probe(&target).await;
                Measurement::ping(created_at, target, result)
            });
        }

        for (index, server) in self.targets.dns_servers.iter().enumerate() {
            let prober = Arc::clone(&self.dns);
            let hostname = self.targets.dns_hostname.clone();
            let server = server.clone();
            self.spawn_limited(&mut tasks, dns_offset + index, async move {
                let result = prober.probe(&hostname, &server).await;
                Measurement::dns(created_at, server, result)
            });
        }

        for (index, url) in self.targets.http.iter().enumerate() {
            let prober = Arc::clone(&self.http);
            let url = url.clone();
            self.spawn_limited(&mut tasks, http_offset + index, async move {
                let result = prober.probe(&url).await;
                Measurement::http(created_at, url, result)
            });
        }

        tasks
    }

    fn spawn_limited<F>(
        &self,
        tasks: &mut JoinSet<ProbeTask>,
        index: usize,
        probe: F,
    ) where
        F: Future<Output = Measurement> + Send + 'static,
    {
        let limiter = Arc::clone(&self.limiter);
        tasks.spawn(async move {
            let _permit = limiter.acquire_owned().await?;
            Ok((index, probe.await))
        });
    }
}
