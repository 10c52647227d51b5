use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::cycle::{CycleError, CycleScheduler, DnsProbe, HttpProbe, Payload, PingProbe};
use crate::report;
use crate::ingest::Reporter;

/// Produces one payload per call.
pub trait CycleSource: Send + Sync + 'static {
    fn run_cycle(&self) -> impl Future<Output = Result<Payload, CycleError>> + Send;
}

/// Consumes payloads. Delivery failures are handled by the sink itself.
pub trait PayloadSink: Send + Sync + 'static {
    fn send(&self, payload: Payload) -> impl Future<Output = ()> + Send;
}

impl<P, D, H> CycleSource for CycleScheduler<P, D, H>
where
    P: PingProbe,
    D: DnsProbe,
    H: HttpProbe,
{
    fn run_cycle(&self) -> impl Future<Output = Result<Payload, CycleError>> + Send {
        CycleScheduler::<P, D, H>::run_cycle(self)
    }
}

impl PayloadSink for Reporter {
    fn send(&self, payload: Payload) -> impl Future<Output = ()> + Send {
        Reporter::send(self, payload)
    }
}

/// Owns the process lifetime: probe, report, sleep, forever.
///
/// Each iteration runs on its own task, so an error or a panic inside a cycle or
/// an upload is logged and the loop carries on with the next iteration after the
/// usual sleep. Only the shutdown future passed to [`AgentLoop::run_until`] stops it.
pub struct AgentLoop<C, S> {
    cycles: Arc<C>,
    sink: Arc<S>,
    interval: Duration,
}

impl<C, S> AgentLoop<C, S>
where
    C: CycleSource,
    S: PayloadSink,
{
    pub fn new(cycles: C, sink: S, interval: Duration) -> Self {
        Self {
            cycles: Arc::new(cycles),
            sink: Arc::new(sink),
            interval,
        }
    }

    /// Run one cycle and hand its payload to the sink.
    /// Returns whether the iteration completed without a failure.
    pub async fn run_once(&self) -> bool {
        let cycles = Arc::clone(&self.cycles);
        let sink = Arc::clone(&self.sink);

        let iteration = tokio::spawn(async move {
            let payload = cycles.run_cycle().await?;
            sink.send(payload).await;
            Ok::<(), CycleError>(())
        });

        match iteration.await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                log::error!("cycle abandoned: {}", report(&e));
                false
            }
            Err(e) => {
                log::error!("cycle failed unexpectedly: {}", report(&e));
                false
            }
        }
    }

    /// Repeat cycles until `shutdown` completes. Returns the number of started cycles.
    ///
    /// The next cycle starts `interval` after the previous one finished, so the
    /// period is the cycle duration plus the interval.
    pub async fn run_until<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut cycles = 0;

        loop {
            cycles += 1;
            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.run_once() => {}
            }
            tokio::select! {
                _ = &mut shutdown => break,
                _ = sleep(self.interval) => {}
            }
        }

        log::info!("stopping after {cycles} cycle(s)");
        cycles
    }
}
