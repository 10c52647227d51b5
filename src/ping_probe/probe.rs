use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use super::parse::parse_ping_output;
use super::result::PingResult;

const PING_PROGRAM: &str = "ping";

/// Slack on top of `count × timeout` before the ping process is killed.
const PROCESS_GRACE: Duration = Duration::from_secs(2);

/// Runs the system `ping` tool against one host.
#[derive(Debug, Clone)]
pub struct PingProber {
    program: String,
    count: u32,
    per_packet_timeout: Duration,
}

impl PingProber {
    pub fn new(count: u32, per_packet_timeout: Duration) -> Self {
        Self {
            program: PING_PROGRAM.to_string(),
            count,
            per_packet_timeout,
        }
    }

    /// Use a different executable than `ping` from `PATH`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Upper bound on how long one probe may run. Saturates instead of overflowing.
    pub fn deadline(&self) -> Duration {
        self.per_packet_timeout
            .saturating_mul(self.count)
            .saturating_add(PROCESS_GRACE)
    }

    fn command(&self, target: &str) -> Command {
        // `-W` takes whole seconds on iputils.
        let wait = self.per_packet_timeout.as_secs().max(1);

        let mut command = Command::new(&self.program);
        command
            .arg("-c")
            .arg(self.count.to_string())
            .arg("-W")
            .arg(wait.to_string())
            .arg("-n")
            .arg("-q")
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    /// Ping `target` and summarise the replies.
    /// Never fails: a tool that cannot be started, times out or prints nothing
    /// recognisable yields an unmeasured result.
    pub async fn probe(&self, target: &str) -> PingResult {
        let output = match timeout(self.deadline(), self.command(target).output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                log::warn!("ping {target}: failed to run {}: {e}", self.program);
                return PingResult::unmeasured();
            }
            Err(_) => {
                log::warn!(
                    "ping {target}: no summary within {:.1}s",
                    self.deadline().as_secs_f64()
                );
                return PingResult::unmeasured();
            }
        };

        // A non-zero exit status is normal for total loss, the summary is still printed.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push('\n');
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        let result = parse_ping_output(&text);
        if result.is_unmeasured() {
            log::warn!(
                "ping {target}: unrecognised output (exit {}): {}",
                output.status,
                text.trim()
            );
        } else {
            log::debug!(
                "ping {target}: loss {:?}% avg {:?}ms mdev {:?}ms",
                result.loss_pct,
                result.latency_ms,
                result.jitter_ms
            );
        }
        result
    }
}
