use super::result::PingResult;

const LOSS_MARKER: &str = "packet loss";
const RTT_MARKER: &str = "min/avg";

/// Extract loss, mean latency and deviation from the summary printed by `ping -q`.
///
/// Handles both the iputils form and the BSD form:
///
/// ```text
/// 4 packets transmitted, 2 received, 50% packet loss, time 3004ms
/// rtt min/avg/max/mdev = 17.1/20.0/23.9/3.0 ms
///
/// 4 packets transmitted, 4 packets received, 0.0% packet loss
/// round-trip min/avg/max/stddev = 14.430/15.529/16.226/0.691 ms
/// ```
///
/// A line or field that is missing or unparsable leaves its metric `None`.
pub fn parse_ping_output(output: &str) -> PingResult {
    let loss_pct = output.lines().filter_map(parse_loss_line).last();

    let (latency_ms, jitter_ms) = output
        .lines()
        .filter_map(parse_rtt_line)
        .last()
        .unwrap_or((None, None));

    // Without a single reply there is nothing to average.
    if loss_pct == Some(100.0) {
        return PingResult {
            latency_ms: None,
            jitter_ms: None,
            loss_pct,
        };
    }

    PingResult {
        latency_ms,
        jitter_ms,
        loss_pct,
    }
}

fn parse_loss_line(line: &str) -> Option<f64> {
    let part = line.split(',').find(|part| part.contains(LOSS_MARKER))?;
    let (number, _) = part.trim().split_once('%')?;
    let digits: String = number
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let loss: f64 = digits.parse().ok()?;
    (0.0..=100.0).contains(&loss).then_some(loss)
}

fn parse_rtt_line(line: &str) -> Option<(Option<f64>, Option<f64>)> {
    if !line.contains(RTT_MARKER) {
        return None;
    }
    let (_, rhs) = line.split_once('=')?;
    let stats = rhs.split_whitespace().next()?;
    let values: Vec<&str> = stats.split('/').collect();

    let field = |index: usize| values.get(index).and_then(|v| v.parse::<f64>().ok());
    Some((field(1), field(3)))
}
