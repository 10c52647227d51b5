use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dns_probe::result::DnsResult;
use crate::http_probe::result::HttpResult;
use crate::ping_probe::result::PingResult;

/// One ping target's result, as sent to the collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingMeasurement {
    pub created_at: DateTime<Utc>,
    pub ping_target: String,
    pub latency_ms: Option<f64>,
    pub jitter_ms: Option<f64>,
    pub loss_pct: Option<f64>,
}

/// One DNS server's result, as sent to the collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsMeasurement {
    pub created_at: DateTime<Utc>,
    pub dns_server: String,
    pub dns_lookup_ms: Option<f64>,
}

/// One HTTP target's result, as sent to the collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpMeasurement {
    pub created_at: DateTime<Utc>,
    pub http_target: String,
    pub http_ttfb_ms: Option<f64>,
}

/// The result of one probe execution.
/// Serialized without a tag: the collector tells the kinds apart by their target field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Measurement {
    Ping(PingMeasurement),
    Dns(DnsMeasurement),
    Http(HttpMeasurement),
}

impl Measurement {
    pub fn ping(created_at: DateTime<Utc>, target: String, result: PingResult) -> Self {
        Measurement::Ping(PingMeasurement {
            created_at,
            ping_target: target,
            latency_ms: result.latency_ms,
            jitter_ms: result.jitter_ms,
            loss_pct: result.loss_pct,
        })
    }

    pub fn dns(created_at: DateTime<Utc>, server: String, result: DnsResult) -> Self {
        Measurement::Dns(DnsMeasurement {
            created_at,
            dns_server: server,
            dns_lookup_ms: Some(result.lookup_ms),
        })
    }

    pub fn http(created_at: DateTime<Utc>, target: String, result: HttpResult) -> Self {
        Measurement::Http(HttpMeasurement {
            created_at,
            http_target: target,
            http_ttfb_ms: Some(result.ttfb_ms),
        })
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Measurement::Ping(m) => m.created_at,
            Measurement::Dns(m) => m.created_at,
            Measurement::Http(m) => m.created_at,
        }
    }

    /// The target this measurement was taken against.
    pub fn target(&self) -> &str {
        match self {
            Measurement::Ping(m) => &m.ping_target,
            Measurement::Dns(m) => &m.dns_server,
            Measurement::Http(m) => &m.http_target,
        }
    }
}

/// The unit transmitted to the collector, one per cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub site: String,
    pub probe_name: String,
    pub measurements: Vec<Measurement>,
}
