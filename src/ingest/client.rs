use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, InvalidHeaderValue},
};
use thiserror::Error;
use unicode_truncate::UnicodeTruncateStr;

use crate::config::AgentConfig;
use crate::cycle::Payload;
use crate::report;

const API_KEY_HEADER: &str = "x-api-key";

/// Longest part of a rejection body that is kept for the log.
const MAX_LOGGED_BODY_WIDTH: usize = 200;

/// Errors that can occur while delivering one payload.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("INGEST_API_KEY is not a valid header value")]
    ApiKey(#[source] InvalidHeaderValue),

    /// The collector could not be reached or did not answer in time.
    #[error("POST {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The collector answered with a non-success status.
    #[error("POST {url} -> {status} {body}")]
    Rejected { url: String, status: u16, body: String },
}

fn truncate_body(body: &str) -> &str {
    let (truncated, _) = body.unicode_truncate(MAX_LOGGED_BODY_WIDTH);
    truncated
}

/// Ships cycle payloads to the collector's ingest endpoint.
///
/// Each payload gets exactly one POST. Nothing is retried or kept: when the
/// upload fails the payload is logged as lost and dropped.
#[derive(Debug, Clone)]
pub struct Reporter {
    client: Client,
    ingest_url: String,
    api_key: String,
}

impl Reporter {
    pub fn new(config: &AgentConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.upload_timeout).build()?;
        Ok(Self {
            client,
            ingest_url: config.ingest_url(),
            api_key: config.ingest_api_key.clone(),
        })
    }

    fn headers(&self) -> Result<HeaderMap, ReportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(&self.api_key).map_err(ReportError::ApiKey)?,
        );
        Ok(headers)
    }

    /// POST `payload` once and return the number of measurements accepted.
    pub async fn try_send(&self, payload: &Payload) -> Result<usize, ReportError> {
        let headers = self.headers()?;

        let response = self
            .client
            .post(&self.ingest_url)
            .headers(headers)
            .json(payload)
            .send()
            .await
            .map_err(|source| ReportError::Transport {
                url: self.ingest_url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Rejected {
                url: self.ingest_url.clone(),
                status: status.as_u16(),
                body: truncate_body(&body).to_string(),
            });
        }

        Ok(payload.measurements.len())
    }

    /// Deliver `payload`, logging the outcome. Never fails; the payload is
    /// consumed whether or not the collector accepted it.
    pub async fn send(&self, payload: Payload) {
        match self.try_send(&payload).await {
            Ok(count) => log::info!("sent {count} measurements"),
            Err(e @ ReportError::Rejected { .. }) => log::warn!("{e}"),
            Err(e) => log::error!("{}", report(&e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::cycle::Measurement;
    use crate::cycle::scheduler::tests::config_with;
    use crate::ping_probe::result::PingResult;

    fn payload() -> Payload {
        Payload {
            site: "lab".into(),
            probe_name: "onprem-1".into(),
            measurements: vec![Measurement::ping(
                Utc::now(),
                "1.1.1.1".into(),
                PingResult {
                    latency_ms: Some(12.0),
                    jitter_ms: Some(1.5),
                    loss_pct: Some(0.0),
                },
            )],
        }
    }

    fn reporter_for(base_url: &str) -> Reporter {
        let config = config_with(&[
            ("CLOUD_BASE_URL", base_url),
            ("INGEST_API_KEY", "secret"),
            ("UPLOAD_TIMEOUT_SECONDS", "0.5"),
        ]);
        Reporter::new(&config).unwrap()
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(500);
        assert_eq!(truncate_body(&long).len(), MAX_LOGGED_BODY_WIDTH);
        assert_eq!(truncate_body("short"), "short");
    }

    #[tokio::test]
    async fn test_accepted_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ingest"))
            .and(header("x-api-key", "secret"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true,"inserted":1}"#))
            .expect(2)
            .mount(&server)
            .await;
        let reporter = reporter_for(&format!("{}/", server.uri()));

        let sent = reporter.try_send(&payload()).await.unwrap();
        assert_eq!(sent, 1);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.path(), "/api/ingest");
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["site"], "lab");
        assert_eq!(body["probeName"], "onprem-1");
        assert_eq!(body["measurements"][0]["pingTarget"], "1.1.1.1");

        reporter.send(payload()).await;
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ingest"))
            .respond_with(ResponseTemplate::new(500).set_body_string("e".repeat(1000)))
            .mount(&server)
            .await;
        let reporter = reporter_for(&server.uri());

        match reporter.try_send(&payload()).await {
            Err(ReportError::Rejected { status, body, .. }) => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), MAX_LOGGED_BODY_WIDTH);
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        reporter.send(payload()).await;
    }

    #[tokio::test]
    async fn test_unauthorized_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error":"unauthorized"}"#))
            .mount(&server)
            .await;
        let reporter = reporter_for(&server.uri());

        match reporter.try_send(&payload()).await {
            Err(ReportError::Rejected { status, body, .. }) => {
                assert_eq!(status, 401);
                assert_eq!(body, r#"{"error":"unauthorized"}"#);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let reporter = reporter_for(&format!("http://{addr}"));

        let result = reporter.try_send(&payload()).await;
        assert!(matches!(result, Err(ReportError::Transport { .. })));

        reporter.send(payload()).await;
    }

    #[tokio::test]
    async fn test_slow_collector_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;
        let reporter = reporter_for(&server.uri());

        let result = reporter.try_send(&payload()).await;
        assert!(matches!(result, Err(ReportError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_invalid_api_key() {
        let mut reporter = reporter_for("http://127.0.0.1:9");
        reporter.api_key = "line\nbreak".into();

        let result = reporter.try_send(&payload()).await;
        assert!(matches!(result, Err(ReportError::ApiKey(_))));

        reporter.send(payload()).await;
    }
}
