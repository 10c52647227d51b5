use serde::Deserialize;

/// The static set of targets probed every cycle.
/// Loaded once at startup and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSet {
    /// Hosts probed with ICMP echo requests.
    pub ping: Vec<String>,

    /// The hostname resolved against every DNS server.
    pub dns_hostname: String,

    /// Nameservers queried for `dns_hostname`, as `ip` or `ip:port`.
    pub dns_servers: Vec<String>,

    /// URLs fetched for time-to-first-byte.
    pub http: Vec<String>,
}

impl TargetSet {
    /// Number of measurements one cycle over this set produces.
    pub fn len(&self) -> usize {
        self.ping.len() + self.dns_servers.len() + self.http.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A list value in the YAML file. Accepts both a sequence and the
/// comma-separated form used by the environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ListValue {
    Items(Vec<String>),
    Joined(String),
}

impl ListValue {
    pub fn into_items(self) -> Vec<String> {
        match self {
            ListValue::Items(items) => items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            ListValue::Joined(joined) => split_list(&joined),
        }
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The optional YAML configuration file.
/// Every key is optional; unset keys fall back to the environment defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Base URL of the collector, `/api/ingest` is appended to it.
    pub cloud_base_url: Option<String>,

    /// Shared secret sent as the `x-api-key` header.
    pub ingest_api_key: Option<String>,

    /// Site identifier reported in every payload.
    pub site_slug: Option<String>,

    /// Name of this probe instance reported in every payload.
    pub probe_name: Option<String>,

    pub interval_seconds: Option<u64>,

    pub ping_targets: Option<ListValue>,
    pub http_targets: Option<ListValue>,
    pub dns_hostname: Option<String>,
    pub dns_servers: Option<ListValue>,

    pub ping_count: Option<u32>,
    pub ping_timeout_seconds: Option<u64>,
    pub dns_timeout_seconds: Option<f64>,
    pub http_timeout_seconds: Option<f64>,
    pub upload_timeout_seconds: Option<f64>,
    pub probe_concurrency: Option<usize>,
}
