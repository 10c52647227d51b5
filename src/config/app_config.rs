use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use super::probe_config::{FileConfig, ListValue, TargetSet, split_list};

const DEFAULT_CLOUD_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_SITE_SLUG: &str = "lab";
const DEFAULT_PROBE_NAME: &str = "onprem-1";
const DEFAULT_INTERVAL_SECONDS: u64 = 15;
const DEFAULT_PING_TARGETS: &str = "1.1.1.1,8.8.8.8";
const DEFAULT_HTTP_TARGETS: &str = "https://www.google.com";
const DEFAULT_DNS_HOSTNAME: &str = "www.google.com";
const DEFAULT_DNS_SERVERS: &str = "1.1.1.1,8.8.8.8";
const DEFAULT_PING_COUNT: u32 = 4;
const DEFAULT_PING_TIMEOUT_SECONDS: u64 = 2;
const DEFAULT_DNS_TIMEOUT_SECONDS: f64 = 2.0;
const DEFAULT_HTTP_TIMEOUT_SECONDS: f64 = 4.0;
const DEFAULT_UPLOAD_TIMEOUT_SECONDS: f64 = 10.0;
const DEFAULT_PROBE_CONCURRENCY: usize = 8;

/// Errors that can occur while loading the agent configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file named by `CONFIG_FILE` could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file named by `CONFIG_FILE` is not valid YAML for this agent.
    #[error("invalid config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A value could not be parsed into the expected type.
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },

    /// A value parsed but is out of range.
    #[error("{key} must be greater than zero")]
    NotPositive { key: &'static str },

    #[error("invalid CLOUD_BASE_URL {value:?}: {source}")]
    BaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// The immutable configuration of the agent.
/// Constructed once at startup and handed to the scheduler, probers and reporter.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Collector base URL without a trailing slash.
    pub cloud_base_url: String,
    pub ingest_api_key: String,
    pub site_slug: String,
    pub probe_name: String,

    /// Sleep between the end of one cycle and the start of the next.
    pub interval: Duration,

    pub targets: TargetSet,

    /// Echo requests sent per ping target.
    pub ping_count: u32,
    /// Per-packet ping timeout, passed to `ping -W`.
    pub ping_timeout: Duration,
    pub dns_timeout: Duration,
    pub http_timeout: Duration,
    pub upload_timeout: Duration,

    /// Maximum number of probes running at once within a cycle.
    pub probe_concurrency: usize,
}

impl AgentConfig {
    /// The collector endpoint payloads are posted to.
    pub fn ingest_url(&self) -> String {
        format!("{}/api/ingest", self.cloud_base_url)
    }

    /// Build a configuration from a key lookup and an optional file.
    /// The lookup takes precedence over the file, the file over the defaults.
    /// Empty values returned by the lookup are treated as unset.
    pub fn from_sources<F>(lookup: F, file: FileConfig) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sources = Sources { lookup, file };

        let cloud_base_url = sources
            .string("CLOUD_BASE_URL", sources.file.cloud_base_url.clone(), DEFAULT_CLOUD_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        Url::parse(&cloud_base_url).map_err(|source| ConfigError::BaseUrl {
            value: cloud_base_url.clone(),
            source,
        })?;

        let targets = TargetSet {
            ping: sources.list("PING_TARGETS", sources.file.ping_targets.clone(), DEFAULT_PING_TARGETS),
            dns_hostname: sources.string(
                "DNS_HOSTNAME",
                sources.file.dns_hostname.clone(),
                DEFAULT_DNS_HOSTNAME,
            ),
            dns_servers: sources.list("DNS_SERVERS", sources.file.dns_servers.clone(), DEFAULT_DNS_SERVERS),
            http: sources.list("HTTP_TARGETS", sources.file.http_targets.clone(), DEFAULT_HTTP_TARGETS),
        };

        let interval_seconds = positive(
            "INTERVAL_SECONDS",
            sources.number("INTERVAL_SECONDS", sources.file.interval_seconds, DEFAULT_INTERVAL_SECONDS)?,
        )?;
        let ping_count = positive(
            "PING_COUNT",
            sources.number("PING_COUNT", sources.file.ping_count, DEFAULT_PING_COUNT)?,
        )?;
        let ping_timeout_seconds = positive(
            "PING_TIMEOUT_SECONDS",
            sources.number(
                "PING_TIMEOUT_SECONDS",
                sources.file.ping_timeout_seconds,
                DEFAULT_PING_TIMEOUT_SECONDS,
            )?,
        )?;
        let probe_concurrency = positive(
            "PROBE_CONCURRENCY",
            sources.number(
                "PROBE_CONCURRENCY",
                sources.file.probe_concurrency,
                DEFAULT_PROBE_CONCURRENCY,
            )?,
        )?;

        Ok(AgentConfig {
            cloud_base_url,
            ingest_api_key: sources.string(
                "INGEST_API_KEY",
                sources.file.ingest_api_key.clone(),
                "",
            ),
            site_slug: sources.string("SITE_SLUG", sources.file.site_slug.clone(), DEFAULT_SITE_SLUG),
            probe_name: sources.string("PROBE_NAME", sources.file.probe_name.clone(), DEFAULT_PROBE_NAME),
            interval: Duration::from_secs(interval_seconds),
            targets,
            ping_count,
            ping_timeout: Duration::from_secs(ping_timeout_seconds),
            dns_timeout: sources.seconds(
                "DNS_TIMEOUT_SECONDS",
                sources.file.dns_timeout_seconds,
                DEFAULT_DNS_TIMEOUT_SECONDS,
            )?,
            http_timeout: sources.seconds(
                "HTTP_TIMEOUT_SECONDS",
                sources.file.http_timeout_seconds,
                DEFAULT_HTTP_TIMEOUT_SECONDS,
            )?,
            upload_timeout: sources.seconds(
                "UPLOAD_TIMEOUT_SECONDS",
                sources.file.upload_timeout_seconds,
                DEFAULT_UPLOAD_TIMEOUT_SECONDS,
            )?,
            probe_concurrency,
        })
    }
}

struct Sources<F> {
    lookup: F,
    file: FileConfig,
}

impl<F> Sources<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn string(&self, key: &str, file: Option<String>, default: &str) -> String {
        self.get(key)
            .or(file)
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| default.to_string())
    }

    fn list(&self, key: &str, file: Option<ListValue>, default: &str) -> Vec<String> {
        match (self.get(key), file) {
            (Some(value), _) => split_list(&value),
            (None, Some(value)) => value.into_items(),
            (None, None) => split_list(default),
        }
    }

    fn number<T: FromStr>(&self, key: &'static str, file: Option<T>, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
            None => Ok(file.unwrap_or(default)),
        }
    }

    fn seconds(&self, key: &'static str, file: Option<f64>, default: f64) -> Result<Duration, ConfigError> {
        let seconds = self.number(key, file, default)?;
        if seconds.is_nan() || seconds <= 0.0 {
            return Err(ConfigError::NotPositive { key });
        }
        Duration::try_from_secs_f64(seconds).map_err(|_| ConfigError::Invalid {
            key,
            value: seconds.to_string(),
        })
    }
}

fn positive<T: Default + PartialOrd>(key: &'static str, value: T) -> Result<T, ConfigError> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::NotPositive { key })
    }
}

/// Load the agent configuration from the environment and the optional YAML file
/// named by the `CONFIG_FILE` environment variable.
/// Environment variables override file values; a `.env` file is expected to be
/// loaded into the environment before this is called.
pub fn load_config() -> Result<AgentConfig, ConfigError> {
    let file = match env::var("CONFIG_FILE").ok().filter(|p| !p.trim().is_empty()) {
        Some(path) => {
            let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            log::info!("Using config file: {}", path);
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml { path, source })?
        }
        None => FileConfig::default(),
    };

    AgentConfig::from_sources(|key| env::var(key).ok(), file)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_map(pairs: &[(&str, &str)], file: FileConfig) -> Result<AgentConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AgentConfig::from_sources(|key| map.get(key).cloned(), file)
    }

    #[test]
    fn test_defaults() {
        let config = from_map(&[], FileConfig::default()).expect("defaults are valid");
        assert_eq!(config.cloud_base_url, "http://localhost:3000");
        assert_eq!(config.ingest_url(), "http://localhost:3000/api/ingest");
        assert_eq!(config.ingest_api_key, "");
        assert_eq!(config.site_slug, "lab");
        assert_eq!(config.probe_name, "onprem-1");
        assert_eq!(config.interval, Duration::from_secs(15));
        assert_eq!(config.targets.ping, vec!["1.1.1.1", "8.8.8.8"]);
        assert_eq!(config.targets.http, vec!["https://www.google.com"]);
        assert_eq!(config.targets.dns_hostname, "www.google.com");
        assert_eq!(config.targets.dns_servers, vec!["1.1.1.1", "8.8.8.8"]);
        assert_eq!(config.ping_count, 4);
        assert_eq!(config.ping_timeout, Duration::from_secs(2));
        assert_eq!(config.dns_timeout, Duration::from_secs(2));
        assert_eq!(config.http_timeout, Duration::from_secs(4));
        assert_eq!(config.upload_timeout, Duration::from_secs(10));
        assert_eq!(config.probe_concurrency, 8);
    }

    #[test]
    fn test_environment_values() {
        let config = from_map(
            &[
                ("CLOUD_BASE_URL", "https://collector.example.com//"),
                ("INGEST_API_KEY", "secret"),
                ("SITE_SLUG", "office"),
                ("PROBE_NAME", "rack-2"),
                ("INTERVAL_SECONDS", "60"),
                ("PING_TARGETS", "10.0.0.1, ,10.0.0.2"),
                ("HTTP_TARGETS", "https://a.example.com"),
                ("DNS_HOSTNAME", "example.org"),
                ("DNS_SERVERS", "9.9.9.9"),
                ("DNS_TIMEOUT_SECONDS", "0.25"),
                ("PROBE_CONCURRENCY", "1"),
            ],
            FileConfig::default(),
        )
        .expect("valid config");

        assert_eq!(config.ingest_url(), "https://collector.example.com/api/ingest");
        assert_eq!(config.ingest_api_key, "secret");
        assert_eq!(config.site_slug, "office");
        assert_eq!(config.probe_name, "rack-2");
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.targets.ping, vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(config.targets.http, vec!["https://a.example.com"]);
        assert_eq!(config.targets.dns_hostname, "example.org");
        assert_eq!(config.targets.dns_servers, vec!["9.9.9.9"]);
        assert_eq!(config.dns_timeout, Duration::from_millis(250));
        assert_eq!(config.probe_concurrency, 1);
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let config = from_map(&[("SITE_SLUG", ""), ("INTERVAL_SECONDS", " ")], FileConfig::default())
            .expect("valid config");
        assert_eq!(config.site_slug, "lab");
        assert_eq!(config.interval, Duration::from_secs(15));
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = FileConfig {
            site_slug: Some("from-file".into()),
            probe_name: Some("file-probe".into()),
            interval_seconds: Some(45),
            ping_targets: Some(ListValue::Items(vec!["192.0.2.1".into()])),
            ..FileConfig::default()
        };
        let config = from_map(&[("SITE_SLUG", "from-env")], file).expect("valid config");
        assert_eq!(config.site_slug, "from-env");
        assert_eq!(config.probe_name, "file-probe");
        assert_eq!(config.interval, Duration::from_secs(45));
        assert_eq!(config.targets.ping, vec!["192.0.2.1"]);
    }

    #[test]
    fn test_empty_target_lists_are_allowed() {
        let file = FileConfig {
            http_targets: Some(ListValue::Items(vec![])),
            ..FileConfig::default()
        };
        let config = from_map(&[("PING_TARGETS", ",")], file).expect("valid config");
        assert!(config.targets.ping.is_empty());
        assert!(config.targets.http.is_empty());
        assert_eq!(config.targets.dns_servers, vec!["1.1.1.1", "8.8.8.8"]);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            from_map(&[("INTERVAL_SECONDS", "soon")], FileConfig::default()),
            Err(ConfigError::Invalid { key: "INTERVAL_SECONDS", .. })
        ));
        assert!(matches!(
            from_map(&[("INTERVAL_SECONDS", "0")], FileConfig::default()),
            Err(ConfigError::NotPositive { key: "INTERVAL_SECONDS" })
        ));
        assert!(matches!(
            from_map(&[("PING_COUNT", "0")], FileConfig::default()),
            Err(ConfigError::NotPositive { key: "PING_COUNT" })
        ));
        assert!(matches!(
            from_map(&[("HTTP_TIMEOUT_SECONDS", "-1")], FileConfig::default()),
            Err(ConfigError::NotPositive { key: "HTTP_TIMEOUT_SECONDS" })
        ));
        assert!(matches!(
            from_map(&[("CLOUD_BASE_URL", "not a url")], FileConfig::default()),
            Err(ConfigError::BaseUrl { .. })
        ));
    }
}
