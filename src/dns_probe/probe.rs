use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use tokio::time::timeout;
use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig, ResolverOpts},
};

use super::result::{DnsOutcome, DnsResult};

const DNS_PORT: u16 = 53;

/// Parse a nameserver given as `ip` or `ip:port`.
pub fn parse_nameserver(nameserver: &str) -> Option<SocketAddr> {
    let nameserver = nameserver.trim();
    if let Ok(addr) = nameserver.parse::<SocketAddr>() {
        return Some(addr);
    }
    nameserver
        .parse::<IpAddr>()
        .ok()
        .map(|ip| SocketAddr::new(ip, DNS_PORT))
}

/// Setup a resolver that only ever asks `socket_addr`.
/// System resolver configuration, search domains and the hosts file are ignored,
/// and every query is attempted once so the elapsed time covers a single request.
fn single_server_resolver(socket_addr: SocketAddr, query_timeout: Duration) -> TokioAsyncResolver {
    let mut opts = ResolverOpts::default();
    opts.attempts = 1;
    opts.timeout = query_timeout;
    opts.use_hosts_file = false;

    let mut name_servers = NameServerConfigGroup::new();
    name_servers.push(NameServerConfig {
        socket_addr,
        protocol: Protocol::Udp,
        tls_dns_name: None,
        trust_negative_responses: true,
        bind_addr: None,
    });

    let resolver_config = ResolverConfig::from_parts(None, vec![], name_servers);
    TokioAsyncResolver::tokio(resolver_config, opts)
}

/// Resolves a hostname against one explicit nameserver and times the attempt.
#[derive(Debug, Clone)]
pub struct DnsProber {
    timeout: Duration,
}

impl DnsProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Resolve the A records of `hostname` using only `nameserver`.
    /// Never fails: resolver errors are folded into the outcome and the
    /// elapsed time is reported either way.
    pub async fn probe(&self, hostname: &str, nameserver: &str) -> DnsResult {
        let start = Instant::now();

        let Some(socket_addr) = parse_nameserver(nameserver) else {
            log::warn!("dns {hostname} @{nameserver}: not an IP address");
            return DnsResult {
                lookup_ms: elapsed_ms(start),
                outcome: DnsOutcome::Failed(format!("invalid nameserver address {nameserver:?}")),
            };
        };

        let resolver = single_server_resolver(socket_addr, self.timeout);
        let lookup = timeout(self.timeout, resolver.ipv4_lookup(hostname)).await;
        let lookup_ms = elapsed_ms(start);

        let outcome = match lookup {
            Ok(Ok(records)) => DnsOutcome::Resolved {
                addresses: records.iter().count(),
            },
            Ok(Err(e)) => DnsOutcome::Failed(e.to_string()),
            Err(_) => DnsOutcome::Failed(format!(
                "no answer within {:.1}s",
                self.timeout.as_secs_f64()
            )),
        };

        match &outcome {
            DnsOutcome::Resolved { addresses } => {
                log::debug!("dns {hostname} @{nameserver}: {addresses} address(es) in {lookup_ms:.1}ms")
            }
            DnsOutcome::Failed(reason) => {
                log::warn!("dns {hostname} @{nameserver}: {reason} after {lookup_ms:.1}ms")
            }
        }

        DnsResult { lookup_ms, outcome }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
