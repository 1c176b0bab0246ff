//! Probe module for endpoint monitoring.
//!
//! A probe is a DNS pre-check followed by an HTTP GET; the outcome is folded
//! into one [`ProbeStatus`] and recorded in the [`Store`].

mod dns;
mod http;

pub use dns::*;
pub use http::*;

use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::{Host, Url};

use crate::db::{Project, Store};

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("invalid url: {0}")]
    BadUrl(String),
    #[error("dns resolution failed for {host}: {reason}")]
    Dns { host: String, reason: String },
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Classification of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    /// A server answered with a status below 500.
    Running,
    /// The server answered 5xx.
    Http(u16),
    Timeout,
    ConnError,
    DnsError,
    BadUrl,
    /// Anything unexpected.
    Error,
}

impl ProbeStatus {
    pub fn is_success(self) -> bool {
        matches!(self, ProbeStatus::Running)
    }

    /// Map an HTTP status code.
    pub fn from_code(code: u16) -> Self {
        if code < 500 {
            ProbeStatus::Running
        } else {
            ProbeStatus::Http(code)
        }
    }
}

impl From<&ProbeError> for ProbeStatus {
    fn from(err: &ProbeError) -> Self {
        match err {
            ProbeError::BadUrl(_) => ProbeStatus::BadUrl,
            ProbeError::Dns { .. } => ProbeStatus::DnsError,
            ProbeError::Timeout => ProbeStatus::Timeout,
            ProbeError::Network(_) => ProbeStatus::ConnError,
            ProbeError::Config(_) => ProbeStatus::Error,
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Running => write!(f, "Running"),
            ProbeStatus::Http(code) => write!(f, "HTTP {}", code),
            ProbeStatus::Timeout => write!(f, "Timeout"),
            ProbeStatus::ConnError => write!(f, "Conn Error"),
            ProbeStatus::DnsError => write!(f, "DNS Error"),
            ProbeStatus::BadUrl => write!(f, "Bad URL"),
            ProbeStatus::Error => write!(f, "Error"),
        }
    }
}

/// Resolves a host name to an IPv4 address.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve_ipv4(&self, host: &str) -> Result<Ipv4Addr, ProbeError>;
}

/// Issues the HTTP liveness request and returns the response status code.
#[async_trait]
pub trait HttpCheck: Send + Sync {
    async fn get(&self, url: &Url) -> Result<u16, ProbeError>;
}

/// Parse a stored url into its absolute form.
///
/// Urls without an http(s) scheme get `https://` prepended first.
pub fn parse_target(raw: &str) -> Result<Url, ProbeError> {
    let raw = raw.trim();
    let lower = raw.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let url = Url::parse(&candidate).map_err(|e| ProbeError::BadUrl(e.to_string()))?;
    let has_host = match url.host() {
        Some(Host::Domain(d)) => !d.is_empty(),
        Some(_) => true,
        None => false,
    };
    if has_host {
        Ok(url)
    } else {
        Err(ProbeError::BadUrl(format!("no host in {}", raw)))
    }
}

/// Runs probes and records their outcomes.
#[derive(Clone)]
pub struct Prober {
    store: Store,
    resolver: Arc<dyn Resolver>,
    http: Arc<dyn HttpCheck>,
    dns_timeout: Duration,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Prober {
    pub fn new(
        store: Store,
        resolver: Arc<dyn Resolver>,
        http: Arc<dyn HttpCheck>,
        dns_timeout: Duration,
    ) -> Self {
        Self {
            store,
            resolver,
            http,
            dns_timeout,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Probe one project and record the outcome.
    ///
    /// Returns `None` without touching the network when the project is
    /// inactive or already being probed.
    pub async fn probe(&self, project: &Project) -> Option<ProbeStatus> {
        if !project.active {
            return None;
        }
        let Some(_guard) = InFlight::claim(&self.in_flight, &project.id) else {
            tracing::debug!("Probe of {} already in flight, skipping", project.name);
            return None;
        };

        tracing::debug!("Pinging: {}", project.name);

        // Run in its own task so a panic inside the network stack becomes a status.
        let this = self.clone();
        let url = project.url.clone();
        let status = match tokio::spawn(async move { this.classify(&url).await }).await {
            Ok(Ok(code)) => ProbeStatus::from_code(code),
            Ok(Err(e)) => {
                let status = ProbeStatus::from(&e);
                if status == ProbeStatus::Error {
                    tracing::error!("Probe of {} failed unexpectedly: {}", project.name, e);
                } else {
                    tracing::warn!("DOWN: {} | {}", project.name, e);
                }
                status
            }
            Err(e) => {
                tracing::error!("Probe task for {} aborted: {}", project.name, e);
                ProbeStatus::Error
            }
        };

        if status.is_success() {
            tracing::info!("UP: {}", project.name);
        }
        self.store
            .record_outcome(&project.id, &status.to_string(), status.is_success());
        Some(status)
    }

    /// URL parse, DNS check, HTTP check. Returns the response status code.
    async fn classify(&self, raw_url: &str) -> Result<u16, ProbeError> {
        let url = parse_target(raw_url)?;

        match url.host() {
            Some(Host::Ipv4(_)) => {}
            Some(Host::Domain(host)) => {
                let addr = tokio::time::timeout(self.dns_timeout, self.resolver.resolve_ipv4(host))
                    .await
                    .map_err(|_| ProbeError::Dns {
                        host: host.to_string(),
                        reason: format!("timed out after {:?}", self.dns_timeout),
                    })??;
                tracing::debug!("DNS OK: {} -> {}", host, addr);
            }
            Some(Host::Ipv6(addr)) => {
                return Err(ProbeError::Dns {
                    host: addr.to_string(),
                    reason: "no IPv4 address".to_string(),
                });
            }
            None => return Err(ProbeError::BadUrl(raw_url.to_string())),
        }

        self.http.get(&url).await
    }
}

/// Marks a project id as being probed until dropped.
struct InFlight {
    set: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl InFlight {
    fn claim(set: &Arc<Mutex<HashSet<String>>>, id: &str) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string());
        inserted.then(|| Self {
            set: set.clone(),
            id: id.to_string(),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::db::JsonFile;
    use tempfile::TempDir;

    fn setup(resolver: FakeResolver, http: FakeHttp) -> (TempDir, Store, Prober, Arc<FakeResolver>, Arc<FakeHttp>) {
        let tmp = TempDir::new().unwrap();
        let store = Store::open(
            JsonFile::new(tmp.path().join("projects.json")),
            JsonFile::new(tmp.path().join("project_stats.json")),
        );
        let resolver = Arc::new(resolver);
        let http = Arc::new(http);
        let prober = Prober::new(
            store.clone(),
            resolver.clone(),
            http.clone(),
            Duration::from_secs(1),
        );
        (tmp, store, prober, resolver, http)
    }

    async fn probe_url(prober: &Prober, store: &Store, url: &str) -> Option<ProbeStatus> {
        let id = store.add_project("target", url, None).unwrap();
        let project = store.get_project(&id).unwrap();
        prober.probe(&project).await
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(ProbeStatus::Running.to_string(), "Running");
        assert_eq!(ProbeStatus::Http(503).to_string(), "HTTP 503");
        assert_eq!(ProbeStatus::Timeout.to_string(), "Timeout");
        assert_eq!(ProbeStatus::ConnError.to_string(), "Conn Error");
        assert_eq!(ProbeStatus::DnsError.to_string(), "DNS Error");
        assert_eq!(ProbeStatus::BadUrl.to_string(), "Bad URL");
        assert_eq!(ProbeStatus::Error.to_string(), "Error");
    }

    #[test]
    fn test_from_code_boundary() {
        assert_eq!(ProbeStatus::from_code(200), ProbeStatus::Running);
        assert_eq!(ProbeStatus::from_code(404), ProbeStatus::Running);
        assert_eq!(ProbeStatus::from_code(499), ProbeStatus::Running);
        assert_eq!(ProbeStatus::from_code(500), ProbeStatus::Http(500));
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(
            parse_target("example.com/health").unwrap().as_str(),
            "https://example.com/health"
        );
        assert!(parse_target("http://10.0.0.1:8080").is_ok());
        assert!(matches!(parse_target("https://"), Err(ProbeError::BadUrl(_))));
        assert!(matches!(parse_target("https://exa mple.com"), Err(ProbeError::BadUrl(_))));
    }

    #[tokio::test]
    async fn test_running_on_200() {
        let (_tmp, store, prober, _, _) = setup(FakeResolver::default(), FakeHttp::default());
        let status = probe_url(&prober, &store, "up.example").await;
        assert_eq!(status, Some(ProbeStatus::Running));

        let project = store.get_project("1").unwrap();
        assert_eq!(project.status, "Running");
        let stats = store.get_stats("1").unwrap();
        assert_eq!((stats.total_pings, stats.successful_pings), (1, 1));
        assert_eq!(stats.uptime_percentage, 100.0);
    }

    #[tokio::test]
    async fn test_client_errors_count_as_up() {
        let http = FakeHttp::with(&[("missing.example", Reply::Status(404))]);
        let (_tmp, store, prober, _, _) = setup(FakeResolver::default(), http);
        let status = probe_url(&prober, &store, "missing.example").await;
        assert_eq!(status, Some(ProbeStatus::Running));
    }

    #[tokio::test]
    async fn test_server_error_is_failure() {
        let http = FakeHttp::with(&[("down.example", Reply::Status(503))]);
        let (_tmp, store, prober, _, _) = setup(FakeResolver::default(), http);
        let status = probe_url(&prober, &store, "down.example").await;
        assert_eq!(status, Some(ProbeStatus::Http(503)));

        assert_eq!(store.get_project("1").unwrap().status, "HTTP 503");
        let stats = store.get_stats("1").unwrap();
        assert_eq!((stats.total_pings, stats.failed_pings), (1, 1));
        assert_eq!(stats.last_status, "HTTP 503");
    }

    #[tokio::test]
    async fn test_dns_failure_skips_http() {
        let (_tmp, store, prober, resolver, http) =
            setup(FakeResolver::failing(&["nowhere.invalid"]), FakeHttp::default());
        let status = probe_url(&prober, &store, "nowhere.invalid").await;

        assert_eq!(status, Some(ProbeStatus::DnsError));
        assert_eq!(resolver.calls(), vec!["nowhere.invalid"]);
        assert_eq!(http.hits(), 0);
        assert_eq!(store.get_project("1").unwrap().status, "DNS Error");
    }

    #[tokio::test]
    async fn test_timeout_and_refused() {
        let http = FakeHttp::with(&[
            ("slow.example", Reply::Timeout),
            ("closed.example", Reply::Refused),
        ]);
        let (_tmp, store, prober, _, _) = setup(FakeResolver::default(), http);

        assert_eq!(
            probe_url(&prober, &store, "slow.example").await,
            Some(ProbeStatus::Timeout)
        );
        assert_eq!(
            probe_url(&prober, &store, "closed.example").await,
            Some(ProbeStatus::ConnError)
        );
        assert_eq!(store.get_stats("1").unwrap().failed_pings, 1);
        assert_eq!(store.get_stats("2").unwrap().failed_pings, 1);
    }

    #[tokio::test]
    async fn test_bad_url_makes_no_network_calls() {
        let (_tmp, store, prober, resolver, http) =
            setup(FakeResolver::default(), FakeHttp::default());
        let status = probe_url(&prober, &store, "https://").await;

        assert_eq!(status, Some(ProbeStatus::BadUrl));
        assert!(resolver.calls().is_empty());
        assert_eq!(http.hits(), 0);
    }

    #[tokio::test]
    async fn test_ipv6_literal_is_dns_error() {
        let (_tmp, store, prober, _, http) = setup(FakeResolver::default(), FakeHttp::default());
        let status = probe_url(&prober, &store, "http://[::1]:8080").await;
        assert_eq!(status, Some(ProbeStatus::DnsError));
        assert_eq!(http.hits(), 0);
    }

    #[tokio::test]
    async fn test_ipv4_literal_skips_resolver() {
        let (_tmp, store, prober, resolver, http) =
            setup(FakeResolver::default(), FakeHttp::default());
        let status = probe_url(&prober, &store, "http://192.0.2.10").await;
        assert_eq!(status, Some(ProbeStatus::Running));
        assert!(resolver.calls().is_empty());
        assert_eq!(http.hits(), 1);
    }

    #[tokio::test]
    async fn test_panic_becomes_error_status() {
        let http = FakeHttp::with(&[("boom.example", Reply::Panic)]);
        let (_tmp, store, prober, _, _) = setup(FakeResolver::default(), http);
        let status = probe_url(&prober, &store, "boom.example").await;

        assert_eq!(status, Some(ProbeStatus::Error));
        assert_eq!(store.get_project("1").unwrap().status, "Error");
        assert_eq!(store.get_stats("1").unwrap().failed_pings, 1);
    }

    #[tokio::test]
    async fn test_inactive_project_is_ignored() {
        let (_tmp, store, prober, resolver, http) =
            setup(FakeResolver::default(), FakeHttp::default());
        let id = store.add_project("paused", "paused.example", None).unwrap();
        store.toggle_project(&id).unwrap();
        let project = store.get_project(&id).unwrap();

        assert_eq!(prober.probe(&project).await, None);
        assert!(resolver.calls().is_empty());
        assert_eq!(http.hits(), 0);
        assert_eq!(store.get_stats(&id).unwrap().total_pings, 0);
        assert!(store.get_project(&id).unwrap().last_ping.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_probe_of_same_project_is_skipped() {
        let http = FakeHttp::with(&[("busy.example", Reply::Slow(Duration::from_millis(200)))]);
        let (_tmp, store, prober, _, http) = setup(FakeResolver::default(), http);
        let id = store.add_project("busy", "busy.example", None).unwrap();
        let project = store.get_project(&id).unwrap();

        let (first, second) = tokio::join!(prober.probe(&project), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            prober.probe(&project).await
        });

        assert_eq!(first, Some(ProbeStatus::Running));
        assert_eq!(second, None);
        assert_eq!(http.hits(), 1);
        assert_eq!(store.get_stats(&id).unwrap().total_pings, 1);

        // Guard is released once the outcome is recorded.
        assert_eq!(prober.probe(&project).await, Some(ProbeStatus::Running));
        assert_eq!(store.get_stats(&id).unwrap().total_pings, 2);
    }
}
