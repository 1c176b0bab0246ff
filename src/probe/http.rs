//! HTTP liveness check.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::{HttpCheck, ProbeError};

/// Client settings for the liveness request.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(20),
            accept_invalid_certs: false,
        }
    }
}

/// GET check backed by a shared `reqwest` client.
///
/// The client binds to `0.0.0.0`, so only IPv4 peers are dialed, keeps no idle
/// connections between checks and follows up to 10 redirects.
#[derive(Debug, Clone)]
pub struct ReqwestCheck {
    client: reqwest::Client,
}

impl ReqwestCheck {
    pub fn new(settings: &HttpSettings) -> Result<Self, ProbeError> {
        if settings.request_timeout <= settings.connect_timeout {
            return Err(ProbeError::Config(format!(
                "request timeout {:?} must exceed connect timeout {:?}",
                settings.request_timeout, settings.connect_timeout
            )));
        }

        let client = reqwest::Client::builder()
            .local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
            .pool_max_idle_per_host(0)
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .user_agent(concat!("pingkeeper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProbeError::Config(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpCheck for ReqwestCheck {
    async fn get(&self, url: &Url) -> Result<u16, ProbeError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_error)?;

        Ok(response.status().as_u16())
    }
}

fn classify_error(e: reqwest::Error) -> ProbeError {
    if e.is_timeout() {
        ProbeError::Timeout
    } else if e.is_builder() {
        ProbeError::Config(e.to_string())
    } else {
        ProbeError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick_settings() -> HttpSettings {
        HttpSettings {
            connect_timeout: Duration::from_millis(500),
            request_timeout: Duration::from_secs(1),
            accept_invalid_certs: false,
        }
    }

    async fn status_of(server: &MockServer, route: &str) -> Result<u16, ProbeError> {
        let check = ReqwestCheck::new(&quick_settings()).unwrap();
        let url = Url::parse(&format!("{}{}", server.uri(), route)).unwrap();
        check.get(&url).await
    }

    #[test]
    fn test_rejects_inverted_timeouts() {
        let settings = HttpSettings {
            connect_timeout: Duration::from_secs(20),
            request_timeout: Duration::from_secs(15),
            accept_invalid_certs: false,
        };
        assert!(matches!(ReqwestCheck::new(&settings), Err(ProbeError::Config(_))));
    }

    #[tokio::test]
    async fn test_reports_status_codes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert_eq!(status_of(&server, "/ok").await.unwrap(), 200);
        assert_eq!(status_of(&server, "/gone").await.unwrap(), 404);
        assert_eq!(status_of(&server, "/broken").await.unwrap(), 503);
    }

    #[tokio::test]
    async fn test_follows_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("Location", format!("{}/new", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        assert_eq!(status_of(&server, "/old").await.unwrap(), 502);
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        assert!(matches!(status_of(&server, "/").await, Err(ProbeError::Timeout)));
    }

    #[tokio::test]
    async fn test_refused_connection_is_network_error() {
        // Grab a free port, then close it so nothing is listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let check = ReqwestCheck::new(&quick_settings()).unwrap();
        let url = Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();
        assert!(matches!(check.get(&url).await, Err(ProbeError::Network(_))));
    }
}
