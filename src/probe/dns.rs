//! DNS pre-check using the system resolver.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use async_trait::async_trait;

use super::{ProbeError, Resolver};

/// Resolver backed by `getaddrinfo` via tokio, keeping IPv4 answers only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve_ipv4(&self, host: &str) -> Result<Ipv4Addr, ProbeError> {
        // Try direct parse first
        if let Ok(ip) = host.parse::<Ipv4Addr>() {
            return Ok(ip);
        }

        let addrs = tokio::net::lookup_host((host, 80))
            .await
            .map_err(|e| ProbeError::Dns {
                host: host.to_string(),
                reason: e.to_string(),
            })?;

        first_ipv4(addrs).ok_or_else(|| ProbeError::Dns {
            host: host.to_string(),
            reason: "no IPv4 address".to_string(),
        })
    }
}

fn first_ipv4(addrs: impl IntoIterator<Item = SocketAddr>) -> Option<Ipv4Addr> {
    addrs.into_iter().find_map(|sa| match sa.ip() {
        IpAddr::V4(v4) => Some(v4),
        IpAddr::V6(_) => None,
    })
}
