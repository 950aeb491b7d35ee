// Network utilities - Target descriptor, DNS resolution, reachability

use anyhow::{Context, Result};
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::*;
use serde::Serialize;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Default TLS port used when the input names none
pub const DEFAULT_PORT: u16 = 443;

/// Target information
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub hostname: String,
    pub port: u16,
    pub ip_addresses: Vec<IpAddr>,
}

impl Target {
    /// Parse target from string (URL, host:port or just host) and resolve it
    pub async fn parse(input: &str) -> Result<Self> {
        let (hostname, port) = split_host_port(input)?;
        let ip_addresses = resolve_hostname(&hostname).await?;

        Ok(Self {
            hostname,
            port,
            ip_addresses,
        })
    }

    /// Target for an already known socket address
    pub fn from_addr(addr: SocketAddr) -> Self {
        Self {
            hostname: addr.ip().to_string(),
            port: addr.port(),
            ip_addresses: vec![addr.ip()],
        }
    }

    /// Get all socket addresses
    pub fn socket_addrs(&self) -> Vec<SocketAddr> {
        self.ip_addresses
            .iter()
            .map(|ip| SocketAddr::new(*ip, self.port))
            .collect()
    }

    /// Get primary IP (first one)
    pub fn primary_ip(&self) -> Option<IpAddr> {
        self.ip_addresses.first().copied()
    }

    /// host:port label stored in the report
    pub fn label(&self) -> String {
        if self.hostname.contains(':') {
            format!("[{}]:{}", self.hostname, self.port)
        } else {
            format!("{}:{}", self.hostname, self.port)
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Split a target string into hostname and port without resolving it
pub fn split_host_port(input: &str) -> Result<(String, u16)> {
    let input = input.trim();
    if input.is_empty() {
        anyhow::bail!("Empty target");
    }

    if input.contains("://") {
        // URL format (https://example.com:443)
        let url = url::Url::parse(input)?;
        let host = url.host_str().context("No hostname in URL")?;
        let host = host.trim_start_matches('[').trim_end_matches(']').to_string();
        return Ok((host, url.port().unwrap_or(DEFAULT_PORT)));
    }

    if let Some(rest) = input.strip_prefix('[') {
        // [v6]:port or [v6]
        let (host, tail) = rest.split_once(']').context("Unterminated IPv6 literal")?;
        let port = match tail.strip_prefix(':') {
            Some(port_str) => parse_port(port_str)?,
            None if tail.is_empty() => DEFAULT_PORT,
            None => anyhow::bail!("Unexpected text after IPv6 literal: {}", tail),
        };
        return Ok((host.to_string(), port));
    }

    if input.parse::<IpAddr>().is_ok() {
        // Bare IPv6 literal, the colons are not a port separator
        return Ok((input.to_string(), DEFAULT_PORT));
    }

    match input.rsplit_once(':') {
        Some((host, port_str)) => Ok((host.to_string(), parse_port(port_str)?)),
        None => Ok((input.to_string(), DEFAULT_PORT)),
    }
}

/// Resolve hostname to IP addresses
pub async fn resolve_hostname(hostname: &str) -> Result<Vec<IpAddr>> {
    // Check if it's already an IP address
    if let Ok(ip) = hostname.parse::<IpAddr>() {
        return Ok(vec![ip]);
    }

    let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());

    let response = resolver
        .lookup_ip(hostname)
        .await
        .context("DNS lookup failed")?;

    let ips: Vec<IpAddr> = response.iter().collect();

    if ips.is_empty() {
        anyhow::bail!("No IP addresses found for {}", hostname);
    }

    Ok(ips)
}

/// Test TCP connection to target
pub async fn test_connection(addr: SocketAddr, connect_timeout: Duration) -> Result<()> {
    timeout(connect_timeout, TcpStream::connect(addr))
        .await
        .context("Connection timeout")??;

    Ok(())
}

/// Succeeds as soon as any of the target's addresses accepts a connection
pub async fn check_reachable(target: &Target, connect_timeout: Duration) -> Result<SocketAddr> {
    let mut last_error = None;
    for addr in target.socket_addrs() {
        match test_connection(addr, connect_timeout).await {
            Ok(()) => return Ok(addr),
            Err(e) => {
                debug!("{} not reachable: {:#}", addr, e);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) => Err(e.context(format!("{} is not reachable", target))),
        None => anyhow::bail!("{} has no addresses", target),
    }
}

/// Parse port from string
pub fn parse_port(port_str: &str) -> Result<u16> {
    port_str.parse::<u16>().context("Invalid port number")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_split_hostname() {
        assert_eq!(
            split_host_port("example.com").unwrap(),
            ("example.com".to_string(), 443)
        );
    }

    #[test]
    fn test_split_with_port() {
        assert_eq!(
            split_host_port("example.com:8443").unwrap(),
            ("example.com".to_string(), 8443)
        );
    }

    #[test]
    fn test_split_url() {
        assert_eq!(
            split_host_port("https://example.com:4433/path").unwrap(),
            ("example.com".to_string(), 4433)
        );
        assert_eq!(
            split_host_port("https://example.com").unwrap(),
            ("example.com".to_string(), 443)
        );
    }

    #[test]
    fn test_split_ipv6() {
        assert_eq!(split_host_port("[::1]:8443").unwrap(), ("::1".to_string(), 8443));
        assert_eq!(split_host_port("::1").unwrap(), ("::1".to_string(), 443));
    }

    #[test]
    fn test_split_rejects_garbage() {
        assert!(split_host_port("").is_err());
        assert!(split_host_port("example.com:https").is_err());
        assert!(split_host_port("[::1").is_err());
    }

    #[tokio::test]
    async fn test_parse_target_ip() {
        let target = Target::parse("93.184.216.34:443").await.unwrap();
        assert_eq!(target.hostname, "93.184.216.34");
        assert_eq!(target.port, 443);
        assert_eq!(target.ip_addresses.len(), 1);
    }

    #[test]
    fn test_from_addr_label() {
        let target = Target::from_addr("127.0.0.1:8443".parse().unwrap());
        assert_eq!(target.label(), "127.0.0.1:8443");
        assert_eq!(target.primary_ip(), Some("127.0.0.1".parse().unwrap()));

        let v6 = Target::from_addr("[::1]:443".parse().unwrap());
        assert_eq!(v6.to_string(), "[::1]:443");
    }

    #[tokio::test]
    async fn test_check_reachable_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = Target::from_addr(listener.local_addr().unwrap());

        let addr = check_reachable(&target, Duration::from_secs(2)).await.unwrap();
        assert_eq!(addr, listener.local_addr().unwrap());
    }

    #[tokio::test]
    async fn test_check_reachable_without_addresses() {
        let target = Target {
            hostname: "nowhere.invalid".to_string(),
            port: 443,
            ip_addresses: Vec::new(),
        };
        assert!(check_reachable(&target, Duration::from_millis(100)).await.is_err());
    }
}
