//! Resolved backend endpoint.

use std::fmt;

use url::Url;

use crate::error::{GatewayError, GatewayResult};

/// Concrete address of one backend replica at a point in time.
///
/// Identity is the normalized absolute URL, so `http://h:80` and
/// `http://h/` are the same endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    address: Url,
}

impl Endpoint {
    /// Parse an absolute listener address such as `http://10.0.0.5:8080/`.
    pub fn parse(address: &str) -> GatewayResult<Self> {
        let url = Url::parse(address).map_err(|e| {
            GatewayError::InvalidArgument(format!("invalid endpoint address {address:?}: {e}"))
        })?;
        Self::from_url(url)
    }

    pub fn from_url(address: Url) -> GatewayResult<Self> {
        if address.host_str().is_none() {
            return Err(GatewayError::InvalidArgument(format!(
                "endpoint address {address} has no host"
            )));
        }
        if address.port_or_known_default().is_none() {
            return Err(GatewayError::InvalidArgument(format!(
                "endpoint address {address} has no port"
            )));
        }
        Ok(Self { address })
    }

    pub fn scheme(&self) -> &str {
        self.address.scheme()
    }

    /// Host as it appears in a URL authority (IPv6 hosts keep brackets).
    pub fn host(&self) -> &str {
        self.address.host_str().unwrap_or_default()
    }

    pub fn port(&self) -> u16 {
        self.address.port_or_known_default().unwrap_or(80)
    }

    /// Path prefix the backend listener is mounted under.
    pub fn path_prefix(&self) -> &str {
        self.address.path()
    }

    /// `host:port`, always with an explicit port.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host(), self.port())
    }

    /// Identity used as the client cache key.
    pub fn identity(&self) -> &str {
        self.address.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.address
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.address.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts() {
        let endpoint = Endpoint::parse("http://10.0.0.5:8080").unwrap();
        assert_eq!(endpoint.scheme(), "http");
        assert_eq!(endpoint.host(), "10.0.0.5");
        assert_eq!(endpoint.port(), 8080);
        assert_eq!(endpoint.path_prefix(), "/");
        assert_eq!(endpoint.authority(), "10.0.0.5:8080");
    }

    #[test]
    fn test_default_port_and_identity() {
        let a = Endpoint::parse("http://backend:80").unwrap();
        let b = Endpoint::parse("http://backend/").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.identity(), b.identity());
        assert_eq!(a.authority(), "backend:80");
    }

    #[test]
    fn test_ipv6_authority() {
        let endpoint = Endpoint::parse("http://[::1]:9000/svc").unwrap();
        assert_eq!(endpoint.authority(), "[::1]:9000");
        assert_eq!(endpoint.path_prefix(), "/svc");
    }

    #[test]
    fn test_rejects_relative_and_hostless() {
        assert!(Endpoint::parse("/relative").is_err());
        assert!(Endpoint::parse("unix:/tmp/socket").is_err());
    }
}
