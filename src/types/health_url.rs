// ABOUTME: Validated HTTP or HTTPS health check URL.
// ABOUTME: Wraps hyper's Uri and exposes the pieces a raw HTTP/1.1 probe needs.

use hyper::Uri;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HealthUrlError {
    #[error("invalid health URL '{url}': {reason}")]
    Invalid { url: String, reason: String },

    #[error("health URL must use http:// or https:// (got '{0}')")]
    UnsupportedScheme(String),

    #[error("health URL has no host: {0}")]
    MissingHost(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthUrl(Uri);

impl HealthUrl {
    pub fn parse(s: &str) -> Result<Self, HealthUrlError> {
        let uri = s
            .trim()
            .parse::<Uri>()
            .map_err(|e| HealthUrlError::Invalid {
                url: s.to_string(),
                reason: e.to_string(),
            })?;

        match uri.scheme_str() {
            Some("http") | Some("https") => {}
            Some(other) => return Err(HealthUrlError::UnsupportedScheme(other.to_string())),
            None => return Err(HealthUrlError::UnsupportedScheme(String::new())),
        }

        if uri.host().is_none_or(str::is_empty) {
            return Err(HealthUrlError::MissingHost(s.to_string()));
        }

        Ok(Self(uri))
    }

    pub fn host(&self) -> &str {
        self.0.host().unwrap_or_default()
    }

    /// Whether the endpoint is behind TLS.
    pub fn is_tls(&self) -> bool {
        self.0.scheme_str() == Some("https")
    }

    pub fn port(&self) -> u16 {
        self.0
            .port_u16()
            .unwrap_or(if self.is_tls() { 443 } else { 80 })
    }

    /// `host:port` suitable for a TCP connect.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host(), self.port())
    }

    /// Value for the `Host` header (port omitted when it is the default).
    pub fn host_header(&self) -> String {
        match self.0.port_u16() {
            Some(port) => format!("{}:{}", self.host(), port),
            None => self.host().to_string(),
        }
    }

    pub fn path_and_query(&self) -> &str {
        self.0
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }

    pub fn as_uri(&self) -> &Uri {
        &self.0
    }
}

impl fmt::Display for HealthUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for HealthUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for HealthUrl {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        HealthUrl::parse(&s).map_err(serde::de::Error::custom)
    }
}
