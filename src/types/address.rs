// ABOUTME: Remote host address for deployment targets and bastion hosts.
// ABOUTME: Parses formats like "host", "user@host", "host:port", "user@host:port".

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const DEFAULT_SSH_PORT: u16 = 22;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address cannot be empty")]
    Empty,

    #[error("hostname cannot be empty")]
    EmptyHost,

    #[error("user cannot be empty")]
    EmptyUser,

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("invalid character in address: '{0}'")]
    InvalidChar(char),
}

/// An SSH-reachable host: `[user@]host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteAddress {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
}

impl RemoteAddress {
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AddressError::Empty);
        }

        let (user, rest) = match s.split_once('@') {
            Some((user, rest)) => {
                if user.is_empty() {
                    return Err(AddressError::EmptyUser);
                }
                (Some(user), rest)
            }
            None => (None, s),
        };

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port_str)) => {
                let port = port_str
                    .parse::<u16>()
                    .map_err(|_| AddressError::InvalidPort(port_str.to_string()))?;
                (host, port)
            }
            None => (rest, DEFAULT_SSH_PORT),
        };

        if host.is_empty() {
            return Err(AddressError::EmptyHost);
        }

        for c in host.chars().chain(user.unwrap_or_default().chars()) {
            if !c.is_ascii_alphanumeric() && !matches!(c, '.' | '-' | '_') {
                return Err(AddressError::InvalidChar(c));
            }
        }

        Ok(Self {
            host: host.to_string(),
            port,
            user: user.map(str::to_string),
        })
    }

    /// User to log in as, falling back to `$USER` and then `root`.
    pub fn login_user(&self) -> String {
        self.user
            .clone()
            .unwrap_or_else(|| std::env::var("USER").unwrap_or_else(|_| "root".to_string()))
    }
}

impl fmt::Display for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        write!(f, "{}", self.host)?;
        if self.port != DEFAULT_SSH_PORT {
            write!(f, ":{}", self.port)?;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AddressEntry {
    Simple(String),
    Detailed {
        host: String,
        #[serde(default = "default_port")]
        port: u16,
        #[serde(default)]
        user: Option<String>,
    },
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

impl<'de> Deserialize<'de> for RemoteAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match AddressEntry::deserialize(deserializer)? {
            AddressEntry::Simple(s) => RemoteAddress::parse(&s).map_err(serde::de::Error::custom),
            AddressEntry::Detailed { host, port, user } => {
                let user_part = user.map(|u| format!("{u}@")).unwrap_or_default();
                RemoteAddress::parse(&format!("{user_part}{host}:{port}"))
                    .map_err(serde::de::Error::custom)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_omits_default_port() {
        let addr = RemoteAddress::parse("deploy@web1").unwrap();
        assert_eq!(addr.to_string(), "deploy@web1");
    }

    #[test]
    fn display_keeps_custom_port() {
        let addr = RemoteAddress::parse("bastion.example.com:2222").unwrap();
        assert_eq!(addr.to_string(), "bastion.example.com:2222");
    }

    #[test]
    fn rejects_shell_characters() {
        assert_eq!(
            RemoteAddress::parse("web1;reboot"),
            Err(AddressError::InvalidChar(';'))
        );
    }

    #[test]
    fn rejects_empty_user() {
        assert_eq!(RemoteAddress::parse("@web1"), Err(AddressError::EmptyUser));
    }
}
