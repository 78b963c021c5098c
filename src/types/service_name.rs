// ABOUTME: Validated name of the service expected to be running on a target.
// ABOUTME: Accepts container names and systemd unit names, nothing shell-significant.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceNameError {
    #[error("service name cannot be empty")]
    Empty,

    #[error("service name exceeds maximum length of 255 characters")]
    TooLong,

    #[error("service name must start with a letter or digit")]
    InvalidStart,

    #[error("invalid character in service name: '{0}'")]
    InvalidChar(char),
}

/// Name of a container or systemd unit.
///
/// The name ends up inside a remote shell command, so the character set is
/// restricted to `[A-Za-z0-9_.@-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(value: &str) -> Result<Self, ServiceNameError> {
        let first = value.chars().next().ok_or(ServiceNameError::Empty)?;

        if value.len() > 255 {
            return Err(ServiceNameError::TooLong);
        }

        if !first.is_ascii_alphanumeric() {
            return Err(ServiceNameError::InvalidStart);
        }

        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.' | '@') {
                return Err(ServiceNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
