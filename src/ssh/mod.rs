// ABOUTME: SSH client module for remote liveness queries.
// ABOUTME: Supports SSH agent and key-based auth, known_hosts checks and bastion hops.

mod client;
mod error;

pub use client::{CommandOutput, Session, SessionConfig};
pub use error::{Error, Result};
