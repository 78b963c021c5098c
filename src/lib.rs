// ABOUTME: Library root for stagehand - the promotion controller and its collaborators.
// ABOUTME: The CLI binary is in main.rs.

pub mod config;
pub mod error;
pub mod executor;
pub mod gate;
pub mod health;
pub mod notify;
pub mod output;
pub mod pipeline;
pub mod runtime;
pub mod ssh;
pub mod types;
