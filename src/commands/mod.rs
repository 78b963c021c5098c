// ABOUTME: Command module aggregator for the stagehand CLI.
// ABOUTME: Re-exports check, run, deploy and verify command handlers.

mod check;
mod deploy;
mod run;
mod setup;
mod verify;

pub use check::check;
pub use deploy::deploy;
pub use run::{RunOptions, run};
pub use setup::{load_config, resolve_build, resolve_job};
pub use verify::verify;
