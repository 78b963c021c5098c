// ABOUTME: Shared helpers for building a command's collaborators from config.
// ABOUTME: Config discovery, job/build resolution, notifier and probe wiring.

use std::path::Path;
use std::sync::Arc;

use stagehand::config::Config;
use stagehand::error::{Error, Result};
use stagehand::executor::PlaybookRunner;
use stagehand::health::{EndpointProbe, HealthVerifier, SshLiveness, TokioClock};
use stagehand::notify::{LogNotifier, Notifier, WebhookNotifier};
use stagehand::pipeline::Collaborators;

/// Load the config from `path`, or discover it in the current directory.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::discover(&std::env::current_dir()?),
    }
}

/// Job name: command line (or `$JOB_NAME`) first, then the config file.
pub fn resolve_job(cli: Option<String>, config: &Config) -> Result<String> {
    cli.or_else(|| config.job.clone())
        .filter(|job| !job.trim().is_empty())
        .ok_or(Error::MissingJobName)
}

pub fn resolve_build(cli: Option<String>) -> Result<String> {
    cli.filter(|build| !build.trim().is_empty())
        .ok_or(Error::MissingBuildId)
}

/// Webhook notifier when a URL resolves, otherwise the log.
pub fn notifier(config: &Config) -> Arc<dyn Notifier> {
    match config.notify.webhook_url() {
        Some(url) => Arc::new(WebhookNotifier::new(url, config.notify.channel.clone())),
        None => {
            tracing::debug!("no webhook configured; notifications go to the log");
            Arc::new(LogNotifier)
        }
    }
}

pub fn verifier(config: &Config) -> HealthVerifier {
    HealthVerifier::new(
        Arc::new(SshLiveness::new(config.ssh.clone())),
        Arc::new(EndpointProbe::new()),
        Arc::new(TokioClock),
    )
}

pub fn collaborators(config: &Config, build: &str, notifier: Arc<dyn Notifier>) -> Collaborators {
    Collaborators {
        runner: Arc::new(PlaybookRunner::new(&config.deploy, build)),
        liveness: Arc::new(SshLiveness::new(config.ssh.clone())),
        http: Arc::new(EndpointProbe::new()),
        clock: Arc::new(TokioClock),
        notifier,
    }
}
