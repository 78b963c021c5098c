// ABOUTME: Run command implementation.
// ABOUTME: Takes the run lock, drives the promotion pipeline and reports the outcome.

use std::sync::Arc;
use std::time::Duration;

use super::setup;
use crate::cli::ApproveMode;
use stagehand::config::Config;
use stagehand::error::{Error, Result};
use stagehand::gate::{ApprovalSource, AutoApprover, FileApprover, PromotionGate, TerminalApprover};
use stagehand::notify::{Notifier, NotifyContext};
use stagehand::output::Output;
use stagehand::pipeline::{AbortSignal, Pipeline, RunLock};
use stagehand::types::EnvironmentId;

/// Bound on waiting for notification delivery before exit.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RunOptions {
    pub job: String,
    pub build: String,
    pub approve: ApproveMode,
    pub force: bool,
}

fn approval_source(mode: &ApproveMode) -> Arc<dyn ApprovalSource> {
    match mode {
        ApproveMode::Auto => Arc::new(AutoApprover),
        ApproveMode::Terminal => Arc::new(TerminalApprover::new()),
        ApproveMode::File(path) => Arc::new(FileApprover::new(path)),
    }
}

pub async fn run(
    config: Config,
    options: RunOptions,
    abort: AbortSignal,
    mut output: Output,
) -> Result<()> {
    output.start_timer();

    let lock_dir = RunLock::default_dir().ok_or(Error::NoStateDir)?;
    let lock = Arc::new(RunLock::acquire(
        &lock_dir,
        &options.job,
        &options.build,
        options.force,
    )?);
    let heartbeat = lock.keep_alive(abort.clone());

    let notifier: Arc<dyn Notifier> = setup::notifier(&config);
    let pipeline = Pipeline::new(
        NotifyContext::new(&options.job, &options.build),
        config.environment(EnvironmentId::Staging),
        config.environment(EnvironmentId::Production),
        setup::collaborators(&config, &options.build, notifier.clone()),
        abort,
    )
    .with_lock(lock.clone());

    let gate = PromotionGate::new(approval_source(&options.approve), config.approval.timeout)
        .with_approvers(config.approval.approvers.clone());

    let run = pipeline.run(gate, &output).await;
    heartbeat.abort();
    lock.release();
    notifier.flush(FLUSH_TIMEOUT).await;

    output.record(&run);
    match run.halted {
        None => {
            output.success(&format!(
                "Promoted {} build {} to production",
                options.job, options.build
            ));
            Ok(())
        }
        Some(halt) => Err(Error::RunFailed {
            stage: halt.stage,
            reason: halt.reason,
        }),
    }
}
