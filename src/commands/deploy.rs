// ABOUTME: Deploy command implementation.
// ABOUTME: One operator-initiated deployment to a single environment, no verification.

use std::sync::Arc;
use std::time::Duration;

use super::setup;
use stagehand::config::Config;
use stagehand::error::Result;
use stagehand::executor::{DeploymentExecutor, PlaybookRunner};
use stagehand::notify::NotifyContext;
use stagehand::output::Output;
use stagehand::types::EnvironmentId;

pub async fn deploy(
    config: Config,
    id: EnvironmentId,
    job: String,
    build: String,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let env = config.environment(id);
    let notifier = setup::notifier(&config);
    let executor = DeploymentExecutor::new(
        Arc::new(PlaybookRunner::new(&config.deploy, &build)),
        notifier.clone(),
        NotifyContext::new(&job, &build),
    );

    output.progress(&format!(
        "Deploying {} build {} to {} ({})",
        job, build, env.id, env.target
    ));
    let result = executor.deploy(&env).await;
    notifier.flush(Duration::from_secs(10)).await;

    match result {
        Ok(attempt) => {
            output.record(&attempt);
            output.success(&format!("Deployed build {} to {}", build, env.id));
            Ok(())
        }
        Err((attempt, error)) => {
            output.record(&attempt);
            Err(error.into())
        }
    }
}
