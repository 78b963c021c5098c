// ABOUTME: Verify command implementation.
// ABOUTME: Runs the health verifier once against a single environment.

use super::setup;
use stagehand::config::Config;
use stagehand::error::Result;
use stagehand::output::Output;
use stagehand::pipeline::PromotionError;
use stagehand::types::EnvironmentId;

pub async fn verify(config: Config, id: EnvironmentId, mut output: Output) -> Result<()> {
    output.start_timer();
    let env = config.environment(id);
    let verifier = setup::verifier(&config);

    output.progress(&format!(
        "Verifying {} ({} on {}, {})",
        env.id,
        env.service.as_str(),
        env.target,
        env.health_url
    ));
    let result = verifier.verify(&env).await;
    output.record(&result);

    if result.is_healthy() {
        output.success(&format!("{} is healthy", env.id));
        return Ok(());
    }

    Err(PromotionError::VerificationFailure {
        environment: env.id,
        service_running: result.service_running,
        attempts: result.attempts,
        last_status: result.http_status,
    }
    .into())
}
