// ABOUTME: Check command implementation.
// ABOUTME: Prints the resolved environments and flags settings that will not work at run time.

use stagehand::config::Config;
use stagehand::error::Result;
use stagehand::output::Output;
use stagehand::types::EnvironmentId;

pub fn check(config: &Config, output: &Output) -> Result<()> {
    if let Some(job) = &config.job {
        output.progress(&format!("Job: {job}"));
    }

    for id in EnvironmentId::ALL {
        let env = config.environment(id);
        output.record(&env);
        output.progress(&format!("{}:", env.id));
        output.progress(&format!("  target:   {}", env.target));
        if let Some(bastion) = &env.bastion {
            output.progress(&format!("  bastion:  {bastion}"));
        }
        output.progress(&format!("  playbook: {} (inventory {})", env.playbook, env.inventory));
        output.progress(&format!("  health:   {}", env.health_url));
        output.progress(&format!(
            "  service:  {} ({:?})",
            env.service.as_str(),
            env.liveness
        ));
        output.progress(&format!(
            "  verify:   {} attempt(s), {}s apart, {}s per probe",
            env.verification.max_attempts,
            env.verification.interval.as_secs(),
            env.verification.request_timeout.as_secs()
        ));
    }

    if let Some(webhook) = &config.notify.webhook
        && let Err(e) = webhook.resolve()
    {
        output.warning(&format!("notifications will only be logged: {e}"));
    }

    output.success("Configuration is valid");
    Ok(())
}
