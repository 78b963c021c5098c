// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates a stagehand.yml template with both environments stubbed out.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::ServiceName;

use super::CONFIG_FILENAME;

pub fn init_config(dir: &Path, job: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let job = job.unwrap_or("my-app");
    ServiceName::new(job).map_err(|e| Error::InvalidConfig(e.to_string()))?;

    std::fs::write(&config_path, template_yaml(job))?;
    Ok(())
}

fn template_yaml(job: &str) -> String {
    format!(
        r##"job: {job}

deploy:
  program: ansible-playbook
  playbook: deploy.yml

verification:
  max_attempts: 3
  interval: 30s
  request_timeout: 10s

approval:
  timeout: 10m
  # approvers: [alice, bob]

notify:
  # Slack-compatible incoming webhook, read from the environment
  webhook: {{ env: STAGEHAND_WEBHOOK_URL, default: "" }}
  channel: "#deployments"

environments:
  staging:
    target: deploy@staging.example.com
    # bastion: jump@bastion.example.com
    inventory: inventories/staging
    health_url: http://staging.example.com:8080/health
    service: {job}
  production:
    target: deploy@prod.example.com
    # bastion: jump@bastion.example.com
    inventory: inventories/production
    health_url: http://prod.example.com:8080/health
    service: {job}
"##
    )
}
