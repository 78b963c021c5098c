// ABOUTME: Remote runner that shells out to a configuration-management CLI.
// ABOUTME: Builds an ansible-playbook style command line for the target environment.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use super::{LaunchError, RemoteRunner};
use crate::config::{DeployConfig, Environment};

#[derive(Debug, Clone)]
pub struct PlaybookRunner {
    program: String,
    extra_args: Vec<String>,
    build: String,
}

impl PlaybookRunner {
    pub fn new(config: &DeployConfig, build: impl Into<String>) -> Self {
        Self {
            program: config.program.clone(),
            extra_args: config.extra_args.clone(),
            build: build.into(),
        }
    }

    /// Arguments for a run against `env`, in order.
    pub fn args(&self, env: &Environment) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            env.inventory.clone(),
            env.playbook.clone(),
            "--limit".to_string(),
            env.target.host.clone(),
        ];

        if let Some(user) = &env.target.user {
            args.push("-u".to_string());
            args.push(user.clone());
        }

        if env.target.port != 22 {
            args.push("-e".to_string());
            args.push(format!("ansible_port={}", env.target.port));
        }

        if let Some(bastion) = &env.bastion {
            args.push("--ssh-common-args".to_string());
            args.push(format!("-o ProxyJump={}", bastion));
        }

        args.push("-e".to_string());
        args.push(format!("stagehand_environment={}", env.id));
        args.push("-e".to_string());
        args.push(format!("stagehand_build={}", self.build));

        args.extend(self.extra_args.iter().cloned());
        args
    }
}

#[async_trait]
impl RemoteRunner for PlaybookRunner {
    async fn run(&self, environment: &Environment) -> Result<Option<i32>, LaunchError> {
        let args = self.args(environment);
        tracing::debug!(program = %self.program, ?args, "launching remote run");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| LaunchError {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::debug!(target: "stagehand::remote", "{}", line);
        }

        if !output.status.success() {
            for line in String::from_utf8_lossy(&output.stderr).lines() {
                tracing::warn!(target: "stagehand::remote", "{}", line);
            }
        }

        Ok(output.status.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::types::EnvironmentId;

    const YAML: &str = r#"
job: shop
deploy:
  playbook: site.yml
  extra_args: ["--diff"]
environments:
  staging:
    target: deploy@10.0.1.10
    bastion: jump@bastion.example.com:2222
    inventory: inventories/staging
    health_url: http://10.0.1.10:8080/health
    service: shop
  production:
    target: 10.0.2.10:2200
    inventory: inventories/production
    playbook: prod.yml
    health_url: http://10.0.2.10:8080/health
    service: shop
"#;

    #[test]
    fn staging_args_include_user_bastion_and_build() {
        let config = Config::from_yaml(YAML).unwrap();
        let runner = PlaybookRunner::new(&config.deploy, "118");
        let args = runner.args(&config.environment(EnvironmentId::Staging));

        assert_eq!(
            args,
            vec![
                "-i",
                "inventories/staging",
                "site.yml",
                "--limit",
                "10.0.1.10",
                "-u",
                "deploy",
                "--ssh-common-args",
                "-o ProxyJump=jump@bastion.example.com:2222",
                "-e",
                "stagehand_environment=staging",
                "-e",
                "stagehand_build=118",
                "--diff",
            ]
        );
    }

    #[test]
    fn production_args_use_override_playbook_and_port() {
        let config = Config::from_yaml(YAML).unwrap();
        let runner = PlaybookRunner::new(&config.deploy, "118");
        let args = runner.args(&config.environment(EnvironmentId::Production));

        assert_eq!(args[2], "prod.yml");
        assert!(args.contains(&"ansible_port=2200".to_string()));
        assert!(!args.contains(&"-u".to_string()));
        assert!(!args.contains(&"--ssh-common-args".to_string()));
    }

    #[tokio::test]
    async fn missing_program_is_a_launch_error() {
        let config = Config::from_yaml(YAML).unwrap();
        let mut deploy = config.deploy.clone();
        deploy.program = "/nonexistent/stagehand-test-runner".to_string();
        let runner = PlaybookRunner::new(&deploy, "1");

        let err = runner
            .run(&config.environment(EnvironmentId::Staging))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/stagehand-test-runner"));
    }
}
