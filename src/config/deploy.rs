// ABOUTME: Configuration-management run settings shared by both environments.
// ABOUTME: Program, playbook and extra arguments passed to the remote runner.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default = "default_playbook")]
    pub playbook: String,

    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_program() -> String {
    "ansible-playbook".to_string()
}

fn default_playbook() -> String {
    "deploy.yml".to_string()
}

impl Default for DeployConfig {
    fn default() -> Self {
        DeployConfig {
            program: default_program(),
            playbook: default_playbook(),
            extra_args: Vec::new(),
        }
    }
}
