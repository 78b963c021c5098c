// ABOUTME: Per-environment target settings and the resolved Environment record.
// ABOUTME: Defaults and overrides are applied once, when the record is built.

use serde::{Deserialize, Serialize};

use super::{VerificationConfig, VerificationOverride};
use crate::runtime::RuntimeType;
use crate::types::{EnvironmentId, HealthUrl, RemoteAddress, ServiceName};

/// How the verifier checks that the service is up on the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LivenessKind {
    /// A docker/podman container, checked via `inspect`.
    #[default]
    Container,
    /// A systemd unit, checked via its sub-state.
    Systemd,
}

/// Environment section as written in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    pub target: RemoteAddress,

    #[serde(default)]
    pub bastion: Option<RemoteAddress>,

    pub inventory: String,

    #[serde(default)]
    pub playbook: Option<String>,

    pub health_url: HealthUrl,

    #[serde(deserialize_with = "deserialize_service_name")]
    pub service: ServiceName,

    #[serde(default)]
    pub liveness: LivenessKind,

    #[serde(default)]
    pub runtime: Option<RuntimeType>,

    /// Public link shown in notifications. Defaults to the health URL.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub verification: Option<VerificationOverride>,
}

/// A fully resolved rollout target. Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize)]
pub struct Environment {
    pub id: EnvironmentId,
    pub target: RemoteAddress,
    pub bastion: Option<RemoteAddress>,
    pub inventory: String,
    pub playbook: String,
    pub health_url: HealthUrl,
    #[serde(serialize_with = "serialize_service_name")]
    pub service: ServiceName,
    pub liveness: LivenessKind,
    pub runtime: Option<RuntimeType>,
    pub link: String,
    pub verification: VerificationConfig,
}

impl Environment {
    pub fn resolve(
        id: EnvironmentId,
        raw: &EnvironmentConfig,
        default_playbook: &str,
        verification: &VerificationConfig,
    ) -> Environment {
        Environment {
            id,
            target: raw.target.clone(),
            bastion: raw.bastion.clone(),
            inventory: raw.inventory.clone(),
            playbook: raw
                .playbook
                .clone()
                .unwrap_or_else(|| default_playbook.to_string()),
            health_url: raw.health_url.clone(),
            service: raw.service.clone(),
            liveness: raw.liveness,
            runtime: raw.runtime,
            link: raw
                .url
                .clone()
                .unwrap_or_else(|| raw.health_url.to_string()),
            verification: verification.merged(raw.verification.as_ref()),
        }
    }
}

fn deserialize_service_name<'de, D>(deserializer: D) -> Result<ServiceName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ServiceName::new(&s).map_err(serde::de::Error::custom)
}

fn serialize_service_name<S>(name: &ServiceName, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(name.as_str())
}
