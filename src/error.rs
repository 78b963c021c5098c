// ABOUTME: Application-wide error types for stagehand.
// ABOUTME: Wraps configuration, I/O and promotion failures via thiserror.

use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::{PromotionError, Stage};

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no build identifier given (use --build or set BUILD_NUMBER)")]
    MissingBuildId,

    #[error("no job name given (set `job` in the config, use --job or set JOB_NAME)")]
    MissingJobName,

    #[error("HOME is not set; cannot place the run lock")]
    NoStateDir,

    #[error("promotion failed at {stage}: {reason}")]
    RunFailed { stage: Stage, reason: String },

    #[error(transparent)]
    Promotion(#[from] PromotionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
