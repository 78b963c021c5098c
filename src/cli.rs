// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands, global flags and the approval mode parser.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use stagehand::types::EnvironmentId;

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(about = "Promote a build from staging to production: deploy, verify, approve, promote")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file (default: discover stagehand.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines for scripting
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a stagehand.yml template in the current directory
    Init {
        /// Job name to put in the template
        #[arg(long)]
        job: Option<String>,

        /// Overwrite an existing stagehand.yml
        #[arg(short, long)]
        force: bool,
    },

    /// Load and validate the configuration, then print the resolved environments
    Check,

    /// Deploy to staging, verify, wait for approval, then deploy and verify production
    Run {
        /// Build identifier to promote
        #[arg(short, long, env = "BUILD_NUMBER")]
        build: Option<String>,

        /// Job name (overrides the config file)
        #[arg(short, long, env = "JOB_NAME")]
        job: Option<String>,

        /// Where the promotion decision comes from: auto, terminal or file:PATH
        #[arg(long, default_value = "terminal")]
        approve: ApproveMode,

        /// Break an existing run lock for this job
        #[arg(long)]
        force: bool,
    },

    /// Deploy one build to a single environment
    Deploy {
        /// Target environment (staging or production)
        environment: EnvironmentId,

        /// Build identifier to deploy
        #[arg(short, long, env = "BUILD_NUMBER")]
        build: Option<String>,

        /// Job name (overrides the config file)
        #[arg(short, long, env = "JOB_NAME")]
        job: Option<String>,
    },

    /// Verify the health of a single environment
    Verify {
        /// Environment to verify (staging or production)
        environment: EnvironmentId,
    },
}

/// Source of the promotion decision for `run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApproveMode {
    Auto,
    Terminal,
    File(PathBuf),
}

impl FromStr for ApproveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ApproveMode::Auto),
            "terminal" => Ok(ApproveMode::Terminal),
            _ => match s.strip_prefix("file:") {
                Some(path) if !path.is_empty() => Ok(ApproveMode::File(PathBuf::from(path))),
                _ => Err(format!(
                    "invalid approval mode '{s}' (expected auto, terminal or file:PATH)"
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_approve_modes() {
        assert_eq!("auto".parse::<ApproveMode>(), Ok(ApproveMode::Auto));
        assert_eq!(
            "file:/tmp/decision".parse::<ApproveMode>(),
            Ok(ApproveMode::File(PathBuf::from("/tmp/decision")))
        );
        assert!("file:".parse::<ApproveMode>().is_err());
        assert!("slack".parse::<ApproveMode>().is_err());
    }

    #[test]
    fn run_accepts_environment_aliases_and_flags() {
        let cli = Cli::try_parse_from([
            "stagehand", "--json", "run", "--build", "117", "--approve", "auto",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Run { build, approve, .. } => {
                assert_eq!(build.as_deref(), Some("117"));
                assert_eq!(approve, ApproveMode::Auto);
            }
            _ => panic!("expected run"),
        }

        let cli = Cli::try_parse_from(["stagehand", "verify", "prod"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Verify {
                environment: EnvironmentId::Production
            }
        ));
    }

    #[test]
    fn quiet_conflicts_with_json() {
        assert!(Cli::try_parse_from(["stagehand", "-q", "--json", "check"]).is_err());
    }
}
