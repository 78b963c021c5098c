// ABOUTME: Promotion pipeline: typed stage transitions, run records and run exclusivity.
// ABOUTME: Exports the state markers, Pipeline/Promotion, data model, errors and the run lock.

mod abort;
mod controller;
mod error;
mod lock;
mod model;
mod promotion;
mod state;

pub use abort::AbortSignal;
pub use error::PromotionError;
pub use lock::{HEARTBEAT_INTERVAL, LockInfo, RunLock};
pub use model::{
    ApprovalDecision, AttemptState, Decision, DeploymentAttempt, Halt, HealthCheckResult,
    PipelineRun, RunStatus, Stage, StageRecord, Verdict,
};
pub use promotion::{Collaborators, Halted, Pipeline, Promotion, TransitionResult};
pub use state::{Approved, Pending, ProductionDeployed, Promoted, StagingDeployed, StagingVerified};
