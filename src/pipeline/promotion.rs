// ABOUTME: Promotion struct parameterized by state marker, and its transitions.
// ABOUTME: Production deploy is only reachable through verified staging and an approval.

use std::sync::Arc;

use super::abort::AbortSignal;
use super::error::PromotionError;
use super::lock::RunLock;
use super::model::{Decision, Halt, PipelineRun, RunStatus, Stage};
use super::state::{
    Approved, Pending, ProductionDeployed, Promoted, StagingDeployed, StagingVerified,
};
use crate::config::Environment;
use crate::executor::{DeploymentExecutor, RemoteRunner};
use crate::gate::{ApprovalRequest, PromotionGate};
use crate::health::{Clock, HealthVerifier, HttpProbe, LivenessProbe};
use crate::notify::{Notifier, NotifyContext, Severity};

/// External systems a pipeline talks to.
pub struct Collaborators {
    pub runner: Arc<dyn RemoteRunner>,
    pub liveness: Arc<dyn LivenessProbe>,
    pub http: Arc<dyn HttpProbe>,
    pub clock: Arc<dyn Clock>,
    pub notifier: Arc<dyn Notifier>,
}

/// Everything a promotion run needs, fixed for its duration.
pub struct Pipeline {
    pub(crate) staging: Environment,
    pub(crate) production: Environment,
    pub(crate) context: NotifyContext,
    pub(crate) executor: DeploymentExecutor,
    pub(crate) verifier: HealthVerifier,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) abort: AbortSignal,
    pub(crate) lock: Option<Arc<RunLock>>,
}

impl Pipeline {
    pub fn new(
        context: NotifyContext,
        staging: Environment,
        production: Environment,
        collaborators: Collaborators,
        abort: AbortSignal,
    ) -> Self {
        let Collaborators {
            runner,
            liveness,
            http,
            clock,
            notifier,
        } = collaborators;

        Self {
            staging,
            production,
            executor: DeploymentExecutor::new(runner, notifier.clone(), context.clone()),
            verifier: HealthVerifier::new(liveness, http, clock),
            context,
            notifier,
            abort,
            lock: None,
        }
    }

    /// Stop at the next stage boundary if `lock` stops being ours.
    pub fn with_lock(mut self, lock: Arc<RunLock>) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Begin a new run.
    pub fn start(&self) -> Promotion<'_, Pending> {
        Promotion {
            pipeline: self,
            run: PipelineRun::new(&self.context.job, &self.context.build),
            _state: Pending,
        }
    }

    pub fn staging(&self) -> &Environment {
        &self.staging
    }

    pub fn production(&self) -> &Environment {
        &self.production
    }
}

/// A promotion in progress, parameterized by its current state.
pub struct Promotion<'a, S> {
    pipeline: &'a Pipeline,
    run: PipelineRun,
    _state: S,
}

/// A run that stopped before reaching production health.
#[derive(Debug)]
pub struct Halted {
    pub run: PipelineRun,
    pub stage: Stage,
    pub error: PromotionError,
}

impl Halted {
    /// Close the run as a failure at the halting stage.
    pub fn into_run(self) -> PipelineRun {
        let mut run = self.run;
        run.finish(
            RunStatus::Failure,
            Some(Halt {
                stage: self.stage,
                reason: self.error.to_string(),
            }),
        );
        run
    }
}

/// Result of a transition: the next state, or the halted run.
pub type TransitionResult<'a, T> = Result<Promotion<'a, T>, Halted>;

// =============================================================================
// Internal Helpers
// =============================================================================

impl<'a, S> Promotion<'a, S> {
    /// Record of the run so far.
    pub fn run(&self) -> &PipelineRun {
        &self.run
    }

    fn advance<T>(self, state: T) -> Promotion<'a, T> {
        Promotion {
            pipeline: self.pipeline,
            run: self.run,
            _state: state,
        }
    }

    fn halt(self, stage: Stage, error: PromotionError) -> Halted {
        tracing::error!(%stage, "{}", error);
        Halted {
            run: self.run,
            stage,
            error,
        }
    }

    /// Why the run must not start `stage`, if anything.
    fn interruption(&self, stage: Stage) -> Option<PromotionError> {
        let pipeline = self.pipeline;
        if let Some(lock) = &pipeline.lock
            && !lock.still_ours()
        {
            return Some(PromotionError::Superseded { stage });
        }
        if pipeline.abort.is_aborted() {
            return Some(PromotionError::Aborted { stage });
        }
        None
    }

    /// Stop here if the operator asked to abort or another run took the lock.
    fn checkpoint(self, stage: Stage) -> Result<Self, Halted> {
        match self.interruption(stage) {
            Some(error) => Err(self.halt(stage, error)),
            None => Ok(self),
        }
    }

    async fn deploy_to(self, env: &Environment, stage: Stage) -> Result<Self, Halted> {
        let mut this = self.checkpoint(stage)?;
        let pipeline = this.pipeline;
        match pipeline.executor.deploy(env).await {
            Ok(attempt) => {
                this.run.record_attempt(attempt);
                Ok(this)
            }
            Err((attempt, error)) => {
                this.run.record_attempt(attempt);
                Err(this.halt(stage, error))
            }
        }
    }

    async fn verify(self, env: &Environment, stage: Stage) -> Result<Self, Halted> {
        let mut this = self.checkpoint(stage)?;
        let pipeline = this.pipeline;
        let result = pipeline.verifier.verify(env).await;
        this.run.record_health(result.clone());

        let ctx = &pipeline.context;
        if result.is_healthy() {
            tracing::info!(environment = %env.id, attempts = result.attempts, "environment is healthy");
            pipeline.notifier.notify(ctx.stage(
                Severity::Good,
                Some(env.id),
                format!(
                    "{} build {} is healthy on {} ({} probe(s))",
                    ctx.job, ctx.build, env.id, result.attempts
                ),
            ));
            return Ok(this);
        }

        let error = PromotionError::VerificationFailure {
            environment: env.id,
            service_running: result.service_running,
            attempts: result.attempts,
            last_status: result.http_status,
        };
        pipeline
            .notifier
            .notify(ctx.stage(Severity::Danger, Some(env.id), error.to_string()));
        Err(this.halt(stage, error))
    }
}

// =============================================================================
// Pending -> StagingDeployed -> StagingVerified
// =============================================================================

impl<'a> Promotion<'a, Pending> {
    #[must_use = "promotion state must be used"]
    pub async fn deploy_staging(self) -> TransitionResult<'a, StagingDeployed> {
        let pipeline = self.pipeline;
        let staging = &pipeline.staging;
        let this = self.deploy_to(staging, Stage::StagingDeploy).await?;
        Ok(this.advance(StagingDeployed))
    }
}

impl<'a> Promotion<'a, StagingDeployed> {
    #[must_use = "promotion state must be used"]
    pub async fn verify_staging(self) -> TransitionResult<'a, StagingVerified> {
        let pipeline = self.pipeline;
        let staging = &pipeline.staging;
        let this = self.verify(staging, Stage::StagingVerify).await?;
        Ok(this.advance(StagingVerified))
    }
}

// =============================================================================
// StagingVerified -> Approved
// =============================================================================

impl<'a> Promotion<'a, StagingVerified> {
    /// Ask the gate for the run's single promotion decision.
    #[must_use = "promotion state must be used"]
    pub async fn request_approval(self, gate: PromotionGate) -> TransitionResult<'a, Approved> {
        let mut this = self.checkpoint(Stage::Approval)?;
        let pipeline = this.pipeline;
        let ctx = &pipeline.context;

        pipeline.notifier.notify(ctx.stage(
            Severity::Warning,
            None,
            format!(
                "{} build {} is waiting for approval to promote to production",
                ctx.job, ctx.build
            ),
        ));

        let request = ApprovalRequest {
            job: ctx.job.clone(),
            build: ctx.build.clone(),
            staging_link: pipeline.staging.link.clone(),
        };
        let timeout = gate.timeout();
        let decision = tokio::select! {
            decision = gate.request_approval(&request) => decision,
            () = pipeline.abort.aborted() => {
                let error = this
                    .interruption(Stage::Approval)
                    .unwrap_or(PromotionError::Aborted { stage: Stage::Approval });
                return Err(this.halt(Stage::Approval, error));
            }
        };
        let responder = decision.responder.clone();
        let outcome = decision.decision;
        this.run.approval = Some(decision);

        match outcome {
            Decision::Approved => {
                tracing::info!(responder = responder.as_deref().unwrap_or("unknown"), "promotion approved");
                Ok(this.advance(Approved))
            }
            Decision::Rejected => {
                Err(this.halt(Stage::Approval, PromotionError::ApprovalRejected { responder }))
            }
            Decision::TimedOut => {
                Err(this.halt(Stage::Approval, PromotionError::ApprovalTimeout { timeout }))
            }
        }
    }
}

// =============================================================================
// Approved -> ProductionDeployed -> Promoted
// =============================================================================

impl<'a> Promotion<'a, Approved> {
    #[must_use = "promotion state must be used"]
    pub async fn deploy_production(self) -> TransitionResult<'a, ProductionDeployed> {
        let pipeline = self.pipeline;
        let production = &pipeline.production;
        let this = self.deploy_to(production, Stage::ProductionDeploy).await?;
        Ok(this.advance(ProductionDeployed))
    }
}

impl<'a> Promotion<'a, ProductionDeployed> {
    #[must_use = "promotion state must be used"]
    pub async fn verify_production(self) -> TransitionResult<'a, Promoted> {
        let pipeline = self.pipeline;
        let production = &pipeline.production;
        let this = self.verify(production, Stage::ProductionVerify).await?;
        Ok(this.advance(Promoted))
    }
}

impl Promotion<'_, Promoted> {
    /// Close the run as a success.
    pub fn finish(self) -> PipelineRun {
        let mut run = self.run;
        run.finish(RunStatus::Success, None);
        run
    }
}
