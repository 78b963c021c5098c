// ABOUTME: Drives a promotion run from staging deploy to production health.
// ABOUTME: Turns the typed transitions into a finished PipelineRun plus one final notification.

use super::model::PipelineRun;
use super::promotion::{Halted, Pipeline};
use crate::gate::PromotionGate;
use crate::output::Output;

impl Pipeline {
    /// Run every stage in order, stopping at the first failure.
    ///
    /// Always returns a finished run and always emits exactly one final
    /// notification, whatever the outcome.
    pub async fn run(&self, gate: PromotionGate, output: &Output) -> PipelineRun {
        let run = match self.promote(gate, output).await {
            Ok(run) => run,
            Err(halted) => halted.into_run(),
        };

        self.notifier
            .notify(self.context.final_for(&run, &[&self.staging, &self.production]));
        run
    }

    async fn promote(&self, gate: PromotionGate, output: &Output) -> Result<PipelineRun, Halted> {
        let ctx = &self.context;
        output.progress(&format!(
            "Promoting {} build {} via {}",
            ctx.job, ctx.build, self.staging.target
        ));

        output.progress("  → Deploying to staging...");
        let promotion = self.start().deploy_staging().await?;

        output.progress("  → Verifying staging...");
        let promotion = promotion.verify_staging().await?;

        output.progress(&format!(
            "  → Waiting for approval (up to {}s)...",
            gate.timeout().as_secs()
        ));
        let promotion = promotion.request_approval(gate).await?;

        output.progress("  → Deploying to production...");
        let promotion = promotion.deploy_production().await?;

        output.progress("  → Verifying production...");
        let promotion = promotion.verify_production().await?;

        Ok(promotion.finish())
    }
}
