// ABOUTME: Integration tests for the promotion pipeline end to end.
// ABOUTME: Success, each failure point, abort, and the production-deploy guard over all permutations.

mod support;

use std::sync::Arc;
use std::time::Duration;

use stagehand::gate::PromotionGate;
use stagehand::notify::Severity;
use stagehand::output::{Output, OutputMode};
use stagehand::pipeline::{Decision, PipelineRun, RunLock, RunStatus, Stage, Verdict};
use stagehand::types::EnvironmentId::{Production, Staging};
use support::{Answer, Harness, ScriptedApprover};

const STAGING_HOST: &str = "staging.internal";
const PROD_HOST: &str = "prod.internal";

fn quiet() -> Output {
    Output::new(OutputMode::Quiet)
}

async fn run_with(harness: &Harness, approver: std::sync::Arc<ScriptedApprover>) -> PipelineRun {
    let gate = PromotionGate::new(approver, Duration::from_secs(600));
    harness.pipeline().run(gate, &quiet()).await
}

#[tokio::test]
async fn successful_promotion_records_both_environments() {
    let harness = Harness::new();
    let approver = ScriptedApprover::new(Answer::Approve("alice"));

    let run = run_with(&harness, approver.clone()).await;

    assert_eq!(run.status, Some(RunStatus::Success));
    assert!(run.halted.is_none());
    assert_eq!(run.attempts().count(), 2);
    assert_eq!(run.health_results().count(), 2);
    assert!(run.health_results().all(|h| h.verdict == Verdict::Healthy));
    assert_eq!(harness.runner.calls(), vec![Staging, Production]);
    assert_eq!(approver.times_asked(), 1);

    let approval = run.approval.as_ref().unwrap();
    assert_eq!(approval.decision, Decision::Approved);
    assert_eq!(approval.responder.as_deref(), Some("alice"));

    let finals = harness.notifier.finals();
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].severity, Severity::Good);
    let summary = finals[0].summary.as_ref().unwrap();
    assert_eq!(summary.status, RunStatus::Success);
    let links: Vec<_> = summary.links.iter().map(|l| l.url.as_str()).collect();
    assert_eq!(links, vec!["https://staging.example.com", "https://shop.example.com"]);
}

#[tokio::test]
async fn stage_notifications_cover_each_pair_and_pending_approval() {
    let harness = Harness::new();
    run_with(&harness, ScriptedApprover::new(Answer::Approve("alice"))).await;

    let all = harness.notifier.all();
    let warnings = all.iter().filter(|n| n.severity == Severity::Warning).count();
    assert_eq!(warnings, 1, "one approval-pending notice");
    assert!(all.iter().all(|n| n.job == "shop-api" && n.build == "117"));
    assert_eq!(all.last().map(|n| n.kind), Some(stagehand::notify::NotificationKind::Final));
}

#[tokio::test]
async fn healthy_after_a_retry_counts_probes() {
    let harness = Harness::new();
    harness.http.script(STAGING_HOST, &[Some(502), Some(200)]);

    let run = run_with(&harness, ScriptedApprover::new(Answer::Approve("alice"))).await;

    assert!(run.is_success());
    let staging = run.health_results().find(|h| h.environment == Staging).unwrap();
    assert_eq!(staging.attempts, 2);
    assert_eq!(harness.http.calls(STAGING_HOST), 2);
    assert_eq!(*harness.clock.sleeps.lock(), vec![Duration::from_secs(30)]);
}

#[tokio::test]
async fn staging_unhealthy_never_reaches_the_gate() {
    let harness = Harness::new();
    harness.http.always(STAGING_HOST, Some(503));
    let approver = ScriptedApprover::new(Answer::Approve("alice"));

    let run = run_with(&harness, approver.clone()).await;

    assert_eq!(run.status, Some(RunStatus::Failure));
    assert_eq!(run.halted.as_ref().unwrap().stage, Stage::StagingVerify);
    assert_eq!(approver.times_asked(), 0);
    assert!(run.approval.is_none());
    assert_eq!(run.attempts_for(Production), 0);
    assert_eq!(harness.http.calls(STAGING_HOST), 3);
    assert_eq!(harness.http.calls(PROD_HOST), 0);

    let finals = harness.notifier.finals();
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].severity, Severity::Danger);
}

#[tokio::test]
async fn stopped_staging_service_fails_without_http_probes() {
    let harness = Harness::new();
    harness.liveness.state(Staging, "exited");

    let run = run_with(&harness, ScriptedApprover::new(Answer::Approve("alice"))).await;

    assert!(!run.is_success());
    let staging = run.health_results().next().unwrap();
    assert!(!staging.service_running);
    assert_eq!(staging.attempts, 0);
    assert_eq!(harness.http.calls(STAGING_HOST), 0);
}

#[tokio::test]
async fn staging_deploy_failure_skips_verification() {
    let harness = Harness::new();
    harness.runner.exit_with(Staging, Some(2));

    let run = run_with(&harness, ScriptedApprover::new(Answer::Approve("alice"))).await;

    assert_eq!(run.status, Some(RunStatus::Failure));
    let halt = run.halted.as_ref().unwrap();
    assert_eq!(halt.stage, Stage::StagingDeploy);
    assert!(halt.reason.contains("exit code 2"), "{}", halt.reason);
    assert_eq!(run.attempts().count(), 1);
    assert!(!run.stages[0].attempt.succeeded());
    assert_eq!(run.stages[0].attempt.exit_code, Some(2));
    assert_eq!(run.health_results().count(), 0);
    assert_eq!(harness.notifier.finals().len(), 1);
}

#[tokio::test]
async fn rejection_stops_before_production() {
    let harness = Harness::new();

    let run = run_with(&harness, ScriptedApprover::new(Answer::Reject("bob"))).await;

    assert_eq!(run.status, Some(RunStatus::Failure));
    assert_eq!(run.approval.as_ref().unwrap().decision, Decision::Rejected);
    assert_eq!(run.halted.as_ref().unwrap().stage, Stage::Approval);
    assert!(run.halted.as_ref().unwrap().reason.contains("bob"));
    assert_eq!(run.attempts_for(Production), 0);
}

#[tokio::test(start_paused = true)]
async fn approval_timeout_is_a_rejection() {
    let harness = Harness::new();

    let run = run_with(&harness, ScriptedApprover::new(Answer::Never)).await;

    let approval = run.approval.as_ref().unwrap();
    assert_eq!(approval.decision, Decision::TimedOut);
    assert!(approval.responder.is_none());
    assert_eq!(run.status, Some(RunStatus::Failure));
    assert_eq!(run.attempts_for(Production), 0);
    assert_eq!(harness.notifier.finals().len(), 1);
}

#[tokio::test]
async fn production_failure_is_not_rolled_back() {
    let harness = Harness::new();
    harness.http.always(PROD_HOST, None);

    let run = run_with(&harness, ScriptedApprover::new(Answer::Approve("alice"))).await;

    assert_eq!(run.status, Some(RunStatus::Failure));
    assert_eq!(run.halted.as_ref().unwrap().stage, Stage::ProductionVerify);
    assert_eq!(harness.runner.calls(), vec![Staging, Production]);
    let prod = run.health_results().find(|h| h.environment == Production).unwrap();
    assert_eq!(prod.http_status, None);
    assert_eq!(prod.attempts, 3);
}

#[tokio::test]
async fn abort_stops_at_the_next_boundary() {
    let harness = Harness::new();
    harness.abort.abort();

    let run = run_with(&harness, ScriptedApprover::new(Answer::Approve("alice"))).await;

    assert_eq!(run.status, Some(RunStatus::Failure));
    let halt = run.halted.as_ref().unwrap();
    assert_eq!(halt.stage, Stage::StagingDeploy);
    assert!(halt.reason.contains("aborted"));
    assert!(harness.runner.calls().is_empty());
    assert_eq!(harness.notifier.finals().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn abort_ends_a_pending_approval_at_once() {
    let harness = Harness::new();
    let abort = harness.abort.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        abort.abort();
    });

    let started = tokio::time::Instant::now();
    let run = run_with(&harness, ScriptedApprover::new(Answer::Never)).await;

    assert!(started.elapsed() < Duration::from_secs(60));
    assert_eq!(run.status, Some(RunStatus::Failure));
    let halt = run.halted.as_ref().unwrap();
    assert_eq!(halt.stage, Stage::Approval);
    assert!(halt.reason.contains("aborted"), "{}", halt.reason);
    assert!(run.approval.is_none());
    assert_eq!(run.attempts_for(Production), 0);
    assert_eq!(harness.notifier.finals().len(), 1);
}

#[tokio::test]
async fn run_whose_lock_was_taken_over_stops() {
    let harness = Harness::new();
    let dir = tempfile::tempdir().unwrap();
    let held = Arc::new(RunLock::acquire(dir.path(), "shop-api", "117", false).unwrap());
    let _forced = RunLock::acquire(dir.path(), "shop-api", "118", true).unwrap();

    let gate = PromotionGate::new(
        ScriptedApprover::new(Answer::Approve("alice")),
        Duration::from_secs(600),
    );
    let run = harness.pipeline().with_lock(held).run(gate, &quiet()).await;

    assert_eq!(run.status, Some(RunStatus::Failure));
    let halt = run.halted.as_ref().unwrap();
    assert_eq!(halt.stage, Stage::StagingDeploy);
    assert!(halt.reason.contains("taken over"), "{}", halt.reason);
    assert!(harness.runner.calls().is_empty());
}

#[tokio::test]
async fn run_holding_its_lock_promotes() {
    let harness = Harness::new();
    let dir = tempfile::tempdir().unwrap();
    let held = Arc::new(RunLock::acquire(dir.path(), "shop-api", "117", false).unwrap());

    let gate = PromotionGate::new(
        ScriptedApprover::new(Answer::Approve("alice")),
        Duration::from_secs(600),
    );
    let run = harness.pipeline().with_lock(held).run(gate, &quiet()).await;

    assert_eq!(run.status, Some(RunStatus::Success));
}

#[tokio::test(start_paused = true)]
async fn production_deploys_only_after_healthy_staging_and_approval() {
    let answers: [fn() -> Answer; 3] = [
        || Answer::Approve("alice"),
        || Answer::Reject("alice"),
        || Answer::Never,
    ];

    for staging_exit in [Some(0), Some(1), None] {
        for staging_state in ["running", "exited"] {
            for staging_status in [Some(200), Some(500), None] {
                for (i, answer) in answers.iter().enumerate() {
                    let harness = Harness::new();
                    harness.runner.exit_with(Staging, staging_exit);
                    harness.liveness.state(Staging, staging_state);
                    harness.http.always(STAGING_HOST, staging_status);

                    let run = run_with(&harness, ScriptedApprover::new(answer())).await;

                    let staging_healthy = staging_exit == Some(0)
                        && staging_state == "running"
                        && staging_status == Some(200);
                    let approved = i == 0;
                    let expected = usize::from(staging_healthy && approved);

                    assert_eq!(
                        harness.runner.calls_for(Production),
                        expected,
                        "exit={staging_exit:?} state={staging_state} status={staging_status:?} answer={i}"
                    );
                    assert_eq!(run.is_success(), staging_healthy && approved);
                    assert_eq!(harness.notifier.finals().len(), 1);
                }
            }
        }
    }
}
