// ABOUTME: Test support utilities.
// ABOUTME: Scriptable fakes for the remote runner, probes, clock, approver and notifier.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Once};
use std::time::Duration;

use stagehand::config::{Config, Environment};
use stagehand::executor::{LaunchError, RemoteRunner};
use stagehand::gate::{ApprovalRequest, ApprovalResponse, ApprovalSource, SourceError};
use stagehand::health::{Clock, HttpProbe, LivenessError, LivenessProbe, ProbeError};
use stagehand::notify::{Notification, NotificationKind, Notifier, NotifyContext};
use stagehand::pipeline::{AbortSignal, Collaborators, Pipeline};
use stagehand::types::{EnvironmentId, HealthUrl};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("stagehand=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const CONFIG: &str = r#"
job: shop-api
verification:
  max_attempts: 3
  interval: 30s
approval:
  timeout: 10m
environments:
  staging:
    target: deploy@staging.internal
    inventory: inventories/staging
    health_url: http://staging.internal:8080/health
    service: shop-api
    url: https://staging.example.com
  production:
    target: deploy@prod.internal
    bastion: jump.example.com
    inventory: inventories/production
    health_url: http://prod.internal/health
    service: shop-api
    url: https://shop.example.com
"#;

pub fn config() -> Config {
    Config::from_yaml(CONFIG).unwrap()
}

/// Runner returning a scripted exit code per environment (default 0).
#[derive(Default)]
pub struct FakeRunner {
    exit_codes: Mutex<HashMap<EnvironmentId, Option<i32>>>,
    calls: Mutex<Vec<EnvironmentId>>,
}

impl FakeRunner {
    pub fn exit_with(&self, env: EnvironmentId, code: Option<i32>) {
        self.exit_codes.lock().insert(env, code);
    }

    pub fn calls(&self) -> Vec<EnvironmentId> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, env: EnvironmentId) -> usize {
        self.calls.lock().iter().filter(|e| **e == env).count()
    }
}

#[async_trait]
impl RemoteRunner for FakeRunner {
    async fn run(&self, environment: &Environment) -> Result<Option<i32>, LaunchError> {
        self.calls.lock().push(environment.id);
        Ok(self
            .exit_codes
            .lock()
            .get(&environment.id)
            .copied()
            .unwrap_or(Some(0)))
    }
}

/// Liveness returning a scripted state per environment (default `running`).
#[derive(Default)]
pub struct FakeLiveness {
    states: Mutex<HashMap<EnvironmentId, String>>,
}

impl FakeLiveness {
    pub fn state(&self, env: EnvironmentId, state: &str) {
        self.states.lock().insert(env, state.to_string());
    }
}

#[async_trait]
impl LivenessProbe for FakeLiveness {
    async fn service_state(&self, env: &Environment) -> Result<String, LivenessError> {
        Ok(self
            .states
            .lock()
            .get(&env.id)
            .cloned()
            .unwrap_or_else(|| "running".to_string()))
    }
}

/// HTTP probe keyed by URL host. Scripted responses are consumed in order;
/// once exhausted the fallback status applies (default 200). `None` is a
/// transport error.
#[derive(Default)]
pub struct FakeHttp {
    scripts: Mutex<HashMap<String, VecDeque<Option<u16>>>>,
    fallback: Mutex<HashMap<String, Option<u16>>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl FakeHttp {
    pub fn script(&self, host: &str, responses: &[Option<u16>]) {
        self.scripts
            .lock()
            .insert(host.to_string(), responses.iter().copied().collect());
    }

    pub fn always(&self, host: &str, response: Option<u16>) {
        self.fallback.lock().insert(host.to_string(), response);
    }

    pub fn calls(&self, host: &str) -> u32 {
        self.calls.lock().get(host).copied().unwrap_or(0)
    }
}

#[async_trait]
impl HttpProbe for FakeHttp {
    async fn get(&self, url: &HealthUrl, _timeout: Duration) -> Result<u16, ProbeError> {
        let host = url.host().to_string();
        *self.calls.lock().entry(host.clone()).or_default() += 1;

        let scripted = self.scripts.lock().get_mut(&host).and_then(VecDeque::pop_front);
        let response = match scripted {
            Some(response) => response,
            None => self.fallback.lock().get(&host).copied().unwrap_or(Some(200)),
        };
        response.ok_or_else(|| ProbeError::Request("connection reset by peer".to_string()))
    }
}

/// Clock that returns immediately and remembers what it was asked to wait.
#[derive(Default)]
pub struct InstantClock {
    pub sleeps: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Clock for InstantClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}

/// Collects every notification.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn finals(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.kind == NotificationKind::Final)
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().push(notification);
    }
}

/// Approval source with a fixed answer, or none at all.
pub enum Answer {
    Approve(&'static str),
    Reject(&'static str),
    Never,
}

pub struct ScriptedApprover {
    answer: Answer,
    asked: Mutex<u32>,
}

impl ScriptedApprover {
    pub fn new(answer: Answer) -> Arc<Self> {
        Arc::new(Self {
            answer,
            asked: Mutex::new(0),
        })
    }

    pub fn times_asked(&self) -> u32 {
        *self.asked.lock()
    }
}

#[async_trait]
impl ApprovalSource for ScriptedApprover {
    async fn decide(&self, _request: &ApprovalRequest) -> Result<ApprovalResponse, SourceError> {
        *self.asked.lock() += 1;
        match self.answer {
            Answer::Approve(who) => Ok(ApprovalResponse {
                approved: true,
                responder: Some(who.to_string()),
            }),
            Answer::Reject(who) => Ok(ApprovalResponse {
                approved: false,
                responder: Some(who.to_string()),
            }),
            Answer::Never => std::future::pending().await,
        }
    }
}

/// A pipeline over fakes, with handles kept for inspection.
pub struct Harness {
    pub runner: Arc<FakeRunner>,
    pub liveness: Arc<FakeLiveness>,
    pub http: Arc<FakeHttp>,
    pub clock: Arc<InstantClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub abort: AbortSignal,
    pub config: Config,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        Self {
            runner: Arc::default(),
            liveness: Arc::default(),
            http: Arc::default(),
            clock: Arc::default(),
            notifier: Arc::default(),
            abort: AbortSignal::new(),
            config: config(),
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            NotifyContext::new("shop-api", "117"),
            self.config.environment(EnvironmentId::Staging),
            self.config.environment(EnvironmentId::Production),
            Collaborators {
                runner: self.runner.clone(),
                liveness: self.liveness.clone(),
                http: self.http.clone(),
                clock: self.clock.clone(),
                notifier: self.notifier.clone(),
            },
            self.abort.clone(),
        )
    }
}
