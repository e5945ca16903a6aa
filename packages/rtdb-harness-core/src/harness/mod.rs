//! Scenario runner.
//!
//! Every scenario walks `Setup -> Exercise -> Assert -> Teardown`. The first
//! three phases share one timeout; teardown always runs afterwards with its
//! own timeout, whatever happened before it. Scenario state lives in the
//! scenario's context value, created fresh for each run and dropped after
//! teardown.
//!
//! A [`Suite`] may carry a timeout override. The override applies only to
//! that suite's scenarios; the harness default is never modified.

pub mod assertions;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::{HarnessError, HarnessResult};
use crate::store::RealtimeStore;

pub use assertions::{expect_absent, expect_cardinality, expect_count, expect_keys};

/// Default per-scenario timeout.
pub const DEFAULT_SCENARIO_TIMEOUT: Duration = Duration::from_secs(5);

/// Scenario lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Exercise,
    Assert,
    Teardown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Setup => "setup",
            Phase::Exercise => "exercise",
            Phase::Assert => "assert",
            Phase::Teardown => "teardown",
        };
        f.write_str(name)
    }
}

/// One verification scenario.
#[async_trait]
pub trait Scenario: Send + Sync {
    /// State carried between phases.
    type Context: Send;

    fn name(&self) -> &str;

    /// Fresh context for one run.
    fn context(&self) -> Self::Context;

    async fn setup(&self, store: &dyn RealtimeStore, ctx: &mut Self::Context)
        -> HarnessResult<()>;

    async fn exercise(
        &self,
        store: &dyn RealtimeStore,
        ctx: &mut Self::Context,
    ) -> HarnessResult<()>;

    async fn assert(&self, store: &dyn RealtimeStore, ctx: &mut Self::Context)
        -> HarnessResult<()>;

    /// Runs after every other phase, even when one of them failed.
    async fn teardown(
        &self,
        store: &dyn RealtimeStore,
        ctx: &mut Self::Context,
    ) -> HarnessResult<()>;
}

/// How a scenario ended.
#[derive(Debug, Clone)]
pub enum Outcome {
    Passed,
    Failed { phase: Phase, error: HarnessError },
    Skipped { reason: String },
}

/// Result of one scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub outcome: Outcome,
    /// Set when teardown failed, even if an earlier phase already had
    pub teardown_error: Option<HarnessError>,
    pub elapsed: Duration,
}

impl ScenarioReport {
    fn skipped(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            outcome: Outcome::Skipped {
                reason: reason.to_string(),
            },
            teardown_error: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Passed)
    }

    /// The failure that ended the scenario, if any.
    pub fn error(&self) -> Option<&HarnessError> {
        match &self.outcome {
            Outcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// True if the failure should abort the remaining run.
    pub fn is_fatal(&self) -> bool {
        self.error().is_some_and(HarnessError::is_fatal)
    }
}

/// Object-safe view of a [`Scenario`] so suites can hold mixed scenarios.
#[async_trait]
pub trait ScenarioRun: Send + Sync {
    fn scenario_name(&self) -> &str;

    async fn run(&self, harness: &Harness, limit: Duration) -> ScenarioReport;
}

#[async_trait]
impl<S> ScenarioRun for S
where
    S: Scenario,
{
    fn scenario_name(&self) -> &str {
        Scenario::name(self)
    }

    async fn run(&self, harness: &Harness, limit: Duration) -> ScenarioReport {
        harness.run_scenario(self, limit).await
    }
}

/// Ordered scenarios sharing an optional timeout override.
pub struct Suite {
    name: String,
    timeout: Option<Duration>,
    scenarios: Vec<Box<dyn ScenarioRun>>,
}

impl Suite {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            timeout: None,
            scenarios: Vec::new(),
        }
    }

    /// Overrides the harness default timeout for this suite's scenarios.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_scenario(mut self, scenario: impl ScenarioRun + 'static) -> Self {
        self.scenarios.push(Box::new(scenario));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

/// Results of one suite.
#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub name: String,
    /// Timeout the suite's scenarios ran under
    pub timeout: Duration,
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(ScenarioReport::passed)
    }

    pub fn failed_count(&self) -> usize {
        self.scenarios
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Failed { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.scenarios
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Skipped { .. }))
            .count()
    }

    fn fatal_error(&self) -> Option<&HarnessError> {
        self.scenarios
            .iter()
            .find(|r| r.is_fatal())
            .and_then(ScenarioReport::error)
    }
}

/// Runs scenarios and suites against one store.
pub struct Harness {
    store: Arc<dyn RealtimeStore>,
    default_timeout: Duration,
}

impl Harness {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self {
            store,
            default_timeout: DEFAULT_SCENARIO_TIMEOUT,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn store(&self) -> &dyn RealtimeStore {
        self.store.as_ref()
    }

    /// Runs one scenario through every phase, teardown included.
    pub async fn run_scenario<S: Scenario>(
        &self,
        scenario: &S,
        limit: Duration,
    ) -> ScenarioReport {
        let name = Scenario::name(scenario).to_string();
        let store = self.store.as_ref();
        let started = Instant::now();
        let mut ctx = scenario.context();
        let mut phase = Phase::Setup;

        tracing::info!(scenario = %name, timeout_ms = limit.as_millis() as u64, "Starting scenario");

        let body = async {
            scenario.setup(store, &mut ctx).await?;
            phase = Phase::Exercise;
            scenario.exercise(store, &mut ctx).await?;
            phase = Phase::Assert;
            scenario.assert(store, &mut ctx).await
        };
        let outcome = match tokio::time::timeout(limit, body).await {
            Ok(Ok(())) => Outcome::Passed,
            Ok(Err(error)) => Outcome::Failed { phase, error },
            Err(_) => Outcome::Failed {
                phase,
                error: HarnessError::Timeout {
                    scenario: name.clone(),
                    limit,
                },
            },
        };
        if let Outcome::Failed { phase, error } = &outcome {
            tracing::error!(scenario = %name, %phase, %error, "Scenario failed");
        }

        let teardown_error =
            match tokio::time::timeout(limit, scenario.teardown(store, &mut ctx)).await {
                Ok(Ok(())) => None,
                Ok(Err(error)) => Some(error),
                Err(_) => Some(HarnessError::Timeout {
                    scenario: name.clone(),
                    limit,
                }),
            };
        drop(ctx);

        let outcome = match (outcome, &teardown_error) {
            (Outcome::Passed, Some(error)) => Outcome::Failed {
                phase: Phase::Teardown,
                error: error.clone(),
            },
            (outcome, _) => outcome,
        };
        if let Some(error) = &teardown_error {
            tracing::error!(scenario = %name, %error, "Teardown failed");
        }

        let report = ScenarioReport {
            name,
            outcome,
            teardown_error,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            scenario = %report.name,
            passed = report.passed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Finished scenario"
        );
        report
    }

    /// Runs a suite. A fatal failure skips the suite's remaining scenarios.
    pub async fn run_suite(&self, suite: &Suite) -> SuiteReport {
        let mut abort = None;
        self.run_suite_inner(suite, &mut abort).await
    }

    /// Runs suites in order. A fatal failure skips everything after it.
    pub async fn run_all(&self, suites: &[Suite]) -> Vec<SuiteReport> {
        let mut abort = None;
        let mut reports = Vec::with_capacity(suites.len());
        for suite in suites {
            reports.push(self.run_suite_inner(suite, &mut abort).await);
        }
        reports
    }

    async fn run_suite_inner(&self, suite: &Suite, abort: &mut Option<String>) -> SuiteReport {
        let limit = suite.timeout.unwrap_or(self.default_timeout);
        if limit != self.default_timeout {
            tracing::info!(
                suite = %suite.name,
                timeout_ms = limit.as_millis() as u64,
                default_ms = self.default_timeout.as_millis() as u64,
                "Using suite timeout override"
            );
        }

        let mut report = SuiteReport {
            name: suite.name.clone(),
            timeout: limit,
            scenarios: Vec::with_capacity(suite.scenarios.len()),
        };
        for scenario in &suite.scenarios {
            if let Some(reason) = abort.as_deref() {
                report
                    .scenarios
                    .push(ScenarioReport::skipped(scenario.scenario_name(), reason));
                continue;
            }
            let scenario_report = scenario.run(self, limit).await;
            let fatal = scenario_report.is_fatal();
            report.scenarios.push(scenario_report);
            if fatal {
                if let Some(error) = report.fatal_error() {
                    tracing::error!(suite = %suite.name, %error, "Aborting run after fatal error");
                    *abort = Some(format!("aborted after fatal error: {}", error));
                }
            }
        }
        report
    }
}
