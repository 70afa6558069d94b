//! # Lifecycle Driver
//!
//! Runs a [`TestCase`] end to end:
//!
//! 1. Open an orchestrator session for the run
//! 2. Execute steps in order, stopping at the first failure
//! 3. Destroy whatever was applied, whether or not the steps passed
//! 4. Verify destruction of every collection the run recorded, including
//!    whatever a failed apply left behind
//!
//! Steps are bounded by the step timeout and honour cancellation. Destroy is
//! bounded by the timeout only, so a cancelled run still cleans up.

use super::context::HarnessContext;
use super::destroy::DestructionVerifier;
use super::error::{AttributeDiff, HarnessError, LifecycleFailure, StepFailure};
use super::steps::{StateCheck, TestCase, TestStep};
use crate::model::LifecycleState;
use crate::observability::metrics;
use crate::orchestrator::{Operation, OrchestratorError, Session};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, Instrument};

/// Outcome of one lifecycle run
#[derive(Debug)]
pub struct RunReport {
    pub case: String,
    pub ri: i64,
    pub steps_completed: usize,
    /// State after the last successful apply
    pub final_state: LifecycleState,
    pub failure: Option<LifecycleFailure>,
    pub duration: Duration,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }

    /// # Errors
    /// Returns the failure when any step or the destroy phase failed
    pub fn into_result(self) -> Result<(), LifecycleFailure> {
        self.failure.map_or(Ok(()), Err)
    }
}

#[derive(Debug, Clone)]
pub struct LifecycleDriver {
    context: Arc<HarnessContext>,
}

impl LifecycleDriver {
    pub fn new(context: Arc<HarnessContext>) -> Self {
        Self { context }
    }

    pub async fn run(&self, case: &TestCase) -> RunReport {
        let span = tracing::info_span!(
            "acctest.run",
            case = %case.name,
            ri = case.ri,
            result = tracing::field::Empty,
        );
        let span_clone = span.clone();

        let report = self.run_inner(case).instrument(span).await;

        let result = report
            .failure
            .as_ref()
            .map_or("passed", |f| f.category().as_str());
        span_clone.record("result", result);
        metrics::increment_runs_total(result);
        metrics::observe_run_duration(report.duration.as_secs_f64());
        report
    }

    /// Run cases concurrently, at most `parallelism` at a time
    ///
    /// Reports come back in the order of `cases`.
    pub async fn run_parallel(&self, cases: &[TestCase], parallelism: usize) -> Vec<RunReport> {
        stream::iter(cases)
            .map(|case| self.run(case))
            .buffered(parallelism.max(1))
            .collect()
            .await
    }

    async fn run_inner(&self, case: &TestCase) -> RunReport {
        let start = Instant::now();
        let run_id = format!("{}-{}", case.name, case.ri);
        info!("Starting lifecycle run {}", run_id);

        let orchestrator = self.context.orchestrator();
        let mut session = match self
            .bounded(Operation::Begin, true, orchestrator.begin(&run_id))
            .await
        {
            Ok(session) => session,
            Err(e) => {
                let failure = StepFailure {
                    step: 0,
                    description: "begin session".to_string(),
                    error: e.into(),
                };
                return self.report(case, start, 0, LifecycleState::default(), Some(failure), Vec::new());
            }
        };

        let mut last_config: Option<String> = None;
        let mut state = LifecycleState::default();
        let mut touched = LifecycleState::default();
        let mut completed = 0;
        let mut step_failure = None;

        for (index, step) in case.steps.iter().enumerate() {
            let number = index + 1;
            let span = tracing::info_span!("acctest.step", step = number, kind = step.kind());
            let result = self
                .run_step(case, step, session.as_mut(), &mut last_config, &mut state)
                .instrument(span)
                .await;
            touched.record(&state);

            match result {
                Ok(()) => {
                    completed += 1;
                    metrics::increment_steps_total(step.kind(), "passed");
                }
                Err(e) => {
                    metrics::increment_steps_total(step.kind(), "failed");
                    error!("Step {} ({}) of {} failed: {}", number, step.describe(), run_id, e);
                    step_failure = Some(StepFailure {
                        step: number,
                        description: step.describe(),
                        error: e,
                    });
                    break;
                }
            }
        }

        let mut destroy_failures = Vec::new();
        if step_failure.is_some() && last_config.is_some() {
            // A failed apply may have created resources its error discarded
            match self
                .bounded(Operation::State, false, session.state())
                .await
            {
                Ok(current) => touched.record(&current),
                Err(e) => {
                    error!("Reading state of {} after failure: {}", run_id, e);
                    destroy_failures.push(HarnessError::from(e));
                }
            }
        }
        if let Some(config) = &last_config {
            if let Err(e) = self
                .bounded(Operation::Destroy, false, session.destroy(config))
                .await
            {
                error!("Destroy of {} failed: {}", run_id, e);
                destroy_failures.push(HarnessError::from(e));
            }
        }
        if case.check_destroy {
            let verifier = DestructionVerifier::new(self.context.checker(), &case.resource_type);
            destroy_failures.extend(verifier.verify(&touched).await);
        }

        self.report(case, start, completed, state, step_failure, destroy_failures)
    }

    async fn run_step(
        &self,
        case: &TestCase,
        step: &TestStep,
        session: &mut dyn Session,
        last_config: &mut Option<String>,
        state: &mut LifecycleState,
    ) -> Result<(), HarnessError> {
        match step {
            TestStep::Apply { config, checks } => {
                let text = config.render(case.ri, &self.context.config().location);
                // Recorded before applying so a partial apply is still destroyed
                *last_config = Some(text.clone());
                *state = self
                    .bounded(Operation::Apply, true, session.apply(&text))
                    .await?;
                self.run_checks(state, checks).await
            }
            TestStep::Import {
                address,
                verify,
                ignore,
            } => {
                let applied = state
                    .get(address)
                    .ok_or_else(|| HarnessError::ResourceNotInState(address.clone()))?;
                let id = applied.id().ok_or_else(|| HarnessError::MissingAttribute {
                    address: address.clone(),
                    missing: vec!["id"],
                })?;
                let config = last_config.as_deref().unwrap_or_default();

                let imported = self
                    .bounded(Operation::Import, true, session.import(config, address, id))
                    .await?;

                if *verify {
                    let diffs = diff_attributes(&applied.attributes, &imported.attributes, ignore);
                    if !diffs.is_empty() {
                        return Err(HarnessError::ImportMismatch {
                            address: address.clone(),
                            diffs,
                        });
                    }
                }
                Ok(())
            }
        }
    }

    /// Run every check and aggregate failures
    async fn run_checks(
        &self,
        state: &LifecycleState,
        checks: &[StateCheck],
    ) -> Result<(), HarnessError> {
        let checker = self.context.checker();
        let mut failures = Vec::new();
        for check in checks {
            if let Err(e) = check.evaluate_attributes(state) {
                failures.push(e);
                continue;
            }
            if let StateCheck::Exists(address) = check {
                if let Err(e) = checker.check(state, address).await {
                    failures.push(e);
                }
            }
        }
        HarnessError::from_checks(failures).map_or(Ok(()), Err)
    }

    /// Bound an orchestrator call by the step timeout and, optionally, cancellation
    async fn bounded<T>(
        &self,
        operation: Operation,
        cancellable: bool,
        future: impl Future<Output = Result<T, OrchestratorError>>,
    ) -> Result<T, OrchestratorError> {
        let timeout = self.context.config().step_timeout();
        let deadline = tokio::time::timeout(timeout, future);
        let result = if cancellable {
            let cancel = self.context.cancellation_token();
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(OrchestratorError::Cancelled(operation)),
                result = deadline => result,
            }
        } else {
            deadline.await
        };
        result.unwrap_or(Err(OrchestratorError::Timeout { operation, timeout }))
    }

    fn report(
        &self,
        case: &TestCase,
        start: Instant,
        steps_completed: usize,
        final_state: LifecycleState,
        step: Option<StepFailure>,
        destroy: Vec<HarnessError>,
    ) -> RunReport {
        let failure = if step.is_none() && destroy.is_empty() {
            info!("Lifecycle run {}-{} passed", case.name, case.ri);
            None
        } else {
            Some(LifecycleFailure {
                case: case.name.clone(),
                ri: case.ri,
                step,
                destroy,
            })
        };

        RunReport {
            case: case.name.clone(),
            ri: case.ri,
            steps_completed,
            final_state,
            failure,
            duration: start.elapsed(),
        }
    }
}

/// Attributes that differ between applied and imported state
///
/// An ignore entry matches the key itself and everything nested under it.
fn diff_attributes(
    applied: &BTreeMap<String, String>,
    imported: &BTreeMap<String, String>,
    ignore: &[String],
) -> Vec<AttributeDiff> {
    let ignored = |key: &str| {
        ignore.iter().any(|prefix| {
            key == prefix
                || key
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    };

    let keys: BTreeSet<&String> = applied.keys().chain(imported.keys()).collect();
    keys.into_iter()
        .filter(|key| !ignored(key))
        .filter_map(|key| {
            let applied = applied.get(key);
            let imported = imported.get(key);
            (applied != imported).then(|| AttributeDiff {
                attribute: key.clone(),
                applied: applied.cloned(),
                imported: imported.cloned(),
            })
        })
        .collect()
}
