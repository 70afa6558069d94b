//! # Lifecycle Integration Tests
//!
//! Full lifecycle runs against the local orchestrator and the in-memory backend.
//!
//! These tests verify:
//! - Scenario runs find exactly the rendered keys
//! - Updates are observable through import
//! - Teardown always runs and leaks are detected
//! - Failures carry the right category
//! - Parallel runs stay isolated

use async_trait::async_trait;
use cosmos_mongo_acctest::acceptance::mongo_collection;
use cosmos_mongo_acctest::config::HarnessConfig;
use cosmos_mongo_acctest::constants::{LOCAL_SUBSCRIPTION_ID, MONGO_COLLECTION_TYPE};
use cosmos_mongo_acctest::harness::{
    AttributeDiff, FailureCategory, HarnessContext, HarnessError, LifecycleDriver, StateCheck,
    TestCase, TestStep,
};
use cosmos_mongo_acctest::model::{
    CollectionAttributes, LifecycleState, ResourceAddress, ResourceKey, ResourceState,
};
use cosmos_mongo_acctest::orchestrator::{
    LocalOrchestrator, Operation, Orchestrator, OrchestratorError, Session,
};
use cosmos_mongo_acctest::provider::InMemoryCosmos;
use cosmos_mongo_acctest::render::{collection_address, Scenario};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn local_driver() -> (InMemoryCosmos, Arc<HarnessContext>, LifecycleDriver) {
    let backend = InMemoryCosmos::new();
    let context = HarnessContext::local(HarnessConfig::default(), backend.clone());
    let driver = LifecycleDriver::new(Arc::clone(&context));
    (backend, context, driver)
}

fn acctest_key(ri: i64) -> ResourceKey {
    let rn = format!("acctest-{ri}");
    ResourceKey::new(format!("acctestRG-{ri}"), rn.as_str(), rn.as_str(), rn.as_str())
}

#[tokio::test]
async fn test_basic_case_passes_and_cleans_up() {
    let (backend, _context, driver) = local_driver();

    let report = driver.run(&mongo_collection::basic(101)).await;

    assert!(report.passed(), "{:?}", report.failure);
    assert_eq!(report.steps_completed, 2);
    let collection = report.final_state.get(&collection_address()).unwrap();
    assert_eq!(collection.attribute("name"), Some("acctest-101"));
    assert_eq!(collection.attribute("account_name"), Some("acctest-101"));
    assert_eq!(collection.attribute("database_name"), Some("acctest-101"));
    assert!(backend.is_empty().await);
}

#[tokio::test]
async fn test_complete_and_update_cases_pass() {
    let (backend, _context, driver) = local_driver();

    for case in [mongo_collection::complete(202), mongo_collection::update(203)] {
        let report = driver.run(&case).await;
        report.into_result().unwrap();
    }
    assert!(backend.is_empty().await);
}

#[tokio::test]
async fn test_import_after_update_shows_updated_settings() {
    let backend = InMemoryCosmos::new();
    let orchestrator = LocalOrchestrator::new(backend.clone(), LOCAL_SUBSCRIPTION_ID);
    let mut session = orchestrator.begin("update").await.unwrap();
    let address = collection_address();

    let complete = session.apply(&Scenario::Complete.render(7, "westus")).await.unwrap();
    let applied = complete.get(&address).unwrap();
    assert_eq!(applied.attribute("default_ttl_seconds"), Some("707"));
    assert_eq!(applied.attribute("shard_key"), Some("seven"));

    let updated_config = Scenario::Updated.render(7, "westus");
    let updated = session.apply(&updated_config).await.unwrap();
    let id = updated.get(&address).unwrap().id().unwrap().to_string();

    let imported = session.import(&updated_config, &address, &id).await.unwrap();
    assert_eq!(imported.attribute("default_ttl_seconds"), Some("70707"));
    assert_eq!(imported.attribute("shard_key"), Some("days"));
    assert_eq!(imported.attribute("indexes.#"), Some("3"));

    session.destroy(&updated_config).await.unwrap();
    assert!(backend.is_empty().await);
}

#[tokio::test]
async fn test_import_immediately_after_apply_is_identical() {
    let backend = InMemoryCosmos::new();
    let orchestrator = LocalOrchestrator::new(backend, LOCAL_SUBSCRIPTION_ID);
    let mut session = orchestrator.begin("import").await.unwrap();
    let address = collection_address();

    for scenario in [Scenario::Basic, Scenario::Complete, Scenario::Updated] {
        let config = scenario.render(9, "westus");
        let state = session.apply(&config).await.unwrap();
        let applied = state.get(&address).unwrap();
        let imported = session
            .import(&config, &address, applied.id().unwrap())
            .await
            .unwrap();
        assert_eq!(imported.attributes, applied.attributes, "scenario {scenario}");
    }
}

#[tokio::test]
async fn test_debug_scenario_creates_exactly_its_key() {
    let backend = InMemoryCosmos::new();
    let orchestrator = LocalOrchestrator::new(backend.clone(), LOCAL_SUBSCRIPTION_ID);
    let mut session = orchestrator.begin("debug").await.unwrap();

    session.apply(&Scenario::Debug.render(0, "westus")).await.unwrap();

    assert_eq!(
        backend.keys().await,
        vec![ResourceKey::new(
            "kt-cosmos-201905",
            "kt-cosmos-mongo",
            "SevenDayDBs22",
            "seven-day-tables-cola"
        )]
    );
}

#[tokio::test]
async fn test_debug_case_passes() {
    let (backend, _context, driver) = local_driver();
    driver.run(&mongo_collection::debug(0)).await.into_result().unwrap();
    assert!(backend.is_empty().await);
}

#[tokio::test]
async fn test_failed_check_still_destroys() {
    let (backend, _context, driver) = local_driver();
    let address = collection_address();
    let case = TestCase::new("mismatch", MONGO_COLLECTION_TYPE)
        .with_suffix(5)
        .step(
            TestStep::apply(Scenario::Basic)
                .check(StateCheck::Exists(address.clone()))
                .check(StateCheck::attr(&address, "name", "wrong"))
                .check(StateCheck::attr(&address, "shard_key", "seven")),
        )
        .step(TestStep::import_verify(address));

    let report = driver.run(&case).await;
    let failure = report.into_result().unwrap_err();

    let step = failure.step.as_ref().unwrap();
    assert_eq!(step.step, 1);
    match &step.error {
        HarnessError::Checks(errors) => {
            assert_eq!(errors.len(), 2);
            assert!(errors
                .iter()
                .all(|e| matches!(e, HarnessError::AttributeMismatch { .. })));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(failure.category(), FailureCategory::Assertion);
    assert!(failure.destroy.is_empty());
    assert!(backend.is_empty().await);
}

#[tokio::test]
async fn test_leaked_collection_is_reported() {
    let (backend, _context, driver) = local_driver();
    backend.set_ignore_deletes(true);

    let report = driver.run(&mongo_collection::basic(303)).await;
    let failure = report.into_result().unwrap_err();

    assert!(failure.step.is_none());
    assert_eq!(failure.destroy.len(), 1);
    match &failure.destroy[0] {
        HarnessError::StillExists { key } => assert_eq!(key, &acctest_key(303)),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(failure.category(), FailureCategory::Assertion);
}

#[tokio::test]
async fn test_lookup_error_is_a_transport_failure() {
    let (backend, _context, driver) = local_driver();
    backend.fail_next_lookups(1, "503 service unavailable").await;

    let report = driver.run(&mongo_collection::basic(404)).await;
    let failure = report.into_result().unwrap_err();

    let step = failure.step.as_ref().unwrap();
    assert_eq!(step.step, 1);
    assert!(matches!(step.error, HarnessError::Transport { .. }));
    assert_eq!(failure.category(), FailureCategory::Transport);
    // Teardown still ran and verified
    assert!(failure.destroy.is_empty());
    assert!(backend.is_empty().await);
}

#[tokio::test]
async fn test_parallel_runs_are_isolated() {
    let (backend, _context, driver) = local_driver();
    let cases = vec![
        mongo_collection::basic(1),
        mongo_collection::complete(2),
        mongo_collection::update(3),
        mongo_collection::basic(4),
    ];

    let reports = driver.run_parallel(&cases, 4).await;

    assert_eq!(reports.len(), 4);
    for (case, report) in cases.iter().zip(&reports) {
        assert_eq!(report.ri, case.ri);
        assert!(report.passed(), "{}: {:?}", case.name, report.failure);
    }
    assert!(backend.is_empty().await);
}

#[tokio::test]
async fn test_cancelled_context_runs_nothing() {
    let (backend, context, driver) = local_driver();
    context.teardown();

    let failure = driver
        .run(&mongo_collection::basic(9))
        .await
        .into_result()
        .unwrap_err();

    assert_eq!(failure.step.as_ref().unwrap().step, 0);
    assert_eq!(failure.category(), FailureCategory::Orchestration);
    assert!(backend.is_empty().await);
}

/// Orchestrator returning canned state, for failure paths the local one cannot produce
#[derive(Debug, Clone, Default)]
struct StubOrchestrator {
    /// State every successful apply returns
    state: LifecycleState,
    /// Attributes replaced in the imported copy of a resource
    import_overrides: Vec<(&'static str, &'static str)>,
    fail_apply: bool,
    /// Collection a failing apply creates before erroring; destroy never removes it
    leave_behind: Option<CollectionAttributes>,
    apply_delay: Option<Duration>,
    backend: InMemoryCosmos,
    /// Per-session record of what has been applied
    applied: LifecycleState,
    destroys: Arc<AtomicUsize>,
}

#[async_trait]
impl Orchestrator for StubOrchestrator {
    async fn begin(&self, _run_id: &str) -> Result<Box<dyn Session>, OrchestratorError> {
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl Session for StubOrchestrator {
    async fn apply(&mut self, _config: &str) -> Result<LifecycleState, OrchestratorError> {
        if let Some(delay) = self.apply_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(attributes) = self.leave_behind.clone() {
            let mut values = attributes.to_values();
            values["id"] = json!(attributes.key.resource_id(LOCAL_SUBSCRIPTION_ID));
            self.backend.upsert(attributes).await;
            self.applied = LifecycleState::new(vec![ResourceState::from_values(
                collection_address(),
                &values,
            )]);
        }
        if self.fail_apply {
            return Err(OrchestratorError::failed(Operation::Apply, "quota exceeded"));
        }
        self.applied = self.state.clone();
        Ok(self.state.clone())
    }

    async fn import(
        &mut self,
        _config: &str,
        address: &ResourceAddress,
        _id: &str,
    ) -> Result<ResourceState, OrchestratorError> {
        let mut imported = self
            .state
            .get(address)
            .cloned()
            .ok_or_else(|| OrchestratorError::failed(Operation::Import, "not found"))?;
        for (key, value) in &self.import_overrides {
            imported.attributes.insert((*key).to_string(), (*value).to_string());
        }
        Ok(imported)
    }

    async fn destroy(&mut self, _config: &str) -> Result<(), OrchestratorError> {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn state(&mut self) -> Result<LifecycleState, OrchestratorError> {
        Ok(self.applied.clone())
    }
}

fn stub_driver(config: HarnessConfig, stub: StubOrchestrator) -> (InMemoryCosmos, LifecycleDriver) {
    let backend = stub.backend.clone();
    let context = HarnessContext::init(config, Arc::new(backend.clone()), Arc::new(stub));
    (backend, LifecycleDriver::new(context))
}

fn complete_collection_state(ri: i64) -> LifecycleState {
    let mut attributes = CollectionAttributes::new(acctest_key(ri));
    attributes.default_ttl_seconds = Some(707);
    attributes.shard_key = Some("seven".to_string());
    let mut values = attributes.to_values();
    values["id"] = json!(attributes.key.resource_id(LOCAL_SUBSCRIPTION_ID));
    LifecycleState::new(vec![ResourceState::from_values(collection_address(), &values)])
}

#[tokio::test]
async fn test_missing_key_attribute_is_a_harness_failure() {
    let address = collection_address();
    let incomplete = ResourceState::from_values(
        address.clone(),
        &json!({"name": "c", "resource_group_name": "rg", "account_name": "acc"}),
    );
    let stub = StubOrchestrator {
        state: LifecycleState::new(vec![incomplete]),
        ..StubOrchestrator::default()
    };
    let (backend, driver) = stub_driver(HarnessConfig::default(), stub);
    let case = TestCase::new("incomplete", MONGO_COLLECTION_TYPE)
        .step(TestStep::apply(Scenario::Basic).check(StateCheck::Exists(address)));

    let failure = driver.run(&case).await.into_result().unwrap_err();

    match &failure.step.as_ref().unwrap().error {
        HarnessError::MissingAttribute { missing, .. } => assert_eq!(missing, &vec!["database_name"]),
        other => panic!("unexpected error: {other}"),
    }
    // The verifier cannot build a key either, and says so
    assert_eq!(failure.destroy.len(), 1);
    assert_eq!(failure.category(), FailureCategory::Harness);
    assert_eq!(backend.lookup_count(), 0);
}

#[tokio::test]
async fn test_failed_apply_still_destroys() {
    let stub = StubOrchestrator {
        fail_apply: true,
        ..StubOrchestrator::default()
    };
    let destroys = Arc::clone(&stub.destroys);
    let (_backend, driver) = stub_driver(HarnessConfig::default(), stub);

    let failure = driver
        .run(&mongo_collection::basic(11))
        .await
        .into_result()
        .unwrap_err();

    assert!(matches!(
        failure.step.as_ref().unwrap().error,
        HarnessError::Orchestration(OrchestratorError::Failed { .. })
    ));
    assert_eq!(failure.category(), FailureCategory::Orchestration);
    assert_eq!(destroys.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_step_timeout_is_an_orchestration_failure() {
    let stub = StubOrchestrator {
        apply_delay: Some(Duration::from_secs(30)),
        ..StubOrchestrator::default()
    };
    let destroys = Arc::clone(&stub.destroys);
    let config = HarnessConfig {
        step_timeout_secs: 1,
        ..HarnessConfig::default()
    };
    let (_backend, driver) = stub_driver(config, stub);

    let failure = driver
        .run(&mongo_collection::basic(12))
        .await
        .into_result()
        .unwrap_err();

    assert!(matches!(
        failure.step.as_ref().unwrap().error,
        HarnessError::Orchestration(OrchestratorError::Timeout {
            operation: Operation::Apply,
            ..
        })
    ));
    assert_eq!(destroys.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_collection_left_by_failed_apply_is_verified() {
    let stub = StubOrchestrator {
        fail_apply: true,
        leave_behind: Some(CollectionAttributes::new(acctest_key(13))),
        ..StubOrchestrator::default()
    };
    let destroys = Arc::clone(&stub.destroys);
    let (backend, driver) = stub_driver(HarnessConfig::default(), stub);

    let report = driver.run(&mongo_collection::basic(13)).await;
    assert!(report.final_state.is_empty());
    let failure = report.into_result().unwrap_err();

    assert_eq!(failure.step.as_ref().unwrap().step, 1);
    assert_eq!(destroys.load(Ordering::SeqCst), 1);
    assert_eq!(failure.destroy.len(), 1);
    match &failure.destroy[0] {
        HarnessError::StillExists { key } => assert_eq!(key, &acctest_key(13)),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(failure.category(), FailureCategory::Orchestration);
    assert_eq!(backend.lookup_count(), 1);
    assert_eq!(backend.keys().await, vec![acctest_key(13)]);
}

#[tokio::test]
async fn test_import_divergence_fails_and_still_destroys() {
    let stub = StubOrchestrator {
        state: complete_collection_state(14),
        import_overrides: vec![("shard_key", "days")],
        ..StubOrchestrator::default()
    };
    let destroys = Arc::clone(&stub.destroys);
    let (_backend, driver) = stub_driver(HarnessConfig::default(), stub);
    let address = collection_address();
    let case = TestCase::new("diverging-import", MONGO_COLLECTION_TYPE)
        .with_suffix(14)
        .step(TestStep::apply(Scenario::Complete))
        .step(TestStep::import_verify(address.clone()));

    let failure = driver.run(&case).await.into_result().unwrap_err();

    let step = failure.step.as_ref().unwrap();
    assert_eq!(step.step, 2);
    match &step.error {
        HarnessError::ImportMismatch { address: at, diffs } => {
            assert_eq!(at, &address);
            assert_eq!(
                diffs,
                &vec![AttributeDiff {
                    attribute: "shard_key".to_string(),
                    applied: Some("seven".to_string()),
                    imported: Some("days".to_string()),
                }]
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(failure.category(), FailureCategory::Assertion);
    assert!(failure.destroy.is_empty());
    assert_eq!(destroys.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ignored_attribute_divergence_passes() {
    let stub = StubOrchestrator {
        state: complete_collection_state(15),
        import_overrides: vec![("shard_key", "days")],
        ..StubOrchestrator::default()
    };
    let destroys = Arc::clone(&stub.destroys);
    let (_backend, driver) = stub_driver(HarnessConfig::default(), stub);
    let case = TestCase::new("ignored-import", MONGO_COLLECTION_TYPE)
        .with_suffix(15)
        .step(TestStep::apply(Scenario::Complete))
        .step(TestStep::Import {
            address: collection_address(),
            verify: true,
            ignore: vec!["shard_key".to_string()],
        });

    let report = driver.run(&case).await;

    assert!(report.passed(), "{:?}", report.failure);
    assert_eq!(report.steps_completed, 2);
    assert_eq!(destroys.load(Ordering::SeqCst), 1);
}
