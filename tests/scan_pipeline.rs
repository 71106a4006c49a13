//! End-to-end specifications for the scan pipeline: gate check, inference,
//! scoring, persistence, and usage recording driven through the public
//! facade with in-memory collaborators.

mod common {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, NaiveDate, Utc};

    use labelscan::clock::Clock;
    use labelscan::config::QuotaConfig;
    use labelscan::entitlement::{
        EntitlementGate, EntitlementOracle, EntitlementStatus, OracleError, ProductId,
        PurchaseOutcome,
    };
    use labelscan::scan::{
        Ingredient, InferenceError, InferenceService, ProductAnalysis, ScanHistory, ScanPipeline,
    };
    use labelscan::storage::MemoryStore;

    pub(super) struct TestClock {
        today: Mutex<NaiveDate>,
    }

    impl TestClock {
        pub(super) fn new() -> Self {
            Self {
                today: Mutex::new(NaiveDate::from_ymd_opt(2025, 6, 10).expect("valid date")),
            }
        }

        pub(super) fn advance_day(&self) {
            let mut today = self.today.lock().expect("clock mutex poisoned");
            *today = today.succ_opt().expect("valid next day");
        }
    }

    impl Clock for TestClock {
        fn today(&self) -> NaiveDate {
            *self.today.lock().expect("clock mutex poisoned")
        }

        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    pub(super) struct TestOracle {
        premium: Mutex<Option<bool>>,
    }

    impl Default for TestOracle {
        fn default() -> Self {
            Self {
                premium: Mutex::new(Some(false)),
            }
        }
    }

    impl TestOracle {
        pub(super) fn set_premium(&self, premium: Option<bool>) {
            *self.premium.lock().expect("oracle mutex poisoned") = premium;
        }
    }

    impl EntitlementOracle for TestOracle {
        fn entitlement_status(&self) -> Result<EntitlementStatus, OracleError> {
            match *self.premium.lock().expect("oracle mutex poisoned") {
                Some(premium_active) => Ok(EntitlementStatus { premium_active }),
                None => Err(OracleError::Unreachable("storefront offline".to_string())),
            }
        }

        fn purchase(&self, _product: &ProductId) -> Result<PurchaseOutcome, OracleError> {
            Ok(PurchaseOutcome::Completed)
        }

        fn restore(&self) -> Result<PurchaseOutcome, OracleError> {
            Ok(PurchaseOutcome::Completed)
        }
    }

    /// Inference double returning a canned payload, a canned failure, or
    /// simulating user cancellation.
    pub(super) struct StubInference {
        response: Mutex<Response>,
    }

    enum Response {
        Analysis(ProductAnalysis),
        Cancelled,
        Failure(String),
    }

    impl StubInference {
        pub(super) fn returning(analysis: ProductAnalysis) -> Self {
            Self {
                response: Mutex::new(Response::Analysis(analysis)),
            }
        }

        pub(super) fn set_analysis(&self, analysis: ProductAnalysis) {
            *self.response.lock().expect("stub mutex poisoned") = Response::Analysis(analysis);
        }

        pub(super) fn set_cancelled(&self) {
            *self.response.lock().expect("stub mutex poisoned") = Response::Cancelled;
        }

        pub(super) fn set_failure(&self, reason: &str) {
            *self.response.lock().expect("stub mutex poisoned") =
                Response::Failure(reason.to_string());
        }
    }

    impl InferenceService for StubInference {
        fn analyze(&self, _image_uri: &str) -> Result<ProductAnalysis, InferenceError> {
            match &*self.response.lock().expect("stub mutex poisoned") {
                Response::Analysis(analysis) => Ok(analysis.clone()),
                Response::Cancelled => Err(InferenceError::Cancelled),
                Response::Failure(reason) => Err(InferenceError::Transport(reason.clone())),
            }
        }
    }

    pub(super) fn ingredient(name: &str, rating: f64) -> Ingredient {
        Ingredient {
            name: name.to_string(),
            rating,
            health_impact: "test impact".to_string(),
            explanation: "test explanation".to_string(),
            citations: Vec::new(),
        }
    }

    pub(super) fn soda_analysis() -> ProductAnalysis {
        ProductAnalysis {
            product_name: "Cola Max".to_string(),
            ingredients: vec![
                ingredient("carbonated water", 80.0),
                ingredient("high fructose corn syrup", 10.0),
                ingredient("caramel color", 30.0),
            ],
            overall_score: 40.0,
            citations: Vec::new(),
        }
    }

    pub(super) struct Fixture {
        pub(super) pipeline: ScanPipeline<MemoryStore, TestOracle, TestClock, StubInference>,
        pub(super) gate: Arc<EntitlementGate<MemoryStore, TestOracle, TestClock>>,
        pub(super) history: Arc<ScanHistory<MemoryStore>>,
        pub(super) inference: Arc<StubInference>,
        pub(super) oracle: Arc<TestOracle>,
        pub(super) clock: Arc<TestClock>,
    }

    pub(super) fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let oracle = Arc::new(TestOracle::default());
        let clock = Arc::new(TestClock::new());
        let gate = Arc::new(EntitlementGate::new(
            store.clone(),
            oracle.clone(),
            clock.clone(),
            QuotaConfig::default(),
        ));
        let history = Arc::new(ScanHistory::new(store));
        let inference = Arc::new(StubInference::returning(soda_analysis()));
        let pipeline = ScanPipeline::new(
            gate.clone(),
            history.clone(),
            inference.clone(),
            clock.clone(),
        );

        Fixture {
            pipeline,
            gate,
            history,
            inference,
            oracle,
            clock,
        }
    }
}

use labelscan::scan::{ProductAnalysis, ScanError};
use labelscan::scoring::Grade;

#[test]
fn successful_scan_persists_a_scored_record_and_consumes_quota() {
    let fixture = common::fixture();

    let result = fixture.pipeline.scan("file://cola.jpg").expect("scan runs");

    assert_eq!(result.product_name, "Cola Max");
    assert_eq!(result.overall_score, 40.0);
    assert_eq!(result.grade, Grade::Slop);
    assert_eq!(result.grade, Grade::for_score(result.overall_score));
    assert_eq!(result.image_uri, "file://cola.jpg");

    let scans = fixture.history.load().expect("history loads");
    assert_eq!(scans.len(), 1);
    assert_eq!(scans[0].id, result.id);

    assert_eq!(fixture.gate.state().expect("state loads").daily_scans_used, 1);
}

#[test]
fn free_tier_allows_two_scans_then_denies_the_third() {
    let fixture = common::fixture();

    fixture.pipeline.scan("file://one.jpg").expect("first scan");
    fixture.pipeline.scan("file://two.jpg").expect("second scan");

    assert!(matches!(
        fixture.pipeline.scan("file://three.jpg"),
        Err(ScanError::QuotaExceeded)
    ));
    assert_eq!(
        fixture.gate.scans_remaining().expect("gate answers").to_string(),
        "0 free today"
    );
    assert_eq!(fixture.history.load().expect("history loads").len(), 2);
}

#[test]
fn cancelled_inference_consumes_no_quota() {
    let fixture = common::fixture();
    fixture.inference.set_cancelled();

    assert!(matches!(
        fixture.pipeline.scan("file://cola.jpg"),
        Err(ScanError::Cancelled)
    ));

    assert!(fixture.gate.can_scan().expect("gate answers"));
    assert_eq!(fixture.gate.state().expect("state loads").daily_scans_used, 0);
    assert!(fixture.history.load().expect("history loads").is_empty());
}

#[test]
fn failed_inference_consumes_no_quota() {
    let fixture = common::fixture();
    fixture.inference.set_failure("socket closed");

    assert!(matches!(
        fixture.pipeline.scan("file://cola.jpg"),
        Err(ScanError::Inference(_))
    ));
    assert_eq!(fixture.gate.state().expect("state loads").daily_scans_used, 0);
}

#[test]
fn contract_violating_analysis_aborts_before_recording() {
    let fixture = common::fixture();
    let mut bad = common::soda_analysis();
    bad.ingredients[1].rating = 250.0;
    fixture.inference.set_analysis(bad);

    assert!(matches!(
        fixture.pipeline.scan("file://cola.jpg"),
        Err(ScanError::Analysis(_))
    ));
    assert!(fixture.history.load().expect("history loads").is_empty());
    assert_eq!(fixture.gate.state().expect("state loads").daily_scans_used, 0);
}

#[test]
fn empty_ingredient_list_scores_zero_and_still_records() {
    let fixture = common::fixture();
    fixture.inference.set_analysis(ProductAnalysis {
        product_name: "Mystery Box".to_string(),
        ingredients: Vec::new(),
        overall_score: 55.0,
        citations: Vec::new(),
    });

    let result = fixture.pipeline.scan("file://box.jpg").expect("scan runs");
    assert_eq!(result.overall_score, 0.0);
    assert_eq!(result.grade, Grade::HealthHazard);
    assert_eq!(fixture.gate.state().expect("state loads").daily_scans_used, 1);
}

#[test]
fn premium_user_scans_past_the_free_limit() {
    let fixture = common::fixture();
    fixture.oracle.set_premium(Some(true));
    assert!(fixture.gate.refresh_premium().expect("refreshes"));

    for index in 0..5 {
        fixture
            .pipeline
            .scan(&format!("file://scan-{index}.jpg"))
            .expect("premium scan runs");
    }

    let state = fixture.gate.state().expect("state loads");
    assert_eq!(state.daily_scans_used, 0);
    assert_eq!(fixture.history.load().expect("history loads").len(), 5);
}

#[test]
fn quota_resets_on_the_next_calendar_day() {
    let fixture = common::fixture();
    fixture.pipeline.scan("file://one.jpg").expect("first scan");
    fixture.pipeline.scan("file://two.jpg").expect("second scan");
    assert!(matches!(
        fixture.pipeline.scan("file://three.jpg"),
        Err(ScanError::QuotaExceeded)
    ));

    fixture.clock.advance_day();

    fixture.pipeline.scan("file://three.jpg").expect("new day scan");
    assert_eq!(fixture.history.load().expect("history loads").len(), 3);
}

#[test]
fn scan_timestamps_do_not_run_backwards() {
    let fixture = common::fixture();
    let first = fixture.pipeline.scan("file://one.jpg").expect("first scan");
    let second = fixture.pipeline.scan("file://two.jpg").expect("second scan");
    assert!(second.timestamp >= first.timestamp);
    assert_ne!(first.id, second.id);
}
