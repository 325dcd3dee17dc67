use super::*;

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::json;
use shared::{
    domain::{ProductsByStore, StatusKind},
    protocol::{
        AnalysisReport, DiscoverResponse, ExtractionSummary, QuestionResponse, ReviewSource,
    },
};

#[derive(Default)]
struct Calls {
    discover: Vec<DiscoverRequest>,
    extract: Vec<ExtractRequest>,
    analyze: Vec<AnalyzeRequest>,
    question: Vec<QuestionRequest>,
}

impl Calls {
    fn total(&self) -> usize {
        self.discover.len() + self.extract.len() + self.analyze.len() + self.question.len()
    }
}

/// Scripted in-memory backend that records every request it receives.
struct TestBackend {
    calls: Arc<Mutex<Calls>>,
    products: ProductsByStore,
    extraction: Result<ExtractionSummary, ClientError>,
    report: Result<AnalysisReport, ClientError>,
    answer: Result<QuestionResponse, ClientError>,
    discover_error: Option<ClientError>,
}

impl TestBackend {
    fn ok() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Calls::default())),
            products: products(&[("amazon", &["p1"]), ("walmart", &[])]),
            extraction: Ok(ExtractionSummary {
                total_reviews: 42,
                ..ExtractionSummary::default()
            }),
            report: Ok(AnalysisReport {
                overall_summary: Some("Buyers love the camera.".into()),
                ..AnalysisReport::default()
            }),
            answer: Ok(QuestionResponse {
                answer: Some("People like the camera.".into()),
                sources: vec![ReviewSource {
                    store: Some("amazon".into()),
                    rating: 5.0,
                    text_snippet: Some("Camera is superb".into()),
                    similarity: Some(0.91),
                }],
                confidence: 0.87,
                error: None,
            }),
            discover_error: None,
        }
    }

    fn calls(&self) -> Arc<Mutex<Calls>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ReviewBackend for TestBackend {
    async fn discover(&self, request: DiscoverRequest) -> Result<DiscoverResponse, ClientError> {
        self.calls.lock().expect("calls").discover.push(request);
        if let Some(err) = &self.discover_error {
            return Err(err.clone());
        }
        Ok(DiscoverResponse {
            products: self.products.clone(),
        })
    }

    async fn extract_reviews(
        &self,
        request: ExtractRequest,
    ) -> Result<ExtractionSummary, ClientError> {
        self.calls.lock().expect("calls").extract.push(request);
        self.extraction.clone()
    }

    async fn analyze_reviews(
        &self,
        request: AnalyzeRequest,
    ) -> Result<AnalysisReport, ClientError> {
        self.calls.lock().expect("calls").analyze.push(request);
        self.report.clone()
    }

    async fn ask_question(
        &self,
        request: QuestionRequest,
    ) -> Result<QuestionResponse, ClientError> {
        self.calls.lock().expect("calls").question.push(request);
        self.answer.clone()
    }
}

fn products(entries: &[(&str, &[&str])]) -> ProductsByStore {
    let mut stores = BTreeMap::new();
    for (store, ids) in entries {
        stores.insert(
            store.to_string(),
            ids.iter()
                .map(|id| ProductListing::new(*id, format!("Listing {id}")))
                .collect(),
        );
    }
    ProductsByStore(stores)
}

async fn analyzed(backend: TestBackend) -> WorkflowController<TestBackend> {
    let mut controller = WorkflowController::new(backend);
    controller.search("iPhone 14", None).await.expect("search");
    controller.select_by_index("amazon", 0).expect("select");
    controller.analyze().await.expect("analyze");
    controller
}

#[tokio::test]
async fn blank_queries_never_reach_the_backend() {
    let backend = TestBackend::ok();
    let calls = backend.calls();
    let mut controller = WorkflowController::new(backend);

    for query in ["", "   ", "\t\n"] {
        let err = controller.search(query, None).await.expect_err("blank query");
        assert!(err.is_validation());
        let status = controller.state().search_status.clone().expect("status");
        assert_eq!(status.kind, StatusKind::Warning);
    }

    assert_eq!(calls.lock().expect("calls").total(), 0);
    assert_eq!(controller.stage(), Stage::Idle);
}

#[tokio::test]
async fn search_uses_default_cap_unless_overridden() {
    let backend = TestBackend::ok();
    let calls = backend.calls();
    let mut controller = WorkflowController::new(backend).with_max_per_store(3);

    controller.search("kettle", None).await.expect("search");
    controller.search("kettle", Some(8)).await.expect("search");

    let calls = calls.lock().expect("calls");
    assert_eq!(calls.discover[0].max_per_store, 3);
    assert_eq!(calls.discover[1].max_per_store, 8);
    assert_eq!(calls.discover[0].query, "kettle");
}

#[tokio::test]
async fn zero_cap_override_is_raised_to_one() {
    let backend = TestBackend::ok();
    let calls = backend.calls();
    let mut controller = WorkflowController::new(backend).with_max_per_store(0);

    controller.search("kettle", Some(0)).await.expect("search");
    controller.search("kettle", None).await.expect("search");

    let calls = calls.lock().expect("calls");
    assert_eq!(calls.discover[0].max_per_store, 1);
    assert_eq!(calls.discover[1].max_per_store, 1);
}

#[tokio::test]
async fn empty_discovery_does_not_advance() {
    let mut backend = TestBackend::ok();
    backend.products = products(&[("amazon", &[]), ("walmart", &[])]);
    let mut controller = WorkflowController::new(backend);

    controller.search("unobtainium", None).await.expect("search");

    assert_eq!(controller.stage(), Stage::Idle);
    let status = controller.state().search_status.clone().expect("status");
    assert!(status.text.contains("No products found"));
    assert!(!controller.state().loading);
}

#[tokio::test]
async fn discovery_error_is_surfaced_and_retry_is_possible() {
    let mut backend = TestBackend::ok();
    backend.discover_error = Some(ClientError::Transport("connection refused".into()));
    let mut controller = WorkflowController::new(backend);

    let err = controller.search("kettle", None).await.expect_err("fails");
    assert!(matches!(err, ClientError::Transport(_)));
    let status = controller.state().search_status.clone().expect("status");
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.text.starts_with("Error searching products: Network error"));
    assert!(!controller.state().loading);

    controller.backend_mut_for_test().discover_error = None;
    controller.search("kettle", None).await.expect("retry succeeds");
    assert_eq!(controller.stage(), Stage::ProductsFound);
}

#[tokio::test]
async fn analyze_with_empty_selection_makes_no_calls() {
    let backend = TestBackend::ok();
    let calls = backend.calls();
    let mut controller = WorkflowController::new(backend);
    controller.search("iPhone 14", None).await.expect("search");

    let err = controller.analyze().await.expect_err("empty selection");
    assert!(err.is_validation());

    let calls = calls.lock().expect("calls");
    assert!(calls.extract.is_empty());
    assert!(calls.analyze.is_empty());
    let status = controller.state().analysis_status.clone().expect("status");
    assert_eq!(status.kind, StatusKind::Error);
    assert_eq!(controller.stage(), Stage::ProductsFound);
}

#[tokio::test]
async fn failed_extraction_skips_analysis_and_stores_nothing() {
    let mut backend = TestBackend::ok();
    backend.extraction = Err(ClientError::server(500, Some("scraper offline".into()), None));
    let calls = backend.calls();
    let mut controller = WorkflowController::new(backend);
    controller.search("iPhone 14", None).await.expect("search");
    controller.select_by_index("amazon", 0).expect("select");

    controller.analyze().await.expect_err("extraction fails");

    assert_eq!(controller.stage(), Stage::ProductsFound);
    assert!(controller.state().analysis.is_none());
    assert!(calls.lock().expect("calls").analyze.is_empty());
    assert_eq!(
        controller.state().analysis_status.clone().map(|s| s.text).as_deref(),
        Some("Analysis failed: scraper offline")
    );
}

#[tokio::test]
async fn failed_analysis_after_extraction_stores_nothing() {
    let mut backend = TestBackend::ok();
    backend.report = Err(ClientError::Transport("request timed out".into()));
    let mut controller = WorkflowController::new(backend);
    controller.search("iPhone 14", None).await.expect("search");
    controller.select_by_index("amazon", 0).expect("select");

    controller.analyze().await.expect_err("analysis fails");

    assert_eq!(controller.stage(), Stage::ProductsFound);
    assert!(controller.state().analysis.is_none());
    assert!(!controller.state().loading);
}

#[tokio::test]
async fn analysis_payload_with_error_field_is_a_failure() {
    let mut backend = TestBackend::ok();
    backend.report = Ok(AnalysisReport {
        error: Some("No reviews found for analysis".into()),
        ..AnalysisReport::default()
    });
    let mut controller = WorkflowController::new(backend);
    controller.search("iPhone 14", None).await.expect("search");
    controller.select_by_index("amazon", 0).expect("select");

    let err = controller.analyze().await.expect_err("rejected");
    assert_eq!(err, ClientError::Rejected("No reviews found for analysis".into()));
    assert!(controller.state().analysis.is_none());
}

#[tokio::test]
async fn question_before_analysis_gets_canned_reply_without_calls() {
    let backend = TestBackend::ok();
    let calls = backend.calls();
    let mut controller = WorkflowController::new(backend);

    for question in ["What do people like?", "hi", ""] {
        let turn = controller.ask(question).await.expect("turn").clone();
        assert_eq!(turn.assistant.as_deref(), Some(ANALYSIS_REQUIRED_REPLY));
    }

    assert_eq!(controller.state().transcript.len(), 3);
    assert_eq!(calls.lock().expect("calls").total(), 0);
}

#[tokio::test]
async fn greetings_are_answered_locally() {
    let backend = TestBackend::ok();
    let calls = backend.calls();
    let mut controller = analyzed(backend).await;

    for greeting in ["hi", "HELLO", "Hey", "  hello there "] {
        let turn = controller.ask(greeting).await.expect("turn").clone();
        assert!(turn
            .assistant
            .as_deref()
            .expect("reply")
            .contains("Amazon: Listing p1"));
    }
    assert!(calls.lock().expect("calls").question.is_empty());

    controller.ask("hi there!").await.expect("turn");
    assert_eq!(calls.lock().expect("calls").question.len(), 1);
}

#[tokio::test]
async fn blank_question_after_analysis_leaves_transcript_unchanged() {
    let mut controller = analyzed(TestBackend::ok()).await;
    assert!(controller.ask("   ").await.is_none());
    assert!(controller.state().transcript.is_empty());
}

#[tokio::test]
async fn backend_error_field_becomes_error_reply() {
    let mut backend = TestBackend::ok();
    backend.answer = Ok(QuestionResponse {
        error: Some("index not ready".into()),
        ..QuestionResponse::default()
    });
    let mut controller = analyzed(backend).await;

    let turn = controller.ask("Is it durable?").await.expect("turn").clone();
    assert_eq!(
        turn.assistant.as_deref(),
        Some("I encountered an error: index not ready")
    );
}

#[tokio::test]
async fn transport_failure_is_appended_and_chat_stays_usable() {
    let mut backend = TestBackend::ok();
    backend.answer = Err(ClientError::Transport("request timed out".into()));
    let mut controller = analyzed(backend).await;

    let turn = controller.ask("Is it durable?").await.expect("turn").clone();
    assert!(turn
        .assistant
        .as_deref()
        .expect("reply")
        .starts_with("Sorry, I encountered an error processing your question: Network error"));

    controller.backend_mut_for_test().answer = Ok(QuestionResponse {
        answer: Some("Yes".into()),
        ..QuestionResponse::default()
    });
    let turn = controller.ask("Is it durable?").await.expect("turn").clone();
    assert_eq!(turn.assistant.as_deref(), Some("Yes"));
    assert_eq!(controller.state().transcript.len(), 2);
    assert!(!controller.state().chat_pending());
}

#[tokio::test]
async fn selection_scoped_contract_sends_selection_with_questions() {
    let backend = TestBackend::ok();
    let calls = backend.calls();
    let mut controller = analyzed(backend).await;
    controller.ask("What do people like?").await.expect("turn");

    let calls = calls.lock().expect("calls");
    assert!(calls.extract[0].session_id.is_none());
    assert!(calls.analyze[0].session_id.is_none());
    let question = &calls.question[0];
    assert!(question.session_id.is_none());
    let selected = question.selected_products.as_ref().expect("selection");
    assert_eq!(selected.get("amazon").map(|p| p.id.as_str()), Some("p1"));
}

#[tokio::test]
async fn session_scoped_contract_sends_session_id() {
    let backend = TestBackend::ok();
    let calls = backend.calls();
    let mut controller = WorkflowController::new(backend).with_contract(ContractRevision::SessionScoped);
    let session_id = controller.session_id();
    controller.search("iPhone 14", None).await.expect("search");
    controller.select_by_index("amazon", 0).expect("select");
    controller.analyze().await.expect("analyze");
    controller.ask("Battery?").await.expect("turn");

    let calls = calls.lock().expect("calls");
    assert_eq!(calls.extract[0].session_id, Some(session_id));
    assert_eq!(calls.analyze[0].session_id, Some(session_id));
    assert_eq!(calls.question[0].session_id, Some(session_id));
    assert!(calls.question[0].selected_products.is_none());

    let body = serde_json::to_value(&calls.question[0]).expect("serialize");
    assert_eq!(body, json!({"session_id": session_id.to_string(), "question": "Battery?"}));
}

#[test]
fn select_by_index_validates_store_and_range() {
    let mut controller = WorkflowController::new(TestBackend::ok());
    assert!(controller.select_by_index("amazon", 0).is_err());

    controller.state.products = products(&[("amazon", &["p1", "p2"])]);
    assert!(controller.select_by_index("amazon", 2).is_err());
    let err = controller
        .select_by_index("amazon", usize::MAX)
        .expect_err("out of range");
    assert!(err.to_string().contains(&usize::MAX.to_string()));
    assert_eq!(
        controller.select_by_index("amazon", 1).expect("select").id,
        "p2"
    );
    assert!(controller.state().selected.get("walmart").is_none());
}

#[test]
fn contract_revision_parses_from_config_values() {
    assert_eq!(
        "session".parse::<ContractRevision>().expect("parse"),
        ContractRevision::SessionScoped
    );
    assert_eq!(
        " Selection_Scoped ".parse::<ContractRevision>().expect("parse"),
        ContractRevision::SelectionScoped
    );
    assert!("legacy".parse::<ContractRevision>().is_err());
    assert_eq!(ContractRevision::SessionScoped.to_string(), "session");
}

#[tokio::test]
async fn end_to_end_search_select_analyze_ask() {
    let backend = TestBackend::ok();
    let mut controller = WorkflowController::new(backend);

    controller.search("iPhone 14", None).await.expect("search");
    assert_eq!(controller.stage(), Stage::ProductsFound);
    assert!(controller
        .state()
        .search_status
        .as_ref()
        .expect("status")
        .text
        .contains("Found 1 products"));

    let p1 = controller.state().products.store("amazon").expect("amazon")[0].clone();
    controller.select("amazon", p1.clone());
    assert_eq!(controller.state().selected.len(), 1);
    assert_eq!(controller.state().selected.get("amazon"), Some(&p1));

    controller.analyze().await.expect("analyze");
    assert_eq!(controller.stage(), Stage::Analyzed);
    assert!(controller
        .state()
        .analysis_status
        .as_ref()
        .expect("status")
        .text
        .contains("42 reviews"));
    let stored = controller.state().analysis.as_ref().expect("analysis");
    assert_eq!(stored.extract_data.total_reviews, 42);
    assert_eq!(
        stored.report.overall_summary.as_deref(),
        Some("Buyers love the camera.")
    );

    let turn = controller.ask("What do people like?").await.expect("turn").clone();
    assert_eq!(turn.user, "What do people like?");
    let reply = turn.assistant.expect("reply");
    assert!(reply.starts_with("People like the camera."));
    assert!(reply.contains("**1. Amazon Review** (⭐5/5):\n*\"Camera is superb\"*"));
    assert!(reply.ends_with("*Confidence: 87%*"));
}

impl WorkflowController<TestBackend> {
    fn backend_mut_for_test(&mut self) -> &mut TestBackend {
        &mut self.backend
    }
}
