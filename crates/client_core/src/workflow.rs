//! The workflow controller: search, select, analyze, ask.

use std::{fmt, mem, str::FromStr};

use chrono::Utc;
use serde_json::Value;
use shared::{
    domain::{ProductListing, SelectedProducts, SessionId, Stage},
    protocol::{
        AnalysisResult, AnalyzeRequest, DiscoverRequest, ExtractRequest, QuestionRequest,
    },
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    backend::ReviewBackend,
    chat::{
        compose_answer, error_reply, failure_reply, greeting_reply, is_greeting, ChatTurn,
        ANALYSIS_REQUIRED_REPLY,
    },
    config::{ClientSettings, DEFAULT_MAX_PER_STORE},
    error::ClientError,
    reducer::{reduce, WorkflowEvent, WorkflowState, EMPTY_QUERY_STATUS, EMPTY_SELECTION_STATUS},
};

/// Which request shape the backend expects.
///
/// `SelectionScoped` sends no session id and passes the full selection map with
/// every question. `SessionScoped` sends the session id on extract, analyze and
/// question calls and relies on server-side state for the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContractRevision {
    #[default]
    SelectionScoped,
    SessionScoped,
}

#[derive(Debug, Error)]
#[error("unknown contract revision '{0}' (expected 'selection' or 'session')")]
pub struct UnknownContractRevision(String);

impl FromStr for ContractRevision {
    type Err = UnknownContractRevision;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "selection" | "selection_scoped" => Ok(ContractRevision::SelectionScoped),
            "session" | "session_scoped" => Ok(ContractRevision::SessionScoped),
            other => Err(UnknownContractRevision(other.to_string())),
        }
    }
}

impl fmt::Display for ContractRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractRevision::SelectionScoped => f.write_str("selection"),
            ContractRevision::SessionScoped => f.write_str("session"),
        }
    }
}

pub struct WorkflowController<B: ReviewBackend> {
    backend: B,
    contract: ContractRevision,
    default_max_per_store: u32,
    state: WorkflowState,
}

impl<B: ReviewBackend> WorkflowController<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            contract: ContractRevision::default(),
            default_max_per_store: DEFAULT_MAX_PER_STORE,
            state: WorkflowState::new(SessionId::new()),
        }
    }

    pub fn from_settings(backend: B, settings: &ClientSettings) -> Self {
        Self::new(backend)
            .with_contract(settings.contract)
            .with_max_per_store(settings.max_per_store)
    }

    pub fn with_contract(mut self, contract: ContractRevision) -> Self {
        self.contract = contract;
        self
    }

    pub fn with_max_per_store(mut self, max_per_store: u32) -> Self {
        self.default_max_per_store = max_per_store.max(1);
        self
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    pub fn session_id(&self) -> SessionId {
        self.state.session_id
    }

    pub fn contract(&self) -> ContractRevision {
        self.contract
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn apply(&mut self, event: WorkflowEvent) {
        let previous_stage = self.state.stage;
        let session_id = self.state.session_id;
        let current = mem::replace(&mut self.state, WorkflowState::new(session_id));
        self.state = reduce(current, event);
        if self.state.stage != previous_stage {
            info!(
                session_id = %self.state.session_id,
                from = ?previous_stage,
                to = ?self.state.stage,
                "workflow: stage changed"
            );
        }
    }

    /// Discovers listings for `query`. Blank queries are rejected locally.
    pub async fn search(
        &mut self,
        query: &str,
        max_per_store: Option<u32>,
    ) -> Result<(), ClientError> {
        let query = query.trim();
        if query.is_empty() {
            self.apply(WorkflowEvent::SearchRejected);
            return Err(ClientError::Validation(EMPTY_QUERY_STATUS.into()));
        }

        self.apply(WorkflowEvent::SearchStarted);
        let request = DiscoverRequest {
            query: query.to_string(),
            max_per_store: max_per_store
                .unwrap_or(self.default_max_per_store)
                .max(1),
        };

        match self.backend.discover(request).await {
            Ok(response) => {
                info!(
                    query,
                    total = response.products.total(),
                    "workflow: discovery finished"
                );
                self.apply(WorkflowEvent::SearchSucceeded {
                    query: query.to_string(),
                    products: response.products,
                });
                Ok(())
            }
            Err(err) => {
                warn!(query, "workflow: discovery failed: {err}");
                self.apply(WorkflowEvent::SearchFailed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Sets the chosen listing for `store`. The listing is not checked against
    /// the latest discovery result.
    pub fn select(&mut self, store: impl Into<String>, listing: ProductListing) {
        self.apply(WorkflowEvent::ProductSelected {
            store: store.into(),
            listing,
        });
    }

    /// Selects the `index`-th (zero-based) listing discovered for `store`.
    pub fn select_by_index(
        &mut self,
        store: &str,
        index: usize,
    ) -> Result<&ProductListing, ClientError> {
        let listings = self
            .state
            .products
            .store(store)
            .ok_or_else(|| ClientError::Validation(format!("No products listed for store '{store}'")))?;
        let listing = listings.get(index).cloned().ok_or_else(|| {
            ClientError::Validation(format!(
                "Store '{store}' has {} products; {} is out of range",
                listings.len(),
                index.saturating_add(1)
            ))
        })?;

        self.select(store, listing);
        self.state
            .selected
            .get(store)
            .ok_or_else(|| ClientError::Validation(format!("Selection for '{store}' was not stored")))
    }

    /// Extracts then analyzes reviews for the current selection. Both calls
    /// must succeed before anything is stored.
    pub async fn analyze(&mut self) -> Result<(), ClientError> {
        if !self.state.can_analyze() {
            self.apply(WorkflowEvent::AnalysisRejected);
            return Err(ClientError::Validation(EMPTY_SELECTION_STATUS.into()));
        }

        self.apply(WorkflowEvent::AnalysisStarted);
        let selected = self.state.selected.clone();

        match self.run_analysis(selected).await {
            Ok(result) => {
                info!(
                    total_reviews = result.extract_data.total_reviews,
                    "workflow: analysis finished"
                );
                self.apply(WorkflowEvent::AnalysisSucceeded { result });
                Ok(())
            }
            Err(err) => {
                warn!("workflow: analysis failed: {err}");
                self.apply(WorkflowEvent::AnalysisFailed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run_analysis(&self, selected: SelectedProducts) -> Result<AnalysisResult, ClientError> {
        let extract_data = self
            .backend
            .extract_reviews(self.build_extract_request(selected.clone()))
            .await?;
        if let Some(error) = extract_data.extra.get("error").and_then(Value::as_str) {
            return Err(ClientError::Rejected(error.to_string()));
        }

        let report = self
            .backend
            .analyze_reviews(self.build_analyze_request(selected))
            .await?;
        if let Some(error) = &report.error {
            return Err(ClientError::Rejected(error.clone()));
        }

        Ok(AnalysisResult {
            report,
            extract_data,
        })
    }

    /// Appends exactly one transcript entry per call, except for a blank
    /// question after analysis, which leaves the transcript unchanged.
    pub async fn ask(&mut self, question: &str) -> Option<&ChatTurn> {
        let question = question.trim();
        let asked_at = Utc::now();

        if !self.state.can_chat() {
            self.apply(WorkflowEvent::LocalReply {
                question: question.to_string(),
                text: ANALYSIS_REQUIRED_REPLY.to_string(),
                asked_at,
            });
            return self.state.transcript.last();
        }

        if question.is_empty() {
            return None;
        }

        if is_greeting(question) {
            let text = greeting_reply(&self.state.selected);
            self.apply(WorkflowEvent::LocalReply {
                question: question.to_string(),
                text,
                asked_at,
            });
            return self.state.transcript.last();
        }

        self.apply(WorkflowEvent::QuestionAsked {
            question: question.to_string(),
            asked_at,
        });
        let index = self.state.transcript.len() - 1;

        let request = self.build_question_request(question);
        let text = match self.backend.ask_question(request).await {
            Ok(response) => match response.error.as_deref() {
                Some(error) => {
                    warn!("workflow: question rejected by backend: {error}");
                    error_reply(error)
                }
                None => compose_answer(&response),
            },
            Err(err) => {
                warn!("workflow: question failed: {err}");
                failure_reply(&err.to_string())
            }
        };

        self.apply(WorkflowEvent::AnswerResolved { index, text });
        self.state.transcript.get(index)
    }

    fn scoped_session_id(&self) -> Option<SessionId> {
        match self.contract {
            ContractRevision::SelectionScoped => None,
            ContractRevision::SessionScoped => Some(self.state.session_id),
        }
    }

    pub fn build_extract_request(&self, selected_products: SelectedProducts) -> ExtractRequest {
        ExtractRequest {
            session_id: self.scoped_session_id(),
            selected_products,
        }
    }

    pub fn build_analyze_request(&self, selected_products: SelectedProducts) -> AnalyzeRequest {
        AnalyzeRequest {
            session_id: self.scoped_session_id(),
            selected_products,
        }
    }

    pub fn build_question_request(&self, question: &str) -> QuestionRequest {
        let selected_products = match self.contract {
            ContractRevision::SelectionScoped => Some(self.state.selected.clone()),
            ContractRevision::SessionScoped => None,
        };
        QuestionRequest {
            session_id: self.scoped_session_id(),
            question: question.to_string(),
            selected_products,
        }
    }
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
