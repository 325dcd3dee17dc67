//! Pure workflow transitions: `(state, event) -> state`. Nothing here touches
//! the network; the controller feeds backend outcomes in as events.

use chrono::{DateTime, Utc};
use shared::{
    domain::{ProductListing, ProductsByStore, SelectedProducts, SessionId, Stage, Status},
    protocol::AnalysisResult,
};

use crate::chat::ChatTurn;

pub const EMPTY_QUERY_STATUS: &str = "Please enter a product name to search.";
pub const SEARCHING_STATUS: &str = "Searching for products across stores...";
pub const NO_RESULTS_STATUS: &str = "No products found. Try a different search term.";
pub const EMPTY_SELECTION_STATUS: &str = "Please select at least one product first";
pub const ANALYZING_STATUS: &str = "Extracting and analyzing reviews... This may take a moment.";

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    pub session_id: SessionId,
    pub stage: Stage,
    /// Set while a search or analysis call is in flight.
    pub loading: bool,
    pub search_status: Option<Status>,
    pub analysis_status: Option<Status>,
    pub products: ProductsByStore,
    pub selected: SelectedProducts,
    pub analysis: Option<AnalysisResult>,
    pub transcript: Vec<ChatTurn>,
}

impl WorkflowState {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            stage: Stage::Idle,
            loading: false,
            search_status: None,
            analysis_status: None,
            products: ProductsByStore::default(),
            selected: SelectedProducts::new(),
            analysis: None,
            transcript: Vec::new(),
        }
    }

    pub fn can_analyze(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn can_chat(&self) -> bool {
        self.analysis.is_some()
    }

    pub fn chat_pending(&self) -> bool {
        self.transcript.last().is_some_and(ChatTurn::is_pending)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    SearchRejected,
    SearchStarted,
    SearchSucceeded {
        query: String,
        products: ProductsByStore,
    },
    SearchFailed {
        message: String,
    },
    ProductSelected {
        store: String,
        listing: ProductListing,
    },
    AnalysisRejected,
    AnalysisStarted,
    AnalysisSucceeded {
        result: AnalysisResult,
    },
    AnalysisFailed {
        message: String,
    },
    QuestionAsked {
        question: String,
        asked_at: DateTime<Utc>,
    },
    AnswerResolved {
        index: usize,
        text: String,
    },
    LocalReply {
        question: String,
        text: String,
        asked_at: DateTime<Utc>,
    },
}

pub fn reduce(mut state: WorkflowState, event: WorkflowEvent) -> WorkflowState {
    match event {
        WorkflowEvent::SearchRejected => {
            state.search_status = Some(Status::warning(EMPTY_QUERY_STATUS));
        }
        WorkflowEvent::SearchStarted => {
            state.loading = true;
            state.search_status = Some(Status::info(SEARCHING_STATUS));
        }
        WorkflowEvent::SearchSucceeded { query, products } => {
            state.loading = false;
            let total = products.total();
            let empty = products.is_empty_result();
            state.products = products;
            if empty {
                state.search_status = Some(Status::warning(NO_RESULTS_STATUS));
            } else {
                state.stage = Stage::ProductsFound;
                state.search_status = Some(Status::success(format!(
                    "Found {total} products for: **{query}**"
                )));
            }
        }
        WorkflowEvent::SearchFailed { message } => {
            state.loading = false;
            state.search_status = Some(Status::error(format!(
                "Error searching products: {message}"
            )));
        }
        WorkflowEvent::ProductSelected { store, listing } => {
            state.selected.select(store, listing);
        }
        WorkflowEvent::AnalysisRejected => {
            state.analysis_status = Some(Status::error(EMPTY_SELECTION_STATUS));
        }
        WorkflowEvent::AnalysisStarted => {
            state.loading = true;
            state.analysis_status = Some(Status::info(ANALYZING_STATUS));
        }
        WorkflowEvent::AnalysisSucceeded { result } => {
            state.loading = false;
            state.analysis_status = Some(Status::success(format!(
                "Analysis Complete! Processed {} reviews",
                result.extract_data.total_reviews
            )));
            state.analysis = Some(result);
            state.stage = Stage::Analyzed;
        }
        WorkflowEvent::AnalysisFailed { message } => {
            state.loading = false;
            state.analysis_status = Some(Status::error(format!("Analysis failed: {message}")));
        }
        WorkflowEvent::QuestionAsked { question, asked_at } => {
            state.transcript.push(ChatTurn::pending(question, asked_at));
        }
        WorkflowEvent::AnswerResolved { index, text } => {
            if let Some(turn) = state.transcript.get_mut(index) {
                turn.assistant = Some(text);
            }
        }
        WorkflowEvent::LocalReply {
            question,
            text,
            asked_at,
        } => {
            let mut turn = ChatTurn::pending(question, asked_at);
            turn.assistant = Some(text);
            state.transcript.push(turn);
        }
    }
    state
}

#[cfg(test)]
#[path = "tests/reducer_tests.rs"]
mod tests;
