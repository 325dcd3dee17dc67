use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{null_as_default, ProductsByStore, SelectedProducts, SessionId};

/// Backend endpoints, relative to the configured API base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Discover,
    ExtractReviews,
    AnalyzeReviews,
    AskQuestion,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Discover => "products/discover",
            Endpoint::ExtractReviews => "reviews/extract",
            Endpoint::AnalyzeReviews => "analysis/analyze",
            Endpoint::AskQuestion => "analysis/question",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverRequest {
    pub query: String,
    pub max_per_store: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoverResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub products: ProductsByStore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    pub selected_products: SelectedProducts,
}

/// Extraction metadata echoed into the stored analysis result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_reviews: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_time_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    pub selected_products: SelectedProducts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSentiment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub average_rating: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_reviews: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub positive_percentage: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub neutral_percentage: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub negative_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProsCons {
    #[serde(default, deserialize_with = "null_as_default")]
    pub pros: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cons: Vec<String>,
}

impl ProsCons {
    pub fn is_empty(&self) -> bool {
        self.pros.is_empty() && self.cons.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_overall: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub considerations: Option<String>,
}

impl Recommendations {
    pub fn is_empty(&self) -> bool {
        self.best_overall.is_none() && self.best_value.is_none() && self.considerations.is_none()
    }
}

/// Body of `analysis/analyze`. Every section is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_summary: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sentiment_analysis: BTreeMap<String, StoreSentiment>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pros_cons: ProsCons,
    #[serde(default, deserialize_with = "null_as_default")]
    pub common_themes: Vec<Theme>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub product_comparison: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub key_insights: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommendations: Recommendations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_reviews: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Stored outcome of a successful analyze transition: the analysis payload with
/// the extraction metadata nested under `extract_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(flatten)]
    pub report: AnalysisReport,
    pub extract_data: ExtractionSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_products: Option<SelectedProducts>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<ReviewSource>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
