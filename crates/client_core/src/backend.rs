//! The remote review-intelligence backend, reached over HTTP/JSON.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, redirect, Client};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    error::BackendErrorBody,
    protocol::{
        AnalysisReport, AnalyzeRequest, DiscoverRequest, DiscoverResponse, Endpoint,
        ExtractRequest, ExtractionSummary, QuestionRequest, QuestionResponse,
    },
};
use tracing::{debug, warn};

use crate::{
    config::{validate_api_base, ClientSettings, ConfigError},
    error::ClientError,
    workflow::ContractRevision,
};

/// The four calls the workflow makes. Responses are returned as sent; the
/// controller decides what an `error` field in a 2xx body means.
#[async_trait]
pub trait ReviewBackend: Send + Sync {
    async fn discover(&self, request: DiscoverRequest) -> Result<DiscoverResponse, ClientError>;
    async fn extract_reviews(
        &self,
        request: ExtractRequest,
    ) -> Result<ExtractionSummary, ClientError>;
    async fn analyze_reviews(&self, request: AnalyzeRequest)
        -> Result<AnalysisReport, ClientError>;
    async fn ask_question(&self, request: QuestionRequest)
        -> Result<QuestionResponse, ClientError>;
}

pub struct MissingBackend;

#[async_trait]
impl ReviewBackend for MissingBackend {
    async fn discover(&self, _request: DiscoverRequest) -> Result<DiscoverResponse, ClientError> {
        Err(missing_backend())
    }

    async fn extract_reviews(
        &self,
        _request: ExtractRequest,
    ) -> Result<ExtractionSummary, ClientError> {
        Err(missing_backend())
    }

    async fn analyze_reviews(
        &self,
        _request: AnalyzeRequest,
    ) -> Result<AnalysisReport, ClientError> {
        Err(missing_backend())
    }

    async fn ask_question(
        &self,
        _request: QuestionRequest,
    ) -> Result<QuestionResponse, ClientError> {
        Err(missing_backend())
    }
}

fn missing_backend() -> ClientError {
    ClientError::Transport("no backend configured".into())
}

pub struct HttpBackend {
    http: Client,
    api_base: String,
    contract: ContractRevision,
    discover_timeout: Duration,
    analysis_timeout: Duration,
    question_timeout: Duration,
}

impl HttpBackend {
    pub fn new(settings: &ClientSettings) -> Result<Self, ConfigError> {
        let api_base = validate_api_base(&settings.api_base)?;
        let redirect_policy = if settings.follow_redirects {
            redirect::Policy::default()
        } else {
            redirect::Policy::none()
        };

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let http = Client::builder()
            .default_headers(headers)
            .redirect(redirect_policy)
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            http,
            api_base: api_base.as_str().trim_end_matches('/').to_string(),
            contract: settings.contract,
            discover_timeout: settings.discover_timeout,
            analysis_timeout: settings.analysis_timeout,
            question_timeout: settings.question_timeout,
        })
    }

    /// The session-scoped backend mounts discovery at `products/discover/`
    /// and answers the bare path with a 307.
    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        match (endpoint, self.contract) {
            (Endpoint::Discover, ContractRevision::SessionScoped) => {
                format!("{}/{}/", self.api_base, endpoint.path())
            }
            _ => format!("{}/{}", self.api_base, endpoint.path()),
        }
    }

    async fn post_json<Req, Resp>(
        &self,
        endpoint: Endpoint,
        body: &Req,
        timeout: Duration,
    ) -> Result<Resp, ClientError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint_url(endpoint);
        debug!(endpoint = endpoint.path(), timeout_secs = timeout.as_secs(), "backend: posting request");

        let response = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                warn!(endpoint = endpoint.path(), "backend: request failed: {err}");
                ClientError::Transport(describe_transport_error(&err))
            })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|err| {
            warn!(endpoint = endpoint.path(), "backend: reading body failed: {err}");
            ClientError::Transport(describe_transport_error(&err))
        })?;

        if !status.is_success() {
            let body_message = serde_json::from_slice::<BackendErrorBody>(&bytes)
                .ok()
                .and_then(|body| body.best_message());
            warn!(
                endpoint = endpoint.path(),
                status = status.as_u16(),
                "backend: error response"
            );
            return Err(ClientError::server(
                status.as_u16(),
                body_message,
                status.canonical_reason(),
            ));
        }

        serde_json::from_slice(&bytes).map_err(|err| {
            warn!(endpoint = endpoint.path(), "backend: malformed response: {err}");
            ClientError::from(err)
        })
    }
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

#[async_trait]
impl ReviewBackend for HttpBackend {
    async fn discover(&self, request: DiscoverRequest) -> Result<DiscoverResponse, ClientError> {
        self.post_json(Endpoint::Discover, &request, self.discover_timeout)
            .await
    }

    async fn extract_reviews(
        &self,
        request: ExtractRequest,
    ) -> Result<ExtractionSummary, ClientError> {
        self.post_json(Endpoint::ExtractReviews, &request, self.analysis_timeout)
            .await
    }

    async fn analyze_reviews(
        &self,
        request: AnalyzeRequest,
    ) -> Result<AnalysisReport, ClientError> {
        self.post_json(Endpoint::AnalyzeReviews, &request, self.analysis_timeout)
            .await
    }

    async fn ask_question(
        &self,
        request: QuestionRequest,
    ) -> Result<QuestionResponse, ClientError> {
        self.post_json(Endpoint::AskQuestion, &request, self.question_timeout)
            .await
    }
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
