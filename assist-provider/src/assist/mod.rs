use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Prompt template selected by the assist endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssistAction {
    AnalyzePhoto,
    GenerateTags,
    DescribePhoto,
    /// Anything else: the endpoint forwards the message untemplated.
    FreeForm,
}

impl AssistAction {
    pub fn wire_value(self) -> &'static str {
        match self {
            AssistAction::AnalyzePhoto => "analyze-photo",
            AssistAction::GenerateTags => "generate-tags",
            AssistAction::DescribePhoto => "describe-photo",
            AssistAction::FreeForm => "free-form",
        }
    }
}

/// Errors that can be produced by assist operations.
#[derive(Debug, Error)]
pub enum AssistError {
    #[error("invalid assist configuration: {message}")]
    InvalidConfiguration { message: String },
    #[error("message is empty")]
    EmptyMessage,
    #[error("credential source failure: {message}")]
    Credential { message: String },
    #[error("endpoint failure: {message}")]
    EndpointFailure { message: String },
    #[error("endpoint rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl AssistError {
    /// Authorization failures trigger a credential refresh and one retry.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AssistError::Rejected { status: 401 | 403, .. })
    }
}

#[derive(Debug, Clone, Serialize)]
struct AssistRequest<'a> {
    message: &'a str,
    action: &'a str,
}

/// Token accounting reported by the language model, passed through verbatim.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// Successful assist exchange: the rewritten/expanded text plus usage.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AssistResponse {
    #[serde(default)]
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct AssistErrorBody {
    error: Option<String>,
}

/// Core interface for assist implementations. Timeout and failure handling
/// belong to the caller; any error simply means "no assist available".
#[async_trait]
pub trait AssistProvider: Send + Sync {
    async fn assist(&self, message: &str, action: AssistAction) -> Result<AssistResponse, AssistError>;
}

/// Source of the secret the proxy authenticates with.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn fetch(&self) -> Result<String, AssistError>;
}

/// Fixed secret, for tests and environments without a secret manager.
#[derive(Debug, Clone)]
pub struct StaticCredentialSource(pub String);

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn fetch(&self) -> Result<String, AssistError> {
        Ok(self.0.clone())
    }
}

/// Cache owning one fetched credential with an explicit refresh trigger.
///
/// Injected into the provider instead of living as ambient process state;
/// `invalidate` is called on authorization failures so the next request
/// fetches a fresh value.
pub struct CredentialCache {
    source: Arc<dyn CredentialSource>,
    cached: RwLock<Option<String>>,
}

impl CredentialCache {
    pub fn new(source: Arc<dyn CredentialSource>) -> Self {
        Self { source, cached: RwLock::new(None) }
    }

    pub async fn get(&self) -> Result<String, AssistError> {
        if let Some(value) = self.cached.read().await.clone() {
            return Ok(value);
        }
        let value = self.source.fetch().await?;
        *self.cached.write().await = Some(value.clone());
        Ok(value)
    }

    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}

/// Configuration for the HTTP assist proxy.
#[derive(Debug, Clone)]
pub struct HttpAssistConfig {
    /// Intermediary endpoint accepting `POST {message, action}`.
    pub endpoint: String,
    /// Optional whole-request timeout. None leaves only transport-level
    /// timeouts in place.
    pub timeout_secs: Option<u64>,
}

/// Assist provider that forwards queries to a hosted language model via an
/// intermediary HTTP service.
pub struct HttpAssistProvider {
    client: reqwest::Client,
    endpoint: String,
    credentials: Option<Arc<CredentialCache>>,
}

impl std::fmt::Debug for HttpAssistProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAssistProvider")
            .field("endpoint", &self.endpoint)
            .field("has_credentials", &self.credentials.is_some())
            .finish()
    }
}

impl HttpAssistProvider {
    pub fn new(config: HttpAssistConfig) -> Result<Self, AssistError> {
        if config.endpoint.trim().is_empty() {
            return Err(AssistError::InvalidConfiguration {
                message: "endpoint must not be empty".into(),
            });
        }
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|err| AssistError::InvalidConfiguration {
            message: format!("failed to build HTTP client: {err}"),
        })?;
        Ok(Self { client, endpoint: config.endpoint, credentials: None })
    }

    /// Inject a credential cache; requests then carry `x-api-key`.
    pub fn with_credentials(mut self, cache: Arc<CredentialCache>) -> Self {
        self.credentials = Some(cache);
        self
    }

    async fn post(&self, message: &str, action: AssistAction) -> Result<AssistResponse, AssistError> {
        let body = AssistRequest { message, action: action.wire_value() };
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(cache) = &self.credentials {
            request = request.header("x-api-key", cache.get().await?);
        }

        let response = request
            .send()
            .await
            .map_err(|err| AssistError::EndpointFailure { message: err.to_string() })?;
        let status = response.status();
        if status.is_success() {
            return response
                .json::<AssistResponse>()
                .await
                .map_err(|err| AssistError::EndpointFailure {
                    message: format!("malformed assist response: {err}"),
                });
        }
        let body: AssistErrorBody = response.json().await.unwrap_or_default();
        Err(AssistError::Rejected {
            status: status.as_u16(),
            message: body.error.unwrap_or_else(|| format!("HTTP {status}")),
        })
    }
}

#[async_trait]
impl AssistProvider for HttpAssistProvider {
    async fn assist(&self, message: &str, action: AssistAction) -> Result<AssistResponse, AssistError> {
        if message.trim().is_empty() {
            return Err(AssistError::EmptyMessage);
        }
        match self.post(message, action).await {
            Err(err) if err.is_unauthorized() && self.credentials.is_some() => {
                // Refresh-on-authorization-failure: drop the cached secret
                // and retry once with a fresh one.
                warn!(%err, "assist endpoint rejected credentials; refreshing and retrying");
                if let Some(cache) = &self.credentials {
                    cache.invalidate().await;
                }
                self.post(message, action).await
            }
            other => {
                if other.is_ok() {
                    debug!(action = action.wire_value(), "assist exchange succeeded");
                }
                other
            }
        }
    }
}
