//! Generation Provider Abstraction
//!
//! Capability contracts consumed by the pipeline: text generation, image generation and
//! speech synthesis. Each stage kind calls exactly one capability; the engine only needs
//! "prompt in, artifact out" and never sees transport details.

use crate::config::ProviderSettings;
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub mod openai;

pub use openai::OpenAiClient;

/// Text generation request: model, optional style directive, resolved prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    pub model: String,
    pub system_directive: Option<String>,
    pub prompt: String,
}

/// Image generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub size: String,
    pub quality: String,
    pub style: Option<String>,
}

/// Speech synthesis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub model: String,
    pub text: String,
    pub voice: String,
    pub speed: f32,
    pub format: String,
}

/// A generated image, referenced remotely until the artifact store fetches it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
    /// Prompt as rewritten by the provider, when it reports one
    pub revised_prompt: Option<String>,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, request: &TextRequest) -> Result<String, ProviderError>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, request: &ImageRequest)
        -> Result<GeneratedImage, ProviderError>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Returns the raw encoded audio bytes
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, ProviderError>;
}

/// The three capabilities a run may call
#[derive(Clone)]
pub struct Providers {
    pub text: Arc<dyn TextGenerator>,
    pub image: Arc<dyn ImageGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
}

impl Providers {
    pub fn new(
        text: Arc<dyn TextGenerator>,
        image: Arc<dyn ImageGenerator>,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            text,
            image,
            speech,
        }
    }

    /// One OpenAI-compatible client serving all three capabilities.
    pub fn openai(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let api_key = settings.resolved_api_key().ok_or_else(|| {
            ProviderError::NotConfigured(
                "No API key: set provider.api_key or OPENAI_API_KEY".to_string(),
            )
        })?;
        let client = Arc::new(OpenAiClient::new(
            api_key,
            Some(settings.base_url.clone()),
            settings.temperature,
            settings.max_tokens,
        )?);
        Ok(Self::new(client.clone(), client.clone(), client))
    }
}

/// Map a transport-level reqwest error to a provider error
pub(crate) fn map_http_error(error: reqwest::Error) -> ProviderError {
    if let Some(status) = error.status() {
        match status.as_u16() {
            401 => ProviderError::AuthFailed(format!("Authentication failed: {}", error)),
            429 => ProviderError::RateLimited(format!("Rate limit exceeded: {}", error)),
            404 => ProviderError::ModelNotFound(format!("Model not found: {}", error)),
            _ => ProviderError::RequestFailed(format!(
                "Request failed with status {}: {}",
                status, error
            )),
        }
    } else if error.is_timeout() {
        ProviderError::Transport(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ProviderError::Transport(format!("Connection error: {}", error))
    } else {
        ProviderError::Transport(format!("HTTP error: {}", error))
    }
}

/// Map a non-success HTTP status plus its body to a provider error
pub(crate) fn map_status_error(status: u16, body: &str) -> ProviderError {
    let message = extract_error_message(body);
    match status {
        401 => ProviderError::AuthFailed(format!("Authentication failed: {}", message)),
        429 => ProviderError::RateLimited(format!("Rate limit exceeded: {}", message)),
        404 => ProviderError::ModelNotFound(format!("Model not found: {}", message)),
        _ => ProviderError::RequestFailed(format!(
            "Request failed with status {}: {}",
            status, message
        )),
    }
}

/// Pull `error.message` out of an OpenAI-style error body, else return the body as is.
fn extract_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.trim().is_empty() => "Unknown error".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub(crate) fn build_provider_http_client() -> Result<Client, ProviderError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(PROVIDER_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::Transport(format!("Failed to create HTTP client: {}", e)))
}
