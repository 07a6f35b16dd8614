//! OpenAI-compatible client serving chat completions, image generation and speech.

use super::{
    build_provider_http_client, map_http_error, map_status_error, GeneratedImage, ImageGenerator,
    ImageRequest, SpeechRequest, SpeechSynthesizer, TextGenerator, TextRequest,
};
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Only this image model accepts the `style` parameter
const STYLE_CAPABLE_IMAGE_MODEL: &str = "dall-e-3";

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiClient {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Self, ProviderError> {
        let client = build_provider_http_client()?;
        let base_url = base_url
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            api_key,
            base_url,
            temperature,
            max_tokens,
        })
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, &error_text));
        }

        Ok(response)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn chat_request(request: &TextRequest, temperature: f32, max_tokens: u32) -> ChatCompletionRequest<'_> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = request
        .system_directive
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: &request.prompt,
    });

    ChatCompletionRequest {
        model: &request.model,
        messages,
        temperature,
        max_tokens,
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate_text(&self, request: &TextRequest) -> Result<String, ProviderError> {
        let body = chat_request(request, self.temperature, self.max_tokens);
        let response = self.post_json("chat/completions", &body).await?;

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

#[derive(Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    quality: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a str>,
}

#[derive(Deserialize)]
struct ImageGenerationResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
    revised_prompt: Option<String>,
}

fn image_request(request: &ImageRequest) -> ImageGenerationRequest<'_> {
    let style = if request.model == STYLE_CAPABLE_IMAGE_MODEL {
        request.style.as_deref()
    } else {
        None
    };
    ImageGenerationRequest {
        model: &request.model,
        prompt: &request.prompt,
        n: 1,
        size: &request.size,
        quality: &request.quality,
        style,
    }
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<GeneratedImage, ProviderError> {
        let body = image_request(request);
        let response = self.post_json("images/generations", &body).await?;

        let generated: ImageGenerationResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse image response: {}", e))
        })?;

        let image = generated
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No image in response".to_string()))?;
        let url = image
            .url
            .ok_or_else(|| ProviderError::InvalidResponse("Image has no URL".to_string()))?;

        debug!(url = %url, "Image generated");
        Ok(GeneratedImage {
            url,
            revised_prompt: image.revised_prompt,
        })
    }
}

#[derive(Serialize)]
struct SpeechGenerationRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'a str,
}

#[async_trait]
impl SpeechSynthesizer for OpenAiClient {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, ProviderError> {
        let body = SpeechGenerationRequest {
            model: &request.model,
            input: &request.text,
            voice: &request.voice,
            speed: request.speed,
            response_format: &request.format,
        };
        let response = self.post_json("audio/speech", &body).await?;

        let bytes = response.bytes().await.map_err(map_http_error)?;
        if bytes.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "Speech response was empty".to_string(),
            ));
        }
        Ok(bytes.to_vec())
    }
}
