//! Gemini `generateContent` client.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{remote_error, ConnectorError, Result};
use crate::text::{ChatMessage, ChatRole, GenerationRequest, TextGenerator};

/// Default model used for every request.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for the Gemini client.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<ChatRole>,
    parts: [Part<'a>; 1],
}

impl<'a> Content<'a> {
    const fn new(role: Option<ChatRole>, text: &'a str) -> Self {
        Self {
            role,
            parts: [Part { text }],
        }
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Result<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let trimmed = text.trim();
        if trimmed.is_empty() {
            Err(ConnectorError::EmptyResponse)
        } else {
            Ok(trimmed.to_string())
        }
    }
}

/// HTTP client for the Gemini API.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn generate_content(
        &self,
        api_key: &str,
        body: &GenerateContentRequest<'_>,
    ) -> Result<String> {
        if api_key.trim().is_empty() {
            return Err(ConnectorError::NotConfigured("text generation API key"));
        }

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = remote_error(response, |body| {
                body["error"]["message"].as_str().map(str::to_string)
            })
            .await;
            tracing::error!(model = %self.config.model, error = %err, "text generation failed");
            return Err(err);
        }

        let parsed: GenerateContentResponse = response.json().await?;
        parsed.into_text()
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, api_key: &str, request: &GenerationRequest) -> Result<String> {
        let generation_config =
            (request.temperature.is_some() || request.max_output_tokens.is_some()).then(|| {
                GenerationConfig {
                    temperature: request.temperature,
                    max_output_tokens: request.max_output_tokens,
                }
            });

        let body = GenerateContentRequest {
            contents: vec![Content::new(Some(ChatRole::User), &request.prompt)],
            system_instruction: None,
            generation_config,
        };
        self.generate_content(api_key, &body).await
    }

    async fn chat(
        &self,
        api_key: &str,
        system_instruction: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String> {
        let mut contents: Vec<Content<'_>> = history
            .iter()
            .map(|m| Content::new(Some(m.role), &m.text))
            .collect();
        contents.push(Content::new(Some(ChatRole::User), message));

        let body = GenerateContentRequest {
            contents,
            system_instruction: Some(Content::new(None, system_instruction)),
            generation_config: None,
        };
        self.generate_content(api_key, &body).await
    }
}
