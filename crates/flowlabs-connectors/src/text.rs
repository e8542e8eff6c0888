//! Text generation seam and prompt builders.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// System instruction for the in-app assistant.
pub const ASSISTANT_PERSONA: &str = "You are AutoFlow, an AI assistant for a one-person \
automation agency. You help with prospecting strategies, debugging Make.com/Zapier \
workflows, and writing client reports. You are concise, technical, and helpful.";

/// Sampling temperature for icebreaker lines.
pub const ICEBREAKER_TEMPERATURE: f32 = 0.7;

/// Output token cap for icebreaker lines.
pub const ICEBREAKER_MAX_TOKENS: u32 = 50;

/// A single-turn generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// The prompt text.
    pub prompt: String,
    /// Sampling temperature, service default when `None`.
    pub temperature: Option<f32>,
    /// Output token cap, service default when `None`.
    pub max_output_tokens: Option<u32>,
}

impl GenerationRequest {
    /// A request with service defaults.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The human user.
    User,
    /// The model.
    Model,
}

/// One turn of a chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author of the turn.
    pub role: ChatRole,
    /// Message text.
    pub text: String,
}

/// Trait for text generation backends.
///
/// The API key is passed per call because it belongs to the calling user's
/// settings, not to the process.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a single prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the model returns no text.
    async fn generate(&self, api_key: &str, request: &GenerationRequest) -> Result<String>;

    /// Continue a chat.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the model returns no text.
    async fn chat(
        &self,
        api_key: &str,
        system_instruction: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String>;
}

/// Build the icebreaker request for a lead.
#[must_use]
pub fn icebreaker_prompt(name: &str, company: &str, title: &str) -> GenerationRequest {
    let prompt = format!(
        "Generate a short, professional, and casual \"icebreaker\" personalization line \
for a cold email to a potential client.\n\
Lead Name: {name}\n\
Company: {company}\n\
Title: {title}\n\
The line should compliment them on their role or company growth. Keep it under 20 words."
    );
    GenerationRequest {
        prompt,
        temperature: Some(ICEBREAKER_TEMPERATURE),
        max_output_tokens: Some(ICEBREAKER_MAX_TOKENS),
    }
}

/// Build the agency metrics analysis request.
#[must_use]
pub fn metrics_analysis_prompt(metrics_description: &str) -> GenerationRequest {
    GenerationRequest::new(format!(
        "You are an expert Automation Agency consultant. Analyze the following agency \
metrics and provide 3 brief, actionable bullet points to improve performance:\n\
{metrics_description}\n\n\
Focus on efficiency, conversion rates, and automation health."
    ))
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockTextGenerator;

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::{ChatMessage, GenerationRequest, TextGenerator};
    use crate::error::{ConnectorError, Result};

    /// A scripted text generator for testing.
    #[derive(Default)]
    pub struct MockTextGenerator {
        reply: Option<String>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl MockTextGenerator {
        /// A generator that always answers `reply`.
        #[must_use]
        pub fn replying(reply: impl Into<String>) -> Self {
            Self {
                reply: Some(reply.into()),
                calls: Mutex::default(),
            }
        }

        /// A generator that always fails with a remote error.
        #[must_use]
        pub fn failing() -> Self {
            Self::default()
        }

        /// Number of calls made so far.
        #[must_use]
        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        /// `(api_key, prompt)` of every call so far.
        #[must_use]
        pub fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().clone()
        }

        fn answer(&self, api_key: &str, prompt: &str) -> Result<String> {
            self.calls
                .lock()
                .push((api_key.to_string(), prompt.to_string()));
            self.reply.clone().ok_or_else(|| ConnectorError::Remote {
                status: 400,
                message: "API key not valid".to_string(),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for MockTextGenerator {
        async fn generate(&self, api_key: &str, request: &GenerationRequest) -> Result<String> {
            self.answer(api_key, &request.prompt)
        }

        async fn chat(
            &self,
            api_key: &str,
            _system_instruction: &str,
            _history: &[ChatMessage],
            message: &str,
        ) -> Result<String> {
            self.answer(api_key, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icebreaker_prompt_mentions_lead() {
        let request = icebreaker_prompt("Alice Chen", "TechFlow", "CTO");
        assert!(request.prompt.contains("Lead Name: Alice Chen"));
        assert!(request.prompt.contains("Company: TechFlow"));
        assert!(request.prompt.contains("Title: CTO"));
        assert!(request.prompt.contains("under 20 words"));
        assert_eq!(request.max_output_tokens, Some(ICEBREAKER_MAX_TOKENS));
        assert_eq!(request.temperature, Some(ICEBREAKER_TEMPERATURE));
    }

    #[test]
    fn metrics_prompt_embeds_description() {
        let request = metrics_analysis_prompt("Pipeline value: $6000");
        assert!(request.prompt.contains("Pipeline value: $6000"));
        assert!(request.prompt.contains("3 brief, actionable bullet points"));
        assert!(request.temperature.is_none());
    }

    #[test]
    fn chat_role_wire_format() {
        let msg = ChatMessage {
            role: ChatRole::Model,
            text: "hi".into(),
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"role":"model","text":"hi"}"#
        );
    }
}
