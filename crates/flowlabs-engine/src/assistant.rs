//! In-app assistant chat.

use std::sync::Arc;

use flowlabs_connectors::{ChatMessage, TextGenerator, ASSISTANT_PERSONA};
use flowlabs_core::UserId;
use flowlabs_store::RecordStore;
use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::settings::resolve_text_key;
use crate::types::EngineConfig;

/// Reply used when the model cannot be reached.
pub const CHAT_FALLBACK: &str =
    "I'm having trouble connecting to the brain. Please check your API key in Settings.";

/// An assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    /// Reply text.
    pub text: String,
    /// True when `text` is the fallback rather than a model answer.
    pub degraded: bool,
}

/// Chat front end over a text generator.
pub struct Assistant<S, G>
where
    S: RecordStore + ?Sized,
    G: TextGenerator + ?Sized,
{
    store: Arc<S>,
    generator: Arc<G>,
    config: EngineConfig,
}

impl<S, G> Assistant<S, G>
where
    S: RecordStore + ?Sized,
    G: TextGenerator + ?Sized,
{
    /// Create a new assistant.
    #[must_use]
    pub fn new(store: Arc<S>, generator: Arc<G>, config: EngineConfig) -> Self {
        Self {
            store,
            generator,
            config,
        }
    }

    /// Answer `message` given the earlier turns of the conversation.
    ///
    /// A generation failure yields the fallback reply, not an error.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` for a blank message or
    /// `EngineError::Configuration` if no text generation key is available.
    pub async fn chat(
        &self,
        user: &UserId,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(EngineError::Validation("Message cannot be empty".to_string()));
        }

        let settings = self.store.get_settings(user).await?;
        let api_key = resolve_text_key(settings.as_ref(), &self.config)?;

        match self
            .generator
            .chat(&api_key, ASSISTANT_PERSONA, history, message)
            .await
        {
            Ok(text) => Ok(ChatReply {
                text,
                degraded: false,
            }),
            Err(e) => {
                tracing::warn!(user_id = %user, error = %e, "Assistant reply failed");
                Ok(ChatReply {
                    text: CHAT_FALLBACK.to_string(),
                    degraded: true,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowlabs_connectors::{ChatRole, MockTextGenerator};
    use flowlabs_store::RocksStore;
    use tempfile::TempDir;

    fn assistant(
        generator: MockTextGenerator,
        config: EngineConfig,
    ) -> (Assistant<RocksStore, MockTextGenerator>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        (Assistant::new(store, Arc::new(generator), config), dir)
    }

    fn with_key() -> EngineConfig {
        EngineConfig {
            default_text_api_key: Some("server-key".into()),
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn replies_with_model_text() {
        let (assistant, _dir) = assistant(MockTextGenerator::replying("Try a filter step."), with_key());
        let history = [
            ChatMessage {
                role: ChatRole::User,
                text: "My Make scenario loops".into(),
            },
            ChatMessage {
                role: ChatRole::Model,
                text: "Which module?".into(),
            },
        ];

        let reply = assistant
            .chat(&UserId::generate(), &history, "The iterator")
            .await
            .unwrap();
        assert_eq!(reply.text, "Try a filter step.");
        assert!(!reply.degraded);
        let calls = assistant.generator.calls();
        assert_eq!(calls[0].0, "server-key");
        assert_eq!(calls[0].1, "The iterator");
    }

    #[tokio::test]
    async fn failure_returns_fallback() {
        let (assistant, _dir) = assistant(MockTextGenerator::failing(), with_key());
        let reply = assistant
            .chat(&UserId::generate(), &[], "hello")
            .await
            .unwrap();
        assert_eq!(reply.text, CHAT_FALLBACK);
        assert!(reply.degraded);
    }

    #[tokio::test]
    async fn missing_key_and_blank_message() {
        let (assistant, _dir) = assistant(MockTextGenerator::replying("x"), EngineConfig::default());
        let user = UserId::generate();

        let err = assistant.chat(&user, &[], "hello").await.unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
        let err = assistant.chat(&user, &[], "   ").await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(assistant.generator.call_count(), 0);
    }
}
