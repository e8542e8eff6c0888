//! Assistant chat endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use flowlabs_auth::{IdentityProvider, TokenVerifier};
use flowlabs_connectors::ChatMessage;

use super::ApiJson;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Request for an assistant reply.
#[derive(Debug, Deserialize)]
pub struct ChatBody {
    /// Earlier turns, oldest first.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    /// The new user message.
    pub message: String,
}

/// Answer a chat message.
///
/// When the model cannot be reached the reply is a fixed fallback with
/// `degraded: true`, not an error.
///
/// # Errors
///
/// Returns an error for a blank message or a missing text generation key.
pub async fn chat<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
    ApiJson(body): ApiJson<ChatBody>,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let reply = state
        .services
        .assistant
        .chat(&user.user_id, &body.history, &body.message)
        .await?;

    Ok(Json(reply))
}
