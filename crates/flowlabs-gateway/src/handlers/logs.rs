//! Automation log endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use flowlabs_auth::{IdentityProvider, TokenVerifier};
use flowlabs_engine::{AutomationLog, RecordLogInput};

use super::ApiJson;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Response for log list.
#[derive(Debug, Serialize)]
pub struct ListLogsResponse {
    /// The most recent entries, newest first.
    pub logs: Vec<AutomationLog>,
}

/// List the authenticated user's recent automation logs.
///
/// # Errors
///
/// Returns an error if the record store fails.
pub async fn list_logs<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let logs = state.services.leads.list_logs(&user.user_id).await?;
    Ok(Json(ListLogsResponse { logs }))
}

/// Append an automation log entry, as reported by an automation run.
///
/// # Errors
///
/// Returns an error if the workflow name is blank or the write fails.
pub async fn record_log<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
    ApiJson(body): ApiJson<RecordLogInput>,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let log = state.services.leads.record_log(&user.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(log)))
}
