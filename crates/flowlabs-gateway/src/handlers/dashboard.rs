//! Dashboard, reporting and activity endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use flowlabs_auth::{IdentityProvider, TokenVerifier};
use flowlabs_engine::ActivityItem;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Response for the activity feed.
#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    /// Newest entries first.
    pub activity: Vec<ActivityItem>,
}

/// Response for the metrics analysis.
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    /// Suggestions from the text generator.
    pub analysis: String,
}

/// Dashboard stats.
///
/// Clients and logs that could not be loaded are counted as empty and listed
/// under `degraded`.
///
/// # Errors
///
/// Returns an error if the leads cannot be loaded.
pub async fn dashboard<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let snapshot = state.services.dashboard.load(&user.user_id).await?;
    Ok(Json(snapshot))
}

/// Performance report as of now.
///
/// # Errors
///
/// Returns an error if the leads cannot be loaded.
pub async fn reporting<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let report = state
        .services
        .dashboard
        .reporting(&user.user_id, Utc::now())
        .await?;

    Ok(Json(report))
}

/// Recent activity feed.
///
/// # Errors
///
/// Returns an error if the leads cannot be loaded.
pub async fn activity<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let activity = state.services.dashboard.activity(&user.user_id).await?;
    Ok(Json(ActivityResponse { activity }))
}

/// Ask for improvement suggestions based on the current metrics.
///
/// # Errors
///
/// Returns an error if no text generation key is configured or generation
/// fails.
pub async fn analysis<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let analysis = state.services.dashboard.analyze(&user.user_id).await?;
    Ok(Json(AnalysisResponse { analysis }))
}
