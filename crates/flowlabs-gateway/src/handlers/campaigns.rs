//! Campaign launch endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use flowlabs_auth::{IdentityProvider, TokenVerifier};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Send every `New` lead to the campaign webhook and mark them contacted.
///
/// # Errors
///
/// Returns an error if there are no new leads, a launch is already running,
/// or the webhook rejects the trigger.
pub async fn launch<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let report = state
        .services
        .leads
        .launch_campaign(&user.user_id)
        .await?;

    Ok(Json(report))
}
