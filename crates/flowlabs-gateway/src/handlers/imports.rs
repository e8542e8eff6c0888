//! Spreadsheet import endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use flowlabs_auth::{IdentityProvider, TokenVerifier};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Import the leads, clients and logs tables named in the user's settings.
///
/// # Errors
///
/// Returns an error if the data source credentials are missing or an import
/// is already running. Tables that fail are listed in the report instead.
pub async fn import_all<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let report = state.services.imports.import_all(&user.user_id).await?;
    Ok(Json(report))
}
