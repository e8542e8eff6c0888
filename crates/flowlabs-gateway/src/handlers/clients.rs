//! Client endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use flowlabs_auth::{IdentityProvider, TokenVerifier};
use flowlabs_engine::{Client, ClientId};

use super::parse_id;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Response for client list.
#[derive(Debug, Serialize)]
pub struct ListClientsResponse {
    /// Clients, newest first.
    pub clients: Vec<Client>,
}

/// List the authenticated user's clients.
///
/// # Errors
///
/// Returns an error if the record store fails.
pub async fn list_clients<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let clients = state.services.leads.list_clients(&user.user_id).await?;
    Ok(Json(ListClientsResponse { clients }))
}

/// Delete a client. Deleting a missing client succeeds.
///
/// # Errors
///
/// Returns an error if the ID is malformed or the record store fails.
pub async fn delete_client<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
    Path(client_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let client_id: ClientId = parse_id("client", &client_id)?;
    state
        .services
        .leads
        .delete_client(&user.user_id, &client_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
