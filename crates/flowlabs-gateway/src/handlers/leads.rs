//! Lead endpoints.
//!
//! Creation, status changes, icebreaker lines, the prospecting board and
//! conversion into a client.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use flowlabs_auth::{IdentityProvider, TokenVerifier};
use flowlabs_engine::{BoardColumn, CreateLeadInput, Lead, LeadId, LeadStatus};
use flowlabs_store::UnknownStatus;

use super::{parse_id, ApiJson};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Response for lead list.
#[derive(Debug, Serialize)]
pub struct ListLeadsResponse {
    /// Leads, newest first.
    pub leads: Vec<Lead>,
}

/// Response for the prospecting board.
#[derive(Debug, Serialize)]
pub struct BoardResponse {
    /// Board columns in display order.
    pub columns: Vec<BoardColumn>,
}

/// Request to change a lead's status.
#[derive(Debug, Deserialize)]
pub struct SetStatusBody {
    /// The new status name, matched case-insensitively.
    pub status: String,
}

impl SetStatusBody {
    /// Parse the requested status.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if the name is not a lead status.
    pub fn parse(&self) -> Result<LeadStatus, ApiError> {
        self.status
            .parse()
            .map_err(|e: UnknownStatus| ApiError::BadRequest(e.to_string()))
    }
}

/// Request to store an edited icebreaker line.
#[derive(Debug, Deserialize)]
pub struct PersonalizationBody {
    /// The line to store.
    pub line: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// List the authenticated user's leads.
///
/// # Errors
///
/// Returns an error if the record store fails.
pub async fn list_leads<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let leads = state.services.leads.list_leads(&user.user_id).await?;
    Ok(Json(ListLeadsResponse { leads }))
}

/// Create a lead.
///
/// # Errors
///
/// Returns an error if the name or email is missing or the write fails.
pub async fn create_lead<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
    ApiJson(body): ApiJson<CreateLeadInput>,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let lead = state.services.leads.create_lead(&user.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

/// Leads grouped into prospecting board columns.
///
/// # Errors
///
/// Returns an error if the record store fails.
pub async fn board<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let columns = state.services.dashboard.board(&user.user_id).await?;
    Ok(Json(BoardResponse { columns }))
}

/// Delete a lead. Deleting a missing lead succeeds.
///
/// # Errors
///
/// Returns an error if the ID is malformed or the record store fails.
pub async fn delete_lead<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
    Path(lead_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let lead_id: LeadId = parse_id("lead", &lead_id)?;
    state
        .services
        .leads
        .delete_lead(&user.user_id, &lead_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Change a lead's status.
///
/// # Errors
///
/// Returns an error if the lead is not found or the transition is rejected.
pub async fn set_status<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
    Path(lead_id): Path<String>,
    ApiJson(body): ApiJson<SetStatusBody>,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let lead_id: LeadId = parse_id("lead", &lead_id)?;
    let status = body.parse()?;
    let lead = state
        .services
        .leads
        .set_status(&user.user_id, &lead_id, status)
        .await?;

    Ok(Json(lead))
}

/// Generate an icebreaker line.
///
/// A failed generation still answers `200 OK`, with `"outcome": "failed"` and
/// the placeholder text to show.
///
/// # Errors
///
/// Returns an error if no text generation key is configured or the lead is
/// not found.
pub async fn generate_personalization<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
    Path(lead_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let lead_id: LeadId = parse_id("lead", &lead_id)?;
    let outcome = state
        .services
        .leads
        .generate_personalization(&user.user_id, &lead_id)
        .await?;

    Ok(Json(outcome))
}

/// Store an edited icebreaker line.
///
/// # Errors
///
/// Returns an error if the line is blank or the lead is not found.
pub async fn save_personalization<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
    Path(lead_id): Path<String>,
    ApiJson(body): ApiJson<PersonalizationBody>,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let lead_id: LeadId = parse_id("lead", &lead_id)?;
    let lead = state
        .services
        .leads
        .save_personalization(&user.user_id, &lead_id, &body.line)
        .await?;

    Ok(Json(lead))
}

/// Convert a lead into a client.
///
/// # Errors
///
/// Returns an error if the lead is not found, a conversion is already
/// running, or either write fails.
pub async fn convert<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
    Path(lead_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let lead_id: LeadId = parse_id("lead", &lead_id)?;
    let conversion = state
        .services
        .leads
        .convert_to_client(&user.user_id, &lead_id)
        .await?;

    Ok((StatusCode::CREATED, Json(conversion)))
}
