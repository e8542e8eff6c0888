//! HTTP request handlers.
//!
//! This module contains all the endpoint handlers for the gateway API.

use std::str::FromStr;

use axum::extract::FromRequest;

use crate::error::ApiError;

pub mod assistant;
pub mod auth;
pub mod billing;
pub mod campaigns;
pub mod clients;
pub mod dashboard;
pub mod health;
pub mod imports;
pub mod leads;
pub mod logs;
pub mod settings;

/// Parse a record ID taken from the request path.
fn parse_id<T: FromStr>(entity: &str, raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid {entity} ID: {raw}")))
}

/// A JSON request body whose rejections use the API error format.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
