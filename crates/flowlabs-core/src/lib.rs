//! Core types and utilities for FlowLabs.
//!
//! This crate provides the strongly-typed IDs for users, leads, clients and
//! automation logs used throughout the FlowLabs workspace.
//!
//! # Example
//!
//! ```
//! use flowlabs_core::{LeadId, UserId};
//!
//! // User IDs come from the identity provider as UUID strings
//! let user_id: UserId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
//!
//! // Record IDs are generated locally
//! let lead_id = LeadId::generate();
//! assert_ne!(lead_id.to_string(), user_id.to_string());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ids;

pub use ids::{ClientId, IdError, LeadId, LogId, UserId};
