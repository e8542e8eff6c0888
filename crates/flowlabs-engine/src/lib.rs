//! Lead lifecycle and aggregate metrics for FlowLabs.
//!
//! This crate holds the business logic of the CRM: how leads are created,
//! moved through the pipeline and converted into clients, and how dashboard
//! and report numbers are derived from the stored records.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Gateway (HTTP)                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  LeadLifecycle   DashboardService   Assistant   Billing     │
//! │  ┌───────────┐   ┌──────────────┐   SettingsService         │
//! │  │ lifecycle │   │   metrics    │   ImportService           │
//! │  │  (policy) │   │ (pure fns)   │                           │
//! │  └───────────┘   └──────────────┘                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┼──────────────┐
//!               ▼              ▼              ▼
//!        ┌──────────┐   ┌──────────┐   ┌────────────┐
//!        │  Store   │   │   Text   │   │ Webhook /  │
//!        │(REST/Rocks)  │(Gemini)  │   │ Payment    │
//!        └──────────┘   └──────────┘   └────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use flowlabs_connectors::{GeminiClient, GeminiConfig};
//! use flowlabs_engine::{CreateLeadInput, EngineConfig, LeadLifecycle};
//! use flowlabs_store::RocksStore;
//! use flowlabs_core::UserId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/flowlabs")?);
//! let generator = Arc::new(GeminiClient::new(GeminiConfig::default())?);
//! let leads = LeadLifecycle::new(store, generator, EngineConfig::default());
//!
//! let user = UserId::generate();
//! let lead = leads
//!     .create_lead(&user, CreateLeadInput::new("Alice Chen", "alice@techflow.io"))
//!     .await?;
//! let conversion = leads.convert_to_client(&user, &lead.id).await?;
//!
//! println!("Converted {} into client {}", lead.name, conversion.client.id);
//! # Ok(())
//! # }
//! ```
//!
//! # Lead statuses
//!
//! `New → Enriched → Contacted → Replied → Booked`, with `Closed` reached by
//! conversion. By default any status may be set from any other; see
//! [`lifecycle::TransitionPolicy`] for the strict alternative.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod assistant;
pub mod billing;
pub mod dashboard;
pub mod error;
pub mod guard;
pub mod import;
pub mod leads;
pub mod lifecycle;
pub mod metrics;
pub mod random;
pub mod settings;
pub mod types;

#[cfg(test)]
mod test_support;

pub use assistant::{Assistant, ChatReply, CHAT_FALLBACK};
pub use billing::{BillingService, PaymentConfirmation};
pub use dashboard::{Collection, DashboardService, DashboardSnapshot, EMPTY_ANALYSIS};
pub use error::{EngineError, ErrorKind, Result};
pub use guard::{Action, SubmissionGuard};
pub use import::{ImportReport, ImportService, ImportTable};
pub use leads::{
    CampaignReport, Conversion, LeadLifecycle, PersonalizationOutcome, EMPTY_PERSONALIZATION,
    PERSONALIZATION_PLACEHOLDER,
};
pub use lifecycle::{TransitionCause, TransitionPolicy};
pub use metrics::{
    board_columns, compute_dashboard_stats, compute_reporting_metrics, recent_activity,
    ActivityItem, BoardColumn, DashboardStats, ReportingMetrics, WeeklyPoint,
};
pub use random::{FixedRandom, RandomSource, SeededRandom, ThreadRandom};
pub use settings::SettingsService;
pub use types::{CreateLeadInput, EngineConfig, RecordLogInput};

// Re-export commonly used types from dependencies for convenience
pub use flowlabs_core::{ClientId, LeadId, LogId, UserId};
pub use flowlabs_store::{
    AutomationLog, Client, ClientStatus, Lead, LeadStatus, LogStatus, SettingsUpdate,
    SubscriptionTier, UserSettings,
};
