//! Lead status transitions.
//!
//! # Pipeline
//!
//! ```text
//!   New ──▶ Enriched ──▶ Contacted ──▶ Replied ──▶ Booked
//!    │                                                │
//!    └──────────── (convert to client) ──────────▶ Closed
//! ```
//!
//! Under [`TransitionPolicy::Permissive`] every status is reachable from every
//! other one. [`TransitionPolicy::Strict`] only allows moving forward along the
//! pipeline (skipping stages is fine) and reserves `Closed` for conversion.

use flowlabs_core::LeadId;
use flowlabs_store::LeadStatus;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Which status changes `set_status` accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Any status to any status.
    #[default]
    Permissive,
    /// Forward along the pipeline only; `Closed` only via conversion.
    Strict,
}

/// Whether the source of a transition is a plain status change or a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    /// Caller-driven status change.
    Manual,
    /// Lead converted to a client.
    Conversion,
}

/// Position of a status in the pipeline.
const fn stage(status: LeadStatus) -> u8 {
    match status {
        LeadStatus::New => 0,
        LeadStatus::Enriched => 1,
        LeadStatus::Contacted => 2,
        LeadStatus::Replied => 3,
        LeadStatus::Booked => 4,
        LeadStatus::Closed => 5,
    }
}

impl TransitionPolicy {
    /// Check if a transition is allowed under this policy.
    #[must_use]
    pub const fn allows(self, from: LeadStatus, to: LeadStatus, cause: TransitionCause) -> bool {
        match self {
            Self::Permissive => true,
            Self::Strict => match (to, cause) {
                (LeadStatus::Closed, TransitionCause::Conversion) => true,
                (LeadStatus::Closed, TransitionCause::Manual) => false,
                _ => stage(to) >= stage(from) && !matches!(from, LeadStatus::Closed),
            },
        }
    }

    /// Statuses a lead in `from` may be moved to manually.
    #[must_use]
    pub fn targets_from(self, from: LeadStatus) -> Vec<LeadStatus> {
        LeadStatus::ALL
            .into_iter()
            .filter(|to| self.allows(from, *to, TransitionCause::Manual))
            .collect()
    }

    /// Validate a transition and return the target status if allowed.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` if the policy forbids the change.
    pub fn validate(
        self,
        lead_id: &LeadId,
        from: LeadStatus,
        to: LeadStatus,
        cause: TransitionCause,
    ) -> Result<LeadStatus> {
        if self.allows(from, to, cause) {
            Ok(to)
        } else {
            tracing::debug!(lead_id = %lead_id, %from, %to, "rejected status transition");
            Err(EngineError::Validation(format!(
                "cannot move lead from {from} to {to}"
            )))
        }
    }
}
