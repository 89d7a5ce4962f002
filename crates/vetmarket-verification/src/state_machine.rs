//! Verification State Machine
//!
//! Pure transition rules for verification records. No I/O here; callers
//! persist the mutated record through the record store.
//!
//! | From          | Event   | To       |
//! |---------------|---------|----------|
//! | not_submitted | Submit  | pending  |
//! | pending       | Approve | approved |
//! | pending       | Reject  | rejected |
//! | rejected      | Submit  | pending  |
//!
//! Everything else is an invalid transition. In particular an approved
//! record cannot be reopened by resubmission; re-verification is a
//! separate workflow.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::record::{DocumentRef, SubmissionMetadata, VerificationRecord, VerificationStatus};
use crate::VerificationError;

/// Events that drive the verification state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationEvent {
    Submit,
    Approve,
    Reject,
}

impl VerificationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

impl std::fmt::Display for VerificationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An admin review decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    pub fn event(&self) -> VerificationEvent {
        match self {
            Self::Approve => VerificationEvent::Approve,
            Self::Reject => VerificationEvent::Reject,
        }
    }
}

impl FromStr for ReviewDecision {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The transition table. Returns the target state, or `None` when the
/// event is not allowed from the given state.
pub fn next_status(
    from: VerificationStatus,
    event: VerificationEvent,
) -> Option<VerificationStatus> {
    use VerificationEvent::*;
    use VerificationStatus::*;
    match (from, event) {
        (NotSubmitted, Submit) => Some(Pending),
        (Rejected, Submit) => Some(Pending),
        (Pending, Approve) => Some(Approved),
        (Pending, Reject) => Some(Rejected),
        _ => None,
    }
}

/// Apply a document submission. Overwrites any prior document and
/// role metadata, clears the last decision, and moves to `pending`.
pub fn apply_submit(
    record: &mut VerificationRecord,
    document: DocumentRef,
    metadata: &SubmissionMetadata,
) -> Result<(), VerificationError> {
    let next = next_status(record.status, VerificationEvent::Submit).ok_or(
        VerificationError::InvalidTransition {
            from: record.status,
            event: VerificationEvent::Submit,
        },
    )?;

    record.document = Some(document);
    record.license_number = metadata.license_number.clone();
    record.registration_number = metadata.registration_number.clone();
    record.decided_by = None;
    record.rejection_reason = None;
    record.set_status(next);
    Ok(())
}

/// Apply an admin decision to a pending record.
pub fn apply_decision(
    record: &mut VerificationRecord,
    decision: ReviewDecision,
    decided_by: Option<String>,
    reason: Option<String>,
) -> Result<(), VerificationError> {
    let event = decision.event();
    let next = next_status(record.status, event).ok_or(VerificationError::InvalidTransition {
        from: record.status,
        event,
    })?;

    // Guard: approval requires an attached document. The store invariant
    // already guarantees this for pending records; a violation here means
    // a corrupted record, not a workflow error.
    if decision == ReviewDecision::Approve && record.document.is_none() {
        return Err(VerificationError::InvalidTransition {
            from: record.status,
            event,
        });
    }

    record.decided_by = decided_by;
    record.rejection_reason = match decision {
        ReviewDecision::Reject => reason,
        ReviewDecision::Approve => None,
    };
    record.set_status(next);
    Ok(())
}
