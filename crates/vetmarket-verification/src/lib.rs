//! Identity and Document Verification Core
//!
//! Doctor, farmer, and medical-store profiles on the marketplace must
//! submit a proof document (plus role-specific license or registration
//! data) which an administrator approves or rejects before the
//! profile's verified flag unlocks role-gated features.
//!
//! ## Architecture
//!
//! - [`profiles`]: resolves a user/profile id + declared role to the
//!   profile record it owns
//! - [`object_store`]: durable storage capability for document binaries
//! - [`record`] / [`state_machine`]: the verification record and its
//!   pure transition rules
//! - [`store`]: one record per profile, insert-if-absent create and
//!   compare-and-swap commit
//! - [`pipeline`]: validates a submission, uploads the document, and
//!   commits the `pending` transition only after storage confirms
//! - [`review`]: admin approve/reject, serialized per profile via CAS
//! - [`status`]: read-only projection for profile pages and the admin
//!   queue
//!
//! Enable the `database` feature for the Postgres-backed record store.

pub mod notify;
pub mod object_store;
pub mod pipeline;
pub mod profiles;
pub mod record;
pub mod review;
pub mod state_machine;
pub mod status;
pub mod store;

#[cfg(feature = "database")]
pub mod pg_store;

pub use notify::{DecisionNotifier, LogNotifier};
pub use object_store::{
    InMemoryObjectStore, LocalObjectStore, ObjectStore, ObjectStoreError, StoredDocument,
};
pub use pipeline::DocumentUploadPipeline;
pub use profiles::{InMemoryProfileDirectory, ProfileDirectory, ProfileRef};
pub use record::{
    DocumentRef, MetadataField, ProfileRole, SubmissionMetadata, VerificationRecord,
    VerificationStatus,
};
pub use review::AdminReviewGateway;
pub use state_machine::{ReviewDecision, VerificationEvent};
pub use status::{StatusQueryService, VerificationStatusView};
pub use store::{InMemoryRecordStore, VerificationRecordStore};

#[cfg(feature = "database")]
pub use pg_store::PgRecordStore;

use record::{ProfileRole as Role, VerificationStatus as Status};
use state_machine::VerificationEvent as Event;
use uuid::Uuid;

/// Error taxonomy for the verification core
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    /// No profile exists for the given id and role
    #[error("no {role} profile found for {id}")]
    ProfileNotFound { id: Uuid, role: Role },

    /// The profile exists but is registered under a different role
    #[error("profile {id} is registered as {actual}, not {declared}")]
    RoleMismatch {
        id: Uuid,
        declared: Role,
        actual: Role,
    },

    /// Missing file or required field; fix the submission and retry
    #[error("invalid submission: {0}")]
    Validation(String),

    /// Document upload failed after any applicable retries
    #[error("document upload failed: {source}")]
    StorageUpload {
        transient: bool,
        #[source]
        source: object_store::ObjectStoreError,
    },

    /// The attempted transition violates the state graph
    #[error("cannot {event} a verification record in state {from}")]
    InvalidTransition { from: Status, event: Event },

    /// Lost a compare-and-swap race; the record was already decided or
    /// updated by someone else
    #[error("verification record for profile {0} was already updated")]
    ConcurrentModification(Uuid),

    /// No verification record exists where one was required
    #[error("no verification record exists for profile {0}")]
    RecordNotFound(Uuid),

    /// Record store backend failure
    #[error("record store error: {0}")]
    Backend(String),
}
