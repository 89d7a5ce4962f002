//! Admin Review Gateway
//!
//! Applies approve/reject decisions to pending records. The commit is a
//! compare-and-swap on the status observed at load time, so two admins
//! deciding the same record concurrently cannot both win: exactly one
//! commits, the other sees `ConcurrentModification` and should report
//! "already reviewed" rather than retry blindly.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::record::VerificationRecord;
use crate::state_machine::{self, ReviewDecision};
use crate::store::VerificationRecordStore;
use crate::VerificationError;

pub struct AdminReviewGateway {
    records: Arc<dyn VerificationRecordStore>,
}

impl AdminReviewGateway {
    pub fn new(records: Arc<dyn VerificationRecordStore>) -> Self {
        Self { records }
    }

    /// Record an admin decision on a pending verification record.
    pub async fn decide(
        &self,
        profile_id: Uuid,
        decision: ReviewDecision,
        decided_by: Option<String>,
        reason: Option<String>,
    ) -> Result<VerificationRecord, VerificationError> {
        let current = self
            .records
            .get_by_profile_id(profile_id)
            .await?
            .ok_or(VerificationError::RecordNotFound(profile_id))?;

        let expected = current.status;
        let mut updated = current;
        state_machine::apply_decision(&mut updated, decision, decided_by, reason)?;

        let committed = self
            .records
            .compare_and_swap_status(profile_id, expected, &updated)
            .await?;

        info!(
            profile_id = %profile_id,
            role = %committed.role,
            decision = %decision,
            "verification decision recorded"
        );
        Ok(committed)
    }
}
