//! Decision Notifications
//!
//! Fire-and-forget hook the web layer invokes after a successful admin
//! decision. Delivery (email, in-app) is an external collaborator; the
//! default implementation just traces. Kept out of the upload pipeline
//! and gateway so commit logic stays decoupled from delivery concerns.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::record::ProfileRole;
use crate::state_machine::ReviewDecision;

#[async_trait]
pub trait DecisionNotifier: Send + Sync {
    async fn decision_recorded(
        &self,
        profile_id: Uuid,
        role: ProfileRole,
        decision: ReviewDecision,
    );
}

/// Default notifier: log and move on
pub struct LogNotifier;

#[async_trait]
impl DecisionNotifier for LogNotifier {
    async fn decision_recorded(
        &self,
        profile_id: Uuid,
        role: ProfileRole,
        decision: ReviewDecision,
    ) {
        info!(
            profile_id = %profile_id,
            role = %role,
            decision = %decision,
            "notifying profile of verification decision"
        );
    }
}
