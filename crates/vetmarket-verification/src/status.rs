//! Status Query Service
//!
//! Read-only projection of verification records for profile pages and
//! the admin review queue. A profile with no record yet is a valid,
//! expected state and projects as `not_submitted`, not an error.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::record::{ProfileRole, VerificationRecord, VerificationStatus};
use crate::store::VerificationRecordStore;
use crate::VerificationError;

/// What profile pages and admin listings see
#[derive(Debug, Clone, Serialize)]
pub struct VerificationStatusView {
    pub profile_id: Uuid,
    pub role: Option<ProfileRole>,
    pub status: VerificationStatus,
    pub is_verified: bool,
    pub document_url: Option<String>,
    pub license_number: Option<String>,
    pub registration_number: Option<String>,
    pub rejection_reason: Option<String>,
}

impl VerificationStatusView {
    pub fn from_record(record: &VerificationRecord) -> Self {
        Self {
            profile_id: record.profile_id,
            role: Some(record.role),
            status: record.status,
            is_verified: record.is_verified,
            document_url: record.document.as_ref().map(|d| d.url.clone()),
            license_number: record.license_number.clone(),
            registration_number: record.registration_number.clone(),
            rejection_reason: record.rejection_reason.clone(),
        }
    }

    fn not_submitted(profile_id: Uuid) -> Self {
        Self {
            profile_id,
            role: None,
            status: VerificationStatus::NotSubmitted,
            is_verified: false,
            document_url: None,
            license_number: None,
            registration_number: None,
            rejection_reason: None,
        }
    }
}

pub struct StatusQueryService {
    records: Arc<dyn VerificationRecordStore>,
}

impl StatusQueryService {
    pub fn new(records: Arc<dyn VerificationRecordStore>) -> Self {
        Self { records }
    }

    pub async fn get_status(
        &self,
        profile_id: Uuid,
    ) -> Result<VerificationStatusView, VerificationError> {
        let view = match self.records.get_by_profile_id(profile_id).await? {
            Some(record) => VerificationStatusView::from_record(&record),
            None => VerificationStatusView::not_submitted(profile_id),
        };
        Ok(view)
    }

    /// The admin review queue, oldest submission first.
    pub async fn list_pending(&self) -> Result<Vec<VerificationStatusView>, VerificationError> {
        let records = self
            .records
            .list_by_status(VerificationStatus::Pending)
            .await?;
        Ok(records.iter().map(VerificationStatusView::from_record).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DocumentRef;
    use crate::store::InMemoryRecordStore;

    #[tokio::test]
    async fn test_missing_record_projects_as_not_submitted() {
        let store = Arc::new(InMemoryRecordStore::new());
        let service = StatusQueryService::new(store);
        let profile_id = Uuid::new_v4();

        let view = service.get_status(profile_id).await.unwrap();
        assert_eq!(view.status, VerificationStatus::NotSubmitted);
        assert!(!view.is_verified);
        assert!(view.document_url.is_none());
        assert!(view.role.is_none());
    }

    #[tokio::test]
    async fn test_view_projects_record_fields() {
        let store = Arc::new(InMemoryRecordStore::new());
        let profile_id = Uuid::new_v4();
        let mut record = VerificationRecord::new(profile_id, ProfileRole::Doctor);
        record.document = Some(DocumentRef {
            url: "memory://doc".to_string(),
            storage_id: "doc".to_string(),
            content_type: None,
        });
        record.license_number = Some("VET-123".to_string());
        record.set_status(VerificationStatus::Pending);
        store.upsert_on_submit(&record).await.unwrap();

        let service = StatusQueryService::new(store);
        let view = service.get_status(profile_id).await.unwrap();

        assert_eq!(view.status, VerificationStatus::Pending);
        assert_eq!(view.role, Some(ProfileRole::Doctor));
        assert_eq!(view.document_url.as_deref(), Some("memory://doc"));
        assert_eq!(view.license_number.as_deref(), Some("VET-123"));
    }

    #[tokio::test]
    async fn test_list_pending_filters_by_status() {
        let store = Arc::new(InMemoryRecordStore::new());

        let mut pending = VerificationRecord::new(Uuid::new_v4(), ProfileRole::Farmer);
        pending.document = Some(DocumentRef {
            url: "memory://a".to_string(),
            storage_id: "a".to_string(),
            content_type: None,
        });
        pending.set_status(VerificationStatus::Pending);
        store.upsert_on_submit(&pending).await.unwrap();

        let mut approved = VerificationRecord::new(Uuid::new_v4(), ProfileRole::Doctor);
        approved.document = Some(DocumentRef {
            url: "memory://b".to_string(),
            storage_id: "b".to_string(),
            content_type: None,
        });
        approved.set_status(VerificationStatus::Approved);
        store.upsert_on_submit(&approved).await.unwrap();

        let service = StatusQueryService::new(store);
        let queue = service.list_pending().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].profile_id, pending.profile_id);
    }
}
