//! Verification Record Store
//!
//! Persistence abstraction for verification records. One record per
//! profile, keyed by `profile_id`. Writers serialize per profile
//! through `compare_and_swap_status`; there is no global lock, so
//! unrelated profiles never contend.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::record::{VerificationRecord, VerificationStatus};
use crate::VerificationError;

/// Persistence for verification records
#[async_trait]
pub trait VerificationRecordStore: Send + Sync {
    /// Load the record for a profile, if one exists
    async fn get_by_profile_id(
        &self,
        profile_id: Uuid,
    ) -> Result<Option<VerificationRecord>, VerificationError>;

    /// Atomic create keyed by `profile_id`, used for the first
    /// submission only. Fails with `ConcurrentModification` if a record
    /// already exists, so concurrent first submissions collapse to one
    /// record and a submission that observed "no record" cannot clobber
    /// a record committed while its upload was in flight. Later
    /// submissions go through `compare_and_swap_status`.
    async fn upsert_on_submit(
        &self,
        record: &VerificationRecord,
    ) -> Result<VerificationRecord, VerificationError>;

    /// Commit `record` only if the stored status still equals
    /// `expected`. Fails with `RecordNotFound` when no record exists,
    /// `ConcurrentModification` when the precondition does not hold.
    async fn compare_and_swap_status(
        &self,
        profile_id: Uuid,
        expected: VerificationStatus,
        record: &VerificationRecord,
    ) -> Result<VerificationRecord, VerificationError>;

    /// All records currently in the given status, oldest first
    async fn list_by_status(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<VerificationRecord>, VerificationError>;
}

/// In-memory record store (POC wiring and tests)
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<HashMap<Uuid, VerificationRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VerificationRecordStore for InMemoryRecordStore {
    async fn get_by_profile_id(
        &self,
        profile_id: Uuid,
    ) -> Result<Option<VerificationRecord>, VerificationError> {
        let records = self.records.read().await;
        Ok(records.get(&profile_id).cloned())
    }

    async fn upsert_on_submit(
        &self,
        record: &VerificationRecord,
    ) -> Result<VerificationRecord, VerificationError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.profile_id) {
            return Err(VerificationError::ConcurrentModification(record.profile_id));
        }
        records.insert(record.profile_id, record.clone());
        Ok(record.clone())
    }

    async fn compare_and_swap_status(
        &self,
        profile_id: Uuid,
        expected: VerificationStatus,
        record: &VerificationRecord,
    ) -> Result<VerificationRecord, VerificationError> {
        // CAS under the single write lock; the lock is held only for the
        // in-memory swap, never across I/O.
        let mut records = self.records.write().await;
        let current = records
            .get_mut(&profile_id)
            .ok_or(VerificationError::RecordNotFound(profile_id))?;

        if current.status != expected {
            return Err(VerificationError::ConcurrentModification(profile_id));
        }

        *current = record.clone();
        Ok(record.clone())
    }

    async fn list_by_status(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<VerificationRecord>, VerificationError> {
        let records = self.records.read().await;
        let mut matching: Vec<VerificationRecord> = records
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.created_at);
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ProfileRole;

    fn pending_record(profile_id: Uuid) -> VerificationRecord {
        let mut record = VerificationRecord::new(profile_id, ProfileRole::Doctor);
        record.document = Some(crate::record::DocumentRef {
            url: "memory://doc".to_string(),
            storage_id: "doc".to_string(),
            content_type: None,
        });
        record.set_status(VerificationStatus::Pending);
        record
    }

    #[tokio::test]
    async fn test_upsert_inserts_at_most_once_per_profile() {
        let store = InMemoryRecordStore::new();
        let profile_id = Uuid::new_v4();

        let first = pending_record(profile_id);
        store.upsert_on_submit(&first).await.unwrap();

        // A concurrent first submission that also observed "no record"
        // loses the insert race instead of overwriting
        let mut second = pending_record(profile_id);
        second.document.as_mut().unwrap().url = "memory://doc-2".to_string();
        let err = store.upsert_on_submit(&second).await.unwrap_err();
        assert!(matches!(err, VerificationError::ConcurrentModification(_)));

        // Still one record; the first write stands
        let stored = store.get_by_profile_id(profile_id).await.unwrap().unwrap();
        assert_eq!(stored.document.unwrap().url, "memory://doc");
        let all = store
            .list_by_status(VerificationStatus::Pending)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_cas_requires_existing_record() {
        let store = InMemoryRecordStore::new();
        let record = pending_record(Uuid::new_v4());

        let err = store
            .compare_and_swap_status(record.profile_id, VerificationStatus::Pending, &record)
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::RecordNotFound(_)));
    }

    #[tokio::test]
    async fn test_cas_race_has_exactly_one_winner() {
        let store = InMemoryRecordStore::new();
        let profile_id = Uuid::new_v4();
        let pending = pending_record(profile_id);
        store.upsert_on_submit(&pending).await.unwrap();

        // Two writers both observed `pending` and race to commit.
        let mut approved = pending.clone();
        approved.set_status(VerificationStatus::Approved);
        let mut rejected = pending.clone();
        rejected.set_status(VerificationStatus::Rejected);

        let first = store
            .compare_and_swap_status(profile_id, VerificationStatus::Pending, &approved)
            .await;
        let second = store
            .compare_and_swap_status(profile_id, VerificationStatus::Pending, &rejected)
            .await;

        assert!(first.is_ok());
        assert!(matches!(
            second,
            Err(VerificationError::ConcurrentModification(_))
        ));

        let stored = store.get_by_profile_id(profile_id).await.unwrap().unwrap();
        assert_eq!(stored.status, VerificationStatus::Approved);
        assert!(stored.is_verified);
    }

    #[tokio::test]
    async fn test_list_by_status_oldest_first() {
        let store = InMemoryRecordStore::new();

        let mut older = pending_record(Uuid::new_v4());
        older.created_at = chrono::Utc::now() - chrono::Duration::minutes(5);
        let newer = pending_record(Uuid::new_v4());

        store.upsert_on_submit(&newer).await.unwrap();
        store.upsert_on_submit(&older).await.unwrap();

        let listed = store
            .list_by_status(VerificationStatus::Pending)
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].profile_id, older.profile_id);
        assert!(store
            .list_by_status(VerificationStatus::Approved)
            .await
            .unwrap()
            .is_empty());
    }
}
