//! Document Upload Pipeline
//!
//! Drives a submission end to end: validate, resolve the profile,
//! upload the document, transition the record, commit. The record's
//! status is never transitioned before the object store confirms the
//! upload, so a failed or abandoned upload leaves the prior record
//! state untouched.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::object_store::{ObjectStore, StoredDocument};
use crate::profiles::ProfileDirectory;
use crate::record::{DocumentRef, ProfileRole, SubmissionMetadata, VerificationRecord};
use crate::state_machine::{self, VerificationEvent};
use crate::store::VerificationRecordStore;
use crate::VerificationError;

/// Transient upload failures are retried this many times before the
/// error surfaces.
pub const DEFAULT_UPLOAD_RETRIES: u32 = 2;

pub struct DocumentUploadPipeline {
    profiles: Arc<dyn ProfileDirectory>,
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn VerificationRecordStore>,
    upload_retries: u32,
}

impl DocumentUploadPipeline {
    pub fn new(
        profiles: Arc<dyn ProfileDirectory>,
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn VerificationRecordStore>,
    ) -> Self {
        Self {
            profiles,
            objects,
            records,
            upload_retries: DEFAULT_UPLOAD_RETRIES,
        }
    }

    pub fn with_upload_retries(mut self, retries: u32) -> Self {
        self.upload_retries = retries;
        self
    }

    /// Submit a proof document for a profile. Returns the committed
    /// record with `status = pending`.
    pub async fn submit(
        &self,
        profile_id: Uuid,
        role: ProfileRole,
        file: &[u8],
        metadata: SubmissionMetadata,
    ) -> Result<VerificationRecord, VerificationError> {
        validate_submission(role, file, &metadata)?;

        let profile = self.profiles.get(profile_id, role).await?;

        let existing = self.records.get_by_profile_id(profile_id).await?;
        let mut record = existing
            .clone()
            .unwrap_or_else(|| VerificationRecord::new(profile_id, role));

        if record.role != role {
            return Err(VerificationError::RoleMismatch {
                id: profile_id,
                declared: role,
                actual: record.role,
            });
        }

        // Refuse before paying for the upload; the same check runs again
        // inside apply_submit.
        if state_machine::next_status(record.status, VerificationEvent::Submit).is_none() {
            return Err(VerificationError::InvalidTransition {
                from: record.status,
                event: VerificationEvent::Submit,
            });
        }

        let key = format!("verification/{}/{}/{}", role, profile_id, Uuid::new_v4());
        let content_type = metadata
            .content_type
            .as_deref()
            .unwrap_or("application/octet-stream");
        let stored = self.upload_with_retry(&key, file, content_type).await?;

        state_machine::apply_submit(
            &mut record,
            DocumentRef {
                url: stored.url,
                storage_id: stored.storage_id,
                content_type: metadata.content_type.clone(),
            },
            &metadata,
        )?;

        // Commit is conditioned on the state observed above; a concurrent
        // writer makes the loser's upload wasted work, never a partial
        // overwrite.
        let committed = match existing {
            Some(prev) => {
                self.records
                    .compare_and_swap_status(profile_id, prev.status, &record)
                    .await?
            }
            None => self.records.upsert_on_submit(&record).await?,
        };

        info!(
            profile_id = %profile_id,
            role = %role,
            profile = %profile.display_name,
            "verification document submitted"
        );
        Ok(committed)
    }

    async fn upload_with_retry(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<StoredDocument, VerificationError> {
        let mut attempt = 0;
        loop {
            match self.objects.put(key, content, content_type).await {
                Ok(stored) => return Ok(stored),
                Err(e) if e.is_transient() && attempt < self.upload_retries => {
                    attempt += 1;
                    warn!(key, attempt, error = %e, "transient upload failure, retrying");
                }
                Err(e) => {
                    return Err(VerificationError::StorageUpload {
                        transient: e.is_transient(),
                        source: e,
                    })
                }
            }
        }
    }
}

fn validate_submission(
    role: ProfileRole,
    file: &[u8],
    metadata: &SubmissionMetadata,
) -> Result<(), VerificationError> {
    if file.is_empty() {
        return Err(VerificationError::Validation(
            "document file is missing or empty".to_string(),
        ));
    }
    for field in role.required_metadata() {
        match metadata.field(*field) {
            Some(value) if !value.trim().is_empty() => {}
            _ => {
                return Err(VerificationError::Validation(format!(
                    "{} is required for {} verification",
                    field.as_str(),
                    role
                )))
            }
        }
    }
    Ok(())
}
