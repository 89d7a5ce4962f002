//! Postgres Record Store
//!
//! sqlx-backed implementation of [`VerificationRecordStore`]. First
//! submission is `INSERT ... ON CONFLICT DO NOTHING` on the
//! `profile_id` primary key; compare-and-swap is a conditional
//! `UPDATE`. Both are checked via `rows_affected`, so same-profile
//! writers linearize at the database without any application-level
//! lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use crate::record::{
    DocumentRef, ProfileRole, VerificationRecord, VerificationStatus,
};
use crate::store::VerificationRecordStore;
use crate::VerificationError;

pub struct PgRecordStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    profile_id: Uuid,
    role: String,
    status: String,
    is_verified: bool,
    document_url: Option<String>,
    document_storage_id: Option<String>,
    document_content_type: Option<String>,
    license_number: Option<String>,
    registration_number: Option<String>,
    decided_by: Option<String>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RecordRow {
    fn into_record(self) -> Result<VerificationRecord, VerificationError> {
        let role = ProfileRole::from_str(&self.role)
            .map_err(|e| VerificationError::Backend(e.to_string()))?;
        let status = VerificationStatus::from_str(&self.status)
            .map_err(|e| VerificationError::Backend(e.to_string()))?;
        let document = match (self.document_url, self.document_storage_id) {
            (Some(url), Some(storage_id)) => Some(DocumentRef {
                url,
                storage_id,
                content_type: self.document_content_type,
            }),
            _ => None,
        };
        Ok(VerificationRecord {
            profile_id: self.profile_id,
            role,
            status,
            is_verified: self.is_verified,
            document,
            license_number: self.license_number,
            registration_number: self.registration_number,
            decided_by: self.decided_by,
            rejection_reason: self.rejection_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, VerificationError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(backend_err)?;
        Ok(Self::new(pool))
    }

    /// Create the backing table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<(), VerificationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS verification_records (
                profile_id UUID PRIMARY KEY,
                role TEXT NOT NULL,
                status TEXT NOT NULL,
                is_verified BOOLEAN NOT NULL,
                document_url TEXT,
                document_storage_id TEXT,
                document_content_type TEXT,
                license_number TEXT,
                registration_number TEXT,
                decided_by TEXT,
                rejection_reason TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }
}

fn backend_err(e: sqlx::Error) -> VerificationError {
    VerificationError::Backend(e.to_string())
}

#[async_trait]
impl VerificationRecordStore for PgRecordStore {
    async fn get_by_profile_id(
        &self,
        profile_id: Uuid,
    ) -> Result<Option<VerificationRecord>, VerificationError> {
        let row: Option<RecordRow> = sqlx::query_as(
            "SELECT * FROM verification_records WHERE profile_id = $1",
        )
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_err)?;

        row.map(RecordRow::into_record).transpose()
    }

    async fn upsert_on_submit(
        &self,
        record: &VerificationRecord,
    ) -> Result<VerificationRecord, VerificationError> {
        // Insert-if-absent: a competing writer that created the record
        // while this submission's upload was in flight wins; the
        // conflict surfaces as a lost race, never an overwrite.
        let result = sqlx::query(
            r#"
            INSERT INTO verification_records (
                profile_id, role, status, is_verified,
                document_url, document_storage_id, document_content_type,
                license_number, registration_number,
                decided_by, rejection_reason, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (profile_id) DO NOTHING
            "#,
        )
        .bind(record.profile_id)
        .bind(record.role.as_str())
        .bind(record.status.as_str())
        .bind(record.is_verified)
        .bind(record.document.as_ref().map(|d| d.url.clone()))
        .bind(record.document.as_ref().map(|d| d.storage_id.clone()))
        .bind(
            record
                .document
                .as_ref()
                .and_then(|d| d.content_type.clone()),
        )
        .bind(record.license_number.clone())
        .bind(record.registration_number.clone())
        .bind(record.decided_by.clone())
        .bind(record.rejection_reason.clone())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        if result.rows_affected() == 0 {
            return Err(VerificationError::ConcurrentModification(record.profile_id));
        }

        Ok(record.clone())
    }

    async fn compare_and_swap_status(
        &self,
        profile_id: Uuid,
        expected: VerificationStatus,
        record: &VerificationRecord,
    ) -> Result<VerificationRecord, VerificationError> {
        let result = sqlx::query(
            r#"
            UPDATE verification_records SET
                status = $3,
                is_verified = $4,
                document_url = $5,
                document_storage_id = $6,
                document_content_type = $7,
                license_number = $8,
                registration_number = $9,
                decided_by = $10,
                rejection_reason = $11,
                updated_at = $12
            WHERE profile_id = $1 AND status = $2
            "#,
        )
        .bind(profile_id)
        .bind(expected.as_str())
        .bind(record.status.as_str())
        .bind(record.is_verified)
        .bind(record.document.as_ref().map(|d| d.url.clone()))
        .bind(record.document.as_ref().map(|d| d.storage_id.clone()))
        .bind(
            record
                .document
                .as_ref()
                .and_then(|d| d.content_type.clone()),
        )
        .bind(record.license_number.clone())
        .bind(record.registration_number.clone())
        .bind(record.decided_by.clone())
        .bind(record.rejection_reason.clone())
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        if result.rows_affected() == 0 {
            // Distinguish a lost race from a missing record
            return match self.get_by_profile_id(profile_id).await? {
                Some(_) => Err(VerificationError::ConcurrentModification(profile_id)),
                None => Err(VerificationError::RecordNotFound(profile_id)),
            };
        }

        Ok(record.clone())
    }

    async fn list_by_status(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<VerificationRecord>, VerificationError> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT * FROM verification_records WHERE status = $1 ORDER BY created_at",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(backend_err)?;

        rows.into_iter().map(RecordRow::into_record).collect()
    }
}
