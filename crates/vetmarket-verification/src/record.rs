//! Verification Record Types
//!
//! One polymorphic `VerificationRecord` per profile, tagged by the role
//! that owns it. The three marketplace roles share the same record shape
//! and state machine; only the required submission metadata differs,
//! driven by the per-role table in [`ProfileRole::required_metadata`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Profile kinds that carry a verification record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileRole {
    Doctor,
    Farmer,
    MedicalStore,
}

impl ProfileRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Doctor => "doctor",
            Self::Farmer => "farmer",
            Self::MedicalStore => "medical_store",
        }
    }

    /// Metadata fields a submission for this role must carry.
    pub fn required_metadata(&self) -> &'static [MetadataField] {
        match self {
            Self::Doctor => &[MetadataField::LicenseNumber],
            Self::MedicalStore => &[MetadataField::RegistrationNumber],
            Self::Farmer => &[],
        }
    }
}

impl FromStr for ProfileRole {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "doctor" => Ok(Self::Doctor),
            "farmer" => Ok(Self::Farmer),
            "medical_store" => Ok(Self::MedicalStore),
            _ => Err(UnknownRoleError(s.to_string())),
        }
    }
}

impl std::fmt::Display for ProfileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown profile role: {0}")]
pub struct UnknownRoleError(pub String);

/// Role-specific metadata fields collected at submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    LicenseNumber,
    RegistrationNumber,
}

impl MetadataField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LicenseNumber => "license_number",
            Self::RegistrationNumber => "registration_number",
        }
    }
}

/// Review status of a verification record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    NotSubmitted,
    Pending,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotSubmitted => "not_submitted",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// `is_verified` is derived from status, never set independently.
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl FromStr for VerificationStatus {
    type Err = UnknownStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_submitted" => Ok(Self::NotSubmitted),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(UnknownStatusError(s.to_string())),
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown verification status: {0}")]
pub struct UnknownStatusError(pub String);

/// Stable reference to an uploaded proof document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub url: String,
    pub storage_id: String,
    pub content_type: Option<String>,
}

/// Role-specific fields accompanying a document submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionMetadata {
    pub license_number: Option<String>,
    pub registration_number: Option<String>,
    pub content_type: Option<String>,
}

impl SubmissionMetadata {
    pub fn field(&self, field: MetadataField) -> Option<&str> {
        match field {
            MetadataField::LicenseNumber => self.license_number.as_deref(),
            MetadataField::RegistrationNumber => self.registration_number.as_deref(),
        }
    }
}

/// The verification record tracking document submission and review for
/// one profile. At most one exists per `profile_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub profile_id: Uuid,
    pub role: ProfileRole,
    pub status: VerificationStatus,
    /// Denormalized from `status`; written in the same commit.
    pub is_verified: bool,
    /// Present whenever `status != not_submitted`.
    pub document: Option<DocumentRef>,
    pub license_number: Option<String>,
    pub registration_number: Option<String>,
    /// Admin who recorded the last decision.
    pub decided_by: Option<String>,
    /// Set on rejection, cleared on resubmission.
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VerificationRecord {
    /// Create a fresh record in the initial state.
    pub fn new(profile_id: Uuid, role: ProfileRole) -> Self {
        let now = Utc::now();
        Self {
            profile_id,
            role,
            status: VerificationStatus::NotSubmitted,
            is_verified: false,
            document: None,
            license_number: None,
            registration_number: None,
            decided_by: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set status and the derived flag together, advancing `updated_at`.
    pub(crate) fn set_status(&mut self, status: VerificationStatus) {
        self.status = status;
        self.is_verified = status.is_verified();
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [
            ProfileRole::Doctor,
            ProfileRole::Farmer,
            ProfileRole::MedicalStore,
        ] {
            assert_eq!(role.as_str().parse::<ProfileRole>().unwrap(), role);
        }
        assert!("veterinarian".parse::<ProfileRole>().is_err());
    }

    #[test]
    fn test_required_metadata_table() {
        assert_eq!(
            ProfileRole::Doctor.required_metadata(),
            &[MetadataField::LicenseNumber][..]
        );
        assert_eq!(
            ProfileRole::MedicalStore.required_metadata(),
            &[MetadataField::RegistrationNumber][..]
        );
        assert!(ProfileRole::Farmer.required_metadata().is_empty());
    }

    #[test]
    fn test_is_verified_derivation() {
        assert!(VerificationStatus::Approved.is_verified());
        assert!(!VerificationStatus::Pending.is_verified());
        assert!(!VerificationStatus::Rejected.is_verified());
        assert!(!VerificationStatus::NotSubmitted.is_verified());
    }

    #[test]
    fn test_new_record_initial_state() {
        let record = VerificationRecord::new(Uuid::new_v4(), ProfileRole::Farmer);
        assert_eq!(record.status, VerificationStatus::NotSubmitted);
        assert!(!record.is_verified);
        assert!(record.document.is_none());
    }

    #[test]
    fn test_set_status_keeps_flag_in_sync() {
        let mut record = VerificationRecord::new(Uuid::new_v4(), ProfileRole::Doctor);
        record.set_status(VerificationStatus::Approved);
        assert!(record.is_verified);
        record.set_status(VerificationStatus::Rejected);
        assert!(!record.is_verified);
    }
}
