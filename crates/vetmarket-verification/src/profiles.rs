//! Profile Resolution
//!
//! Maps user identities and profile ids to the role-specific profile
//! record they own. The marketplace's profile tables are an external
//! collaborator; this module defines the capability interface the
//! verification core consumes, plus an in-memory directory for POC
//! wiring and tests.
//!
//! A role mismatch is a caller error, distinct from a missing profile:
//! asking for profile X "as a doctor" when X is a farmer yields
//! `RoleMismatch`, not `ProfileNotFound`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::record::ProfileRole;
use crate::VerificationError;

/// Reference to a role-specific profile record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRef {
    pub profile_id: Uuid,
    pub user_id: Uuid,
    pub role: ProfileRole,
    pub display_name: String,
}

/// Capability interface over the marketplace's profile tables
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// Map a user to the profile it owns for the declared role.
    async fn resolve(
        &self,
        user_id: Uuid,
        role: ProfileRole,
    ) -> Result<ProfileRef, VerificationError>;

    /// Look up a profile by its own id, checking the declared role.
    async fn get(
        &self,
        profile_id: Uuid,
        role: ProfileRole,
    ) -> Result<ProfileRef, VerificationError>;
}

/// In-memory profile directory (POC wiring and tests)
#[derive(Default)]
pub struct InMemoryProfileDirectory {
    profiles: Arc<RwLock<HashMap<Uuid, ProfileRef>>>,
}

impl InMemoryProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile, returning its generated id.
    pub async fn register(
        &self,
        user_id: Uuid,
        role: ProfileRole,
        display_name: impl Into<String>,
    ) -> ProfileRef {
        let profile = ProfileRef {
            profile_id: Uuid::new_v4(),
            user_id,
            role,
            display_name: display_name.into(),
        };
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.profile_id, profile.clone());
        profile
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryProfileDirectory {
    async fn resolve(
        &self,
        user_id: Uuid,
        role: ProfileRole,
    ) -> Result<ProfileRef, VerificationError> {
        let profiles = self.profiles.read().await;
        let owned: Vec<&ProfileRef> = profiles
            .values()
            .filter(|p| p.user_id == user_id)
            .collect();

        if let Some(profile) = owned.iter().find(|p| p.role == role) {
            return Ok((*profile).clone());
        }
        match owned.first() {
            Some(other) => Err(VerificationError::RoleMismatch {
                id: user_id,
                declared: role,
                actual: other.role,
            }),
            None => Err(VerificationError::ProfileNotFound { id: user_id, role }),
        }
    }

    async fn get(
        &self,
        profile_id: Uuid,
        role: ProfileRole,
    ) -> Result<ProfileRef, VerificationError> {
        let profiles = self.profiles.read().await;
        match profiles.get(&profile_id) {
            Some(profile) if profile.role == role => Ok(profile.clone()),
            Some(profile) => Err(VerificationError::RoleMismatch {
                id: profile_id,
                declared: role,
                actual: profile.role,
            }),
            None => Err(VerificationError::ProfileNotFound {
                id: profile_id,
                role,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_by_user() {
        let directory = InMemoryProfileDirectory::new();
        let user_id = Uuid::new_v4();
        let profile = directory
            .register(user_id, ProfileRole::Doctor, "Dr. Anand")
            .await;

        let resolved = directory.resolve(user_id, ProfileRole::Doctor).await.unwrap();
        assert_eq!(resolved, profile);
    }

    #[tokio::test]
    async fn test_role_mismatch_is_not_not_found() {
        let directory = InMemoryProfileDirectory::new();
        let user_id = Uuid::new_v4();
        let profile = directory
            .register(user_id, ProfileRole::Farmer, "Green Acres")
            .await;

        let err = directory
            .resolve(user_id, ProfileRole::Doctor)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VerificationError::RoleMismatch {
                declared: ProfileRole::Doctor,
                actual: ProfileRole::Farmer,
                ..
            }
        ));

        let err = directory
            .get(profile.profile_id, ProfileRole::MedicalStore)
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::RoleMismatch { .. }));
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let directory = InMemoryProfileDirectory::new();

        let err = directory
            .resolve(Uuid::new_v4(), ProfileRole::Doctor)
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::ProfileNotFound { .. }));

        let err = directory
            .get(Uuid::new_v4(), ProfileRole::Farmer)
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::ProfileNotFound { .. }));
    }
}
