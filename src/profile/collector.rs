//! ProfileCollector — validates and persists business profiles.

use std::sync::Arc;

use tracing::{info, warn};

use super::model::{BusinessProfile, ProfileDraft, settings_keys};
use super::validation::validate;
use crate::error::{DatabaseError, ProfileError};
use crate::store::Database;

/// Validates profile submissions and writes them to the store.
pub struct ProfileCollector {
    db: Arc<dyn Database>,
}

impl ProfileCollector {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Validate and persist a submitted draft.
    ///
    /// Validation failures touch nothing. On success the structured record
    /// is created first, then the per-user setting is written; the profile
    /// is returned only after both succeed.
    pub async fn submit(
        &self,
        user_id: &str,
        draft: &ProfileDraft,
    ) -> Result<BusinessProfile, ProfileError> {
        let profile = validate(draft).map_err(|errors| {
            info!(
                user_id,
                fields = ?errors.keys().collect::<Vec<_>>(),
                "Profile submission rejected"
            );
            ProfileError::Invalid(errors)
        })?;

        self.persist(user_id, &profile).await.map_err(|e| {
            warn!(user_id, error = %e, "Failed to save business profile");
            ProfileError::Persist(e)
        })?;

        info!(user_id, company = %profile.company_name, "Business profile saved");
        Ok(profile)
    }

    async fn persist(&self, user_id: &str, profile: &BusinessProfile) -> Result<(), DatabaseError> {
        self.db.create_business_profile(user_id, profile).await?;
        let value = serde_json::to_value(profile)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        self.db
            .set_setting(user_id, settings_keys::BUSINESS_PROFILE, &value)
            .await
    }

    /// Load a previously saved profile.
    ///
    /// Reads the per-user setting first. When that is missing or unreadable
    /// the newest structured record is used instead. Anything else is
    /// logged and treated as absent so the user is sent back to the form.
    pub async fn load(&self, user_id: &str) -> Option<BusinessProfile> {
        match self.load_setting(user_id).await {
            Some(profile) => Some(profile),
            None => self.load_latest_record(user_id).await,
        }
    }

    async fn load_setting(&self, user_id: &str) -> Option<BusinessProfile> {
        let value = match self
            .db
            .get_setting(user_id, settings_keys::BUSINESS_PROFILE)
            .await
        {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                warn!(user_id, error = %e, "Error loading business profile");
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(user_id, error = %e, "Stored business profile is unreadable");
                None
            }
        }
    }

    async fn load_latest_record(&self, user_id: &str) -> Option<BusinessProfile> {
        match self.db.list_business_profiles(user_id).await {
            Ok(records) => {
                let record = records.into_iter().next()?;
                info!(user_id, profile_id = %record.id, "Loaded business profile from its record");
                Some(record.profile)
            }
            Err(e) => {
                warn!(user_id, error = %e, "Error listing business profile records");
                None
            }
        }
    }
}
