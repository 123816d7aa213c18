//! `Database` trait — single async interface for all persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::profile::BusinessProfile;

/// A row from the `business_profiles` table.
#[derive(Debug, Clone)]
pub struct BusinessProfileRecord {
    pub id: Uuid,
    pub user_id: String,
    pub profile: BusinessProfile,
    pub verification_status: String,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic database trait.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    // ── Settings ────────────────────────────────────────────────────

    /// Read a JSON setting for a user.
    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Insert or replace a JSON setting for a user.
    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    // ── Business profiles ───────────────────────────────────────────

    /// Create a structured business-profile record with `pending`
    /// verification. Returns the new record id.
    async fn create_business_profile(
        &self,
        user_id: &str,
        profile: &BusinessProfile,
    ) -> Result<Uuid, DatabaseError>;

    /// All profile records for a user, newest first.
    async fn list_business_profiles(
        &self,
        user_id: &str,
    ) -> Result<Vec<BusinessProfileRecord>, DatabaseError>;
}
