//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::profile::{BusinessProfile, CompanySize};
use crate::store::migrations;
use crate::store::traits::{BusinessProfileRecord, Database};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

const PROFILE_COLUMNS: &str = "id, user_id, full_name, company_name, company_email, contact_number, \
     job_title, company_size, industry, business_description, verification_status, created_at";

/// Map a libsql Row to a BusinessProfileRecord.
fn row_to_profile(row: &libsql::Row) -> Result<BusinessProfileRecord, DatabaseError> {
    let get_text = |idx: i32| -> Result<String, DatabaseError> {
        row.get::<String>(idx)
            .map_err(|e| DatabaseError::Query(format!("read column {idx}: {e}")))
    };

    let id_str = get_text(0)?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| DatabaseError::Serialization(format!("bad profile id {id_str}: {e}")))?;
    let size_str = get_text(7)?;
    let company_size = size_str
        .parse::<CompanySize>()
        .map_err(DatabaseError::Serialization)?;

    Ok(BusinessProfileRecord {
        id,
        user_id: get_text(1)?,
        profile: BusinessProfile {
            full_name: get_text(2)?,
            company_name: get_text(3)?,
            company_email: get_text(4)?,
            contact_number: get_text(5)?,
            job_title: get_text(6)?,
            company_size,
            industry: get_text(8)?,
            business_description: row.get::<Option<String>>(9).ok().flatten(),
        },
        verification_status: get_text(10)?,
        created_at: parse_datetime(&get_text(11)?),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Settings ────────────────────────────────────────────────────

    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT value FROM settings WHERE user_id = ?1 AND key = ?2",
                params![user_id, key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value_str: String = row.get(0).unwrap_or_else(|_| "null".to_string());
                let value: serde_json::Value =
                    serde_json::from_str(&value_str).unwrap_or(serde_json::Value::Null);
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_setting: {e}"))),
        }
    }

    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let value_str = serde_json::to_string(value)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        conn.execute(
            "INSERT INTO settings (user_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, key) DO UPDATE SET value = ?3, updated_at = ?4",
            params![user_id, key, value_str, now],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("set_setting: {e}")))?;

        debug!(user_id, key, "Setting saved");
        Ok(())
    }

    // ── Business profiles ───────────────────────────────────────────

    async fn create_business_profile(
        &self,
        user_id: &str,
        profile: &BusinessProfile,
    ) -> Result<Uuid, DatabaseError> {
        let conn = self.conn();
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            &format!(
                "INSERT INTO business_profiles ({PROFILE_COLUMNS}, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'pending', ?11, ?11)"
            ),
            params![
                id.to_string(),
                user_id,
                profile.full_name.as_str(),
                profile.company_name.as_str(),
                profile.company_email.as_str(),
                profile.contact_number.as_str(),
                profile.job_title.as_str(),
                profile.company_size.label(),
                profile.industry.as_str(),
                opt_text(profile.business_description.as_deref()),
                now,
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("create_business_profile: {e}")))?;

        info!(user_id, profile_id = %id, "Business profile record created");
        Ok(id)
    }

    async fn list_business_profiles(
        &self,
        user_id: &str,
    ) -> Result<Vec<BusinessProfileRecord>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {PROFILE_COLUMNS} FROM business_profiles
                     WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
                ),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_business_profiles: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_business_profiles: {e}")))?
        {
            records.push(row_to_profile(&row)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::model::sample_profile;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    // ── Settings tests ──────────────────────────────────────────────

    #[tokio::test]
    async fn setting_roundtrip_and_overwrite() {
        let db = test_db().await;
        assert!(db.get_setting("u1", "k").await.unwrap().is_none());

        db.set_setting("u1", "k", &serde_json::json!({"a": 1}))
            .await
            .unwrap();
        db.set_setting("u1", "k", &serde_json::json!({"a": 2}))
            .await
            .unwrap();

        let value = db.get_setting("u1", "k").await.unwrap().unwrap();
        assert_eq!(value["a"], 2);
    }

    #[tokio::test]
    async fn settings_are_scoped_per_user() {
        let db = test_db().await;
        db.set_setting("u1", "k", &serde_json::json!("one"))
            .await
            .unwrap();
        assert!(db.get_setting("u2", "k").await.unwrap().is_none());
    }

    // ── Profile tests ───────────────────────────────────────────────

    #[tokio::test]
    async fn create_and_list_profile_records() {
        let db = test_db().await;
        let profile = sample_profile();
        let id = db.create_business_profile("u1", &profile).await.unwrap();

        let records = db.list_business_profiles("u1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].user_id, "u1");
        assert_eq!(records[0].profile, profile);
        assert_eq!(records[0].verification_status, "pending");
        assert!(db.list_business_profiles("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn profile_without_description_roundtrips() {
        let db = test_db().await;
        let profile = BusinessProfile {
            business_description: None,
            ..sample_profile()
        };
        db.create_business_profile("u1", &profile).await.unwrap();
        let records = db.list_business_profiles("u1").await.unwrap();
        assert!(records[0].profile.business_description.is_none());
    }

    #[tokio::test]
    async fn resubmission_lists_newest_first() {
        let db = test_db().await;
        db.create_business_profile("u1", &sample_profile())
            .await
            .unwrap();
        let renamed = BusinessProfile {
            company_name: "Acme Roasting Co".to_string(),
            ..sample_profile()
        };
        db.create_business_profile("u1", &renamed).await.unwrap();

        let records = db.list_business_profiles("u1").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].profile.company_name, "Acme Roasting Co");
    }

    #[tokio::test]
    async fn file_backed_db_persists_across_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("consult.db");
        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.set_setting("u1", "k", &serde_json::json!(42))
                .await
                .unwrap();
        }
        let db = LibSqlBackend::new_local(&path).await.unwrap();
        assert_eq!(db.get_setting("u1", "k").await.unwrap().unwrap(), 42);
    }
}
