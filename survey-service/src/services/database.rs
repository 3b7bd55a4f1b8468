//! Database service for survey-service.

use crate::models::{NewSurveyRecord, SurveyRecord};
use crate::services::metrics::record_db_query;
use service_core::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, instrument};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the SQLite file and build a pool over it.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn new(path: &Path, max_connections: u32) -> Result<Self, AppError> {
        info!(max_connections = max_connections, "Opening SQLite database");

        // DELETE journaling keeps every committed row in the main file, which
        // is what the download endpoint hands out.
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("SQLite connection pool established");

        Ok(Self { pool })
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Create the survey table if it does not exist yet.
    #[instrument(skip(self))]
    pub async fn create_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS survey_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                address TEXT NOT NULL,
                score INTEGER NOT NULL,
                level TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create schema: {}", e)))?;

        info!("survey_results table ready");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Survey Operations
    // -------------------------------------------------------------------------

    /// Insert a survey record. The `UNIQUE` constraint on `email` is the
    /// duplicate check; a violation is reported as a conflict.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn insert_survey(&self, input: &NewSurveyRecord) -> Result<SurveyRecord, AppError> {
        let start = Instant::now();

        let result = sqlx::query_as::<_, SurveyRecord>(
            r#"
            INSERT INTO survey_results (email, address, score, level)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, email, address, score, level
            "#,
        )
        .bind(&input.email)
        .bind(&input.address)
        .bind(input.score)
        .bind(input.level.label())
        .fetch_one(&self.pool)
        .await;

        record_db_query("insert_survey", start.elapsed());

        let record = result.map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Email '{}' is already registered",
                    input.email
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to insert survey: {}", e)),
        })?;

        info!(survey_id = record.id, level = %record.level, "Survey record created");

        Ok(record)
    }

    /// Address of the most recently inserted record, if any.
    #[instrument(skip(self))]
    pub async fn latest_address(&self) -> Result<Option<String>, AppError> {
        let start = Instant::now();

        let address = sqlx::query_scalar::<_, String>(
            "SELECT address FROM survey_results ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to read latest address: {}", e)));

        record_db_query("latest_address", start.elapsed());

        address
    }

    /// Look up a record by email.
    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<SurveyRecord>, AppError> {
        let start = Instant::now();

        let record = sqlx::query_as::<_, SurveyRecord>(
            "SELECT id, email, address, score, level FROM survey_results WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find survey: {}", e)));

        record_db_query("find_by_email", start.elapsed());

        record
    }

    /// Total number of stored records.
    #[instrument(skip(self))]
    pub async fn count_surveys(&self) -> Result<i64, AppError> {
        let start = Instant::now();

        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM survey_results")
            .fetch_one(&self.pool)
            .await;

        record_db_query("count_surveys", start.elapsed());

        Ok(count?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SecurityLevel, SurveySubmission};
    use tempfile::TempDir;

    async fn open_db() -> (Database, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(&dir.path().join("survey.db"), 2).await.unwrap();
        db.create_schema().await.unwrap();
        (db, dir)
    }

    fn submission(email: &str, address: &str, score: i64) -> NewSurveyRecord {
        SurveySubmission {
            email: email.to_string(),
            address: address.to_string(),
            score,
        }
        .into_record()
    }

    #[tokio::test]
    async fn insert_returns_stored_row() {
        let (db, _dir) = open_db().await;

        let record = db
            .insert_survey(&submission("a@x.com", "1 Main St", 60))
            .await
            .unwrap();

        assert_eq!(record.email, "a@x.com");
        assert_eq!(record.level, SecurityLevel::Medium.label());
        assert_eq!(db.count_surveys().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let (db, _dir) = open_db().await;

        db.insert_survey(&submission("dup@x.com", "1 Main St", 10))
            .await
            .unwrap();
        let err = db
            .insert_survey(&submission("dup@x.com", "2 Side St", 90))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(db.count_surveys().await.unwrap(), 1);
        let stored = db.find_by_email("dup@x.com").await.unwrap().unwrap();
        assert_eq!(stored.address, "1 Main St");
    }

    #[tokio::test]
    async fn latest_address_follows_insertion_order() {
        let (db, _dir) = open_db().await;
        assert_eq!(db.latest_address().await.unwrap(), None);

        db.insert_survey(&submission("a@x.com", "First", 10))
            .await
            .unwrap();
        db.insert_survey(&submission("b@x.com", "Second", 10))
            .await
            .unwrap();

        assert_eq!(db.latest_address().await.unwrap().as_deref(), Some("Second"));
    }

    #[tokio::test]
    async fn create_schema_is_idempotent() {
        let (db, _dir) = open_db().await;
        db.create_schema().await.unwrap();
        db.health_check().await.unwrap();
    }
}
