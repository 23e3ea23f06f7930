//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `MoodRecordStore` and `SubjectDirectory` ports from the `core` crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mood_insight_core::domain::{Group, MoodRecord, Subject, SubjectRef};
use mood_insight_core::ports::{MoodRecordStore, PortError, PortResult, SubjectDirectory};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the record-store and directory ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const FEELING_COLUMNS: &str = "f.id, f.student_id, s.name AS student_name, s.student_code, \
     f.class_id, f.emotion, f.occurred_on, f.note";

#[derive(FromRow)]
struct FeelingRecord {
    id: Uuid,
    student_id: Uuid,
    student_name: String,
    student_code: Option<String>,
    class_id: Uuid,
    emotion: String,
    occurred_on: DateTime<Utc>,
    note: Option<String>,
}
impl FeelingRecord {
    fn to_domain(self) -> PortResult<MoodRecord> {
        // The CHECK constraint keeps this from failing unless the schema drifted.
        let emotion = self
            .emotion
            .parse()
            .map_err(|e| PortError::Unexpected(format!("Feeling {}: {}", self.id, e)))?;
        Ok(MoodRecord {
            id: self.id,
            subject: SubjectRef {
                id: self.student_id,
                name: self.student_name,
                student_code: self.student_code,
            },
            group_id: self.class_id,
            emotion,
            occurred_on: self.occurred_on,
            note: self.note,
        })
    }
}

#[derive(FromRow)]
struct StudentRecord {
    id: Uuid,
    name: String,
    student_code: Option<String>,
    class_id: Option<Uuid>,
    class_name: Option<String>,
    class_code: Option<String>,
}
impl StudentRecord {
    fn to_domain(self) -> Subject {
        let group = match (self.class_id, self.class_name, self.class_code) {
            (Some(id), Some(name), Some(code)) => Some(Group { id, name, code }),
            _ => None,
        };
        Subject {
            id: self.id,
            name: self.name,
            student_code: self.student_code,
            group,
        }
    }
}

#[derive(FromRow)]
struct ClassRecord {
    id: Uuid,
    name: String,
    code: String,
}
impl ClassRecord {
    fn to_domain(self) -> Group {
        Group {
            id: self.id,
            name: self.name,
            code: self.code,
        }
    }
}

fn to_domain_all(records: Vec<FeelingRecord>) -> PortResult<Vec<MoodRecord>> {
    records.into_iter().map(FeelingRecord::to_domain).collect()
}

//=========================================================================================
// `MoodRecordStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl MoodRecordStore for DbAdapter {
    async fn records_for_group(
        &self,
        group_id: Uuid,
        since: DateTime<Utc>,
    ) -> PortResult<Vec<MoodRecord>> {
        let sql = format!(
            "SELECT {} FROM feelings f JOIN students s ON s.id = f.student_id \
             WHERE f.class_id = $1 AND f.occurred_on >= $2 \
             ORDER BY f.occurred_on ASC, f.created_at ASC",
            FEELING_COLUMNS
        );
        let records = sqlx::query_as::<_, FeelingRecord>(&sql)
            .bind(group_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        to_domain_all(records)
    }

    async fn records_for_subject(
        &self,
        subject_id: Uuid,
        since: DateTime<Utc>,
    ) -> PortResult<Vec<MoodRecord>> {
        let sql = format!(
            "SELECT {} FROM feelings f JOIN students s ON s.id = f.student_id \
             WHERE f.student_id = $1 AND f.occurred_on >= $2 \
             ORDER BY f.occurred_on ASC, f.created_at ASC",
            FEELING_COLUMNS
        );
        let records = sqlx::query_as::<_, FeelingRecord>(&sql)
            .bind(subject_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        to_domain_all(records)
    }
}

//=========================================================================================
// `SubjectDirectory` Trait Implementation
//=========================================================================================

#[async_trait]
impl SubjectDirectory for DbAdapter {
    async fn find_subject(&self, subject_id: Uuid) -> PortResult<Subject> {
        let record = sqlx::query_as::<_, StudentRecord>(
            "SELECT s.id, s.name, s.student_code, c.id AS class_id, c.name AS class_name, \
             c.code AS class_code \
             FROM students s LEFT JOIN classes c ON c.id = s.class_id WHERE s.id = $1",
        )
        .bind(subject_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Student {} not found", subject_id))
            }
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(record.to_domain())
    }

    async fn find_group(&self, group_id: Uuid) -> PortResult<Group> {
        let record = sqlx::query_as::<_, ClassRecord>(
            "SELECT id, name, code FROM classes WHERE id = $1",
        )
        .bind(group_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Class {} not found", group_id)),
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(record.to_domain())
    }
}
