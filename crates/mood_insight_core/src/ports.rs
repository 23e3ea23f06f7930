//! crates/mood_insight_core/src/ports.rs
//!
//! Defines the service contracts (traits) the analyzer depends on.
//! These traits form the boundary of the hexagonal architecture, so the core
//! never talks to a database or a language-model SDK directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Group, MoodRecord, Subject};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Read-only access to persisted mood check-ins.
#[async_trait]
pub trait MoodRecordStore: Send + Sync {
    /// All records of a class with `occurred_on >= since`, ascending by `occurred_on`.
    async fn records_for_group(
        &self,
        group_id: Uuid,
        since: DateTime<Utc>,
    ) -> PortResult<Vec<MoodRecord>>;

    /// All records of one student with `occurred_on >= since`, ascending by `occurred_on`.
    async fn records_for_subject(
        &self,
        subject_id: Uuid,
        since: DateTime<Utc>,
    ) -> PortResult<Vec<MoodRecord>>;
}

#[async_trait]
pub trait SubjectDirectory: Send + Sync {
    async fn find_subject(&self, subject_id: Uuid) -> PortResult<Subject>;

    async fn find_group(&self, group_id: Uuid) -> PortResult<Group>;
}

/// The raw answer of a language model asked for a JSON object.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub content: String,
    pub tokens_used: Option<u32>,
}

/// An external language model used to write the class analysis.
#[async_trait]
pub trait AnalysisModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Sends a system instruction and a prompt; the reply must be a single JSON object.
    async fn complete_json(&self, system: &str, prompt: &str) -> PortResult<ModelReply>;
}
