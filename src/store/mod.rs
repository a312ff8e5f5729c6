//! Document store abstraction.
//!
//! The learn engine only needs point lookups, scans filtered by one reference
//! field, and upserts. Implementations are shared as `Arc<dyn DocumentStore>`.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::core::config::{StoreBackend, StoreConfig};
use crate::learn::types::{Course, Learner, ProgressRecord, Quiz, StudyMaterial, Topic};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Duplicate key: {0}")]
    Duplicate(String),
    #[error("Missing record: {0}")]
    Missing(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid document: {0}")]
    Invalid(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Opens the backend selected by `[store]`.
pub fn open(config: &StoreConfig) -> StoreResult<Arc<dyn DocumentStore>> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&config.path)?)),
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    // Learner operations
    async fn insert_learner(&self, learner: Learner) -> StoreResult<Learner>;
    async fn get_learner(&self, id: Uuid) -> StoreResult<Option<Learner>>;
    async fn find_learner_by_email(&self, email: &str) -> StoreResult<Option<Learner>>;
    async fn update_learner(&self, learner: Learner) -> StoreResult<()>;

    // Course operations
    async fn insert_course(&self, course: Course) -> StoreResult<Course>;
    async fn get_course(&self, id: Uuid) -> StoreResult<Option<Course>>;
    async fn list_courses(&self) -> StoreResult<Vec<Course>>;

    // Topic operations
    async fn insert_topic(&self, topic: Topic) -> StoreResult<Topic>;
    async fn get_topic(&self, id: Uuid) -> StoreResult<Option<Topic>>;
    async fn list_topics(&self) -> StoreResult<Vec<Topic>>;
    async fn topics_for_course(&self, course_id: Uuid) -> StoreResult<Vec<Topic>>;

    // Material operations
    async fn insert_material(&self, material: StudyMaterial) -> StoreResult<StudyMaterial>;
    async fn get_material(&self, id: Uuid) -> StoreResult<Option<StudyMaterial>>;
    async fn list_materials(&self) -> StoreResult<Vec<StudyMaterial>>;
    async fn materials_for_topic(&self, topic_id: Uuid) -> StoreResult<Vec<StudyMaterial>>;

    // Quiz operations
    async fn insert_quiz(&self, quiz: Quiz) -> StoreResult<Quiz>;
    async fn get_quiz(&self, id: Uuid) -> StoreResult<Option<Quiz>>;

    // Progress operations
    async fn get_progress(
        &self,
        learner_id: Uuid,
        topic_id: Uuid,
    ) -> StoreResult<Option<ProgressRecord>>;
    async fn progress_for_learner(&self, learner_id: Uuid) -> StoreResult<Vec<ProgressRecord>>;
    /// Inserts or replaces the record for `(learner_id, topic_id)`.
    async fn put_progress(&self, record: ProgressRecord) -> StoreResult<()>;

    /// Writes a graded attempt and the learner's new rewards together.
    /// Either both land or neither does.
    async fn commit_submission(&self, progress: ProgressRecord, learner: Learner)
        -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_selects_backend() {
        let dir = tempfile::tempdir().unwrap();
        let sqlite = StoreConfig {
            backend: StoreBackend::Sqlite,
            path: dir.path().join("learn.db"),
        };
        open(&sqlite).unwrap().ping().await.unwrap();
        assert!(sqlite.path.exists());

        let memory = StoreConfig {
            backend: StoreBackend::Memory,
            path: dir.path().join("unused.db"),
        };
        open(&memory).unwrap().ping().await.unwrap();
        assert!(!memory.path.exists());
    }
}
