use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{DocumentStore, StoreError, StoreResult};
use crate::learn::types::{Course, Learner, ProgressRecord, Quiz, StudyMaterial, Topic};

/// Collections kept in insertion order, which is the order scans return.
#[derive(Debug, Default)]
struct Collections {
    learners: Vec<Learner>,
    courses: Vec<Course>,
    topics: Vec<Topic>,
    materials: Vec<StudyMaterial>,
    quizzes: Vec<Quiz>,
    progress: Vec<ProgressRecord>,
}

impl Collections {
    fn upsert_progress(&mut self, record: ProgressRecord) {
        match self
            .progress
            .iter_mut()
            .find(|p| p.learner_id == record.learner_id && p.topic_id == record.topic_id)
        {
            Some(existing) => *existing = record,
            None => self.progress.push(record),
        }
    }

    fn learner_slot(&mut self, id: Uuid) -> StoreResult<&mut Learner> {
        self.learners
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| StoreError::Missing(format!("learner {id}")))
    }
}

/// In-process store. Cloning shares the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        let _guard = self.data.read().await;
        Ok(())
    }

    async fn insert_learner(&self, learner: Learner) -> StoreResult<Learner> {
        let mut data = self.data.write().await;
        if data.learners.iter().any(|l| l.email == learner.email) {
            return Err(StoreError::Duplicate(format!("learner email {}", learner.email)));
        }
        data.learners.push(learner.clone());
        debug!("Stored learner {}", learner.id);
        Ok(learner)
    }

    async fn get_learner(&self, id: Uuid) -> StoreResult<Option<Learner>> {
        let data = self.data.read().await;
        Ok(data.learners.iter().find(|l| l.id == id).cloned())
    }

    async fn find_learner_by_email(&self, email: &str) -> StoreResult<Option<Learner>> {
        let data = self.data.read().await;
        Ok(data.learners.iter().find(|l| l.email == email).cloned())
    }

    async fn update_learner(&self, learner: Learner) -> StoreResult<()> {
        let mut data = self.data.write().await;
        let slot = data.learner_slot(learner.id)?;
        *slot = learner;
        Ok(())
    }

    async fn insert_course(&self, course: Course) -> StoreResult<Course> {
        let mut data = self.data.write().await;
        data.courses.push(course.clone());
        Ok(course)
    }

    async fn get_course(&self, id: Uuid) -> StoreResult<Option<Course>> {
        let data = self.data.read().await;
        Ok(data.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn list_courses(&self) -> StoreResult<Vec<Course>> {
        Ok(self.data.read().await.courses.clone())
    }

    async fn insert_topic(&self, topic: Topic) -> StoreResult<Topic> {
        let mut data = self.data.write().await;
        data.topics.push(topic.clone());
        Ok(topic)
    }

    async fn get_topic(&self, id: Uuid) -> StoreResult<Option<Topic>> {
        let data = self.data.read().await;
        Ok(data.topics.iter().find(|t| t.id == id).cloned())
    }

    async fn list_topics(&self) -> StoreResult<Vec<Topic>> {
        Ok(self.data.read().await.topics.clone())
    }

    async fn topics_for_course(&self, course_id: Uuid) -> StoreResult<Vec<Topic>> {
        let data = self.data.read().await;
        Ok(data
            .topics
            .iter()
            .filter(|t| t.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn insert_material(&self, material: StudyMaterial) -> StoreResult<StudyMaterial> {
        let mut data = self.data.write().await;
        data.materials.push(material.clone());
        Ok(material)
    }

    async fn get_material(&self, id: Uuid) -> StoreResult<Option<StudyMaterial>> {
        let data = self.data.read().await;
        Ok(data.materials.iter().find(|m| m.id == id).cloned())
    }

    async fn list_materials(&self) -> StoreResult<Vec<StudyMaterial>> {
        Ok(self.data.read().await.materials.clone())
    }

    async fn materials_for_topic(&self, topic_id: Uuid) -> StoreResult<Vec<StudyMaterial>> {
        let data = self.data.read().await;
        Ok(data
            .materials
            .iter()
            .filter(|m| m.topic_id == topic_id)
            .cloned()
            .collect())
    }

    async fn insert_quiz(&self, quiz: Quiz) -> StoreResult<Quiz> {
        let mut data = self.data.write().await;
        data.quizzes.push(quiz.clone());
        Ok(quiz)
    }

    async fn get_quiz(&self, id: Uuid) -> StoreResult<Option<Quiz>> {
        let data = self.data.read().await;
        Ok(data.quizzes.iter().find(|q| q.id == id).cloned())
    }

    async fn get_progress(
        &self,
        learner_id: Uuid,
        topic_id: Uuid,
    ) -> StoreResult<Option<ProgressRecord>> {
        let data = self.data.read().await;
        Ok(data
            .progress
            .iter()
            .find(|p| p.learner_id == learner_id && p.topic_id == topic_id)
            .cloned())
    }

    async fn progress_for_learner(&self, learner_id: Uuid) -> StoreResult<Vec<ProgressRecord>> {
        let data = self.data.read().await;
        Ok(data
            .progress
            .iter()
            .filter(|p| p.learner_id == learner_id)
            .cloned()
            .collect())
    }

    async fn put_progress(&self, record: ProgressRecord) -> StoreResult<()> {
        self.data.write().await.upsert_progress(record);
        Ok(())
    }

    async fn commit_submission(
        &self,
        progress: ProgressRecord,
        learner: Learner,
    ) -> StoreResult<()> {
        let mut data = self.data.write().await;
        // Resolve the learner before touching anything so a miss writes nothing.
        let slot = data.learner_slot(learner.id)?;
        *slot = learner;
        data.upsert_progress(progress);
        Ok(())
    }
}
