use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::LearnError;
use super::grading::{normalize_answers, GradingEngine};
use super::recommend::{Recommendation, RecommendationEngine, RecommendationInput};
use super::types::*;
use crate::core::shared::locks::KeyedLocks;
use crate::security::{CredentialHasher, JwtManager};
use crate::store::{DocumentStore, StoreError};

/// Main Learn engine: accounts, catalog, grading and recommendations over a
/// document store.
pub struct LearnEngine {
    store: Arc<dyn DocumentStore>,
    credentials: Arc<CredentialHasher>,
    jwt: Arc<JwtManager>,
    learner_locks: KeyedLocks<Uuid>,
    grading: GradingEngine,
    recommender: RecommendationEngine,
}

impl LearnEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        credentials: Arc<CredentialHasher>,
        jwt: Arc<JwtManager>,
        grading: GradingEngine,
        recommender: RecommendationEngine,
    ) -> Self {
        Self {
            store,
            credentials,
            jwt,
            learner_locks: KeyedLocks::new(),
            grading,
            recommender,
        }
    }

    // ----- Account Operations -----

    pub async fn register(&self, req: RegisterRequest) -> Result<LearnerProfile, LearnError> {
        let name = req.name.trim().to_string();
        let email = normalize_email(&req.email);
        if name.is_empty() || email.is_empty() || req.password.is_empty() {
            return Err(LearnError::Validation("Please enter all fields".into()));
        }
        if !email.contains('@') {
            return Err(LearnError::Validation("Email address is not valid".into()));
        }
        if let Some(issue) = self.credentials.validate(&req.password).first() {
            return Err(LearnError::Validation(issue.message()));
        }

        if self.store.find_learner_by_email(&email).await?.is_some() {
            return Err(LearnError::Conflict("User already exists".into()));
        }

        let password_hash = self
            .credentials
            .hash(&req.password)
            .map_err(|e| LearnError::Internal(e.to_string()))?;

        let learner = Learner {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            learning_style: req.learning_style.unwrap_or_default(),
            points: 0,
            badges: BTreeSet::new(),
            created_at: Utc::now(),
        };

        let learner = self.store.insert_learner(learner).await.map_err(|e| match e {
            StoreError::Duplicate(_) => LearnError::Conflict("User already exists".into()),
            other => other.into(),
        })?;

        info!("Registered learner {} ({})", learner.id, learner.learning_style);
        Ok(learner.profile())
    }

    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, LearnError> {
        let email = normalize_email(&req.email);
        if email.is_empty() || req.password.is_empty() {
            return Err(LearnError::Validation("Please enter all fields".into()));
        }

        let invalid = || LearnError::Unauthorized("Invalid credentials".into());
        let learner = self
            .store
            .find_learner_by_email(&email)
            .await?
            .ok_or_else(invalid)?;

        let matches = self
            .credentials
            .verify(&req.password, &learner.password_hash)
            .map_err(|e| {
                warn!("Stored hash for learner {} is unusable: {e}", learner.id);
                LearnError::Internal(e.to_string())
            })?;
        if !matches {
            return Err(invalid());
        }

        let issued = self
            .jwt
            .issue_access_token(learner.id, &learner.email)
            .map_err(|e| LearnError::Internal(e.to_string()))?;

        debug!("Learner {} logged in", learner.id);
        Ok(LoginResponse {
            token: issued.access_token,
            token_type: issued.token_type,
            expires_in: issued.expires_in,
            user: learner.profile(),
        })
    }

    pub async fn profile(&self, learner_id: Uuid) -> Result<LearnerProfile, LearnError> {
        Ok(self.require_learner(learner_id).await?.profile())
    }

    pub async fn update_profile(
        &self,
        learner_id: Uuid,
        req: UpdateProfileRequest,
    ) -> Result<LearnerProfile, LearnError> {
        let name = match req.name {
            Some(name) if name.trim().is_empty() => {
                return Err(LearnError::Validation("Name must not be empty".into()));
            }
            other => other.map(|n| n.trim().to_string()),
        };

        let _guard = self.learner_locks.acquire(learner_id).await;
        let mut learner = self.require_learner(learner_id).await?;
        if let Some(name) = name {
            learner.name = name;
        }
        if let Some(style) = req.learning_style {
            learner.learning_style = style;
        }
        self.store.update_learner(learner.clone()).await?;

        Ok(learner.profile())
    }

    // ----- Course Operations -----

    pub async fn list_courses(&self) -> Result<Vec<Course>, LearnError> {
        Ok(self.store.list_courses().await?)
    }

    pub async fn create_course(&self, req: CreateCourseRequest) -> Result<Course, LearnError> {
        let name = required(&req.name, "Course name")?;
        let course = Course {
            id: Uuid::new_v4(),
            name,
            description: req.description,
            created_at: Utc::now(),
        };
        Ok(self.store.insert_course(course).await?)
    }

    // ----- Topic Operations -----

    pub async fn topics_for_course(&self, course_id: Uuid) -> Result<Vec<Topic>, LearnError> {
        self.store
            .get_course(course_id)
            .await?
            .ok_or_else(|| LearnError::NotFound("Course not found".into()))?;
        Ok(self.store.topics_for_course(course_id).await?)
    }

    pub async fn create_topic(&self, req: CreateTopicRequest) -> Result<Topic, LearnError> {
        let name = required(&req.name, "Topic name")?;
        self.store
            .get_course(req.course_id)
            .await?
            .ok_or_else(|| LearnError::NotFound("Course not found".into()))?;

        let topic = Topic {
            id: Uuid::new_v4(),
            course_id: req.course_id,
            name,
            description: req.description,
            created_at: Utc::now(),
        };
        Ok(self.store.insert_topic(topic).await?)
    }

    // ----- Quiz Operations -----

    pub async fn create_quiz(&self, req: CreateQuizRequest) -> Result<Quiz, LearnError> {
        let title = required(&req.title, "Quiz title")?;
        self.require_topic(req.topic_id).await?;
        let questions = normalize_questions(req.questions).map_err(LearnError::Validation)?;

        let quiz = Quiz {
            id: Uuid::new_v4(),
            topic_id: req.topic_id,
            title,
            description: req.description,
            difficulty: req.difficulty,
            questions,
            created_at: Utc::now(),
        };
        Ok(self.store.insert_quiz(quiz).await?)
    }

    pub async fn get_quiz(&self, quiz_id: Uuid) -> Result<Quiz, LearnError> {
        self.store
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| LearnError::NotFound("Quiz not found".into()))
    }

    pub async fn submit_quiz(
        &self,
        learner_id: Uuid,
        quiz_id: Uuid,
        submission: QuizSubmission,
    ) -> Result<QuizResult, LearnError> {
        let quiz = self.get_quiz(quiz_id).await?;
        self.grade_and_record(learner_id, quiz.topic_id, quiz.id, &quiz.questions, &submission)
            .await
    }

    // ----- Material Operations -----

    pub async fn materials_for_topic(
        &self,
        topic_id: Uuid,
    ) -> Result<Vec<StudyMaterial>, LearnError> {
        self.require_topic(topic_id).await?;
        Ok(self.store.materials_for_topic(topic_id).await?)
    }

    pub async fn create_material(
        &self,
        req: CreateMaterialRequest,
    ) -> Result<StudyMaterial, LearnError> {
        let title = required(&req.title, "Material title")?;
        self.require_topic(req.topic_id).await?;

        let mut material = StudyMaterial {
            id: Uuid::new_v4(),
            topic_id: req.topic_id,
            material_type: req.material_type,
            title,
            content_url: None,
            quiz_data: None,
            quiz_id: None,
            created_at: Utc::now(),
        };

        match req.material_type {
            MaterialType::Video | MaterialType::Pdf => {
                let url = req
                    .content_url
                    .map(|u| u.trim().to_string())
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| {
                        LearnError::Validation(format!(
                            "A {} material needs a content_url",
                            req.material_type
                        ))
                    })?;
                material.content_url = Some(url);
            }
            MaterialType::Quiz => {
                if let Some(data) = req.quiz_data {
                    let questions =
                        normalize_questions(data.questions).map_err(LearnError::Validation)?;
                    material.quiz_data = Some(QuizData { questions });
                }
                if let Some(quiz_id) = req.quiz_id {
                    let quiz = self.get_quiz(quiz_id).await?;
                    if quiz.topic_id != req.topic_id {
                        return Err(LearnError::Validation(
                            "Linked quiz belongs to a different topic".into(),
                        ));
                    }
                    material.quiz_id = Some(quiz_id);
                }
                if material.quiz_data.is_none() && material.quiz_id.is_none() {
                    return Err(LearnError::Validation(
                        "A quiz material needs quiz_data or a quiz_id".into(),
                    ));
                }
            }
        }

        Ok(self.store.insert_material(material).await?)
    }

    /// Grades a quiz material: its embedded questions, or the linked quiz.
    pub async fn submit_material_quiz(
        &self,
        learner_id: Uuid,
        material_id: Uuid,
        submission: QuizSubmission,
    ) -> Result<QuizResult, LearnError> {
        let material = self
            .store
            .get_material(material_id)
            .await?
            .ok_or_else(|| LearnError::NotFound("Material not found".into()))?;

        if material.material_type != MaterialType::Quiz {
            return Err(LearnError::Validation(format!(
                "Material is a {}, not a quiz",
                material.material_type
            )));
        }

        match (&material.quiz_data, material.quiz_id) {
            (Some(data), _) => {
                self.grade_and_record(
                    learner_id,
                    material.topic_id,
                    material.id,
                    &data.questions,
                    &submission,
                )
                .await
            }
            (None, Some(quiz_id)) => self.submit_quiz(learner_id, quiz_id, submission).await,
            (None, None) => Err(LearnError::DivisionUndefined(
                "Quiz material has no questions".into(),
            )),
        }
    }

    // ----- Progress Operations -----

    /// Records a self-reported score. Grade and status are derived here; no
    /// attempt, points or badges are recorded.
    pub async fn report_progress(
        &self,
        learner_id: Uuid,
        req: ReportProgressRequest,
    ) -> Result<ProgressRecord, LearnError> {
        let score = u8::try_from(req.score)
            .ok()
            .filter(|s| *s <= 100)
            .ok_or_else(|| LearnError::Validation("Score must be between 0 and 100".into()))?;
        self.require_topic(req.topic_id).await?;

        let _guard = self.learner_locks.acquire(learner_id).await;
        self.require_learner(learner_id).await?;

        let now = Utc::now();
        let mut record = self
            .store
            .get_progress(learner_id, req.topic_id)
            .await?
            .unwrap_or_else(|| ProgressRecord::new(learner_id, req.topic_id, now));
        record.record_score(score, now);
        self.store.put_progress(record.clone()).await?;

        debug!(
            "Learner {learner_id} reported {score} on topic {}",
            req.topic_id
        );
        Ok(record)
    }

    pub async fn progress_details(
        &self,
        learner_id: Uuid,
    ) -> Result<Vec<ProgressDetail>, LearnError> {
        self.require_learner(learner_id).await?;
        let records = self.store.progress_for_learner(learner_id).await?;

        let topics: HashMap<Uuid, Topic> = self
            .store
            .list_topics()
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        let courses: HashMap<Uuid, Course> = self
            .store
            .list_courses()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Ok(records
            .into_iter()
            .map(|record| {
                let topic = topics.get(&record.topic_id);
                let course = topic.and_then(|t| courses.get(&t.course_id));
                ProgressDetail {
                    topic_name: topic.map_or_else(|| "Unknown Topic".into(), |t| t.name.clone()),
                    course_name: course
                        .map_or_else(|| "Unknown Course".into(), |c| c.name.clone()),
                    record,
                }
            })
            .collect())
    }

    // ----- Recommendations -----

    pub async fn recommendations(
        &self,
        learner_id: Uuid,
    ) -> Result<Vec<Recommendation>, LearnError> {
        let learner = self.require_learner(learner_id).await?;
        let progress = self.store.progress_for_learner(learner_id).await?;
        let topics = self.store.list_topics().await?;
        let materials = self.store.list_materials().await?;

        let recommendations = self.recommender.recommend(&RecommendationInput {
            learning_style: learner.learning_style,
            progress: &progress,
            topics: &topics,
            materials: &materials,
        });

        debug!(
            "Recommended {} items to learner {learner_id}",
            recommendations.len()
        );
        Ok(recommendations)
    }

    // ----- Helpers -----

    async fn require_learner(&self, learner_id: Uuid) -> Result<Learner, LearnError> {
        self.store
            .get_learner(learner_id)
            .await?
            .ok_or_else(|| LearnError::NotFound("Student not found".into()))
    }

    async fn require_topic(&self, topic_id: Uuid) -> Result<Topic, LearnError> {
        self.store
            .get_topic(topic_id)
            .await?
            .ok_or_else(|| LearnError::NotFound("Topic not found".into()))
    }

    /// Grades, then commits the attempt and rewards in one store write while
    /// holding the learner's lock.
    async fn grade_and_record(
        &self,
        learner_id: Uuid,
        topic_id: Uuid,
        quiz_ref: Uuid,
        questions: &[Question],
        submission: &QuizSubmission,
    ) -> Result<QuizResult, LearnError> {
        if questions.is_empty() {
            return Err(LearnError::DivisionUndefined(
                "Quiz has no questions".into(),
            ));
        }
        let answers = normalize_answers(questions, &submission.answers)?;

        let _guard = self.learner_locks.acquire(learner_id).await;
        let mut learner = self.require_learner(learner_id).await?;
        let existing = self.store.get_progress(learner_id, topic_id).await?;

        let history = existing
            .as_ref()
            .map(|p| p.quiz_attempts.as_slice())
            .unwrap_or_default();
        let report = self
            .grading
            .grade(questions, &answers, &learner.badges, history)?;

        let now = Utc::now();
        let mut progress =
            existing.unwrap_or_else(|| ProgressRecord::new(learner_id, topic_id, now));
        progress.record_attempt(quiz_ref, report.score, now);
        let attempt_number = progress.quiz_attempts.len();

        learner.points = learner.points.saturating_add(report.points_earned);
        learner.badges.extend(report.new_badges.iter().cloned());
        let total_points = learner.points;

        self.store.commit_submission(progress, learner).await?;

        info!(
            "Learner {learner_id} scored {} ({}) on {quiz_ref}, +{} points, badges {:?}",
            report.score, report.grade, report.points_earned, report.new_badges
        );

        Ok(QuizResult {
            quiz_id: quiz_ref,
            topic_id,
            score: report.score,
            grade: report.grade,
            status: report.status,
            correct_count: report.correct_count,
            total_questions: report.total_questions,
            points_earned: report.points_earned,
            total_points,
            new_badges: report.new_badges,
            attempt_number,
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn required(value: &str, field: &str) -> Result<String, LearnError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(LearnError::Validation(format!("{field} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}
