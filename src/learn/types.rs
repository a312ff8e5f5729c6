//! Types for the Learn module: learners, catalog entities, quizzes and
//! per-topic progress records.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Score at or above which a topic counts as completed.
pub const PASSING_SCORE: u8 = 70;

// ============================================================================
// LEARNER MODELS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LearningStyle {
    #[default]
    Visual,
    Auditory,
    Kinesthetic,
}

impl LearningStyle {
    /// Material type that suits this style best when no quiz is available.
    pub fn preferred_material(&self) -> MaterialType {
        match self {
            Self::Visual | Self::Auditory => MaterialType::Video,
            Self::Kinesthetic => MaterialType::Pdf,
        }
    }
}

impl std::fmt::Display for LearningStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Visual => write!(f, "visual"),
            Self::Auditory => write!(f, "auditory"),
            Self::Kinesthetic => write!(f, "kinesthetic"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learner {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password_hash: String,
    pub learning_style: LearningStyle,
    pub points: u32,
    pub badges: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

impl Learner {
    pub fn profile(&self) -> LearnerProfile {
        LearnerProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            learning_style: self.learning_style,
            points: self.points,
            badges: self.badges.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LearnerProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub learning_style: LearningStyle,
    pub points: u32,
    pub badges: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub learning_style: Option<LearningStyle>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: LearnerProfile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub learning_style: Option<LearningStyle>,
}

// ============================================================================
// CATALOG MODELS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCourseRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Topic {
    pub id: Uuid,
    pub course_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTopicRequest {
    pub course_id: Uuid,
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MaterialType {
    Video,
    Pdf,
    Quiz,
}

impl std::fmt::Display for MaterialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Pdf => write!(f, "pdf"),
            Self::Quiz => write!(f, "quiz"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyMaterial {
    pub id: Uuid,
    pub topic_id: Uuid,
    #[serde(rename = "type")]
    pub material_type: MaterialType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_data: Option<QuizData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMaterialRequest {
    pub topic_id: Uuid,
    #[serde(rename = "type")]
    pub material_type: MaterialType,
    #[serde(default)]
    pub title: String,
    pub content_url: Option<String>,
    pub quiz_data: Option<QuizDataInput>,
    pub quiz_id: Option<Uuid>,
}

// ============================================================================
// QUIZ MODELS
// ============================================================================

/// A question with its correct answer stored as an option index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
}

/// An answer as it arrives over the wire: an option index or option text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnswerValue {
    Index(usize),
    Text(String),
}

impl AnswerValue {
    /// Maps the answer onto an option index. Text is compared to the option
    /// labels case-insensitively, ignoring surrounding whitespace.
    pub fn resolve(&self, options: &[String]) -> Option<usize> {
        match self {
            Self::Index(index) => (*index < options.len()).then_some(*index),
            Self::Text(text) => {
                let wanted = text.trim().to_lowercase();
                options
                    .iter()
                    .position(|option| option.trim().to_lowercase() == wanted)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionInput {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(alias = "correct")]
    pub correct_answer: AnswerValue,
}

impl QuestionInput {
    /// Converts the incoming marker into the canonical index form.
    pub fn normalize(self) -> Result<Question, String> {
        if self.question.trim().is_empty() {
            return Err("question text is empty".to_string());
        }
        if self.options.is_empty() {
            return Err(format!("question \"{}\" has no options", self.question));
        }
        let correct_answer = match &self.correct_answer {
            AnswerValue::Index(index) if *index >= self.options.len() => {
                return Err(format!(
                    "question \"{}\" marks option {} correct but only has {} options",
                    self.question,
                    index,
                    self.options.len()
                ));
            }
            marker => marker.resolve(&self.options).ok_or_else(|| {
                format!(
                    "question \"{}\" has a correct answer that matches no option",
                    self.question
                )
            })?,
        };

        Ok(Question {
            question: self.question,
            options: self.options,
            correct_answer,
        })
    }
}

/// Normalizes a question list, rejecting empty quizzes.
pub fn normalize_questions(inputs: Vec<QuestionInput>) -> Result<Vec<Question>, String> {
    if inputs.is_empty() {
        return Err("a quiz needs at least one question".to_string());
    }
    inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| input.normalize().map_err(|e| format!("question {index}: {e}")))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizData {
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizDataInput {
    pub questions: Vec<QuestionInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quiz {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuizRequest {
    pub topic_id: Uuid,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub questions: Vec<QuestionInput>,
}

/// Submitted answers, either positional or keyed by question index. `null`
/// marks an unanswered question in both forms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SubmittedAnswers {
    Positional(Vec<Option<AnswerValue>>),
    Sparse(BTreeMap<String, Option<AnswerValue>>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizSubmission {
    pub answers: SubmittedAnswers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResult {
    pub quiz_id: Uuid,
    pub topic_id: Uuid,
    pub score: u8,
    pub grade: Grade,
    pub status: ProgressStatus,
    pub correct_count: usize,
    pub total_questions: usize,
    pub points_earned: u32,
    pub total_points: u32,
    pub new_badges: Vec<String>,
    pub attempt_number: usize,
}

// ============================================================================
// PROGRESS MODELS
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => Self::A,
            80..=89 => Self::B,
            70..=79 => Self::C,
            60..=69 => Self::D,
            _ => Self::F,
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        };
        f.write_str(letter)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    pub fn from_score(score: u8) -> Self {
        if score >= PASSING_SCORE {
            Self::Completed
        } else {
            Self::InProgress
        }
    }
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizAttempt {
    pub quiz_id: Uuid,
    pub score: u8,
    pub attempted_at: DateTime<Utc>,
}

/// Latest result of one learner on one topic, plus every graded attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressRecord {
    pub learner_id: Uuid,
    pub topic_id: Uuid,
    pub score: u8,
    pub grade: Grade,
    pub status: ProgressStatus,
    pub last_accessed: DateTime<Utc>,
    pub quiz_attempts: Vec<QuizAttempt>,
}

impl ProgressRecord {
    pub fn new(learner_id: Uuid, topic_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            learner_id,
            topic_id,
            score: 0,
            grade: Grade::F,
            status: ProgressStatus::NotStarted,
            last_accessed: now,
            quiz_attempts: Vec::new(),
        }
    }

    /// Overwrites the latest score and the fields derived from it.
    pub fn record_score(&mut self, score: u8, at: DateTime<Utc>) {
        self.score = score;
        self.grade = Grade::from_score(score);
        self.status = ProgressStatus::from_score(score);
        self.last_accessed = at;
    }

    pub fn record_attempt(&mut self, quiz_id: Uuid, score: u8, at: DateTime<Utc>) {
        self.record_score(score, at);
        self.quiz_attempts.push(QuizAttempt {
            quiz_id,
            score,
            attempted_at: at,
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProgressRequest {
    pub topic_id: Uuid,
    pub score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressDetail {
    #[serde(flatten)]
    pub record: ProgressRecord,
    pub topic_name: String,
    pub course_name: String,
}
