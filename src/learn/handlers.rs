use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::error::LearnError;
use crate::core::shared::state::AppState;
use crate::security::AuthenticatedLearner;

type HandlerResult = Result<Response, LearnError>;

fn success<T: Serialize>(status: StatusCode, data: T) -> Response {
    (
        status,
        Json(serde_json::json!({
            "success": true,
            "data": data
        })),
    )
        .into_response()
}

/// Body parsing that reports malformed payloads through the error envelope.
fn parse_body<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, LearnError> {
    serde_json::from_value(body)
        .map_err(|e| LearnError::Validation(format!("Invalid request body: {e}")))
}

// ----- Accounts -----

/// Register a learner account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let profile = state.learn.register(parse_body(body)?).await?;
    Ok(success(StatusCode::CREATED, profile))
}

/// Exchange credentials for an access token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let response = state.learn.login(parse_body(body)?).await?;
    Ok(success(StatusCode::OK, response))
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    learner: AuthenticatedLearner,
) -> HandlerResult {
    let profile = state.learn.profile(learner.learner_id).await?;
    Ok(success(StatusCode::OK, profile))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    learner: AuthenticatedLearner,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let profile = state
        .learn
        .update_profile(learner.learner_id, parse_body(body)?)
        .await?;
    Ok(success(StatusCode::OK, profile))
}

// ----- Catalog -----

pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    _learner: AuthenticatedLearner,
) -> HandlerResult {
    Ok(success(StatusCode::OK, state.learn.list_courses().await?))
}

pub async fn create_course(
    State(state): State<Arc<AppState>>,
    _learner: AuthenticatedLearner,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let course = state.learn.create_course(parse_body(body)?).await?;
    Ok(success(StatusCode::CREATED, course))
}

/// List the topics of a course
pub async fn get_topics(
    State(state): State<Arc<AppState>>,
    _learner: AuthenticatedLearner,
    Path(course_id): Path<Uuid>,
) -> HandlerResult {
    let topics = state.learn.topics_for_course(course_id).await?;
    Ok(success(StatusCode::OK, topics))
}

pub async fn create_topic(
    State(state): State<Arc<AppState>>,
    _learner: AuthenticatedLearner,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let topic = state.learn.create_topic(parse_body(body)?).await?;
    Ok(success(StatusCode::CREATED, topic))
}

pub async fn get_materials(
    State(state): State<Arc<AppState>>,
    _learner: AuthenticatedLearner,
    Path(topic_id): Path<Uuid>,
) -> HandlerResult {
    let materials = state.learn.materials_for_topic(topic_id).await?;
    Ok(success(StatusCode::OK, materials))
}

pub async fn create_material(
    State(state): State<Arc<AppState>>,
    _learner: AuthenticatedLearner,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let material = state.learn.create_material(parse_body(body)?).await?;
    Ok(success(StatusCode::CREATED, material))
}

// ----- Quizzes -----

pub async fn create_quiz(
    State(state): State<Arc<AppState>>,
    _learner: AuthenticatedLearner,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let quiz = state.learn.create_quiz(parse_body(body)?).await?;
    Ok(success(StatusCode::CREATED, quiz))
}

pub async fn get_quiz(
    State(state): State<Arc<AppState>>,
    _learner: AuthenticatedLearner,
    Path(quiz_id): Path<Uuid>,
) -> HandlerResult {
    Ok(success(StatusCode::OK, state.learn.get_quiz(quiz_id).await?))
}

/// Grade a quiz attempt for the calling learner
pub async fn submit_quiz(
    State(state): State<Arc<AppState>>,
    learner: AuthenticatedLearner,
    Path(quiz_id): Path<Uuid>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let result = state
        .learn
        .submit_quiz(learner.learner_id, quiz_id, parse_body(body)?)
        .await?;
    Ok(success(StatusCode::OK, result))
}

/// Grade a quiz material attempt for the calling learner
pub async fn submit_material_quiz(
    State(state): State<Arc<AppState>>,
    learner: AuthenticatedLearner,
    Path(material_id): Path<Uuid>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let result = state
        .learn
        .submit_material_quiz(learner.learner_id, material_id, parse_body(body)?)
        .await?;
    Ok(success(StatusCode::OK, result))
}

// ----- Progress -----

pub async fn report_progress(
    State(state): State<Arc<AppState>>,
    learner: AuthenticatedLearner,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let record = state
        .learn
        .report_progress(learner.learner_id, parse_body(body)?)
        .await?;
    Ok(success(StatusCode::OK, record))
}

pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    learner: AuthenticatedLearner,
    Path(learner_id): Path<Uuid>,
) -> HandlerResult {
    learner.ensure_self(learner_id)?;
    let progress = state.learn.progress_details(learner_id).await?;
    Ok(success(StatusCode::OK, progress))
}

pub async fn get_recommendations(
    State(state): State<Arc<AppState>>,
    learner: AuthenticatedLearner,
    Path(learner_id): Path<Uuid>,
) -> HandlerResult {
    learner.ensure_self(learner_id)?;
    let recommendations = state.learn.recommendations(learner_id).await?;
    Ok(success(StatusCode::OK, recommendations))
}
