//! # Learn Module - Adaptive Learning Backend
//!
//! Learner accounts, a course/topic/material catalog, quiz grading with
//! points and badges, per-topic progress and learning-style aware
//! recommendations.
//!
//! ## Architecture
//!
//! - `types`: serde models shared by the store and the HTTP layer
//! - `grading`: pure scoring, grade bands and badge rules
//! - `recommend`: pure three-tier recommendation ranking
//! - `engine`: `LearnEngine`, the store-backed operations
//! - `handlers`: Axum handlers returning the `{success, data|error}` envelope

pub mod engine;
pub mod error;
pub mod grading;
pub mod handlers;
pub mod recommend;
pub mod seed;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub use engine::LearnEngine;
pub use error::LearnError;
pub use grading::{BadgeRule, BadgeRules, GradingEngine, GradingError};
pub use recommend::{Recommendation, RecommendationEngine, RecommendationTier};
pub use types::*;

// ============================================================================
// ROUTE CONFIGURATION
// ============================================================================

/// Configure all Learn module routes
pub fn configure_learn_routes() -> Router<Arc<AppState>> {
    use handlers::*;

    Router::new()
        // Account routes
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/profile", get(get_profile).put(update_profile))
        // Catalog routes
        .route("/api/courses", get(list_courses).post(create_course))
        .route("/api/topics", post(create_topic))
        .route("/api/topics/:course_id", get(get_topics))
        // Material routes share the :id segment; GET takes a topic id, submit a material id
        .route("/api/materials", post(create_material))
        .route("/api/materials/:id", get(get_materials))
        .route("/api/materials/:id/submit", post(submit_material_quiz))
        // Quiz routes
        .route("/api/quizzes", post(create_quiz))
        .route("/api/quizzes/:quiz_id", get(get_quiz))
        .route("/api/quizzes/:quiz_id/submit", post(submit_quiz))
        // Progress routes
        .route("/api/progress", post(report_progress))
        .route("/api/progress/:learner_id", get(get_progress))
        // Recommendations
        .route("/api/recommendations/:learner_id", get(get_recommendations))
}
