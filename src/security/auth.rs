//! Bearer-token authentication for learner routes.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::jwt::extract_bearer_token;
use crate::core::shared::state::AppState;
use crate::learn::error::LearnError;

/// The learner identified by a valid access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedLearner {
    pub learner_id: Uuid,
}

impl AuthenticatedLearner {
    /// Rejects access to another learner's data.
    pub fn ensure_self(&self, learner_id: Uuid) -> Result<(), LearnError> {
        if self.learner_id == learner_id {
            Ok(())
        } else {
            Err(LearnError::Forbidden(
                "Cannot access another learner's data".into(),
            ))
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedLearner {
    type Rejection = LearnError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or_else(|| LearnError::Unauthorized("No authentication token".into()))?;

        let claims = state.jwt.validate_access_token(token).map_err(|e| {
            debug!("Rejected token: {e}");
            LearnError::Forbidden("Invalid token".into())
        })?;

        let learner_id = claims
            .learner_id()
            .map_err(|_| LearnError::Forbidden("Invalid token".into()))?;

        Ok(Self { learner_id })
    }
}
