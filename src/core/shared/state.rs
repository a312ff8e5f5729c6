use anyhow::{Context, Result};
use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::learn::{GradingEngine, LearnEngine, RecommendationEngine};
use crate::security::{Argon2Config, CredentialHasher, JwtConfig, JwtManager, PasswordPolicy};
use crate::store::DocumentStore;

/// Shared state handed to every Axum handler as `State<Arc<AppState>>`.
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub jwt: Arc<JwtManager>,
    pub learn: Arc<LearnEngine>,
}

impl AppState {
    pub fn from_config(config: AppConfig, store: Arc<dyn DocumentStore>) -> Result<Self> {
        Self::with_argon2(config, store, Argon2Config::default())
    }

    /// Same as [`AppState::from_config`] with explicit hashing cost, mainly so
    /// tests can use [`Argon2Config::low_memory`].
    pub fn with_argon2(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        argon2: Argon2Config,
    ) -> Result<Self> {
        let jwt_config = JwtConfig {
            access_token_expiry_minutes: config.auth.token_expiry_minutes,
            ..JwtConfig::default()
        };
        let jwt = Arc::new(
            JwtManager::new(jwt_config, &config.auth.jwt_secret())
                .context("Failed to initialize token manager")?,
        );

        let policy = PasswordPolicy {
            min_length: config.auth.min_password_length,
            ..PasswordPolicy::default()
        };
        let credentials = Arc::new(
            CredentialHasher::new(argon2, policy).context("Failed to initialize password hasher")?,
        );

        let learn = Arc::new(LearnEngine::new(
            Arc::clone(&store),
            credentials,
            Arc::clone(&jwt),
            GradingEngine::default(),
            RecommendationEngine::new(config.learn.recommendation_limit),
        ));

        Ok(Self {
            store,
            jwt,
            learn,
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_token_expiry_follows_config() {
        let mut config = AppConfig::default();
        config.auth.token_expiry_minutes = 15;
        let state = AppState::with_argon2(
            config,
            Arc::new(MemoryStore::new()),
            Argon2Config::low_memory(),
        )
        .unwrap();
        let token = state
            .jwt
            .issue_access_token(uuid::Uuid::new_v4(), "ada@example.com")
            .unwrap();
        assert_eq!(token.expires_in, 900);
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = Some("short".into());
        let result = AppState::with_argon2(
            config,
            Arc::new(MemoryStore::new()),
            Argon2Config::low_memory(),
        );
        assert!(result.is_err());
    }
}
