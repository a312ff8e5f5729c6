pub mod auth;
pub mod jwt;
pub mod password;

pub use auth::AuthenticatedLearner;
pub use jwt::{extract_bearer_token, Claims, IssuedToken, JwtConfig, JwtManager};
pub use password::{Argon2Config, CredentialHasher, PasswordIssue, PasswordPolicy};
