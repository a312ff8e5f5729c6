use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub reject_common: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 6,
            max_length: 128,
            reject_common: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Argon2Config {
    pub memory_cost_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
    pub output_length: usize,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
            output_length: 32,
        }
    }
}

impl Argon2Config {
    pub fn low_memory() -> Self {
        Self {
            memory_cost_kib: 8192,
            time_cost: 1,
            parallelism: 1,
            output_length: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PasswordIssue {
    Empty,
    TooShort { min: usize, actual: usize },
    TooLong { max: usize, actual: usize },
    CommonPassword,
}

impl PasswordIssue {
    pub fn message(&self) -> String {
        match self {
            Self::Empty => "Password must not be empty".into(),
            Self::TooShort { min, actual } => {
                format!("Password must be at least {min} characters (currently {actual})")
            }
            Self::TooLong { max, actual } => {
                format!("Password must be at most {max} characters (currently {actual})")
            }
            Self::CommonPassword => "This password is too common and easily guessed".into(),
        }
    }
}

/// Argon2id hashing plus a small acceptance policy for new passwords.
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    policy: PasswordPolicy,
}

impl CredentialHasher {
    pub fn new(argon2_config: Argon2Config, policy: PasswordPolicy) -> Result<Self> {
        let params = Params::new(
            argon2_config.memory_cost_kib,
            argon2_config.time_cost,
            argon2_config.parallelism,
            Some(argon2_config.output_length),
        )
        .map_err(|e| anyhow!("Invalid Argon2 parameters: {e}"))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        Ok(Self { argon2, policy })
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to hash password: {e}"))?;

        Ok(hash.to_string())
    }

    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| anyhow!("Invalid password hash format: {e}"))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => {
                debug!("Password mismatch");
                Ok(false)
            }
            Err(e) => Err(anyhow!("Password verification failed: {e}")),
        }
    }

    /// Issues found in a new password. Empty means acceptable.
    pub fn validate(&self, password: &str) -> Vec<PasswordIssue> {
        let mut issues = Vec::new();
        let length = password.chars().count();

        if length == 0 {
            issues.push(PasswordIssue::Empty);
            return issues;
        }
        if length < self.policy.min_length {
            issues.push(PasswordIssue::TooShort {
                min: self.policy.min_length,
                actual: length,
            });
        }
        if length > self.policy.max_length {
            issues.push(PasswordIssue::TooLong {
                max: self.policy.max_length,
                actual: length,
            });
        }
        if self.policy.reject_common && is_common_password(password) {
            issues.push(PasswordIssue::CommonPassword);
        }

        issues
    }
}

fn is_common_password(password: &str) -> bool {
    const COMMON_PASSWORDS: &[&str] = &[
        "password",
        "123456",
        "12345678",
        "qwerty",
        "abc123",
        "letmein",
        "iloveyou",
        "welcome",
        "admin",
        "changeme",
        "password1",
        "password123",
        "111111",
        "000000",
    ];

    let lower = password.to_lowercase();
    COMMON_PASSWORDS.iter().any(|&common| lower == common)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_hasher() -> CredentialHasher {
        CredentialHasher::new(Argon2Config::low_memory(), PasswordPolicy::default())
            .expect("Failed to create hasher")
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = test_hasher();
        let hash = hasher.hash("correct horse").expect("Failed to hash");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash).expect("Verify failed"));
        assert!(!hasher.verify("wrong horse", &hash).expect("Verify failed"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = test_hasher();
        let first = hasher.hash("same secret").expect("Failed to hash");
        let second = hasher.hash("same secret").expect("Failed to hash");
        assert_ne!(first, second);
    }

    #[test]
    fn test_invalid_hash_format() {
        let hasher = test_hasher();
        assert!(hasher.verify("anything", "not-a-hash").is_err());
    }

    #[test]
    fn test_policy_issues() {
        let hasher = test_hasher();

        assert_eq!(hasher.validate(""), vec![PasswordIssue::Empty]);
        assert!(hasher
            .validate("abc")
            .iter()
            .any(|i| matches!(i, PasswordIssue::TooShort { min: 6, actual: 3 })));
        assert!(hasher
            .validate("Password123")
            .contains(&PasswordIssue::CommonPassword));
        assert!(hasher.validate("tangerine-river").is_empty());
    }

    #[test]
    fn test_issue_messages() {
        let msg = PasswordIssue::TooShort { min: 6, actual: 2 }.message();
        assert!(msg.contains("at least 6"));
    }
}
