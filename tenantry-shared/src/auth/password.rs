/// Password hashing capability
///
/// Hashing and comparison go through the [`PasswordScheme`] trait so the
/// algorithm stays pluggable. [`Argon2Scheme`] is the default scheme.
///
/// # Security
///
/// Default Argon2id parameters:
///
/// - **Memory**: 64 MB (65536 KB)
/// - **Iterations**: 3 passes
/// - **Parallelism**: 4 lanes
/// - **Output**: 32-byte hash
///
/// Verification reads the parameters embedded in the stored PHC string, so
/// hashes created with older parameters keep verifying after a config change.
///
/// # Example
///
/// ```
/// use tenantry_shared::auth::password::{Argon2Scheme, PasswordConfig, PasswordScheme};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let scheme = Argon2Scheme::new(PasswordConfig::fast_for_tests());
/// let hash = scheme.hash("super_secret_password_123")?;
///
/// assert!(scheme.verify("super_secret_password_123", &hash)?);
/// assert!(!scheme.verify("wrong_password", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use serde::{Deserialize, Serialize};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hashing and comparison of user passwords
pub trait PasswordScheme: Send + Sync {
    /// Hashes a plaintext password into a self-describing string
    fn hash(&self, password: &str) -> Result<String, PasswordError>;

    /// Checks a plaintext password against a hash produced by `hash`
    ///
    /// Returns `Ok(false)` on mismatch; errors are reserved for unusable
    /// hashes.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError>;
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl PasswordConfig {
    /// Minimum-cost parameters for tests and local tooling
    ///
    /// Never use these for real credentials.
    pub fn fast_for_tests() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Argon2id implementation of [`PasswordScheme`]
#[derive(Debug, Clone, Default)]
pub struct Argon2Scheme {
    config: PasswordConfig,
}

impl Argon2Scheme {
    /// Creates a scheme hashing with the given cost parameters
    pub fn new(config: PasswordConfig) -> Self {
        Self { config }
    }

    /// Returns the configured cost parameters
    pub fn config(&self) -> &PasswordConfig {
        &self.config
    }
}

impl PasswordScheme for Argon2Scheme {
    fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let params = ParamsBuilder::new()
            .m_cost(self.config.memory_kib)
            .t_cost(self.config.iterations)
            .p_cost(self.config.parallelism)
            .output_len(32)
            .build()
            .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

        if parsed_hash.hash.is_none() {
            return Err(PasswordError::InvalidHash("Hash has no output".to_string()));
        }

        // Parameters come from the PHC string, not from self.config
        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme() -> Argon2Scheme {
        Argon2Scheme::new(PasswordConfig::fast_for_tests())
    }

    #[test]
    fn test_default_config() {
        let config = PasswordConfig::default();
        assert_eq!(config.memory_kib, 65536);
        assert_eq!(config.iterations, 3);
        assert_eq!(config.parallelism, 4);
    }

    #[test]
    fn test_hash_embeds_parameters() {
        let hash = Argon2Scheme::default()
            .hash("test_password_123")
            .expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=4"));
    }

    #[test]
    fn test_hash_produces_different_salts() {
        let hash1 = scheme().hash("same_password").expect("Hash 1 should succeed");
        let hash2 = scheme().hash("same_password").expect("Hash 2 should succeed");

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_correct_and_incorrect() {
        let scheme = scheme();
        let hash = scheme.hash("correct_password").unwrap();

        assert!(scheme.verify("correct_password", &hash).unwrap());
        assert!(!scheme.verify("wrong_password", &hash).unwrap());
        assert!(!scheme.verify("", &hash).unwrap());
    }

    #[test]
    fn test_verify_across_configs() {
        let weak = scheme();
        let hash = weak.hash("portable").unwrap();

        // A scheme with different costs still verifies older hashes
        assert!(Argon2Scheme::default().verify("portable", &hash).unwrap());
    }

    #[test]
    fn test_verify_invalid_hash() {
        assert!(matches!(
            scheme().verify("password", "invalid_hash"),
            Err(PasswordError::InvalidHash(_))
        ));

        // Parses as PHC (algorithm and salt) but carries no hash output
        assert!(matches!(
            scheme().verify("password", "$argon2id$invalid"),
            Err(PasswordError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let scheme = Argon2Scheme::new(PasswordConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });

        assert!(matches!(
            scheme.hash("password"),
            Err(PasswordError::HashError(_))
        ));
    }

    #[test]
    fn test_unicode_passwords() {
        let scheme = scheme();
        for password in ["with spaces", "unicode-密码-パスワード", "with-special-chars!@#$%"] {
            let hash = scheme.hash(password).unwrap();
            assert!(scheme.verify(password, &hash).unwrap(), "'{}' should verify", password);
        }
    }
}
