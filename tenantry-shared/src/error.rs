/// Error type for the provisioning service
///
/// The three caller-facing kinds (`NotFound`, `BadRequest`, `Unauthorized`)
/// carry the message meant for the client. Store and password failures are
/// internal and should be reported without details.
///
/// # Example
///
/// ```
/// use tenantry_shared::error::AuthError;
///
/// let err = AuthError::Unauthorized("Invalid email or password".to_string());
/// assert_eq!(err.status_code(), 401);
/// assert_eq!(err.message(), "Invalid email or password");
/// ```

use crate::auth::password::PasswordError;
use crate::store::StoreError;

/// Result type alias for service operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Unified service error type
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing record or seed data (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input or duplicate registration (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Credentials rejected (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Persistence failure (500)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Password hashing failure (500)
    #[error("Password operation failed: {0}")]
    Password(#[from] PasswordError),
}

impl AuthError {
    /// HTTP status the controller layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::NotFound(_) => 404,
            AuthError::BadRequest(_) => 400,
            AuthError::Unauthorized(_) => 401,
            AuthError::Store(_) | AuthError::Password(_) => 500,
        }
    }

    /// Message safe to show to the client
    pub fn message(&self) -> &str {
        match self {
            AuthError::NotFound(msg) | AuthError::BadRequest(msg) | AuthError::Unauthorized(msg) => {
                msg
            }
            AuthError::Store(_) | AuthError::Password(_) => "An internal error occurred",
        }
    }
}
