/// User model and database operations
///
/// A user is the identity behind one or more provider accounts. Users are
/// created on first login or on registration, and every user created through
/// provisioning owns exactly one workspace.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL,
///     name VARCHAR(255) NOT NULL,
///     password_hash VARCHAR(255),
///     profile_picture VARCHAR(1024),
///     current_workspace_id UUID REFERENCES workspaces(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT users_email_key UNIQUE (email)
/// );
/// ```
///
/// # Passwords
///
/// The hash is produced and checked through a [`PasswordScheme`], never by
/// comparing strings. OAuth-only users have no hash and never match a
/// password.
///
/// # Example
///
/// ```no_run
/// use tenantry_shared::auth::password::{Argon2Scheme, PasswordConfig};
/// use tenantry_shared::models::user::{CreateUser, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let scheme = Argon2Scheme::new(PasswordConfig::default());
/// let data = CreateUser::with_password("user@example.com", "Jane", "s3cret!", &scheme)?;
///
/// let user = User::create(&pool, data).await?;
/// assert!(user.compare_password("s3cret!", &scheme)?);
///
/// let public = user.omit_password();
/// println!("Created user: {}", public.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::auth::password::{PasswordError, PasswordScheme};

const USER_COLUMNS: &str = "id, email::TEXT AS email, name, password_hash, profile_picture, \
                            current_workspace_id, created_at, updated_at";

/// User model as stored, including the password hash
///
/// The hash is never serialized. Hand a [`SanitizedUser`] to callers outside
/// the crate.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Email address (case-insensitive, unique)
    pub email: String,

    /// Display name
    pub name: String,

    /// PHC-format password hash, absent for provider-only users
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    /// Optional avatar/profile picture URL
    pub profile_picture: Option<String>,

    /// Workspace the user is currently working in
    pub current_workspace_id: Option<Uuid>,

    /// When the user was created
    pub created_at: DateTime<Utc>,

    /// When the user was last updated
    pub updated_at: DateTime<Utc>,
}

/// User with the password hash removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub profile_picture: Option<String>,
    pub current_workspace_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Email address
    pub email: String,

    /// Display name
    pub name: String,

    /// Already-hashed password (NOT plaintext)
    pub password_hash: Option<String>,

    /// Optional avatar URL
    pub profile_picture: Option<String>,
}

impl CreateUser {
    /// Builds user input for email/password registration
    ///
    /// The plaintext password is hashed through `scheme` before it ever
    /// reaches the store.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::HashError` if hashing fails
    pub fn with_password(
        email: impl Into<String>,
        name: impl Into<String>,
        password: &str,
        scheme: &dyn PasswordScheme,
    ) -> Result<Self, PasswordError> {
        Ok(Self {
            email: email.into(),
            name: name.into(),
            password_hash: Some(scheme.hash(password)?),
            profile_picture: None,
        })
    }
}

impl User {
    /// Checks a plaintext password against the stored hash
    ///
    /// Users without a password hash (provider-only logins) never match.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored hash is malformed
    pub fn compare_password(
        &self,
        candidate: &str,
        scheme: &dyn PasswordScheme,
    ) -> Result<bool, PasswordError> {
        match self.password_hash.as_deref() {
            Some(hash) => scheme.verify(candidate, hash),
            None => Ok(false),
        }
    }

    /// Drops the password hash, producing the public view of the user
    pub fn omit_password(self) -> SanitizedUser {
        SanitizedUser {
            id: self.id,
            email: self.email,
            name: self.name,
            profile_picture: self.profile_picture,
            current_workspace_id: self.current_workspace_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email already exists (`users_email_key` violation)
    /// - Database connection fails
    pub async fn create<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO users (email, name, password_hash, profile_picture) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(data.email)
            .bind(data.name)
            .bind(data.password_hash)
            .bind(data.profile_picture)
            .fetch_one(executor)
            .await?;

        Ok(user)
    }

    /// Finds a user by ID
    ///
    /// # Returns
    ///
    /// The user if found, None otherwise
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(user)
    }

    /// Finds a user by email address
    ///
    /// Email lookup is case-insensitive (via CITEXT column type).
    pub async fn find_by_email<'e, E>(
        executor: E,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1::CITEXT");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(executor)
            .await?;

        Ok(user)
    }

    /// Persists the mutable fields of an existing user
    ///
    /// Writes name, password hash, profile picture and current workspace.
    /// `updated_at` is set to the current time.
    ///
    /// # Returns
    ///
    /// The stored user, or `sqlx::Error::RowNotFound` if it no longer exists
    pub async fn save<'e, E>(executor: E, user: &User) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE users \
             SET name = $2, password_hash = $3, profile_picture = $4, \
                 current_workspace_id = $5, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );

        let saved = sqlx::query_as::<_, User>(&query)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(&user.profile_picture)
            .bind(user.current_workspace_id)
            .fetch_one(executor)
            .await?;

        Ok(saved)
    }
}
