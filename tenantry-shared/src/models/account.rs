/// Account model and database operations
///
/// An account links a user to one authentication provider. The pair
/// `(provider, provider_id)` identifies a login method; for email/password
/// logins the provider ID is the email address.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     provider VARCHAR(32) NOT NULL,
///     provider_id VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT accounts_provider_provider_id_key UNIQUE (provider, provider_id),
///     CONSTRAINT accounts_user_id_provider_key UNIQUE (user_id, provider)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Authentication provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provider {
    /// Email and password
    #[default]
    Email,

    /// Google OAuth
    Google,

    /// GitHub OAuth
    Github,

    /// Facebook OAuth
    Facebook,
}

/// Error returned when parsing an unknown provider name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown authentication provider: {0}")]
pub struct UnknownProvider(pub String);

impl Provider {
    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Email => "EMAIL",
            Provider::Google => "GOOGLE",
            Provider::Github => "GITHUB",
            Provider::Facebook => "FACEBOOK",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EMAIL" => Ok(Provider::Email),
            "GOOGLE" => Ok(Provider::Google),
            "GITHUB" => Ok(Provider::Github),
            "FACEBOOK" => Ok(Provider::Facebook),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

impl_text_column!(Provider);

/// Account model linking a user to a provider identity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    /// Unique account ID
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Authentication provider
    pub provider: Provider,

    /// Identity at the provider (the email for `Provider::Email`)
    pub provider_id: String,

    /// When the account was linked
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccount {
    pub user_id: Uuid,
    pub provider: Provider,
    pub provider_id: String,
}

impl Account {
    /// Links a user to a provider identity
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The provider identity is already linked (`accounts_provider_provider_id_key`)
    /// - The user already has an account for this provider (`accounts_user_id_provider_key`)
    /// - The user doesn't exist (foreign key violation)
    pub async fn create<'e, E>(executor: E, data: CreateAccount) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (user_id, provider, provider_id)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, provider, provider_id, created_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.provider)
        .bind(data.provider_id)
        .fetch_one(executor)
        .await?;

        Ok(account)
    }

    /// Finds the account for a provider identity
    pub async fn find_one<'e, E>(
        executor: E,
        provider: Provider,
        provider_id: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, user_id, provider, provider_id, created_at
            FROM accounts
            WHERE provider = $1 AND provider_id = $2
            "#,
        )
        .bind(provider)
        .bind(provider_id)
        .fetch_optional(executor)
        .await?;

        Ok(account)
    }

    /// Lists all accounts linked to a user
    pub async fn list_by_user<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, user_id, provider, provider_id, created_at
            FROM accounts
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_default_is_email() {
        assert_eq!(Provider::default(), Provider::Email);
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("EMAIL".parse::<Provider>().unwrap(), Provider::Email);
        assert_eq!("google".parse::<Provider>().unwrap(), Provider::Google);
        assert_eq!("GitHub".parse::<Provider>().unwrap(), Provider::Github);
        assert_eq!(
            "myspace".parse::<Provider>(),
            Err(UnknownProvider("myspace".to_string()))
        );
    }

    #[test]
    fn test_provider_serde_uses_stored_names() {
        assert_eq!(serde_json::to_string(&Provider::Facebook).unwrap(), "\"FACEBOOK\"");
        let parsed: Provider = serde_json::from_str("\"GOOGLE\"").unwrap();
        assert_eq!(parsed, Provider::Google);
        assert_eq!(Provider::Github.to_string(), "GITHUB");
    }
}
