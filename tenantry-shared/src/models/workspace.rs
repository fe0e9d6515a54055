/// Workspace model and database operations
///
/// A workspace is the tenant container. Provisioning creates exactly one
/// workspace per new user, named [`DEFAULT_WORKSPACE_NAME`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE workspaces (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     owner_user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Name given to the workspace created for every new user
pub const DEFAULT_WORKSPACE_NAME: &str = "My Workspace";

/// Workspace model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Workspace {
    /// Unique workspace ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// User who created and owns the workspace
    pub owner_user_id: Uuid,

    /// When the workspace was created
    pub created_at: DateTime<Utc>,

    /// When the workspace was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new workspace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkspace {
    pub name: String,
    pub description: Option<String>,
    pub owner_user_id: Uuid,
}

impl CreateWorkspace {
    /// The personal workspace created during provisioning
    pub fn personal(owner_user_id: Uuid, owner_name: &str) -> Self {
        Self {
            name: DEFAULT_WORKSPACE_NAME.to_string(),
            description: Some(format!("Workspace created for {}", owner_name)),
            owner_user_id,
        }
    }
}

impl Workspace {
    /// Creates a new workspace
    ///
    /// # Errors
    ///
    /// Returns an error if the owner doesn't exist or the database fails
    pub async fn create<'e, E>(executor: E, data: CreateWorkspace) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let workspace = sqlx::query_as::<_, Workspace>(
            r#"
            INSERT INTO workspaces (name, description, owner_user_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, owner_user_id, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.owner_user_id)
        .fetch_one(executor)
        .await?;

        Ok(workspace)
    }

    /// Finds a workspace by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let workspace = sqlx::query_as::<_, Workspace>(
            r#"
            SELECT id, name, description, owner_user_id, created_at, updated_at
            FROM workspaces
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(workspace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_personal_workspace() {
        let owner = Uuid::new_v4();
        let data = CreateWorkspace::personal(owner, "Ada");

        assert_eq!(data.name, "My Workspace");
        assert_eq!(data.description.as_deref(), Some("Workspace created for Ada"));
        assert_eq!(data.owner_user_id, owner);
    }
}
