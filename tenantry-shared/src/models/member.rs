/// Member model and database operations
///
/// A member grants a user a role inside a workspace. Provisioning writes one
/// member per new user, pointing at the owner role.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE members (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     workspace_id UUID NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
///     role_id UUID NOT NULL REFERENCES roles(id) ON DELETE RESTRICT,
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT members_user_id_workspace_id_key UNIQUE (user_id, workspace_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Member model representing a user's role in a workspace
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Member {
    /// Unique member ID
    pub id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Workspace ID
    pub workspace_id: Uuid,

    /// Role held in the workspace
    pub role_id: Uuid,

    /// When the user joined the workspace
    pub joined_at: DateTime<Utc>,
}

/// Input for creating a new member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMember {
    pub user_id: Uuid,
    pub workspace_id: Uuid,
    pub role_id: Uuid,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    /// Adds a user to a workspace with a role
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The user is already a member (`members_user_id_workspace_id_key`)
    /// - User, workspace or role doesn't exist (foreign key violation)
    pub async fn create<'e, E>(executor: E, data: CreateMember) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let member = sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (user_id, workspace_id, role_id, joined_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, workspace_id, role_id, joined_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.workspace_id)
        .bind(data.role_id)
        .bind(data.joined_at)
        .fetch_one(executor)
        .await?;

        Ok(member)
    }

    /// Lists a user's memberships, oldest first
    pub async fn list_by_user<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let members = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, user_id, workspace_id, role_id, joined_at
            FROM members
            WHERE user_id = $1
            ORDER BY joined_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(members)
    }
}
