/// Role directory model and database operations
///
/// Roles are static reference data. They are seeded once (see
/// `AuthService::seed_roles`) and only looked up by name during
/// provisioning.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE roles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(32) NOT NULL,
///     permissions TEXT[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT roles_name_key UNIQUE (name)
/// );
/// ```
///
/// # Roles
///
/// - **owner**: Every permission, assigned to a workspace's creator
/// - **admin**: Everything except editing or deleting the workspace
/// - **member**: View plus create/edit tasks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Names in the role directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    Owner,
    Admin,
    Member,
}

/// Workspace permissions carried by a role
///
/// Stored for consumers of the role directory; nothing in this crate
/// evaluates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    CreateWorkspace,
    DeleteWorkspace,
    EditWorkspace,
    ManageWorkspaceSettings,
    AddMember,
    ChangeMemberRole,
    RemoveMember,
    CreateProject,
    EditProject,
    DeleteProject,
    CreateTask,
    EditTask,
    DeleteTask,
    ViewOnly,
}

/// Error returned when parsing an unknown role or permission name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role directory value: {0}")]
pub struct UnknownRoleValue(pub String);

impl RoleName {
    /// Every role, in descending privilege
    pub const ALL: [RoleName; 3] = [RoleName::Owner, RoleName::Admin, RoleName::Member];

    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Owner => "owner",
            RoleName::Admin => "admin",
            RoleName::Member => "member",
        }
    }

    /// Permission set written when seeding this role
    pub fn default_permissions(&self) -> Vec<Permission> {
        use Permission::*;

        match self {
            RoleName::Owner => Permission::ALL.to_vec(),
            RoleName::Admin => Permission::ALL
                .into_iter()
                .filter(|p| !matches!(p, DeleteWorkspace | EditWorkspace))
                .collect(),
            RoleName::Member => vec![ViewOnly, CreateTask, EditTask],
        }
    }
}

impl Permission {
    pub const ALL: [Permission; 14] = [
        Permission::CreateWorkspace,
        Permission::DeleteWorkspace,
        Permission::EditWorkspace,
        Permission::ManageWorkspaceSettings,
        Permission::AddMember,
        Permission::ChangeMemberRole,
        Permission::RemoveMember,
        Permission::CreateProject,
        Permission::EditProject,
        Permission::DeleteProject,
        Permission::CreateTask,
        Permission::EditTask,
        Permission::DeleteTask,
        Permission::ViewOnly,
    ];

    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CreateWorkspace => "CREATE_WORKSPACE",
            Permission::DeleteWorkspace => "DELETE_WORKSPACE",
            Permission::EditWorkspace => "EDIT_WORKSPACE",
            Permission::ManageWorkspaceSettings => "MANAGE_WORKSPACE_SETTINGS",
            Permission::AddMember => "ADD_MEMBER",
            Permission::ChangeMemberRole => "CHANGE_MEMBER_ROLE",
            Permission::RemoveMember => "REMOVE_MEMBER",
            Permission::CreateProject => "CREATE_PROJECT",
            Permission::EditProject => "EDIT_PROJECT",
            Permission::DeleteProject => "DELETE_PROJECT",
            Permission::CreateTask => "CREATE_TASK",
            Permission::EditTask => "EDIT_TASK",
            Permission::DeleteTask => "DELETE_TASK",
            Permission::ViewOnly => "VIEW_ONLY",
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = UnknownRoleValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleName::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRoleValue(s.to_string()))
    }
}

impl FromStr for Permission {
    type Err = UnknownRoleValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|permission| permission.as_str() == s)
            .ok_or_else(|| UnknownRoleValue(s.to_string()))
    }
}

impl_text_column!(RoleName);
impl_text_column!(Permission);

/// Role model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    /// Unique role ID
    pub id: Uuid,

    /// Role name, unique in the directory
    pub name: RoleName,

    /// Permissions granted by the role
    pub permissions: Vec<Permission>,

    /// When the role was seeded
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Finds a role by name
    pub async fn find_by_name<'e, E>(executor: E, name: RoleName) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, name, permissions, created_at
            FROM roles
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(executor)
        .await?;

        Ok(role)
    }

    /// Inserts a role or replaces the permissions of an existing one
    ///
    /// The role keeps its ID when it already exists, so members referencing
    /// it stay valid.
    pub async fn upsert<'e, E>(
        executor: E,
        name: RoleName,
        permissions: &[Permission],
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (name, permissions)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET permissions = EXCLUDED.permissions
            RETURNING id, name, permissions, created_at
            "#,
        )
        .bind(name)
        .bind(permissions.to_vec())
        .fetch_one(executor)
        .await?;

        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_name_roundtrip() {
        for role in RoleName::ALL {
            assert_eq!(role.as_str().parse::<RoleName>().unwrap(), role);
        }
        assert!("OWNER".parse::<RoleName>().is_err());
        assert!("superuser".parse::<RoleName>().is_err());
    }

    #[test]
    fn test_permission_names_are_unique() {
        let mut names: Vec<&str> = Permission::ALL.iter().map(|p| p.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Permission::ALL.len());
    }

    #[test]
    fn test_owner_has_every_permission() {
        let owner = RoleName::Owner.default_permissions();
        for permission in Permission::ALL {
            assert!(owner.contains(&permission), "owner lacks {}", permission);
        }
    }

    #[test]
    fn test_admin_permissions() {
        assert_eq!(
            RoleName::Admin.default_permissions(),
            vec![
                Permission::CreateWorkspace,
                Permission::ManageWorkspaceSettings,
                Permission::AddMember,
                Permission::ChangeMemberRole,
                Permission::RemoveMember,
                Permission::CreateProject,
                Permission::EditProject,
                Permission::DeleteProject,
                Permission::CreateTask,
                Permission::EditTask,
                Permission::DeleteTask,
                Permission::ViewOnly,
            ]
        );
    }

    #[test]
    fn test_member_permissions() {
        assert_eq!(
            RoleName::Member.default_permissions(),
            vec![Permission::ViewOnly, Permission::CreateTask, Permission::EditTask]
        );
    }

    #[test]
    fn test_permission_serde_matches_stored_name() {
        for permission in Permission::ALL {
            let json = serde_json::to_string(&permission).unwrap();
            assert_eq!(json, format!("\"{}\"", permission.as_str()));
        }
    }
}
