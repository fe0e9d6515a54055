/// Persistence seams used by the provisioning service
///
/// The service talks to five passive stores (users, accounts, workspaces,
/// roles, members) through the traits in this module. Every operation runs
/// inside a [`UnitOfWork`] obtained from a [`Database`]; nothing becomes
/// visible to other units until `commit` succeeds, and dropping or rolling
/// back a unit discards its writes.
///
/// # Implementations
///
/// - `postgres`: `PgDatabase`, one `sqlx::Transaction` per unit of work
/// - `memory`: `MemoryDatabase`, an in-process store with the same unique
///   constraints, used by tests and local tooling
///
/// # Example
///
/// ```no_run
/// use tenantry_shared::store::{postgres::PgDatabase, Database, UnitOfWork, UserStore};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let db = PgDatabase::new(pool);
///
/// let mut uow = db.begin().await?;
/// let user = uow.find_user_by_email("user@example.com").await?;
/// uow.rollback().await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    account::{Account, CreateAccount, Provider},
    member::{CreateMember, Member},
    role::{Permission, Role, RoleName},
    user::{CreateUser, User},
    workspace::{CreateWorkspace, Workspace},
};

pub mod memory;
pub mod postgres;

/// Constraint names shared by every store implementation
pub mod constraints {
    pub const USERS_EMAIL: &str = "users_email_key";
    pub const ACCOUNTS_PROVIDER_ID: &str = "accounts_provider_provider_id_key";
    pub const ACCOUNTS_USER_PROVIDER: &str = "accounts_user_id_provider_key";
    pub const MEMBERS_USER_WORKSPACE: &str = "members_user_id_workspace_id_key";
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; holds the constraint name
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    /// A referenced row doesn't exist
    #[error("Referenced record missing: {0}")]
    MissingReference(String),

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Returns true if this is a violation of the named unique constraint
    pub fn is_conflict_on(&self, constraint: &str) -> bool {
        matches!(self, StoreError::Conflict(name) if name == constraint)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::Conflict(constraint);
            }
            if db_err.is_foreign_key_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::MissingReference(constraint);
            }
        }
        StoreError::Database(err)
    }
}

/// User collection
#[async_trait]
pub trait UserStore: Send {
    /// Finds a user by email (case-insensitive)
    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>>;

    /// Finds a user by ID
    async fn find_user_by_id(&mut self, id: Uuid) -> StoreResult<Option<User>>;

    /// Inserts a user
    async fn create_user(&mut self, data: CreateUser) -> StoreResult<User>;

    /// Persists the mutable fields of an existing user
    async fn save_user(&mut self, user: &User) -> StoreResult<User>;
}

/// Account collection
#[async_trait]
pub trait AccountStore: Send {
    /// Finds the account for a provider identity
    async fn find_account(
        &mut self,
        provider: Provider,
        provider_id: &str,
    ) -> StoreResult<Option<Account>>;

    /// Links a user to a provider identity
    async fn create_account(&mut self, data: CreateAccount) -> StoreResult<Account>;
}

/// Workspace collection
#[async_trait]
pub trait WorkspaceStore: Send {
    /// Inserts a workspace
    async fn create_workspace(&mut self, data: CreateWorkspace) -> StoreResult<Workspace>;
}

/// Role directory
#[async_trait]
pub trait RoleStore: Send {
    /// Looks up a role by name
    async fn find_role_by_name(&mut self, name: RoleName) -> StoreResult<Option<Role>>;

    /// Inserts a role or replaces its permissions, keeping its ID
    async fn upsert_role(&mut self, name: RoleName, permissions: &[Permission])
        -> StoreResult<Role>;
}

/// Member collection
#[async_trait]
pub trait MemberStore: Send {
    /// Inserts a member
    async fn create_member(&mut self, data: CreateMember) -> StoreResult<Member>;
}

/// All five stores behind one atomic boundary
#[async_trait]
pub trait UnitOfWork: UserStore + AccountStore + WorkspaceStore + RoleStore + MemberStore {
    /// Makes every write of this unit visible at once
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discards every write of this unit
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Source of units of work
#[async_trait]
pub trait Database: Send + Sync {
    /// Starts a new unit of work
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_conflict_on() {
        let err = StoreError::Conflict(constraints::USERS_EMAIL.to_string());
        assert!(err.is_conflict_on(constraints::USERS_EMAIL));
        assert!(!err.is_conflict_on(constraints::ACCOUNTS_PROVIDER_ID));
        assert!(!StoreError::Database(sqlx::Error::RowNotFound)
            .is_conflict_on(constraints::USERS_EMAIL));
    }

    #[test]
    fn test_from_sqlx_non_database_error() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }
}
