/// PostgreSQL store implementation
///
/// Each unit of work owns one `sqlx::Transaction`. Model operations run
/// against `&mut *tx`, so uniqueness and foreign keys are enforced by the
/// database and surface as [`StoreError::Conflict`] /
/// [`StoreError::MissingReference`].
///
/// Dropping a [`PgUnitOfWork`] without committing rolls the transaction back.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::{
    AccountStore, Database, MemberStore, RoleStore, StoreResult, UnitOfWork, UserStore,
    WorkspaceStore,
};
use crate::models::{
    account::{Account, CreateAccount, Provider},
    member::{CreateMember, Member},
    role::{Permission, Role, RoleName},
    user::{CreateUser, User},
    workspace::{CreateWorkspace, Workspace},
};

/// Database handle over a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Wraps an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        debug!("Began database transaction");
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// Unit of work backed by a PostgreSQL transaction
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UserStore for PgUnitOfWork {
    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&mut *self.tx, email).await?)
    }

    async fn find_user_by_id(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&mut *self.tx, id).await?)
    }

    async fn create_user(&mut self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&mut *self.tx, data).await?)
    }

    async fn save_user(&mut self, user: &User) -> StoreResult<User> {
        Ok(User::save(&mut *self.tx, user).await?)
    }
}

#[async_trait]
impl AccountStore for PgUnitOfWork {
    async fn find_account(
        &mut self,
        provider: Provider,
        provider_id: &str,
    ) -> StoreResult<Option<Account>> {
        Ok(Account::find_one(&mut *self.tx, provider, provider_id).await?)
    }

    async fn create_account(&mut self, data: CreateAccount) -> StoreResult<Account> {
        Ok(Account::create(&mut *self.tx, data).await?)
    }
}

#[async_trait]
impl WorkspaceStore for PgUnitOfWork {
    async fn create_workspace(&mut self, data: CreateWorkspace) -> StoreResult<Workspace> {
        Ok(Workspace::create(&mut *self.tx, data).await?)
    }
}

#[async_trait]
impl RoleStore for PgUnitOfWork {
    async fn find_role_by_name(&mut self, name: RoleName) -> StoreResult<Option<Role>> {
        Ok(Role::find_by_name(&mut *self.tx, name).await?)
    }

    async fn upsert_role(
        &mut self,
        name: RoleName,
        permissions: &[Permission],
    ) -> StoreResult<Role> {
        Ok(Role::upsert(&mut *self.tx, name, permissions).await?)
    }
}

#[async_trait]
impl MemberStore for PgUnitOfWork {
    async fn create_member(&mut self, data: CreateMember) -> StoreResult<Member> {
        Ok(Member::create(&mut *self.tx, data).await?)
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        debug!("Committed database transaction");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        debug!("Rolled back database transaction");
        Ok(())
    }
}
