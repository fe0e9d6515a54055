//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use tenantry_shared::{
    auth::{
        password::{Argon2Scheme, PasswordConfig},
        service::{AuthService, LoginOrCreateInput, RegisterInput},
    },
    models::{
        account::{Account, CreateAccount, Provider},
        member::{CreateMember, Member},
        role::{Permission, Role, RoleName},
        user::{CreateUser, User},
        workspace::{CreateWorkspace, Workspace},
    },
    store::{
        memory::MemoryDatabase, AccountStore, Database, MemberStore, RoleStore, StoreResult,
        UnitOfWork, UserStore, WorkspaceStore,
    },
};
use tokio::sync::Barrier;
use uuid::Uuid;

/// Service over an empty in-memory database
pub fn service() -> (MemoryDatabase, AuthService) {
    let db = MemoryDatabase::new();
    let service = AuthService::new(
        Arc::new(db.clone()),
        Arc::new(Argon2Scheme::new(PasswordConfig::fast_for_tests())),
    );
    (db, service)
}

/// Service over an in-memory database with the role directory seeded
pub async fn seeded_service() -> (MemoryDatabase, AuthService) {
    let (db, service) = service();
    service.seed_roles().await.expect("Failed to seed roles");
    (db, service)
}

pub fn register_input(email: &str, name: &str, password: &str) -> RegisterInput {
    RegisterInput {
        email: email.to_string(),
        name: name.to_string(),
        password: password.to_string(),
    }
}

pub fn github_login(email: &str) -> LoginOrCreateInput {
    LoginOrCreateInput {
        provider: Provider::Github,
        display_name: "Octo Cat".to_string(),
        provider_id: "gh-42".to_string(),
        picture: Some("https://avatars.example.com/octo.png".to_string()),
        email: Some(email.to_string()),
    }
}

/// Database whose units of work wait for each other before committing
///
/// Lets two operations stage their writes before either commits, so the
/// commit-time constraint checks decide the winner.
pub struct CommitBarrierDatabase {
    inner: MemoryDatabase,
    barrier: Arc<Barrier>,
}

impl CommitBarrierDatabase {
    pub fn new(inner: MemoryDatabase, parties: usize) -> Self {
        Self {
            inner,
            barrier: Arc::new(Barrier::new(parties)),
        }
    }
}

#[async_trait]
impl Database for CommitBarrierDatabase {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(BarrierUnit {
            inner: self.inner.begin().await?,
            barrier: Arc::clone(&self.barrier),
        }))
    }
}

struct BarrierUnit {
    inner: Box<dyn UnitOfWork>,
    barrier: Arc<Barrier>,
}

#[async_trait]
impl UserStore for BarrierUnit {
    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }

    async fn find_user_by_id(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        self.inner.find_user_by_id(id).await
    }

    async fn create_user(&mut self, data: CreateUser) -> StoreResult<User> {
        self.inner.create_user(data).await
    }

    async fn save_user(&mut self, user: &User) -> StoreResult<User> {
        self.inner.save_user(user).await
    }
}

#[async_trait]
impl AccountStore for BarrierUnit {
    async fn find_account(
        &mut self,
        provider: Provider,
        provider_id: &str,
    ) -> StoreResult<Option<Account>> {
        self.inner.find_account(provider, provider_id).await
    }

    async fn create_account(&mut self, data: CreateAccount) -> StoreResult<Account> {
        self.inner.create_account(data).await
    }
}

#[async_trait]
impl WorkspaceStore for BarrierUnit {
    async fn create_workspace(&mut self, data: CreateWorkspace) -> StoreResult<Workspace> {
        self.inner.create_workspace(data).await
    }
}

#[async_trait]
impl RoleStore for BarrierUnit {
    async fn find_role_by_name(&mut self, name: RoleName) -> StoreResult<Option<Role>> {
        self.inner.find_role_by_name(name).await
    }

    async fn upsert_role(
        &mut self,
        name: RoleName,
        permissions: &[Permission],
    ) -> StoreResult<Role> {
        self.inner.upsert_role(name, permissions).await
    }
}

#[async_trait]
impl MemberStore for BarrierUnit {
    async fn create_member(&mut self, data: CreateMember) -> StoreResult<Member> {
        self.inner.create_member(data).await
    }
}

#[async_trait]
impl UnitOfWork for BarrierUnit {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.barrier.wait().await;
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.inner.rollback().await
    }
}

/// Service over any database, with fast password hashing
pub fn service_over(db: Arc<dyn Database>) -> AuthService {
    AuthService::new(
        db,
        Arc::new(Argon2Scheme::new(PasswordConfig::fast_for_tests())),
    )
}
