/// In-process store implementation
///
/// `MemoryDatabase` keeps the five collections behind a mutex and enforces
/// the same unique and reference constraints as the PostgreSQL schema,
/// reporting violations with the same constraint names.
///
/// A unit of work stages its writes privately. Reads see the unit's own
/// writes layered over committed data. `commit` re-checks uniqueness against
/// whatever other units committed in the meantime, then publishes every
/// staged row at once; dropping the unit discards them.
///
/// Committed writes are counted, which lets callers assert that an operation
/// wrote nothing.
///
/// # Example
///
/// ```
/// use tenantry_shared::store::{memory::MemoryDatabase, Database, RoleStore, UnitOfWork};
/// use tenantry_shared::models::role::RoleName;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let db = MemoryDatabase::new();
///
/// let mut uow = db.begin().await?;
/// uow.upsert_role(RoleName::Owner, &RoleName::Owner.default_permissions()).await?;
/// uow.commit().await?;
///
/// assert_eq!(db.roles().len(), 1);
/// assert_eq!(db.write_count(), 1);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::{
    constraints, AccountStore, Database, MemberStore, RoleStore, StoreError, StoreResult,
    UnitOfWork, UserStore, WorkspaceStore,
};
use crate::models::{
    account::{Account, CreateAccount, Provider},
    member::{CreateMember, Member},
    role::{Permission, Role, RoleName},
    user::{CreateUser, User},
    workspace::{CreateWorkspace, Workspace},
};

#[derive(Debug, Default, Clone)]
struct Tables {
    users: Vec<User>,
    accounts: Vec<Account>,
    workspaces: Vec<Workspace>,
    roles: Vec<Role>,
    members: Vec<Member>,
}

#[derive(Debug, Default)]
struct Committed {
    tables: Tables,
    writes: u64,
}

/// Shared in-memory database; clones share the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    shared: Arc<Mutex<Committed>>,
}

fn lock(shared: &Mutex<Committed>) -> MutexGuard<'_, Committed> {
    // Rows are only published after all checks pass, so a poisoned lock
    // still guards consistent data.
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryDatabase {
    /// Creates an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed users
    pub fn users(&self) -> Vec<User> {
        lock(&self.shared).tables.users.clone()
    }

    /// Committed accounts
    pub fn accounts(&self) -> Vec<Account> {
        lock(&self.shared).tables.accounts.clone()
    }

    /// Committed workspaces
    pub fn workspaces(&self) -> Vec<Workspace> {
        lock(&self.shared).tables.workspaces.clone()
    }

    /// Committed roles
    pub fn roles(&self) -> Vec<Role> {
        lock(&self.shared).tables.roles.clone()
    }

    /// Committed members
    pub fn members(&self) -> Vec<Member> {
        lock(&self.shared).tables.members.clone()
    }

    /// Number of row writes committed so far
    pub fn write_count(&self) -> u64 {
        lock(&self.shared).writes
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(MemoryUnitOfWork {
            shared: Arc::clone(&self.shared),
            staged: Tables::default(),
            writes: 0,
        }))
    }
}

/// Unit of work over a [`MemoryDatabase`]
pub struct MemoryUnitOfWork {
    shared: Arc<Mutex<Committed>>,
    staged: Tables,
    writes: u64,
}

fn email_taken(users: &[User], email: &str, except: Uuid) -> bool {
    users
        .iter()
        .any(|u| u.id != except && u.email.eq_ignore_ascii_case(email))
}

fn account_conflict(accounts: &[Account], candidate: &Account) -> Option<&'static str> {
    accounts.iter().find_map(|a| {
        if a.provider == candidate.provider && a.provider_id == candidate.provider_id {
            Some(constraints::ACCOUNTS_PROVIDER_ID)
        } else if a.user_id == candidate.user_id && a.provider == candidate.provider {
            Some(constraints::ACCOUNTS_USER_PROVIDER)
        } else {
            None
        }
    })
}

fn member_taken(members: &[Member], candidate: &Member) -> bool {
    members
        .iter()
        .any(|m| m.user_id == candidate.user_id && m.workspace_id == candidate.workspace_id)
}

/// Replaces the row with the same key or appends it
fn upsert_by<T, K: PartialEq>(rows: &mut Vec<T>, row: T, key: impl Fn(&T) -> K) {
    let k = key(&row);
    match rows.iter_mut().find(|r| key(r) == k) {
        Some(existing) => *existing = row,
        None => rows.push(row),
    }
}

impl MemoryUnitOfWork {
    fn committed(&self) -> MutexGuard<'_, Committed> {
        lock(&self.shared)
    }

    fn user_exists(&self, id: Uuid) -> bool {
        self.staged.users.iter().any(|u| u.id == id)
            || self.committed().tables.users.iter().any(|u| u.id == id)
    }

    fn workspace_exists(&self, id: Uuid) -> bool {
        self.staged.workspaces.iter().any(|w| w.id == id)
            || self.committed().tables.workspaces.iter().any(|w| w.id == id)
    }

    fn role_exists(&self, id: Uuid) -> bool {
        self.staged.roles.iter().any(|r| r.id == id)
            || self.committed().tables.roles.iter().any(|r| r.id == id)
    }
}

#[async_trait]
impl UserStore for MemoryUnitOfWork {
    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        if let Some(user) = self
            .staged
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
        {
            return Ok(Some(user.clone()));
        }

        Ok(self
            .committed()
            .tables
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_id(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        if let Some(user) = self.staged.users.iter().find(|u| u.id == id) {
            return Ok(Some(user.clone()));
        }

        Ok(self
            .committed()
            .tables
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn create_user(&mut self, data: CreateUser) -> StoreResult<User> {
        let id = Uuid::new_v4();
        if email_taken(&self.staged.users, &data.email, id)
            || email_taken(&self.committed().tables.users, &data.email, id)
        {
            return Err(StoreError::Conflict(constraints::USERS_EMAIL.to_string()));
        }

        let now = Utc::now();
        let user = User {
            id,
            email: data.email,
            name: data.name,
            password_hash: data.password_hash,
            profile_picture: data.profile_picture,
            current_workspace_id: None,
            created_at: now,
            updated_at: now,
        };

        self.staged.users.push(user.clone());
        self.writes += 1;
        Ok(user)
    }

    async fn save_user(&mut self, user: &User) -> StoreResult<User> {
        let current = self
            .find_user_by_id(user.id)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;

        if let Some(workspace_id) = user.current_workspace_id {
            if !self.workspace_exists(workspace_id) {
                return Err(StoreError::MissingReference(
                    "users_current_workspace_id_fkey".to_string(),
                ));
            }
        }

        // Email is not one of the saved fields
        let saved = User {
            email: current.email,
            created_at: current.created_at,
            updated_at: Utc::now(),
            ..user.clone()
        };

        upsert_by(&mut self.staged.users, saved.clone(), |u| u.id);
        self.writes += 1;
        Ok(saved)
    }
}

#[async_trait]
impl AccountStore for MemoryUnitOfWork {
    async fn find_account(
        &mut self,
        provider: Provider,
        provider_id: &str,
    ) -> StoreResult<Option<Account>> {
        let is_match = |a: &&Account| a.provider == provider && a.provider_id == provider_id;

        if let Some(account) = self.staged.accounts.iter().find(is_match) {
            return Ok(Some(account.clone()));
        }

        Ok(self.committed().tables.accounts.iter().find(is_match).cloned())
    }

    async fn create_account(&mut self, data: CreateAccount) -> StoreResult<Account> {
        if !self.user_exists(data.user_id) {
            return Err(StoreError::MissingReference("accounts_user_id_fkey".to_string()));
        }

        let account = Account {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            provider: data.provider,
            provider_id: data.provider_id,
            created_at: Utc::now(),
        };

        let conflict = account_conflict(&self.staged.accounts, &account)
            .or_else(|| account_conflict(&self.committed().tables.accounts, &account));
        if let Some(constraint) = conflict {
            return Err(StoreError::Conflict(constraint.to_string()));
        }

        self.staged.accounts.push(account.clone());
        self.writes += 1;
        Ok(account)
    }
}

#[async_trait]
impl WorkspaceStore for MemoryUnitOfWork {
    async fn create_workspace(&mut self, data: CreateWorkspace) -> StoreResult<Workspace> {
        if !self.user_exists(data.owner_user_id) {
            return Err(StoreError::MissingReference(
                "workspaces_owner_user_id_fkey".to_string(),
            ));
        }

        let now = Utc::now();
        let workspace = Workspace {
            id: Uuid::new_v4(),
            name: data.name,
            description: data.description,
            owner_user_id: data.owner_user_id,
            created_at: now,
            updated_at: now,
        };

        self.staged.workspaces.push(workspace.clone());
        self.writes += 1;
        Ok(workspace)
    }
}

#[async_trait]
impl RoleStore for MemoryUnitOfWork {
    async fn find_role_by_name(&mut self, name: RoleName) -> StoreResult<Option<Role>> {
        if let Some(role) = self.staged.roles.iter().find(|r| r.name == name) {
            return Ok(Some(role.clone()));
        }

        Ok(self
            .committed()
            .tables
            .roles
            .iter()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn upsert_role(
        &mut self,
        name: RoleName,
        permissions: &[Permission],
    ) -> StoreResult<Role> {
        let role = match self.find_role_by_name(name).await? {
            Some(existing) => Role {
                permissions: permissions.to_vec(),
                ..existing
            },
            None => Role {
                id: Uuid::new_v4(),
                name,
                permissions: permissions.to_vec(),
                created_at: Utc::now(),
            },
        };

        upsert_by(&mut self.staged.roles, role.clone(), |r| r.name);
        self.writes += 1;
        Ok(role)
    }
}

#[async_trait]
impl MemberStore for MemoryUnitOfWork {
    async fn create_member(&mut self, data: CreateMember) -> StoreResult<Member> {
        if !self.user_exists(data.user_id) {
            return Err(StoreError::MissingReference("members_user_id_fkey".to_string()));
        }
        if !self.workspace_exists(data.workspace_id) {
            return Err(StoreError::MissingReference(
                "members_workspace_id_fkey".to_string(),
            ));
        }
        if !self.role_exists(data.role_id) {
            return Err(StoreError::MissingReference("members_role_id_fkey".to_string()));
        }

        let member = Member {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            workspace_id: data.workspace_id,
            role_id: data.role_id,
            joined_at: data.joined_at,
        };

        if member_taken(&self.staged.members, &member)
            || member_taken(&self.committed().tables.members, &member)
        {
            return Err(StoreError::Conflict(
                constraints::MEMBERS_USER_WORKSPACE.to_string(),
            ));
        }

        self.staged.members.push(member.clone());
        self.writes += 1;
        Ok(member)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork {
            shared,
            staged,
            writes,
        } = *self;
        let mut committed = lock(&shared);

        // Another unit may have committed conflicting rows since staging
        for user in &staged.users {
            if email_taken(&committed.tables.users, &user.email, user.id) {
                return Err(StoreError::Conflict(constraints::USERS_EMAIL.to_string()));
            }
        }
        for account in &staged.accounts {
            if let Some(constraint) = account_conflict(&committed.tables.accounts, account) {
                return Err(StoreError::Conflict(constraint.to_string()));
            }
        }
        for member in &staged.members {
            if member_taken(&committed.tables.members, member) {
                return Err(StoreError::Conflict(
                    constraints::MEMBERS_USER_WORKSPACE.to_string(),
                ));
            }
        }

        let tables = &mut committed.tables;
        for user in staged.users {
            upsert_by(&mut tables.users, user, |u| u.id);
        }

        // A role committed first by another unit keeps its ID; members
        // staged against the losing ID are pointed at the surviving one
        let mut members = staged.members;
        for mut role in staged.roles {
            if let Some(existing) = tables.roles.iter().find(|r| r.name == role.name) {
                if existing.id != role.id {
                    for member in members.iter_mut().filter(|m| m.role_id == role.id) {
                        member.role_id = existing.id;
                    }
                }
                role.id = existing.id;
                role.created_at = existing.created_at;
            }
            upsert_by(&mut tables.roles, role, |r| r.name);
        }

        tables.accounts.extend(staged.accounts);
        tables.workspaces.extend(staged.workspaces);
        tables.members.extend(members);
        committed.writes += writes;

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> CreateUser {
        CreateUser {
            email: email.to_string(),
            name: "Test".to_string(),
            password_hash: None,
            profile_picture: None,
        }
    }

    #[tokio::test]
    async fn test_staged_rows_invisible_until_commit() {
        let db = MemoryDatabase::new();

        let mut uow = db.begin().await.unwrap();
        let user = uow.create_user(new_user("a@example.com")).await.unwrap();

        // Visible inside the unit, not outside
        assert!(uow.find_user_by_id(user.id).await.unwrap().is_some());
        assert!(db.users().is_empty());

        uow.commit().await.unwrap();
        assert_eq!(db.users().len(), 1);
        assert_eq!(db.write_count(), 1);
    }

    #[tokio::test]
    async fn test_rollback_and_drop_discard_writes() {
        let db = MemoryDatabase::new();

        let mut uow = db.begin().await.unwrap();
        uow.create_user(new_user("a@example.com")).await.unwrap();
        uow.rollback().await.unwrap();

        let mut uow = db.begin().await.unwrap();
        uow.create_user(new_user("b@example.com")).await.unwrap();
        drop(uow);

        assert!(db.users().is_empty());
        assert_eq!(db.write_count(), 0);
    }

    #[tokio::test]
    async fn test_email_uniqueness_is_case_insensitive() {
        let db = MemoryDatabase::new();

        let mut uow = db.begin().await.unwrap();
        uow.create_user(new_user("Ada@Example.com")).await.unwrap();
        let err = uow.create_user(new_user("ada@example.com")).await.unwrap_err();
        assert!(err.is_conflict_on(constraints::USERS_EMAIL));

        let found = uow.find_user_by_email("ADA@EXAMPLE.COM").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_commit_rechecks_against_concurrent_units() {
        let db = MemoryDatabase::new();

        let mut first = db.begin().await.unwrap();
        let mut second = db.begin().await.unwrap();
        first.create_user(new_user("race@example.com")).await.unwrap();
        second.create_user(new_user("race@example.com")).await.unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();

        assert!(err.is_conflict_on(constraints::USERS_EMAIL));
        assert_eq!(db.users().len(), 1);
    }

    #[tokio::test]
    async fn test_account_constraints() {
        let db = MemoryDatabase::new();
        let mut uow = db.begin().await.unwrap();
        let user = uow.create_user(new_user("a@example.com")).await.unwrap();

        let link = |provider, provider_id: &str| CreateAccount {
            user_id: user.id,
            provider,
            provider_id: provider_id.to_string(),
        };

        uow.create_account(link(Provider::Google, "g-1")).await.unwrap();

        let err = uow.create_account(link(Provider::Google, "g-2")).await.unwrap_err();
        assert!(err.is_conflict_on(constraints::ACCOUNTS_USER_PROVIDER));

        let orphan = CreateAccount {
            user_id: Uuid::new_v4(),
            provider: Provider::Google,
            provider_id: "g-1".to_string(),
        };
        let err = uow.create_account(orphan).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference(_)));

        let found = uow.find_account(Provider::Google, "g-1").await.unwrap();
        assert_eq!(found.map(|a| a.user_id), Some(user.id));
        assert!(uow.find_account(Provider::Github, "g-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_role_keeps_id() {
        let db = MemoryDatabase::new();

        let mut uow = db.begin().await.unwrap();
        let first = uow.upsert_role(RoleName::Member, &[]).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = db.begin().await.unwrap();
        let second = uow
            .upsert_role(RoleName::Member, &[Permission::ViewOnly])
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(first.id, second.id);
        let roles = db.roles();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].permissions, vec![Permission::ViewOnly]);
    }

    #[tokio::test]
    async fn test_racing_role_seeds_keep_first_id() {
        let db = MemoryDatabase::new();

        let mut first = db.begin().await.unwrap();
        let mut second = db.begin().await.unwrap();
        let kept = first.upsert_role(RoleName::Owner, &[]).await.unwrap();
        let lost = second
            .upsert_role(RoleName::Owner, &[Permission::ViewOnly])
            .await
            .unwrap();
        assert_ne!(kept.id, lost.id);

        let user = second.create_user(new_user("a@example.com")).await.unwrap();
        let workspace = second
            .create_workspace(CreateWorkspace::personal(user.id, &user.name))
            .await
            .unwrap();
        second
            .create_member(CreateMember {
                user_id: user.id,
                workspace_id: workspace.id,
                role_id: lost.id,
                joined_at: Utc::now(),
            })
            .await
            .unwrap();

        first.commit().await.unwrap();
        second.commit().await.unwrap();

        let roles = db.roles();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].id, kept.id);
        assert_eq!(roles[0].permissions, vec![Permission::ViewOnly]);
        assert_eq!(db.members()[0].role_id, kept.id);
    }

    #[tokio::test]
    async fn test_save_user_requires_existing_workspace() {
        let db = MemoryDatabase::new();
        let mut uow = db.begin().await.unwrap();
        let mut user = uow.create_user(new_user("a@example.com")).await.unwrap();

        user.current_workspace_id = Some(Uuid::new_v4());
        let err = uow.save_user(&user).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference(_)));
    }
}
