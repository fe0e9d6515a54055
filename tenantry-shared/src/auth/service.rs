/// Account provisioning and credential verification
///
/// [`AuthService`] is called by the HTTP controller layer. It provides:
///
/// - `login_or_create_account`: sign-in through a provider, creating the user
///   and their personal workspace on first sight of an email
/// - `register_user`: email/password sign-up
/// - `verify_user`: email/password check, returning the user without its
///   password hash
/// - `seed_roles`: writes the role directory provisioning depends on
///
/// # Provisioning
///
/// A new user always gets, in one unit of work:
///
/// ```text
/// users       1 row  (current_workspace_id -> the workspace below)
/// accounts    1 row  (provider, provider_id)
/// workspaces  1 row  "My Workspace"
/// members     1 row  (user, workspace, owner role)
/// ```
///
/// If any step fails, including a missing `owner` role, the unit is rolled
/// back and nothing is persisted.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tenantry_shared::auth::password::{Argon2Scheme, PasswordConfig};
/// use tenantry_shared::auth::service::{AuthService, RegisterInput, VerifyInput};
/// use tenantry_shared::store::memory::MemoryDatabase;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = AuthService::new(
///     Arc::new(MemoryDatabase::new()),
///     Arc::new(Argon2Scheme::new(PasswordConfig::fast_for_tests())),
/// );
/// service.seed_roles().await?;
///
/// let registered = service
///     .register_user(RegisterInput {
///         email: "ada@example.com".to_string(),
///         name: "Ada".to_string(),
///         password: "analytical".to_string(),
///     })
///     .await?;
///
/// let user = service
///     .verify_user(VerifyInput::email("ada@example.com", "analytical"))
///     .await?;
/// assert_eq!(user.id, registered.user_id);
/// # Ok(())
/// # }
/// ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::auth::password::{PasswordError, PasswordScheme};
use crate::error::{AuthError, AuthResult};
use crate::models::{
    account::{CreateAccount, Provider},
    member::CreateMember,
    role::{Role, RoleName},
    user::{CreateUser, SanitizedUser, User},
    workspace::{CreateWorkspace, Workspace},
};
use crate::store::{constraints, Database, StoreError, UnitOfWork};

/// Shared by unknown-account and wrong-password failures
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Provider sign-in request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginOrCreateInput {
    /// Provider the user signed in with
    pub provider: Provider,

    /// Name reported by the provider
    #[validate(length(min = 1, max = 255, message = "Display name must be 1-255 characters"))]
    pub display_name: String,

    /// Identity at the provider
    #[validate(length(min = 1, max = 255, message = "Provider ID must be 1-255 characters"))]
    pub provider_id: String,

    /// Optional avatar URL
    #[serde(default)]
    pub picture: Option<String>,

    /// Email reported by the provider
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

/// Provider sign-in result
#[derive(Debug, Clone, Serialize)]
pub struct LoginOrCreateOutput {
    pub user: SanitizedUser,
}

/// Email/password sign-up request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(min = 4, max = 128, message = "Password must be 4-128 characters"))]
    pub password: String,
}

/// Email/password sign-up result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegisterOutput {
    pub user_id: Uuid,
    pub workspace_id: Uuid,
}

/// Credential check request
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyInput {
    pub email: String,
    pub password: String,

    /// Defaults to `Provider::Email`
    #[serde(default)]
    pub provider: Provider,
}

impl VerifyInput {
    /// Email/password check with the default provider
    pub fn email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            provider: Provider::Email,
        }
    }
}

/// Provisioning and verification over a [`Database`]
#[derive(Clone)]
pub struct AuthService {
    db: Arc<dyn Database>,
    passwords: Arc<dyn PasswordScheme>,
}

impl AuthService {
    /// Creates a service over a database and password scheme
    pub fn new(db: Arc<dyn Database>, passwords: Arc<dyn PasswordScheme>) -> Self {
        Self { db, passwords }
    }

    /// Signs a user in through a provider, provisioning them on first sight
    ///
    /// Users are matched by email. An existing user is returned unchanged,
    /// even when `provider` isn't linked to them yet.
    ///
    /// # Errors
    ///
    /// - `BadRequest`: invalid input or no email
    /// - `NotFound`: the owner role hasn't been seeded (nothing is persisted)
    pub async fn login_or_create_account(
        &self,
        mut data: LoginOrCreateInput,
    ) -> AuthResult<LoginOrCreateOutput> {
        // Blank counts as absent
        data.email = data
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|email| !email.is_empty());

        data.validate().map_err(validation_error)?;

        let email = data
            .email
            .clone()
            .ok_or_else(|| AuthError::BadRequest("Email is required".to_string()))?;

        let mut uow = self.db.begin().await?;
        let result = self.login_or_create_in(uow.as_mut(), email, data).await;
        finish(uow, result).await
    }

    /// Registers an email/password user
    ///
    /// # Errors
    ///
    /// - `BadRequest`: invalid input, or the email is already registered
    /// - `NotFound`: the owner role hasn't been seeded (nothing is persisted)
    pub async fn register_user(&self, mut body: RegisterInput) -> AuthResult<RegisterOutput> {
        body.email = normalize_email(&body.email);
        body.validate().map_err(validation_error)?;

        // Hash before opening the unit of work so no connection is held
        let passwords = Arc::clone(&self.passwords);
        let RegisterInput {
            email,
            name,
            password,
        } = body;
        let new_user = tokio::task::spawn_blocking(move || {
            CreateUser::with_password(email, name, &password, passwords.as_ref())
        })
        .await
        .map_err(|e| PasswordError::HashError(format!("Hashing task failed: {}", e)))??;

        let mut uow = self.db.begin().await?;
        let result = register_in(uow.as_mut(), new_user).await;
        finish(uow, result).await
    }

    /// Checks email/password credentials
    ///
    /// # Errors
    ///
    /// - `NotFound(INVALID_CREDENTIALS)`: no account for the email
    /// - `NotFound`: the account points at a missing user
    /// - `Unauthorized(INVALID_CREDENTIALS)`: wrong password
    pub async fn verify_user(&self, input: VerifyInput) -> AuthResult<SanitizedUser> {
        let mut uow = self.db.begin().await?;
        let result = verify_in(uow.as_mut(), &input).await;
        let user = finish(uow, result).await?;

        let passwords = Arc::clone(&self.passwords);
        let VerifyInput { password, .. } = input;
        let (user, matches) = tokio::task::spawn_blocking(move || {
            let matches = user.compare_password(&password, passwords.as_ref());
            (user, matches)
        })
        .await
        .map_err(|e| PasswordError::VerifyError(format!("Verification task failed: {}", e)))?;

        if !matches? {
            warn!(user_id = %user.id, "Password mismatch");
            return Err(AuthError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        Ok(user.omit_password())
    }

    /// Writes every role of the directory with its default permissions
    ///
    /// Safe to run repeatedly: existing roles keep their IDs.
    pub async fn seed_roles(&self) -> AuthResult<Vec<Role>> {
        let mut uow = self.db.begin().await?;
        let result = seed_in(uow.as_mut()).await;
        finish(uow, result).await
    }

    async fn login_or_create_in(
        &self,
        uow: &mut dyn UnitOfWork,
        email: String,
        data: LoginOrCreateInput,
    ) -> AuthResult<LoginOrCreateOutput> {
        if let Some(user) = uow.find_user_by_email(&email).await? {
            debug!(
                user_id = %user.id,
                provider = %data.provider,
                "Existing user signed in; provider accounts are not re-linked"
            );
            return Ok(LoginOrCreateOutput {
                user: user.omit_password(),
            });
        }

        let new_user = CreateUser {
            email,
            name: data.display_name,
            password_hash: None,
            profile_picture: data.picture,
        };

        let (user, _) = provision(uow, new_user, data.provider, data.provider_id).await?;

        Ok(LoginOrCreateOutput {
            user: user.omit_password(),
        })
    }
}

async fn register_in(uow: &mut dyn UnitOfWork, new_user: CreateUser) -> AuthResult<RegisterOutput> {
    if uow.find_user_by_email(&new_user.email).await?.is_some() {
        return Err(email_exists());
    }

    let provider_id = new_user.email.clone();
    let (user, workspace) = provision(uow, new_user, Provider::Email, provider_id).await?;

    Ok(RegisterOutput {
        user_id: user.id,
        workspace_id: workspace.id,
    })
}

/// Resolves the user behind a provider identity
async fn verify_in(uow: &mut dyn UnitOfWork, input: &VerifyInput) -> AuthResult<User> {
    let provider_id = match input.provider {
        Provider::Email => normalize_email(&input.email),
        _ => input.email.clone(),
    };

    let account = uow
        .find_account(input.provider, &provider_id)
        .await?
        .ok_or_else(|| {
            debug!(provider = %input.provider, "No account for credentials");
            AuthError::NotFound(INVALID_CREDENTIALS.to_string())
        })?;

    uow.find_user_by_id(account.user_id).await?.ok_or_else(|| {
        warn!(account_id = %account.id, user_id = %account.user_id, "Account references missing user");
        AuthError::NotFound("User not found for the given account".to_string())
    })
}

/// Creates user, account, workspace and owner membership for a new user
async fn provision(
    uow: &mut dyn UnitOfWork,
    new_user: CreateUser,
    provider: Provider,
    provider_id: String,
) -> AuthResult<(User, Workspace)> {
    let mut user = uow.create_user(new_user).await.map_err(store_error)?;

    uow.create_account(CreateAccount {
        user_id: user.id,
        provider,
        provider_id,
    })
    .await?;

    let workspace = uow
        .create_workspace(CreateWorkspace::personal(user.id, &user.name))
        .await?;

    let owner_role = uow
        .find_role_by_name(RoleName::Owner)
        .await?
        .ok_or_else(|| {
            warn!("Owner role missing from role directory; run role seeding");
            AuthError::NotFound("Owner role not found".to_string())
        })?;

    uow.create_member(CreateMember {
        user_id: user.id,
        workspace_id: workspace.id,
        role_id: owner_role.id,
        joined_at: Utc::now(),
    })
    .await?;

    user.current_workspace_id = Some(workspace.id);
    let user = uow.save_user(&user).await?;

    info!(
        user_id = %user.id,
        workspace_id = %workspace.id,
        provider = %provider,
        "Provisioned new user"
    );

    Ok((user, workspace))
}

async fn seed_in(uow: &mut dyn UnitOfWork) -> AuthResult<Vec<Role>> {
    let mut roles = Vec::with_capacity(RoleName::ALL.len());
    for name in RoleName::ALL {
        let role = uow.upsert_role(name, &name.default_permissions()).await?;
        debug!(role = %role.name, permissions = role.permissions.len(), "Seeded role");
        roles.push(role);
    }

    info!(count = roles.len(), "Role directory seeded");
    Ok(roles)
}

/// Commits on success, rolls back on failure
async fn finish<T>(uow: Box<dyn UnitOfWork>, result: AuthResult<T>) -> AuthResult<T> {
    match result {
        Ok(value) => {
            uow.commit().await.map_err(store_error)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = uow.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn email_exists() -> AuthError {
    AuthError::BadRequest("Email already exists".to_string())
}

/// A lost race on the email constraint reads the same as a duplicate
fn store_error(err: StoreError) -> AuthError {
    if err.is_conflict_on(constraints::USERS_EMAIL) {
        email_exists()
    } else {
        AuthError::Store(err)
    }
}

fn validation_error(errors: ValidationErrors) -> AuthError {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string());
                format!("{}: {}", field, message)
            })
        })
        .collect();
    messages.sort();

    AuthError::BadRequest(messages.join("; "))
}
