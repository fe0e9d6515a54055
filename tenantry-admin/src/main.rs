//! # Tenantry Admin
//!
//! Operator tool for the provisioning database. It applies migrations, seeds
//! the role directory and runs the provisioning operations from a shell,
//! which is handy for bootstrapping environments and debugging sign-in.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p tenantry-admin -- migrate
//! cargo run -p tenantry-admin -- seed-roles
//! cargo run -p tenantry-admin -- register ada@example.com Ada s3cret
//! cargo run -p tenantry-admin -- login google 1093 "Ada L" --email ada@example.com
//! cargo run -p tenantry-admin -- verify ada@example.com s3cret
//! ```

mod config;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tenantry_shared::{
    auth::{
        password::Argon2Scheme,
        service::{AuthService, LoginOrCreateInput, RegisterInput, VerifyInput},
    },
    db::{migrations, pool},
    error::AuthError,
    models::account::Provider,
    store::postgres::PgDatabase,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;

#[derive(Debug, Parser)]
#[command(name = "tenantry-admin", version, about = "Tenantry provisioning admin tool")]
struct Args {
    /// Skip creating the database and applying migrations on startup
    #[arg(long, global = true)]
    no_migrate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the database if needed and apply pending migrations
    Migrate,

    /// Write the owner, admin and member roles
    SeedRoles,

    /// Register an email/password user
    Register {
        email: String,
        name: String,
        password: String,
    },

    /// Sign a user in through a provider, provisioning them if new
    Login {
        /// EMAIL, GOOGLE, GITHUB or FACEBOOK
        provider: Provider,
        provider_id: String,
        display_name: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        picture: Option<String>,
    },

    /// Check email/password credentials
    Verify { email: String, password: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tenantry_admin=debug,tenantry_shared=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        command = ?args.command,
        "Tenantry admin starting"
    );

    if !args.no_migrate || matches!(args.command, Command::Migrate) {
        migrations::ensure_database_exists(&config.database.url).await?;
    }

    let pg_pool = pool::create_pool(config.database.clone()).await?;

    if !args.no_migrate || matches!(args.command, Command::Migrate) {
        migrations::run_migrations(&pg_pool).await?;
    }

    let passwords = Argon2Scheme::new(config.password);
    tracing::debug!(
        memory_kib = passwords.config().memory_kib,
        iterations = passwords.config().iterations,
        parallelism = passwords.config().parallelism,
        "Using Argon2id password scheme"
    );

    let service = AuthService::new(
        Arc::new(PgDatabase::new(pg_pool.clone())),
        Arc::new(passwords),
    );

    let outcome = run(&service, &pg_pool, args.command).await;
    pool::close_pool(pg_pool).await;

    match outcome {
        Ok(()) => Ok(()),
        Err(CommandError::Auth(err)) => {
            tracing::warn!(status = err.status_code(), error = %err, "Command rejected");
            anyhow::bail!("{} ({})", err.message(), err.status_code())
        }
        Err(CommandError::Other(err)) => Err(err),
    }
}

enum CommandError {
    Auth(AuthError),
    Other(anyhow::Error),
}

impl From<AuthError> for CommandError {
    fn from(err: AuthError) -> Self {
        CommandError::Auth(err)
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(err: anyhow::Error) -> Self {
        CommandError::Other(err)
    }
}

async fn run(
    service: &AuthService,
    pg_pool: &sqlx::PgPool,
    command: Command,
) -> Result<(), CommandError> {
    match command {
        Command::Migrate => {
            let status = migrations::get_migration_status(pg_pool)
                .await
                .map_err(anyhow::Error::from)?;
            tracing::info!(
                applied_migrations = status.applied_migrations,
                latest_version = ?status.latest_version,
                "Schema is up to date"
            );
        }
        Command::SeedRoles => {
            let roles = service.seed_roles().await?;
            print_json(&roles)?;
        }
        Command::Register {
            email,
            name,
            password,
        } => {
            let output = service
                .register_user(RegisterInput {
                    email,
                    name,
                    password,
                })
                .await?;
            print_json(&output)?;
        }
        Command::Login {
            provider,
            provider_id,
            display_name,
            email,
            picture,
        } => {
            let output = service
                .login_or_create_account(LoginOrCreateInput {
                    provider,
                    display_name,
                    provider_id,
                    picture,
                    email,
                })
                .await?;
            print_json(&output)?;
        }
        Command::Verify { email, password } => {
            let user = service
                .verify_user(VerifyInput::email(email, password))
                .await?;
            print_json(&user)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_command() {
        let args = Args::parse_from([
            "tenantry-admin",
            "login",
            "github",
            "42",
            "Octo Cat",
            "--email",
            "octo@example.com",
        ]);

        match args.command {
            Command::Login {
                provider,
                provider_id,
                email,
                picture,
                ..
            } => {
                assert_eq!(provider, Provider::Github);
                assert_eq!(provider_id, "42");
                assert_eq!(email.as_deref(), Some("octo@example.com"));
                assert!(picture.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(!args.no_migrate);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let result = Args::try_parse_from(["tenantry-admin", "login", "myspace", "1", "Tom"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_migrate_is_global() {
        let args = Args::parse_from(["tenantry-admin", "verify", "a@b.co", "pw", "--no-migrate"]);
        assert!(args.no_migrate);
        assert!(matches!(args.command, Command::Verify { .. }));
    }
}
