/// Database models for Tenantry
///
/// This module contains the five collections touched by account provisioning
/// and their PostgreSQL operations.
///
/// # Models
///
/// - `user`: User identities and the password capability
/// - `account`: Links between users and authentication providers
/// - `workspace`: Tenant containers, one created per new user
/// - `role`: Static role directory (seeded, never created during provisioning)
/// - `member`: User-workspace relationships carrying a role
///
/// Every operation takes a generic `PgExecutor`, so the same query runs
/// against a `&PgPool` or inside a transaction (`&mut *tx`).
///
/// # Example
///
/// ```no_run
/// use tenantry_shared::models::user::{User, CreateUser};
/// use tenantry_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     email: "user@example.com".to_string(),
///     name: "Jane Doe".to_string(),
///     password_hash: None,
///     profile_picture: None,
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

/// Implements sqlx encoding for enums persisted as plain text columns.
///
/// The enum must provide `as_str()` and a `FromStr` impl whose error is
/// `std::error::Error + Send + Sync + 'static`.
macro_rules! impl_text_column {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <&str as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl sqlx::postgres::PgHasArrayType for $ty {
            fn array_type_info() -> sqlx::postgres::PgTypeInfo {
                <&str as sqlx::postgres::PgHasArrayType>::array_type_info()
            }

            fn array_compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <&str as sqlx::postgres::PgHasArrayType>::array_compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let text = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                Ok(text.parse::<$ty>()?)
            }
        }
    };
}

pub mod account;
pub mod member;
pub mod role;
pub mod user;
pub mod workspace;
