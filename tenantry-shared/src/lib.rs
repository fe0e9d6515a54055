//! # Tenantry Shared Library
//!
//! Account provisioning and credential verification for a multi-tenant
//! application, plus the models and persistence they touch.
//!
//! ## Module Organization
//!
//! - `auth`: Password scheme and the provisioning/verification service
//! - `db`: Connection pooling and migrations
//! - `error`: Service error type
//! - `models`: Users, accounts, workspaces, roles, members
//! - `store`: Store traits, unit of work, PostgreSQL and in-memory backends

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod store;

/// Current version of the Tenantry shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
