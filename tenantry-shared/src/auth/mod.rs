/// Authentication for Tenantry
///
/// - `password`: pluggable password hashing (`PasswordScheme`, Argon2id default)
/// - `service`: account provisioning and credential verification (`AuthService`)

pub mod password;
pub mod service;
