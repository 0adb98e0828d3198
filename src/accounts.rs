//! Accounts: registration, password login, external-identity login,
//! and admin-side creation of doctor and admin users.
//!
//! A user and its role profile row are always written in one
//! transaction, so a patient or doctor user never exists without its
//! profile.

use std::sync::OnceLock;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::config::AdminBootstrap;
use crate::crypto::{hash_password, verify_password, CryptoError};
use crate::db::repository::{self, NewUser};
use crate::db::DatabaseError;
use crate::models::{PublicUser, Role};
use crate::token::{AuthError, TokenService};

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("User already exists")]
    EmailTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Token error: {0}")]
    Token(#[from] AuthError),
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl From<rusqlite::Error> for AccountError {
    fn from(err: rusqlite::Error) -> Self {
        AccountError::Database(err.into())
    }
}

// ═══════════════════════════════════════════
// Request / response types
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalIdentity {
    pub name: String,
    pub email: String,
    #[serde(rename = "googleId")]
    pub google_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDoctor {
    pub name: String,
    pub email: String,
    pub password: String,
    pub specialization: String,
    pub phone: Option<String>,
}

/// A freshly authenticated user and the token they should present next.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreatedDoctor {
    pub doctor_id: i64,
    pub user_id: i64,
}

// ═══════════════════════════════════════════
// Operations
// ═══════════════════════════════════════════

/// Register a patient account: user row + patient row, then a token.
pub fn register(
    conn: &Connection,
    tokens: &TokenService,
    registration: &Registration,
) -> Result<AuthSession, AccountError> {
    let name = required("name", &registration.name)?;
    let email = validate_email(&registration.email)?;
    if registration.password.is_empty() {
        return Err(AccountError::Validation("password is required".into()));
    }

    // Hash outside the write transaction; it is the slow part.
    let password_hash = hash_password(&registration.password)?;

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    if repository::email_exists(&tx, email)? {
        return Err(AccountError::EmailTaken);
    }
    let user_id = insert_user_checked(
        &tx,
        &NewUser {
            name,
            email,
            password_hash: Some(&password_hash),
            role: Role::Patient,
            google_id: None,
        },
    )?;
    repository::insert_patient(&tx, user_id)?;
    tx.commit()?;

    tracing::info!(user_id, "Patient registered");

    let token = tokens.issue(user_id)?;
    Ok(AuthSession {
        token,
        user: PublicUser {
            id: user_id,
            name: name.to_string(),
            email: email.to_string(),
            role: Role::Patient,
        },
    })
}

/// Password login. Unknown email and wrong password are indistinguishable.
pub fn login(
    conn: &Connection,
    tokens: &TokenService,
    credentials: &Credentials,
) -> Result<AuthSession, AccountError> {
    let user = repository::get_user_by_email(conn, credentials.email.trim())?;

    let Some(user) = user else {
        // Burn the same hashing work as a real check.
        if let Some(dummy) = dummy_hash() {
            let _ = verify_password(&credentials.password, dummy);
        }
        return Err(AccountError::InvalidCredentials);
    };

    let matches = match user.password_hash.as_deref() {
        Some(stored) => verify_password(&credentials.password, stored).unwrap_or_else(|e| {
            tracing::warn!(user_id = user.id, error = %e, "Stored password hash unreadable");
            false
        }),
        None => false,
    };
    if !matches {
        return Err(AccountError::InvalidCredentials);
    }

    let token = tokens.issue(user.id)?;
    Ok(AuthSession {
        token,
        user: user.public_profile(),
    })
}

/// Login with an external identity. First sight of the identity (and of
/// its email) creates a patient account without a password.
pub fn login_with_google(
    conn: &Connection,
    tokens: &TokenService,
    identity: &ExternalIdentity,
) -> Result<AuthSession, AccountError> {
    let name = required("name", &identity.name)?;
    let email = validate_email(&identity.email)?;
    let google_id = required("googleId", &identity.google_id)?;

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let user = match repository::find_user_by_google_id_or_email(&tx, google_id, email)? {
        Some(existing) => existing.public_profile(),
        None => {
            let user_id = insert_user_checked(
                &tx,
                &NewUser {
                    name,
                    email,
                    password_hash: None,
                    role: Role::Patient,
                    google_id: Some(google_id),
                },
            )?;
            repository::insert_patient(&tx, user_id)?;
            tracing::info!(user_id, "Patient registered via external identity");
            PublicUser {
                id: user_id,
                name: name.to_string(),
                email: email.to_string(),
                role: Role::Patient,
            }
        }
    };
    tx.commit()?;

    let token = tokens.issue(user.id)?;
    Ok(AuthSession { token, user })
}

/// Admin operation: doctor user + doctor row in one transaction.
pub fn create_doctor(conn: &Connection, doctor: &NewDoctor) -> Result<CreatedDoctor, AccountError> {
    let name = required("name", &doctor.name)?;
    let email = validate_email(&doctor.email)?;
    let specialization = required("specialization", &doctor.specialization)?;
    if doctor.password.is_empty() {
        return Err(AccountError::Validation("password is required".into()));
    }
    let phone = doctor.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());

    let password_hash = hash_password(&doctor.password)?;

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let user_id = insert_user_checked(
        &tx,
        &NewUser {
            name,
            email,
            password_hash: Some(&password_hash),
            role: Role::Doctor,
            google_id: None,
        },
    )?;
    let doctor_id = repository::insert_doctor(&tx, user_id, specialization, phone)?;
    tx.commit()?;

    tracing::info!(user_id, doctor_id, "Doctor created");
    Ok(CreatedDoctor { doctor_id, user_id })
}

/// Create the configured admin account unless the email is already taken.
/// Returns `true` when a new account was written.
pub fn ensure_admin(conn: &Connection, admin: &AdminBootstrap) -> Result<bool, AccountError> {
    let email = validate_email(&admin.email)?;
    if repository::email_exists(conn, email)? {
        return Ok(false);
    }
    let password_hash = hash_password(&admin.password)?;
    let user_id = insert_user_checked(
        conn,
        &NewUser {
            name: admin.name.trim(),
            email,
            password_hash: Some(&password_hash),
            role: Role::Admin,
            google_id: None,
        },
    )?;
    tracing::info!(user_id, "Bootstrap admin created");
    Ok(true)
}

/// Look up the identity a verified token refers to.
pub fn resolve_identity(conn: &Connection, user_id: i64) -> Result<Option<PublicUser>, DatabaseError> {
    Ok(repository::get_user_by_id(conn, user_id)?.map(|u| u.public_profile()))
}

// ═══════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════

fn insert_user_checked(conn: &Connection, user: &NewUser<'_>) -> Result<i64, AccountError> {
    repository::insert_user(conn, user).map_err(|e| {
        if e.is_unique_violation() {
            AccountError::EmailTaken
        } else {
            AccountError::Database(e)
        }
    })
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, AccountError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AccountError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

fn validate_email(value: &str) -> Result<&str, AccountError> {
    let email = required("email", value)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AccountError::Validation("email is invalid".into())),
    }
}

fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("medicare-timing-equalizer").ok())
        .as_deref()
}
