//! Identity provider: email + password accounts and bearer sessions.
//!
//! Sign-up runs the profile trigger in the same transaction as the
//! identity insert: a `profiles` row (role defaults to `patient`) plus
//! the matching directory row (`patients` or `doctors`). Sessions are
//! opaque bearer tokens; only their SHA-256 hash is persisted.

use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{generate_salt, generate_token, hash_token, PasswordHash, SALT_LENGTH};
use crate::db::{self, DatabaseError, TIMESTAMP_FORMAT};
use crate::models::{Doctor, Patient, Profile, Role};

pub const MIN_PASSWORD_LENGTH: usize = 8;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Sign-up form. Credentials are wiped from memory on drop.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
    #[zeroize(skip)]
    pub role: Option<Role>,
    /// Required when `role` is `doctor`.
    pub specialization: Option<String>,
    /// Required when `role` is `doctor`.
    pub license_number: Option<String>,
    pub department: Option<String>,
}

#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// A resolved, unexpired session: who is calling and with which profile.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub profile: Profile,
    pub expires_at: NaiveDateTime,
}

impl Session {
    pub fn role(&self) -> Role {
        self.profile.role
    }
}

/// Bearer token handed to the client at sign-in. Never persisted.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Password must be at least {} characters", MIN_PASSWORD_LENGTH)]
    WeakPassword,
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("An account with this email already exists")]
    EmailTaken,
    #[error("Signing up as {0} is not allowed")]
    RoleNotAllowed(Role),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Session not found")]
    SessionNotFound,
    #[error("Session expired")]
    SessionExpired,
    #[error("Identity has no profile")]
    ProfileMissing,
    #[error("Session lifetime out of range")]
    SessionTtlOutOfRange,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for IdentityError {
    fn from(err: rusqlite::Error) -> Self {
        IdentityError::Database(err.into())
    }
}

// ═══════════════════════════════════════════════════════════
// Service
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct IdentityService {
    session_ttl: Duration,
    allow_admin_signup: bool,
}

impl IdentityService {
    pub fn new(session_ttl: Duration, allow_admin_signup: bool) -> Self {
        Self {
            session_ttl,
            allow_admin_signup,
        }
    }

    /// Create an identity and run the profile trigger. Returns the new profile.
    pub fn sign_up(&self, conn: &Connection, req: &SignUpRequest) -> Result<Profile, IdentityError> {
        let email = normalize_email(&req.email)?;
        if req.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(IdentityError::WeakPassword);
        }
        let full_name = req.full_name.trim();
        if full_name.is_empty() {
            return Err(IdentityError::MissingField("full_name"));
        }
        let role = req.role.unwrap_or(Role::Patient);
        if role == Role::Admin && !self.allow_admin_signup {
            return Err(IdentityError::RoleNotAllowed(role));
        }
        let doctor_fields = if role == Role::Doctor {
            let specialization = non_empty(req.specialization.as_deref())
                .ok_or(IdentityError::MissingField("specialization"))?;
            let license = non_empty(req.license_number.as_deref())
                .ok_or(IdentityError::MissingField("license_number"))?;
            Some((specialization.to_string(), license.to_string()))
        } else {
            None
        };

        let salt = generate_salt();
        let hash = PasswordHash::derive(&req.password, &salt);
        let user_id = Uuid::new_v4();
        let now = now();

        let tx = conn.unchecked_transaction()?;
        db::insert_identity(&tx, &user_id, &email, hash.as_bytes(), &salt).map_err(|e| {
            if e.is_constraint_violation() {
                IdentityError::EmailTaken
            } else {
                e.into()
            }
        })?;

        let profile = Profile {
            id: Uuid::new_v4(),
            user_id,
            full_name: full_name.to_string(),
            email: email.clone(),
            phone: non_empty(req.phone.as_deref()).map(str::to_string),
            role,
            created_at: now,
            updated_at: now,
        };
        db::insert_profile(&tx, &profile)?;

        match (role, doctor_fields) {
            (Role::Patient, _) => db::insert_patient(&tx, &Patient::blank(profile.id, now))?,
            (Role::Doctor, Some((specialization, license_number))) => {
                let doctor = Doctor {
                    id: Uuid::new_v4(),
                    profile_id: profile.id,
                    specialization,
                    license_number,
                    department: non_empty(req.department.as_deref()).map(str::to_string),
                    years_of_experience: None,
                    created_at: now,
                };
                db::insert_doctor(&tx, &doctor).map_err(|e| {
                    if e.is_constraint_violation() {
                        DatabaseError::ConstraintViolation("license number already registered".into())
                    } else {
                        e
                    }
                })?;
            }
            _ => {}
        }
        tx.commit()?;

        tracing::info!(user_id = %user_id, role = %role, "Identity created");
        Ok(profile)
    }

    /// Verify credentials and issue a new session token.
    pub fn sign_in(&self, conn: &Connection, req: &SignInRequest) -> Result<IssuedSession, IdentityError> {
        let email = normalize_email(&req.email).map_err(|_| IdentityError::InvalidCredentials)?;

        let Some(identity) = db::find_identity_by_email(conn, &email)? else {
            // Burn the same derivation cost so unknown emails are not distinguishable by timing.
            let _ = PasswordHash::derive(&req.password, &[0u8; SALT_LENGTH]);
            tracing::info!("Sign-in rejected: unknown email");
            return Err(IdentityError::InvalidCredentials);
        };

        let candidate = PasswordHash::derive(&req.password, &identity.password_salt);
        if !candidate.matches(&identity.password_hash) {
            tracing::info!(user_id = %identity.id, "Sign-in rejected: wrong password");
            return Err(IdentityError::InvalidCredentials);
        }

        let issued = self.issue_session(conn, &identity.id)?;
        tracing::info!(user_id = %identity.id, "Signed in");
        Ok(issued)
    }

    /// Persist a fresh session for an already-authenticated identity.
    pub fn issue_session(&self, conn: &Connection, user_id: &Uuid) -> Result<IssuedSession, IdentityError> {
        let profile = db::get_profile_by_user(conn, user_id)?.ok_or(IdentityError::ProfileMissing)?;
        let token = generate_token();
        let created_at = now();
        let expires_at = created_at
            .checked_add_signed(self.session_ttl)
            .ok_or(IdentityError::SessionTtlOutOfRange)?;
        db::insert_session(conn, &hash_token(&token), user_id, &created_at, &expires_at)?;

        Ok(IssuedSession {
            token,
            session: Session {
                user_id: *user_id,
                profile,
                expires_at,
            },
        })
    }

    /// Look up the session behind a bearer token. Expired sessions are deleted.
    pub fn resolve(&self, conn: &Connection, token: &str) -> Result<Session, IdentityError> {
        let token_hash = hash_token(token);
        let row = db::find_session(conn, &token_hash)?.ok_or(IdentityError::SessionNotFound)?;

        if row.expires_at <= now() {
            db::delete_session(conn, &token_hash)?;
            return Err(IdentityError::SessionExpired);
        }

        let profile =
            db::get_profile_by_user(conn, &row.user_id)?.ok_or(IdentityError::ProfileMissing)?;
        Ok(Session {
            user_id: row.user_id,
            profile,
            expires_at: row.expires_at,
        })
    }

    /// Tear down a session. Unknown tokens are not an error.
    pub fn sign_out(&self, conn: &Connection, token: &str) -> Result<(), IdentityError> {
        if db::delete_session(conn, &hash_token(token))? {
            tracing::info!("Signed out");
        }
        Ok(())
    }
}

fn now() -> NaiveDateTime {
    // Truncate to the storage precision so in-memory and stored values compare equal.
    let formatted = chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string();
    NaiveDateTime::parse_from_str(&formatted, TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| chrono::Utc::now().naive_utc())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn normalize_email(raw: &str) -> Result<String, IdentityError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(IdentityError::InvalidEmail)
    }
}
