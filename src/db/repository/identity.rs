use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, timestamp_col, uuid_col};
use crate::db::{now_timestamp, DatabaseError};

/// Stored credentials for one identity.
#[derive(Debug, Clone)]
pub struct IdentityRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Vec<u8>,
    pub password_salt: Vec<u8>,
}

/// Persisted session. Only the token hash is stored.
#[derive(Debug, Clone)]
pub struct SessionRow {
    pub user_id: Uuid,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

pub fn insert_identity(
    conn: &Connection,
    id: &Uuid,
    email: &str,
    password_hash: &[u8],
    password_salt: &[u8],
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO identities (id, email, password_hash, password_salt, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id.to_string(), email, password_hash, password_salt, now_timestamp()],
    )?;
    Ok(())
}

pub fn find_identity_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<IdentityRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, email, password_hash, password_salt FROM identities WHERE email = ?1",
            params![email],
            |row| {
                Ok(IdentityRow {
                    id: uuid_col(row, 0)?,
                    email: row.get(1)?,
                    password_hash: row.get(2)?,
                    password_salt: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn insert_session(
    conn: &Connection,
    token_hash: &[u8; 32],
    user_id: &Uuid,
    created_at: &NaiveDateTime,
    expires_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            &token_hash[..],
            user_id.to_string(),
            format_timestamp(created_at),
            format_timestamp(expires_at),
        ],
    )?;
    Ok(())
}

pub fn find_session(
    conn: &Connection,
    token_hash: &[u8; 32],
) -> Result<Option<SessionRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT user_id, created_at, expires_at FROM sessions WHERE token_hash = ?1",
            params![&token_hash[..]],
            |row| {
                Ok(SessionRow {
                    user_id: uuid_col(row, 0)?,
                    created_at: timestamp_col(row, 1)?,
                    expires_at: timestamp_col(row, 2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Returns true if a session was removed.
pub fn delete_session(conn: &Connection, token_hash: &[u8; 32]) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM sessions WHERE token_hash = ?1",
        params![&token_hash[..]],
    )?;
    Ok(deleted > 0)
}

pub fn delete_expired_sessions(conn: &Connection) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= ?1",
        params![now_timestamp()],
    )?;
    Ok(deleted)
}
