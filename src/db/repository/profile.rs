use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{enum_col, format_timestamp, not_found, timestamp_col, uuid_col};
use crate::db::{now_timestamp, DatabaseError};
use crate::models::*;

const PROFILE_COLUMNS: &str =
    "id, user_id, full_name, email, phone, role, created_at, updated_at";

fn map_profile(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: uuid_col(row, 0)?,
        user_id: uuid_col(row, 1)?,
        full_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        role: enum_col(row, 5)?,
        created_at: timestamp_col(row, 6)?,
        updated_at: timestamp_col(row, 7)?,
    })
}

pub fn insert_profile(conn: &Connection, profile: &Profile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO profiles (id, user_id, full_name, email, phone, role, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            profile.id.to_string(),
            profile.user_id.to_string(),
            profile.full_name,
            profile.email,
            profile.phone,
            profile.role.as_str(),
            format_timestamp(&profile.created_at),
            format_timestamp(&profile.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_profile(conn: &Connection, id: &Uuid) -> Result<Option<Profile>, DatabaseError> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1");
    Ok(conn
        .query_row(&sql, params![id.to_string()], map_profile)
        .optional()?)
}

pub fn get_profile_by_user(conn: &Connection, user_id: &Uuid) -> Result<Option<Profile>, DatabaseError> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1");
    Ok(conn
        .query_row(&sql, params![user_id.to_string()], map_profile)
        .optional()?)
}

/// Update display fields. Role is never written after creation.
pub fn update_profile(
    conn: &Connection,
    id: &Uuid,
    full_name: &str,
    phone: Option<&str>,
) -> Result<Profile, DatabaseError> {
    let updated = conn.execute(
        "UPDATE profiles SET full_name = ?1, phone = ?2, updated_at = ?3 WHERE id = ?4",
        params![full_name, phone, now_timestamp(), id.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "profile".into(),
            id: id.to_string(),
        });
    }
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], map_profile)
        .map_err(not_found("profile", id))
}
