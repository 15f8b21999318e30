use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_timestamp, timestamp_col, uuid_col};
use crate::db::DatabaseError;
use crate::models::*;

const DOCTOR_COLUMNS: &str = "d.id, d.profile_id, d.specialization, d.license_number,
     d.department, d.years_of_experience, d.created_at";

fn map_doctor(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: uuid_col(row, 0)?,
        profile_id: uuid_col(row, 1)?,
        specialization: row.get(2)?,
        license_number: row.get(3)?,
        department: row.get(4)?,
        years_of_experience: row.get(5)?,
        created_at: timestamp_col(row, 6)?,
    })
}

pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (id, profile_id, specialization, license_number, department,
         years_of_experience, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            doctor.id.to_string(),
            doctor.profile_id.to_string(),
            doctor.specialization,
            doctor.license_number,
            doctor.department,
            doctor.years_of_experience,
            format_timestamp(&doctor.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_doctor(conn: &Connection, id: &Uuid) -> Result<Option<Doctor>, DatabaseError> {
    let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors d WHERE d.id = ?1");
    Ok(conn
        .query_row(&sql, params![id.to_string()], map_doctor)
        .optional()?)
}

pub fn get_doctor_by_profile(
    conn: &Connection,
    profile_id: &Uuid,
) -> Result<Option<Doctor>, DatabaseError> {
    let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors d WHERE d.profile_id = ?1");
    Ok(conn
        .query_row(&sql, params![profile_id.to_string()], map_doctor)
        .optional()?)
}

/// All doctors joined with their profile, alphabetical by name.
pub fn list_doctors_with_profiles(
    conn: &Connection,
) -> Result<Vec<DoctorWithProfile>, DatabaseError> {
    let sql = format!(
        "SELECT {DOCTOR_COLUMNS}, pr.full_name, pr.email, pr.phone
         FROM doctors d JOIN profiles pr ON pr.id = d.profile_id
         ORDER BY pr.full_name COLLATE NOCASE"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok(DoctorWithProfile {
            doctor: map_doctor(row)?,
            full_name: row.get(7)?,
            email: row.get(8)?,
            phone: row.get(9)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE doctors SET specialization = ?1, department = ?2, years_of_experience = ?3
         WHERE id = ?4",
        params![
            doctor.specialization,
            doctor.department,
            doctor.years_of_experience,
            doctor.id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "doctor".into(),
            id: doctor.id.to_string(),
        });
    }
    Ok(())
}
