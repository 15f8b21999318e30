use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_timestamp, opt_date_col, timestamp_col, uuid_col};
use crate::db::DatabaseError;
use crate::models::*;

const PATIENT_COLUMNS: &str = "p.id, p.profile_id, p.date_of_birth, p.gender, p.address,
     p.blood_type, p.allergies, p.emergency_contact_name, p.emergency_contact_phone, p.created_at";

fn map_patient(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: uuid_col(row, 0)?,
        profile_id: uuid_col(row, 1)?,
        date_of_birth: opt_date_col(row, 2)?,
        gender: row.get(3)?,
        address: row.get(4)?,
        blood_type: row.get(5)?,
        allergies: row.get(6)?,
        emergency_contact_name: row.get(7)?,
        emergency_contact_phone: row.get(8)?,
        created_at: timestamp_col(row, 9)?,
    })
}

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, profile_id, date_of_birth, gender, address, blood_type,
         allergies, emergency_contact_name, emergency_contact_phone, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            patient.id.to_string(),
            patient.profile_id.to_string(),
            patient.date_of_birth.map(|d| d.to_string()),
            patient.gender,
            patient.address,
            patient.blood_type,
            patient.allergies,
            patient.emergency_contact_name,
            patient.emergency_contact_phone,
            format_timestamp(&patient.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients p WHERE p.id = ?1");
    Ok(conn
        .query_row(&sql, params![id.to_string()], map_patient)
        .optional()?)
}

pub fn get_patient_by_profile(
    conn: &Connection,
    profile_id: &Uuid,
) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients p WHERE p.profile_id = ?1");
    Ok(conn
        .query_row(&sql, params![profile_id.to_string()], map_patient)
        .optional()?)
}

/// All patients joined with their profile, newest first.
pub fn list_patients_with_profiles(
    conn: &Connection,
) -> Result<Vec<PatientWithProfile>, DatabaseError> {
    let sql = format!(
        "SELECT {PATIENT_COLUMNS}, pr.full_name, pr.email, pr.phone
         FROM patients p JOIN profiles pr ON pr.id = p.profile_id
         ORDER BY p.created_at DESC, pr.full_name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok(PatientWithProfile {
            patient: map_patient(row)?,
            full_name: row.get(10)?,
            email: row.get(11)?,
            phone: row.get(12)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE patients SET date_of_birth = ?1, gender = ?2, address = ?3, blood_type = ?4,
         allergies = ?5, emergency_contact_name = ?6, emergency_contact_phone = ?7
         WHERE id = ?8",
        params![
            patient.date_of_birth.map(|d| d.to_string()),
            patient.gender,
            patient.address,
            patient.blood_type,
            patient.allergies,
            patient.emergency_contact_name,
            patient.emergency_contact_phone,
            patient.id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "patient".into(),
            id: patient.id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_patient(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    conn.execute("DELETE FROM patients WHERE id = ?1", params![id.to_string()])?;
    Ok(())
}
