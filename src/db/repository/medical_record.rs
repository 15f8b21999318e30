use rusqlite::{params, Connection, Row, ToSql};

use super::{date_col, format_timestamp, opt_uuid_col, timestamp_col, uuid_col};
use crate::db::DatabaseError;
use crate::models::*;

const RECORD_COLUMNS: &str = "r.id, r.patient_id, r.doctor_id, r.appointment_id, r.diagnosis,
     r.symptoms, r.treatment, r.medications, r.lab_results, r.notes, r.record_date, r.created_at";

fn map_record(row: &Row<'_>) -> rusqlite::Result<MedicalRecord> {
    Ok(MedicalRecord {
        id: uuid_col(row, 0)?,
        patient_id: uuid_col(row, 1)?,
        doctor_id: uuid_col(row, 2)?,
        appointment_id: opt_uuid_col(row, 3)?,
        diagnosis: row.get(4)?,
        symptoms: row.get(5)?,
        treatment: row.get(6)?,
        medications: row.get(7)?,
        lab_results: row.get(8)?,
        notes: row.get(9)?,
        record_date: date_col(row, 10)?,
        created_at: timestamp_col(row, 11)?,
    })
}

pub fn insert_medical_record(conn: &Connection, record: &MedicalRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medical_records (id, patient_id, doctor_id, appointment_id, diagnosis,
         symptoms, treatment, medications, lab_results, notes, record_date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            record.id.to_string(),
            record.patient_id.to_string(),
            record.doctor_id.to_string(),
            record.appointment_id.map(|id| id.to_string()),
            record.diagnosis,
            record.symptoms,
            record.treatment,
            record.medications,
            record.lab_results,
            record.notes,
            record.record_date.to_string(),
            format_timestamp(&record.created_at),
        ],
    )?;
    Ok(())
}

/// Records with display names, newest first.
pub fn list_medical_records(
    conn: &Connection,
    filter: &MedicalRecordFilter,
) -> Result<Vec<MedicalRecordDetail>, DatabaseError> {
    let mut sql = format!(
        "SELECT {RECORD_COLUMNS}, pp.full_name, dp.full_name
         FROM medical_records r
         JOIN patients p ON p.id = r.patient_id
         JOIN profiles pp ON pp.id = p.profile_id
         JOIN doctors d ON d.id = r.doctor_id
         JOIN profiles dp ON dp.id = d.profile_id
         WHERE 1=1"
    );
    let mut values: Vec<String> = Vec::new();

    if let Some(patient_id) = &filter.patient_id {
        values.push(patient_id.to_string());
        sql.push_str(&format!(" AND r.patient_id = ?{}", values.len()));
    }
    if let Some(doctor_id) = &filter.doctor_id {
        values.push(doctor_id.to_string());
        sql.push_str(&format!(" AND r.doctor_id = ?{}", values.len()));
    }
    sql.push_str(" ORDER BY r.record_date DESC, r.created_at DESC");

    let params: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params.as_slice(), |row| {
        Ok(MedicalRecordDetail {
            record: map_record(row)?,
            patient_name: row.get(12)?,
            doctor_name: row.get(13)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
