//! Repository layer: entity-scoped database operations.
//!
//! These functions are unscoped: they see every row. Application code
//! reaches them only through `access::ScopedStore`, which applies the
//! per-role row predicates.

mod appointment;
mod audit;
mod doctor;
mod identity;
mod medical_record;
mod patient;
mod profile;

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::Type;
use rusqlite::Row;
use uuid::Uuid;

use super::{DatabaseError, TIMESTAMP_FORMAT};

pub use appointment::*;
pub use audit::*;
pub use doctor::*;
pub use identity::*;
pub use medical_record::*;
pub use patient::*;
pub use profile::*;

// ── Column decoding ─────────────────────────────────────────

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(crate) fn date_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_date_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(crate) fn time_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveTime> {
    let raw: String = row.get(idx)?;
    crate::models::parse_time(&raw).ok_or_else(|| {
        conversion_error(
            idx,
            DatabaseError::ConstraintViolation(format!("invalid time '{raw}'")),
        )
    })
}

pub(crate) fn timestamp_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn enum_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = DatabaseError>,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn format_time(time: &NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Map "no rows" to a typed `NotFound`.
pub(crate) fn not_found(entity_type: &str, id: &Uuid) -> impl FnOnce(rusqlite::Error) -> DatabaseError {
    let entity_type = entity_type.to_string();
    let id = id.to_string();
    move |err| match err {
        rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound { entity_type, id },
        other => DatabaseError::Sqlite(other),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::*;

    #[test]
    fn deleting_patient_cascades_to_appointments_and_records() {
        let conn = open_memory_database().unwrap();
        let (_, patient) = seed_patient(&conn, "Jane Doe");
        let (_, doctor) = seed_doctor(&conn, "Greg House", "Diagnostics");
        seed_appointment(&conn, &patient, &doctor, (2025, 5, 1), (9, 0), AppointmentStatus::Scheduled);
        seed_record(&conn, &patient, &doctor, "Flu", (2025, 5, 1));

        delete_patient(&conn, &patient.id).unwrap();

        assert!(list_appointments(&conn, &AppointmentFilter::default()).unwrap().is_empty());
        assert!(list_medical_records(&conn, &MedicalRecordFilter::default()).unwrap().is_empty());
        assert!(get_doctor(&conn, &doctor.id).unwrap().is_some());
    }

    #[test]
    fn deleting_appointment_keeps_record_without_link() {
        let conn = open_memory_database().unwrap();
        let (_, patient) = seed_patient(&conn, "Jane Doe");
        let (_, doctor) = seed_doctor(&conn, "Greg House", "Diagnostics");
        let appt =
            seed_appointment(&conn, &patient, &doctor, (2025, 5, 1), (9, 0), AppointmentStatus::Completed);
        let mut record = seed_record(&conn, &patient, &doctor, "Flu", (2025, 5, 1));
        record.appointment_id = Some(appt.id);
        conn.execute(
            "UPDATE medical_records SET appointment_id = ?1 WHERE id = ?2",
            rusqlite::params![appt.id.to_string(), record.id.to_string()],
        )
        .unwrap();

        conn.execute(
            "DELETE FROM appointments WHERE id = ?1",
            rusqlite::params![appt.id.to_string()],
        )
        .unwrap();

        let records = list_medical_records(&conn, &MedicalRecordFilter::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].record.appointment_id.is_none());
    }

    #[test]
    fn appointment_requires_existing_patient() {
        let conn = open_memory_database().unwrap();
        let (_, patient) = seed_patient(&conn, "Jane Doe");
        let (_, doctor) = seed_doctor(&conn, "Greg House", "Diagnostics");
        let mut ghost = patient.clone();
        ghost.id = Uuid::new_v4();

        let appt = Appointment {
            id: Uuid::new_v4(),
            patient_id: ghost.id,
            doctor_id: doctor.id,
            appointment_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            appointment_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            duration_minutes: 30,
            status: AppointmentStatus::Scheduled,
            reason: None,
            notes: None,
            created_at: now(),
            updated_at: now(),
        };
        let err = insert_appointment(&conn, &appt).unwrap_err();
        assert!(err.is_constraint_violation());
    }
}
