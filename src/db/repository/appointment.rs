use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use uuid::Uuid;

use super::{date_col, enum_col, format_time, format_timestamp, time_col, timestamp_col, uuid_col};
use crate::db::{now_timestamp, DatabaseError};
use crate::models::*;

const APPOINTMENT_COLUMNS: &str = "a.id, a.patient_id, a.doctor_id, a.appointment_date,
     a.appointment_time, a.duration_minutes, a.status, a.reason, a.notes, a.created_at, a.updated_at";

fn map_appointment(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: uuid_col(row, 0)?,
        patient_id: uuid_col(row, 1)?,
        doctor_id: uuid_col(row, 2)?,
        appointment_date: date_col(row, 3)?,
        appointment_time: time_col(row, 4)?,
        duration_minutes: row.get(5)?,
        status: enum_col(row, 6)?,
        reason: row.get(7)?,
        notes: row.get(8)?,
        created_at: timestamp_col(row, 9)?,
        updated_at: timestamp_col(row, 10)?,
    })
}

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, doctor_id, appointment_date, appointment_time,
         duration_minutes, status, reason, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            appt.id.to_string(),
            appt.patient_id.to_string(),
            appt.doctor_id.to_string(),
            appt.appointment_date.to_string(),
            format_time(&appt.appointment_time),
            appt.duration_minutes,
            appt.status.as_str(),
            appt.reason,
            appt.notes,
            format_timestamp(&appt.created_at),
            format_timestamp(&appt.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = ?1");
    Ok(conn
        .query_row(&sql, params![id.to_string()], map_appointment)
        .optional()?)
}

/// Appointments with patient/doctor display names, ascending by (date, time).
pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<AppointmentDetail>, DatabaseError> {
    let mut sql = format!(
        "SELECT {APPOINTMENT_COLUMNS}, pp.full_name, dp.full_name, d.specialization
         FROM appointments a
         JOIN patients p ON p.id = a.patient_id
         JOIN profiles pp ON pp.id = p.profile_id
         JOIN doctors d ON d.id = a.doctor_id
         JOIN profiles dp ON dp.id = d.profile_id
         WHERE 1=1"
    );
    let mut values: Vec<String> = Vec::new();

    if let Some(patient_id) = &filter.patient_id {
        values.push(patient_id.to_string());
        sql.push_str(&format!(" AND a.patient_id = ?{}", values.len()));
    }
    if let Some(doctor_id) = &filter.doctor_id {
        values.push(doctor_id.to_string());
        sql.push_str(&format!(" AND a.doctor_id = ?{}", values.len()));
    }
    if let Some(status) = &filter.status {
        values.push(status.as_str().to_string());
        sql.push_str(&format!(" AND a.status = ?{}", values.len()));
    }
    sql.push_str(" ORDER BY a.appointment_date ASC, a.appointment_time ASC");

    let params: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params.as_slice(), |row| {
        Ok(AppointmentDetail {
            appointment: map_appointment(row)?,
            patient_name: row.get(11)?,
            doctor_name: row.get(12)?,
            doctor_specialization: row.get(13)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_appointment_status(
    conn: &Connection,
    id: &Uuid,
    status: AppointmentStatus,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_timestamp(), id.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "appointment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// True when this doctor has a completed appointment with the patient.
/// Scheduled, cancelled and no-show visits do not count.
pub fn has_treated(
    conn: &Connection,
    doctor_id: &Uuid,
    patient_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM appointments
                       WHERE doctor_id = ?1 AND patient_id = ?2 AND status = ?3)",
        params![
            doctor_id.to_string(),
            patient_id.to_string(),
            AppointmentStatus::Completed.as_str()
        ],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn list_orders_by_date_then_time() {
        let conn = open_memory_database().unwrap();
        let (_, patient) = seed_patient(&conn, "Jane Doe");
        let (_, doctor) = seed_doctor(&conn, "Greg House", "Diagnostics");
        let late = seed_appointment(&conn, &patient, &doctor, (2025, 6, 2), (8, 0), AppointmentStatus::Scheduled);
        let early_pm = seed_appointment(&conn, &patient, &doctor, (2025, 6, 1), (14, 0), AppointmentStatus::Scheduled);
        let early_am = seed_appointment(&conn, &patient, &doctor, (2025, 6, 1), (9, 30), AppointmentStatus::Scheduled);

        let ids: Vec<Uuid> = list_appointments(&conn, &AppointmentFilter::default())
            .unwrap()
            .into_iter()
            .map(|a| a.appointment.id)
            .collect();
        assert_eq!(ids, vec![early_am.id, early_pm.id, late.id]);
    }

    #[test]
    fn list_joins_display_names() {
        let conn = open_memory_database().unwrap();
        let (_, patient) = seed_patient(&conn, "Jane Doe");
        let (_, doctor) = seed_doctor(&conn, "Greg House", "Diagnostics");
        seed_appointment(&conn, &patient, &doctor, (2025, 6, 1), (9, 0), AppointmentStatus::Scheduled);

        let rows = list_appointments(&conn, &AppointmentFilter::default()).unwrap();
        assert_eq!(rows[0].patient_name, "Jane Doe");
        assert_eq!(rows[0].doctor_name, "Greg House");
        assert_eq!(rows[0].doctor_specialization, "Diagnostics");
    }

    #[test]
    fn filter_by_patient_and_status() {
        let conn = open_memory_database().unwrap();
        let (_, jane) = seed_patient(&conn, "Jane Doe");
        let (_, john) = seed_patient(&conn, "John Roe");
        let (_, doctor) = seed_doctor(&conn, "Greg House", "Diagnostics");
        seed_appointment(&conn, &jane, &doctor, (2025, 6, 1), (9, 0), AppointmentStatus::Scheduled);
        seed_appointment(&conn, &jane, &doctor, (2025, 6, 3), (9, 0), AppointmentStatus::Cancelled);
        seed_appointment(&conn, &john, &doctor, (2025, 6, 2), (9, 0), AppointmentStatus::Cancelled);

        let filter = AppointmentFilter {
            patient_id: Some(jane.id),
            status: Some(AppointmentStatus::Cancelled),
            ..Default::default()
        };
        let rows = list_appointments(&conn, &filter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].appointment.patient_id, jane.id);
    }

    #[test]
    fn status_update_persists_and_round_trips_time() {
        let conn = open_memory_database().unwrap();
        let (_, patient) = seed_patient(&conn, "Jane Doe");
        let (_, doctor) = seed_doctor(&conn, "Greg House", "Diagnostics");
        let appt = seed_appointment(&conn, &patient, &doctor, (2025, 6, 1), (9, 45), AppointmentStatus::Scheduled);

        update_appointment_status(&conn, &appt.id, AppointmentStatus::Completed).unwrap();
        let stored = get_appointment(&conn, &appt.id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Completed);
        assert_eq!(stored.appointment_time, appt.appointment_time);
    }

    #[test]
    fn has_treated_requires_completed_appointment() {
        let conn = open_memory_database().unwrap();
        let (_, jane) = seed_patient(&conn, "Jane Doe");
        let (_, john) = seed_patient(&conn, "John Roe");
        let (_, doctor) = seed_doctor(&conn, "Greg House", "Diagnostics");
        seed_appointment(&conn, &john, &doctor, (2025, 6, 1), (9, 0), AppointmentStatus::Cancelled);
        seed_appointment(&conn, &john, &doctor, (2025, 6, 2), (9, 0), AppointmentStatus::Scheduled);
        seed_appointment(&conn, &john, &doctor, (2025, 6, 3), (9, 0), AppointmentStatus::NoShow);
        assert!(!has_treated(&conn, &doctor.id, &john.id).unwrap());

        seed_appointment(&conn, &jane, &doctor, (2025, 5, 1), (9, 0), AppointmentStatus::Completed);
        assert!(has_treated(&conn, &doctor.id, &jane.id).unwrap());
    }
}
