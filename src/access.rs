//! Policy-enforcing data access.
//!
//! `ScopedStore` pairs a connection with a `Viewer` and is the only way
//! page code touches clinical rows. Reads run the repository query, then
//! keep only rows the viewer may see (denied rows vanish without error).
//! Writes check the matching predicate against the row as it will be
//! stored, and fail with `AccessError::Denied` otherwise.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use uuid::Uuid;

use crate::authorization::{self as policy, Viewer};
use crate::db::{self, DatabaseError, TIMESTAMP_FORMAT};
use crate::models::*;

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("Not permitted to modify this {0}")]
    Denied(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("Cannot move appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    #[error("{0}")]
    Unsupported(&'static str),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl AccessError {
    fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

/// Directory entity kinds an admin might try to provision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryKind {
    Patient,
    Doctor,
}

pub const PROVISIONING_UNSUPPORTED: &str =
    "Accounts are created through sign-up; directory entries cannot be added here";

pub struct ScopedStore<'c> {
    conn: &'c Connection,
    viewer: Viewer,
}

impl<'c> ScopedStore<'c> {
    pub fn new(conn: &'c Connection, viewer: Viewer) -> Self {
        Self { conn, viewer }
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    // ── Profiles ────────────────────────────────────────────

    pub fn own_profile(&self) -> Result<Profile, AccessError> {
        db::get_profile(self.conn, &self.viewer.profile_id)?.ok_or(AccessError::NotFound("profile"))
    }

    pub fn get_profile(&self, id: &Uuid) -> Result<Option<Profile>, AccessError> {
        Ok(db::get_profile(self.conn, id)?
            .filter(|p| policy::check_profile_read(&self.viewer, p).allowed))
    }

    pub fn update_own_profile(&self, update: ProfileUpdate) -> Result<Profile, AccessError> {
        let current = self.own_profile()?;
        if !policy::check_profile_write(&self.viewer, &current).allowed {
            return Err(AccessError::Denied("profile"));
        }
        let full_name = match update.full_name {
            Some(name) if name.trim().is_empty() => {
                return Err(AccessError::validation("full_name", "must not be empty"))
            }
            Some(name) => name.trim().to_string(),
            None => current.full_name,
        };
        let phone = match update.phone {
            Some(phone) if phone.trim().is_empty() => None,
            Some(phone) => Some(phone.trim().to_string()),
            None => current.phone,
        };
        let updated = db::update_profile(self.conn, &current.id, &full_name, phone.as_deref())?;
        tracing::info!(profile_id = %updated.id, "Profile updated");
        Ok(updated)
    }

    // ── Patients ────────────────────────────────────────────

    pub fn list_patients(&self) -> Result<Vec<PatientWithProfile>, AccessError> {
        let mut rows = db::list_patients_with_profiles(self.conn)?;
        rows.retain(|row| policy::check_patient_read(&self.viewer, &row.patient).allowed);
        Ok(rows)
    }

    pub fn get_patient(&self, id: &Uuid) -> Result<Option<Patient>, AccessError> {
        Ok(db::get_patient(self.conn, id)?
            .filter(|p| policy::check_patient_read(&self.viewer, p).allowed))
    }

    pub fn update_patient(&self, id: &Uuid, update: PatientUpdate) -> Result<Patient, AccessError> {
        let mut patient = self.get_patient(id)?.ok_or(AccessError::NotFound("patient"))?;
        if !policy::check_patient_write(&self.viewer, &patient).allowed {
            tracing::warn!(viewer = %self.viewer.profile_id, patient_id = %id, "Denied patient update");
            return Err(AccessError::Denied("patient"));
        }
        update.apply(&mut patient);
        db::update_patient(self.conn, &patient)?;
        tracing::info!(patient_id = %id, "Patient updated");
        Ok(patient)
    }

    // ── Doctors ─────────────────────────────────────────────

    pub fn list_doctors(&self) -> Result<Vec<DoctorWithProfile>, AccessError> {
        let mut rows = db::list_doctors_with_profiles(self.conn)?;
        rows.retain(|row| policy::check_doctor_read(&self.viewer, &row.doctor).allowed);
        Ok(rows)
    }

    pub fn get_doctor(&self, id: &Uuid) -> Result<Option<Doctor>, AccessError> {
        Ok(db::get_doctor(self.conn, id)?
            .filter(|d| policy::check_doctor_read(&self.viewer, d).allowed))
    }

    pub fn update_doctor(&self, id: &Uuid, update: DoctorUpdate) -> Result<Doctor, AccessError> {
        let mut doctor = self.get_doctor(id)?.ok_or(AccessError::NotFound("doctor"))?;
        if !policy::check_doctor_write(&self.viewer, &doctor).allowed {
            tracing::warn!(viewer = %self.viewer.profile_id, doctor_id = %id, "Denied doctor update");
            return Err(AccessError::Denied("doctor"));
        }
        if matches!(&update.specialization, Some(s) if s.trim().is_empty()) {
            return Err(AccessError::validation("specialization", "must not be empty"));
        }
        if matches!(update.years_of_experience, Some(y) if y < 0) {
            return Err(AccessError::validation("years_of_experience", "must not be negative"));
        }
        update.apply(&mut doctor);
        db::update_doctor(self.conn, &doctor)?;
        tracing::info!(doctor_id = %id, "Doctor updated");
        Ok(doctor)
    }

    /// Admin-only, and not implemented: accounts come from sign-up.
    pub fn provision_directory_entry(&self, kind: DirectoryKind) -> Result<(), AccessError> {
        let entity = match kind {
            DirectoryKind::Patient => "patient",
            DirectoryKind::Doctor => "doctor",
        };
        if !policy::check_directory_provision(&self.viewer).allowed {
            return Err(AccessError::Denied(entity));
        }
        tracing::info!(viewer = %self.viewer.profile_id, entity, "Directory provisioning requested");
        Err(AccessError::Unsupported(PROVISIONING_UNSUPPORTED))
    }

    // ── Appointments ────────────────────────────────────────

    /// Scope the SQL to the viewer's own rows before the per-row check.
    fn scoped_appointment_filter(&self, status: Option<AppointmentStatus>) -> Option<AppointmentFilter> {
        let mut filter = AppointmentFilter {
            status,
            ..Default::default()
        };
        match self.viewer.role {
            Role::Admin => {}
            Role::Patient => filter.patient_id = Some(self.viewer.patient_id?),
            Role::Doctor => filter.doctor_id = Some(self.viewer.doctor_id?),
        }
        Some(filter)
    }

    pub fn list_appointments(&self) -> Result<Vec<AppointmentDetail>, AccessError> {
        self.list_appointments_with_status(None)
    }

    pub fn list_appointments_with_status(
        &self,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<AppointmentDetail>, AccessError> {
        let Some(filter) = self.scoped_appointment_filter(status) else {
            return Ok(Vec::new());
        };
        let mut rows = db::list_appointments(self.conn, &filter)?;
        rows.retain(|row| policy::check_appointment_read(&self.viewer, &row.appointment).allowed);
        Ok(rows)
    }

    pub fn get_appointment(&self, id: &Uuid) -> Result<Option<Appointment>, AccessError> {
        Ok(db::get_appointment(self.conn, id)?
            .filter(|a| policy::check_appointment_read(&self.viewer, a).allowed))
    }

    pub fn create_appointment(&self, form: NewAppointment) -> Result<Appointment, AccessError> {
        let patient_id = form
            .patient_id
            .or(self.viewer.patient_id)
            .ok_or_else(|| AccessError::validation("patient_id", "is required"))?;
        let doctor_id = form
            .doctor_id
            .or(self.viewer.doctor_id)
            .ok_or_else(|| AccessError::validation("doctor_id", "is required"))?;
        let duration_minutes = form.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
        if duration_minutes <= 0 {
            return Err(AccessError::validation("duration_minutes", "must be positive"));
        }

        let now = current_timestamp();
        let appt = Appointment {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            appointment_date: form.appointment_date,
            appointment_time: form.appointment_time,
            duration_minutes,
            status: form.status.unwrap_or_default(),
            reason: trimmed(form.reason),
            notes: trimmed(form.notes),
            created_at: now,
            updated_at: now,
        };
        if !policy::check_appointment_write(&self.viewer, &appt).allowed {
            tracing::warn!(viewer = %self.viewer.profile_id, "Denied appointment create");
            return Err(AccessError::Denied("appointment"));
        }
        if db::get_patient(self.conn, &patient_id)?.is_none() {
            return Err(AccessError::validation("patient_id", "unknown patient"));
        }
        if db::get_doctor(self.conn, &doctor_id)?.is_none() {
            return Err(AccessError::validation("doctor_id", "unknown doctor"));
        }

        db::insert_appointment(self.conn, &appt)?;
        tracing::info!(appointment_id = %appt.id, status = %appt.status, "Appointment created");
        Ok(appt)
    }

    pub fn update_appointment_status(
        &self,
        id: &Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AccessError> {
        let mut appt = self.get_appointment(id)?.ok_or(AccessError::NotFound("appointment"))?;
        if !policy::check_appointment_write(&self.viewer, &appt).allowed {
            tracing::warn!(viewer = %self.viewer.profile_id, appointment_id = %id, "Denied status change");
            return Err(AccessError::Denied("appointment"));
        }
        if !appt.status.can_transition_to(status) {
            return Err(AccessError::InvalidTransition {
                from: appt.status,
                to: status,
            });
        }
        db::update_appointment_status(self.conn, id, status)?;
        tracing::info!(appointment_id = %id, from = %appt.status, to = %status, "Appointment status changed");
        appt.status = status;
        Ok(appt)
    }

    // ── Medical records ─────────────────────────────────────

    pub fn list_medical_records(&self) -> Result<Vec<MedicalRecordDetail>, AccessError> {
        let mut filter = MedicalRecordFilter::default();
        match self.viewer.role {
            Role::Admin => {}
            Role::Patient => match self.viewer.patient_id {
                Some(id) => filter.patient_id = Some(id),
                None => return Ok(Vec::new()),
            },
            Role::Doctor => match self.viewer.doctor_id {
                Some(id) => filter.doctor_id = Some(id),
                None => return Ok(Vec::new()),
            },
        }
        let mut rows = db::list_medical_records(self.conn, &filter)?;
        rows.retain(|row| policy::check_record_read(&self.viewer, &row.record).allowed);
        Ok(rows)
    }

    pub fn create_medical_record(&self, form: NewMedicalRecord) -> Result<MedicalRecord, AccessError> {
        let diagnosis = form.diagnosis.trim().to_string();
        if diagnosis.is_empty() {
            return Err(AccessError::validation("diagnosis", "is required"));
        }
        let doctor_id = form
            .doctor_id
            .or(self.viewer.doctor_id)
            .ok_or(AccessError::Denied("medical record"))?;

        let now = current_timestamp();
        let record = MedicalRecord {
            id: Uuid::new_v4(),
            patient_id: form.patient_id,
            doctor_id,
            appointment_id: form.appointment_id,
            diagnosis,
            symptoms: trimmed(form.symptoms),
            treatment: trimmed(form.treatment),
            medications: trimmed(form.medications),
            lab_results: trimmed(form.lab_results),
            notes: trimmed(form.notes),
            record_date: form.record_date.unwrap_or_else(|| now.date()),
            created_at: now,
        };

        let treated = db::has_treated(self.conn, &record.doctor_id, &record.patient_id)?;
        if !policy::check_record_create(&self.viewer, &record, treated).allowed {
            tracing::warn!(
                viewer = %self.viewer.profile_id,
                patient_id = %record.patient_id,
                treated,
                "Denied medical record create"
            );
            return Err(AccessError::Denied("medical record"));
        }
        if let Some(appointment_id) = &record.appointment_id {
            let linked = db::get_appointment(self.conn, appointment_id)?;
            let matches_pair = linked.map_or(false, |a| {
                a.patient_id == record.patient_id && a.doctor_id == record.doctor_id
            });
            if !matches_pair {
                return Err(AccessError::validation(
                    "appointment_id",
                    "must be an appointment between this doctor and patient",
                ));
            }
        }

        db::insert_medical_record(self.conn, &record)?;
        tracing::info!(record_id = %record.id, patient_id = %record.patient_id, "Medical record created");
        Ok(record)
    }
}

/// Wall-clock UTC truncated to whole seconds, as stored.
fn current_timestamp() -> NaiveDateTime {
    NaiveDateTime::parse_from_str(&db::now_timestamp(), TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| chrono::Utc::now().naive_utc())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
