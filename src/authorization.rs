//! Row-level access policy.
//!
//! Every row in the store is guarded by a predicate over the calling
//! `Viewer` and the row itself:
//! 1. Admin → read everything, write nothing clinical
//! 2. Own row (own profile / own patient row / own doctor row) → read + write
//! 3. Party to the row (appointment or record naming the viewer's patient or doctor row) → read + write
//! 4. Directory (every doctor row; every patient row for doctors) → read only
//! 5. Default → DENY
//!
//! The predicates are pure. `access::ScopedStore` evaluates them on every
//! row it returns and before every write.

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::identity::Session;
use crate::models::{Appointment, Doctor, MedicalRecord, Patient, Profile, Role};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// The authenticated caller as the policy sees it: role plus the
/// directory rows it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Uuid,
    pub profile_id: Uuid,
    pub role: Role,
    pub full_name: String,
    /// Own `patients` row, when the viewer is a patient.
    pub patient_id: Option<Uuid>,
    /// Own `doctors` row, when the viewer is a doctor.
    pub doctor_id: Option<Uuid>,
}

impl Viewer {
    /// Resolve the directory rows owned by a session's profile.
    pub fn resolve(conn: &Connection, session: &Session) -> Result<Self, DatabaseError> {
        let profile = &session.profile;
        let patient_id = match profile.role {
            Role::Patient => db::get_patient_by_profile(conn, &profile.id)?.map(|p| p.id),
            _ => None,
        };
        let doctor_id = match profile.role {
            Role::Doctor => db::get_doctor_by_profile(conn, &profile.id)?.map(|d| d.id),
            _ => None,
        };
        Ok(Self {
            user_id: session.user_id,
            profile_id: profile.id,
            role: profile.role,
            full_name: profile.full_name.clone(),
            patient_id,
            doctor_id,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    fn owns_patient(&self, patient_id: &Uuid) -> bool {
        self.patient_id.as_ref() == Some(patient_id)
    }

    fn owns_doctor(&self, doctor_id: &Uuid) -> bool {
        self.doctor_id.as_ref() == Some(doctor_id)
    }
}

/// Why access was granted (or denied): for the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    /// Viewer's own profile / patient / doctor row.
    OwnRow,
    /// Appointment or record whose patient is the viewer.
    PatientParty,
    /// Appointment or record whose doctor is the viewer.
    DoctorParty,
    /// Directory read (doctor rows for everyone, patient rows for doctors).
    Directory,
    /// Admin read-all.
    Admin,
    /// No matching rule.
    Denied,
}

/// Result of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    fn allow(reason: AccessReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    fn deny() -> Self {
        Self {
            allowed: false,
            reason: AccessReason::Denied,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Profiles
// ═══════════════════════════════════════════════════════════

pub fn check_profile_read(viewer: &Viewer, profile: &Profile) -> AccessDecision {
    if profile.id == viewer.profile_id {
        return AccessDecision::allow(AccessReason::OwnRow);
    }
    match (viewer.role, profile.role) {
        (Role::Admin, _) => AccessDecision::allow(AccessReason::Admin),
        (Role::Doctor, Role::Patient | Role::Doctor) => AccessDecision::allow(AccessReason::Directory),
        (Role::Patient, Role::Doctor) => AccessDecision::allow(AccessReason::Directory),
        _ => AccessDecision::deny(),
    }
}

pub fn check_profile_write(viewer: &Viewer, profile: &Profile) -> AccessDecision {
    if profile.id == viewer.profile_id {
        AccessDecision::allow(AccessReason::OwnRow)
    } else {
        AccessDecision::deny()
    }
}

// ═══════════════════════════════════════════════════════════
// Directory rows
// ═══════════════════════════════════════════════════════════

pub fn check_patient_read(viewer: &Viewer, patient: &Patient) -> AccessDecision {
    if viewer.owns_patient(&patient.id) {
        return AccessDecision::allow(AccessReason::OwnRow);
    }
    match viewer.role {
        Role::Admin => AccessDecision::allow(AccessReason::Admin),
        Role::Doctor => AccessDecision::allow(AccessReason::Directory),
        Role::Patient => AccessDecision::deny(),
    }
}

pub fn check_patient_write(viewer: &Viewer, patient: &Patient) -> AccessDecision {
    if viewer.owns_patient(&patient.id) {
        AccessDecision::allow(AccessReason::OwnRow)
    } else {
        AccessDecision::deny()
    }
}

/// Doctor rows form a public directory for every authenticated viewer.
pub fn check_doctor_read(viewer: &Viewer, doctor: &Doctor) -> AccessDecision {
    if viewer.owns_doctor(&doctor.id) {
        AccessDecision::allow(AccessReason::OwnRow)
    } else {
        AccessDecision::allow(AccessReason::Directory)
    }
}

pub fn check_doctor_write(viewer: &Viewer, doctor: &Doctor) -> AccessDecision {
    if viewer.owns_doctor(&doctor.id) {
        AccessDecision::allow(AccessReason::OwnRow)
    } else {
        AccessDecision::deny()
    }
}

/// Creating patient/doctor directory entries is an admin privilege.
pub fn check_directory_provision(viewer: &Viewer) -> AccessDecision {
    if viewer.is_admin() {
        AccessDecision::allow(AccessReason::Admin)
    } else {
        AccessDecision::deny()
    }
}

// ═══════════════════════════════════════════════════════════
// Clinical rows
// ═══════════════════════════════════════════════════════════

fn party_decision(viewer: &Viewer, patient_id: &Uuid, doctor_id: &Uuid) -> AccessDecision {
    if viewer.owns_patient(patient_id) {
        AccessDecision::allow(AccessReason::PatientParty)
    } else if viewer.owns_doctor(doctor_id) {
        AccessDecision::allow(AccessReason::DoctorParty)
    } else {
        AccessDecision::deny()
    }
}

pub fn check_appointment_read(viewer: &Viewer, appt: &Appointment) -> AccessDecision {
    let decision = party_decision(viewer, &appt.patient_id, &appt.doctor_id);
    if !decision.allowed && viewer.is_admin() {
        return AccessDecision::allow(AccessReason::Admin);
    }
    decision
}

pub fn check_appointment_write(viewer: &Viewer, appt: &Appointment) -> AccessDecision {
    party_decision(viewer, &appt.patient_id, &appt.doctor_id)
}

pub fn check_record_read(viewer: &Viewer, record: &MedicalRecord) -> AccessDecision {
    let decision = party_decision(viewer, &record.patient_id, &record.doctor_id);
    if !decision.allowed && viewer.is_admin() {
        return AccessDecision::allow(AccessReason::Admin);
    }
    decision
}

/// Records are authored by the treating doctor only. `treated` is whether
/// an appointment links the record's doctor and patient.
pub fn check_record_create(viewer: &Viewer, record: &MedicalRecord, treated: bool) -> AccessDecision {
    if viewer.owns_doctor(&record.doctor_id) && treated {
        AccessDecision::allow(AccessReason::DoctorParty)
    } else {
        AccessDecision::deny()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use crate::models::AppointmentStatus;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn viewer(role: Role) -> Viewer {
        Viewer {
            user_id: Uuid::new_v4(),
            profile_id: Uuid::new_v4(),
            role,
            full_name: "Viewer".into(),
            patient_id: (role == Role::Patient).then(Uuid::new_v4),
            doctor_id: (role == Role::Doctor).then(Uuid::new_v4),
        }
    }

    fn patient_row(id: Uuid) -> Patient {
        let mut p = Patient::blank(Uuid::new_v4(), ts());
        p.id = id;
        p
    }

    fn doctor_row(id: Uuid) -> Doctor {
        Doctor {
            id,
            profile_id: Uuid::new_v4(),
            specialization: "Cardiology".into(),
            license_number: "LIC".into(),
            department: None,
            years_of_experience: None,
            created_at: ts(),
        }
    }

    fn profile_row(id: Uuid, role: Role) -> Profile {
        Profile {
            id,
            user_id: Uuid::new_v4(),
            full_name: "Someone".into(),
            email: "someone@example.org".into(),
            phone: None,
            role,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn appointment(patient_id: Uuid, doctor_id: Uuid) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            appointment_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            appointment_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            duration_minutes: 30,
            status: AppointmentStatus::Scheduled,
            reason: None,
            notes: None,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn record(patient_id: Uuid, doctor_id: Uuid) -> MedicalRecord {
        MedicalRecord {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            appointment_id: None,
            diagnosis: "Flu".into(),
            symptoms: None,
            treatment: None,
            medications: None,
            lab_results: None,
            notes: None,
            record_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            created_at: ts(),
        }
    }

    #[test]
    fn patient_reads_only_own_patient_row() {
        let v = viewer(Role::Patient);
        let own = patient_row(v.patient_id.unwrap());
        let other = patient_row(Uuid::new_v4());
        assert_eq!(check_patient_read(&v, &own).reason, AccessReason::OwnRow);
        assert!(!check_patient_read(&v, &other).allowed);
        assert!(check_patient_write(&v, &own).allowed);
        assert!(!check_patient_write(&v, &other).allowed);
    }

    #[test]
    fn doctor_reads_every_patient_but_writes_none() {
        let v = viewer(Role::Doctor);
        let p = patient_row(Uuid::new_v4());
        assert_eq!(check_patient_read(&v, &p).reason, AccessReason::Directory);
        assert!(!check_patient_write(&v, &p).allowed);
    }

    #[test]
    fn admin_reads_all_rows_and_writes_no_clinical_rows() {
        let v = viewer(Role::Admin);
        let appt = appointment(Uuid::new_v4(), Uuid::new_v4());
        let rec = record(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(check_patient_read(&v, &patient_row(Uuid::new_v4())).reason, AccessReason::Admin);
        assert_eq!(check_appointment_read(&v, &appt).reason, AccessReason::Admin);
        assert_eq!(check_record_read(&v, &rec).reason, AccessReason::Admin);
        assert!(!check_appointment_write(&v, &appt).allowed);
        assert!(!check_record_create(&v, &rec, true).allowed);
    }

    #[test]
    fn doctor_rows_are_public_but_owner_writable() {
        let owner = viewer(Role::Doctor);
        let own = doctor_row(owner.doctor_id.unwrap());
        for role in [Role::Patient, Role::Doctor, Role::Admin] {
            let v = viewer(role);
            assert!(check_doctor_read(&v, &own).allowed);
            assert!(!check_doctor_write(&v, &own).allowed);
        }
        assert!(check_doctor_write(&owner, &own).allowed);
    }

    #[test]
    fn appointment_parties_read_and_write() {
        let patient = viewer(Role::Patient);
        let doctor = viewer(Role::Doctor);
        let appt = appointment(patient.patient_id.unwrap(), doctor.doctor_id.unwrap());

        assert_eq!(check_appointment_read(&patient, &appt).reason, AccessReason::PatientParty);
        assert_eq!(check_appointment_write(&doctor, &appt).reason, AccessReason::DoctorParty);

        let stranger = viewer(Role::Patient);
        assert!(!check_appointment_read(&stranger, &appt).allowed);
        let other_doctor = viewer(Role::Doctor);
        assert!(!check_appointment_read(&other_doctor, &appt).allowed);
        assert!(!check_appointment_write(&other_doctor, &appt).allowed);
    }

    #[test]
    fn record_creation_requires_treating_doctor() {
        let doctor = viewer(Role::Doctor);
        let rec = record(Uuid::new_v4(), doctor.doctor_id.unwrap());
        assert!(check_record_create(&doctor, &rec, true).allowed);
        assert!(!check_record_create(&doctor, &rec, false).allowed);

        let patient = viewer(Role::Patient);
        let own = record(patient.patient_id.unwrap(), Uuid::new_v4());
        assert!(check_record_read(&patient, &own).allowed);
        assert!(!check_record_create(&patient, &own, true).allowed);
    }

    #[test]
    fn profile_visibility_by_role() {
        let patient = viewer(Role::Patient);
        let doctor = viewer(Role::Doctor);
        let other_patient = profile_row(Uuid::new_v4(), Role::Patient);
        let a_doctor = profile_row(Uuid::new_v4(), Role::Doctor);
        let an_admin = profile_row(Uuid::new_v4(), Role::Admin);

        assert!(!check_profile_read(&patient, &other_patient).allowed);
        assert!(check_profile_read(&patient, &a_doctor).allowed);
        assert!(check_profile_read(&doctor, &other_patient).allowed);
        assert!(!check_profile_read(&doctor, &an_admin).allowed);
        assert!(check_profile_read(&viewer(Role::Admin), &an_admin).allowed);

        let own = profile_row(patient.profile_id, Role::Patient);
        assert!(check_profile_write(&patient, &own).allowed);
        assert!(!check_profile_write(&doctor, &own).allowed);
    }

    #[test]
    fn only_admins_may_provision() {
        assert!(check_directory_provision(&viewer(Role::Admin)).allowed);
        assert!(!check_directory_provision(&viewer(Role::Doctor)).allowed);
        assert!(!check_directory_provision(&viewer(Role::Patient)).allowed);
    }
}
