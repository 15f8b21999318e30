use uuid::Uuid;

use super::enums::AppointmentStatus;

/// Exact-match foreign-key filters pushed down to SQL.
#[derive(Debug, Default, Clone)]
pub struct AppointmentFilter {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Default, Clone)]
pub struct MedicalRecordFilter {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}
