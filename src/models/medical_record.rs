use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub diagnosis: String,
    pub symptoms: Option<String>,
    pub treatment: Option<String>,
    pub medications: Option<String>,
    pub lab_results: Option<String>,
    pub notes: Option<String>,
    pub record_date: NaiveDate,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct MedicalRecordDetail {
    #[serde(flatten)]
    pub record: MedicalRecord,
    pub patient_name: String,
    pub doctor_name: String,
}

/// Record form. `doctor_id` defaults to the author's own doctor row,
/// `record_date` to today.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMedicalRecord {
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub diagnosis: String,
    pub symptoms: Option<String>,
    pub treatment: Option<String>,
    pub medications: Option<String>,
    pub lab_results: Option<String>,
    pub notes: Option<String>,
    pub record_date: Option<NaiveDate>,
}
