use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub specialization: String,
    pub license_number: String,
    pub department: Option<String>,
    pub years_of_experience: Option<i32>,
    pub created_at: NaiveDateTime,
}

/// Doctor row joined with its owning profile's display fields.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorWithProfile {
    #[serde(flatten)]
    pub doctor: Doctor,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorUpdate {
    pub specialization: Option<String>,
    pub department: Option<String>,
    pub years_of_experience: Option<i32>,
}

impl DoctorUpdate {
    pub fn apply(self, doctor: &mut Doctor) {
        if let Some(v) = self.specialization {
            doctor.specialization = v;
        }
        if let Some(v) = self.department {
            doctor.department = Some(v);
        }
        if let Some(v) = self.years_of_experience {
            doctor.years_of_experience = Some(v);
        }
    }
}
