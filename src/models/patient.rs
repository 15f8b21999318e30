use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Patient {
    /// Empty demographic row for a freshly signed-up patient.
    pub fn blank(profile_id: Uuid, created_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            profile_id,
            date_of_birth: None,
            gender: None,
            address: None,
            blood_type: None,
            allergies: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            created_at,
        }
    }
}

/// Patient row joined with its owning profile's display fields.
#[derive(Debug, Clone, Serialize)]
pub struct PatientWithProfile {
    #[serde(flatten)]
    pub patient: Patient,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientUpdate {
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

impl PatientUpdate {
    pub fn apply(self, patient: &mut Patient) {
        if let Some(v) = self.date_of_birth {
            patient.date_of_birth = Some(v);
        }
        if let Some(v) = self.gender {
            patient.gender = Some(v);
        }
        if let Some(v) = self.address {
            patient.address = Some(v);
        }
        if let Some(v) = self.blood_type {
            patient.blood_type = Some(v);
        }
        if let Some(v) = self.allergies {
            patient.allergies = Some(v);
        }
        if let Some(v) = self.emergency_contact_name {
            patient.emergency_contact_name = Some(v);
        }
        if let Some(v) = self.emergency_contact_phone {
            patient.emergency_contact_phone = Some(v);
        }
    }
}
