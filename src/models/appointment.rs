use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AppointmentStatus;

pub const DEFAULT_DURATION_MINUTES: i32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    #[serde(with = "hh_mm")]
    pub appointment_time: NaiveTime,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Appointment plus the display names the list view needs.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetail {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient_name: String,
    pub doctor_name: String,
    pub doctor_specialization: String,
}

/// Booking form. Missing status means `scheduled`, missing duration means 30 minutes.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointment {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub appointment_date: NaiveDate,
    #[serde(with = "hh_mm")]
    pub appointment_time: NaiveTime,
    pub duration_minutes: Option<i32>,
    pub status: Option<AppointmentStatus>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// Parse `HH:MM`, or `HH:MM:00`. Slots are stored to the minute, so a
/// non-zero seconds field is rejected rather than silently dropped.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
        .filter(|time| time.second() == 0)
}

/// Serde adapter storing times as `HH:MM`.
pub mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time '{raw}', expected HH:MM")))
    }
}
