//! Landing page: per-role counters plus the next few scheduled visits.
//!
//! Every figure is derived from rows the viewer can already see, so the
//! dashboard never reveals more than the list pages do.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use super::PageError;
use crate::access::ScopedStore;
use crate::models::{AppointmentDetail, AppointmentStatus, Role};

const PAGE: &str = "dashboard";
pub const UPCOMING_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum DashboardStats {
    Patient {
        upcoming_appointments: usize,
        completed_appointments: usize,
        medical_records: usize,
    },
    Doctor {
        todays_appointments: usize,
        scheduled_appointments: usize,
        patients_treated: usize,
        records_authored: usize,
    },
    Admin {
        total_patients: usize,
        total_doctors: usize,
        total_appointments: usize,
        total_records: usize,
    },
}

#[derive(Debug, Serialize)]
pub struct DashboardPage {
    pub greeting: String,
    pub stats: DashboardStats,
    pub upcoming: Vec<AppointmentDetail>,
}

impl DashboardPage {
    pub fn load(store: &ScopedStore<'_>) -> Result<Self, PageError> {
        Self::load_at(store, chrono::Utc::now().date_naive())
    }

    pub fn load_at(store: &ScopedStore<'_>, today: NaiveDate) -> Result<Self, PageError> {
        let viewer = store.viewer();
        let appointments = store.list_appointments().map_err(PageError::load(PAGE))?;
        let records = store.list_medical_records().map_err(PageError::load(PAGE))?.len();

        let is_upcoming = |a: &AppointmentDetail| {
            a.appointment.status == AppointmentStatus::Scheduled && a.appointment.appointment_date >= today
        };
        let count_status = |status: AppointmentStatus| {
            appointments
                .iter()
                .filter(|a| a.appointment.status == status)
                .count()
        };

        let stats = match viewer.role {
            Role::Patient => DashboardStats::Patient {
                upcoming_appointments: appointments.iter().filter(|a| is_upcoming(a)).count(),
                completed_appointments: count_status(AppointmentStatus::Completed),
                medical_records: records,
            },
            Role::Doctor => DashboardStats::Doctor {
                todays_appointments: appointments
                    .iter()
                    .filter(|a| a.appointment.appointment_date == today)
                    .count(),
                scheduled_appointments: count_status(AppointmentStatus::Scheduled),
                // Same rule as record authorship: completed visits only
                patients_treated: appointments
                    .iter()
                    .filter(|a| a.appointment.status == AppointmentStatus::Completed)
                    .map(|a| a.appointment.patient_id)
                    .collect::<HashSet<_>>()
                    .len(),
                records_authored: records,
            },
            Role::Admin => DashboardStats::Admin {
                total_patients: store.list_patients().map_err(PageError::load(PAGE))?.len(),
                total_doctors: store.list_doctors().map_err(PageError::load(PAGE))?.len(),
                total_appointments: appointments.len(),
                total_records: records,
            },
        };

        // Already in (date, time) order.
        let upcoming = appointments
            .iter()
            .filter(|a| is_upcoming(a))
            .take(UPCOMING_LIMIT)
            .cloned()
            .collect();

        Ok(Self {
            greeting: format!("Welcome back, {}", viewer.full_name),
            stats,
            upcoming,
        })
    }
}
