//! Appointments list: search + status filter, booking and status changes.

use uuid::Uuid;

use super::{matches_search, EmptyState, ListView, MutationOutcome, PageError, Searchable, StatusFilter};
use crate::access::ScopedStore;
use crate::models::{Appointment, AppointmentDetail, AppointmentStatus, NewAppointment, Role};

const PAGE: &str = "appointments";
const ENTITY: &str = "appointment";

impl Searchable for AppointmentDetail {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.patient_name.as_str(), self.doctor_name.as_str()];
        fields.extend(self.appointment.reason.as_deref());
        fields
    }
}

#[derive(Debug)]
pub struct AppointmentsPage {
    role: Role,
    rows: Vec<AppointmentDetail>,
}

impl AppointmentsPage {
    pub fn load(store: &ScopedStore<'_>) -> Result<Self, PageError> {
        let rows = store.list_appointments().map_err(PageError::load(PAGE))?;
        Ok(Self {
            role: store.viewer().role,
            rows,
        })
    }

    pub fn rows(&self) -> &[AppointmentDetail] {
        &self.rows
    }

    /// Rows matching both the search box and the status dropdown, still
    /// in `(date, time)` order.
    pub fn visible(&self, search: &str, status: StatusFilter) -> Vec<&AppointmentDetail> {
        self.rows
            .iter()
            .filter(|row| status.matches(row.appointment.status))
            .filter(|row| matches_search(*row, search))
            .collect()
    }

    /// Patients book with a doctor, doctors book with a patient. Admins
    /// read only.
    pub fn can_create(&self) -> bool {
        matches!(self.role, Role::Patient | Role::Doctor)
    }

    pub fn empty_state(&self, search: &str, status: StatusFilter) -> Option<EmptyState> {
        if !self.rows.is_empty() {
            return self
                .visible(search, status)
                .is_empty()
                .then(|| EmptyState::no_matches(PAGE));
        }
        Some(match self.role {
            Role::Patient => EmptyState::new(
                "No appointments yet",
                "Book a visit with one of our doctors.",
                Some("Book appointment"),
            ),
            Role::Doctor => EmptyState::new(
                "No appointments yet",
                "Appointments with your patients will appear here.",
                Some("Schedule appointment"),
            ),
            Role::Admin => EmptyState::new(
                "No appointments yet",
                "No appointments have been booked.",
                None,
            ),
        })
    }

    pub fn view(&self, search: &str, status: StatusFilter) -> ListView<'_, AppointmentDetail> {
        ListView {
            rows: self.visible(search, status),
            total: self.rows.len(),
            empty_state: self.empty_state(search, status),
            can_create: self.can_create(),
        }
    }

    pub fn create(
        &mut self,
        store: &ScopedStore<'_>,
        form: NewAppointment,
    ) -> Result<MutationOutcome<Appointment>, PageError> {
        let saved = store.create_appointment(form).map_err(PageError::save(ENTITY))?;
        let outcome = MutationOutcome::success(saved, "Appointment booked");
        Ok(self.refresh_after(store, outcome))
    }

    pub fn set_status(
        &mut self,
        store: &ScopedStore<'_>,
        id: &Uuid,
        status: AppointmentStatus,
    ) -> Result<MutationOutcome<Appointment>, PageError> {
        let saved = store
            .update_appointment_status(id, status)
            .map_err(PageError::save(ENTITY))?;
        let message = match status {
            AppointmentStatus::Completed => "Appointment marked as completed",
            AppointmentStatus::Cancelled => "Appointment cancelled",
            _ => "Appointment updated",
        };
        let outcome = MutationOutcome::success(saved, message);
        Ok(self.refresh_after(store, outcome))
    }

    fn refresh_after<T>(&mut self, store: &ScopedStore<'_>, outcome: MutationOutcome<T>) -> MutationOutcome<T> {
        match store.list_appointments() {
            Ok(rows) => {
                self.rows = rows;
                outcome
            }
            Err(err) => {
                tracing::error!(error = %err, "Appointment list refresh failed");
                outcome.with_refresh_failure(PAGE)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::test_support::store_for;
    use crate::access::AccessError;
    use crate::db::repository::fixtures::*;
    use crate::db::sqlite::open_memory_database;
    use chrono::{NaiveDate, NaiveTime};

    fn seeded() -> (rusqlite::Connection, crate::models::Profile, crate::models::Profile) {
        let conn = open_memory_database().unwrap();
        let (_, jane) = seed_patient(&conn, "Jane Doe");
        let (_, john) = seed_patient(&conn, "John Roe");
        let (house_profile, house) = seed_doctor(&conn, "Greg House", "Diagnostics");
        let admin = seed_profile(&conn, "Lisa Cuddy", Role::Admin);
        seed_appointment(&conn, &jane, &house, (2025, 6, 3), (14, 0), AppointmentStatus::Scheduled);
        seed_appointment(&conn, &john, &house, (2025, 6, 3), (9, 30), AppointmentStatus::Cancelled);
        seed_appointment(&conn, &john, &house, (2025, 6, 1), (16, 0), AppointmentStatus::Completed);
        (conn, house_profile, admin)
    }

    #[test]
    fn search_jane_returns_only_jane_row() {
        let (conn, house, _) = seeded();
        let page = AppointmentsPage::load(&store_for(&conn, &house)).unwrap();
        let hits = page.visible("jane", StatusFilter::All);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].patient_name, "Jane Doe");
    }

    #[test]
    fn status_filter_all_and_cancelled() {
        let (conn, house, _) = seeded();
        let page = AppointmentsPage::load(&store_for(&conn, &house)).unwrap();
        assert_eq!(page.visible("", StatusFilter::All).len(), 3);

        let cancelled = page.visible("", StatusFilter::Only(AppointmentStatus::Cancelled));
        assert_eq!(cancelled.len(), 1);
        assert!(cancelled
            .iter()
            .all(|a| a.appointment.status == AppointmentStatus::Cancelled));
    }

    #[test]
    fn admin_sees_every_appointment_in_order() {
        let (conn, _, admin) = seeded();
        let page = AppointmentsPage::load(&store_for(&conn, &admin)).unwrap();
        let order: Vec<(u32, u32)> = page
            .rows()
            .iter()
            .map(|a| {
                use chrono::{Datelike, Timelike};
                (a.appointment.appointment_date.day(), a.appointment.appointment_time.hour())
            })
            .collect();
        assert_eq!(order, vec![(1, 16), (3, 9), (3, 14)]);
        assert!(!page.can_create());
    }

    #[test]
    fn booking_defaults_to_scheduled_and_refreshes() {
        let conn = open_memory_database().unwrap();
        let (jane_profile, _) = seed_patient(&conn, "Jane Doe");
        let (_, house) = seed_doctor(&conn, "Greg House", "Diagnostics");
        let store = store_for(&conn, &jane_profile);
        let mut page = AppointmentsPage::load(&store).unwrap();
        assert_eq!(
            page.empty_state("", StatusFilter::All).unwrap().action.as_deref(),
            Some("Book appointment")
        );

        let outcome = page
            .create(
                &store,
                NewAppointment {
                    patient_id: None,
                    doctor_id: Some(house.id),
                    appointment_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
                    appointment_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                    duration_minutes: None,
                    status: None,
                    reason: Some("Headache".into()),
                    notes: None,
                },
            )
            .unwrap();

        assert_eq!(outcome.saved.status, AppointmentStatus::Scheduled);
        assert!(!outcome.dialog_open);
        assert_eq!(page.rows().len(), 1);
        assert_eq!(page.rows()[0].doctor_name, "Greg House");
    }

    #[test]
    fn failed_transition_keeps_dialog_open() {
        let (conn, house, _) = seeded();
        let store = store_for(&conn, &house);
        let mut page = AppointmentsPage::load(&store).unwrap();
        let done = page
            .visible("", StatusFilter::Only(AppointmentStatus::Completed))[0]
            .appointment
            .id;

        let err = page
            .set_status(&store, &done, AppointmentStatus::Cancelled)
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to save appointment");
        assert!(err.dialog_open());
        assert!(matches!(err.source_error(), AccessError::InvalidTransition { .. }));
    }

    #[test]
    fn completing_updates_listed_status() {
        let (conn, house, _) = seeded();
        let store = store_for(&conn, &house);
        let mut page = AppointmentsPage::load(&store).unwrap();
        let open = page
            .visible("jane", StatusFilter::All)[0]
            .appointment
            .id;

        page.set_status(&store, &open, AppointmentStatus::Completed).unwrap();
        let listed = page.rows().iter().find(|a| a.appointment.id == open).unwrap();
        assert_eq!(listed.appointment.status, AppointmentStatus::Completed);
    }
}
