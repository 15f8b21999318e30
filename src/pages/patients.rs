use uuid::Uuid;

use super::{matches_search, EmptyState, ListView, MutationOutcome, PageError, Searchable};
use crate::access::ScopedStore;
use crate::models::{Patient, PatientUpdate, PatientWithProfile, Role};

const PAGE: &str = "patients";

impl Searchable for PatientWithProfile {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.full_name.as_str(), self.email.as_str()];
        fields.extend(self.phone.as_deref());
        fields.extend(self.patient.blood_type.as_deref());
        fields
    }
}

/// Patient directory. Patients see only themselves; doctors and admins
/// see every patient, newest first.
#[derive(Debug)]
pub struct PatientsPage {
    role: Role,
    rows: Vec<PatientWithProfile>,
}

impl PatientsPage {
    pub fn load(store: &ScopedStore<'_>) -> Result<Self, PageError> {
        let rows = store.list_patients().map_err(PageError::load(PAGE))?;
        Ok(Self {
            role: store.viewer().role,
            rows,
        })
    }

    pub fn rows(&self) -> &[PatientWithProfile] {
        &self.rows
    }

    pub fn visible(&self, search: &str) -> Vec<&PatientWithProfile> {
        self.rows.iter().filter(|row| matches_search(*row, search)).collect()
    }

    /// Only admins get the "add patient" action.
    pub fn can_create(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn empty_state(&self, search: &str) -> Option<EmptyState> {
        if !self.rows.is_empty() {
            return self.visible(search).is_empty().then(|| EmptyState::no_matches(PAGE));
        }
        Some(match self.role {
            Role::Patient => EmptyState::new(
                "No patient record",
                "Your patient record has not been created yet.",
                None,
            ),
            Role::Doctor => EmptyState::new(
                "No patients yet",
                "Patients appear here once they sign up.",
                None,
            ),
            Role::Admin => EmptyState::new(
                "No patients yet",
                "Patients appear here once they sign up.",
                Some("Add patient"),
            ),
        })
    }

    pub fn view(&self, search: &str) -> ListView<'_, PatientWithProfile> {
        ListView {
            rows: self.visible(search),
            total: self.rows.len(),
            empty_state: self.empty_state(search),
            can_create: self.can_create(),
        }
    }

    pub fn update(
        &mut self,
        store: &ScopedStore<'_>,
        id: &Uuid,
        update: PatientUpdate,
    ) -> Result<MutationOutcome<Patient>, PageError> {
        let saved = store
            .update_patient(id, update)
            .map_err(PageError::save("patient"))?;
        let outcome = MutationOutcome::success(saved, "Patient details saved");
        Ok(match self.refresh(store) {
            Ok(()) => outcome,
            Err(_) => outcome.with_refresh_failure(PAGE),
        })
    }

    fn refresh(&mut self, store: &ScopedStore<'_>) -> Result<(), PageError> {
        self.rows = store.list_patients().map_err(PageError::load(PAGE))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::test_support::store_for;
    use crate::db::repository::fixtures::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn doctor_searches_by_blood_type() {
        let conn = open_memory_database().unwrap();
        let (_, jane) = seed_patient(&conn, "Jane Doe");
        seed_patient(&conn, "John Roe");
        let (house, _) = seed_doctor(&conn, "Greg House", "Diagnostics");
        conn.execute(
            "UPDATE patients SET blood_type = 'AB-' WHERE id = ?1",
            [jane.id.to_string()],
        )
        .unwrap();

        let store = store_for(&conn, &house);
        let page = PatientsPage::load(&store).unwrap();
        assert_eq!(page.rows().len(), 2);
        let hits = page.visible("ab-");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].full_name, "Jane Doe");
        assert!(!page.can_create());
    }

    #[test]
    fn patient_page_shows_only_self() {
        let conn = open_memory_database().unwrap();
        let (jane, _) = seed_patient(&conn, "Jane Doe");
        seed_patient(&conn, "John Roe");

        let page = PatientsPage::load(&store_for(&conn, &jane)).unwrap();
        let view = page.view("");
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].email, "jane.doe@example.org");
    }

    #[test]
    fn filtered_out_rows_yield_no_match_state() {
        let conn = open_memory_database().unwrap();
        seed_patient(&conn, "Jane Doe");
        let admin = seed_profile(&conn, "Lisa Cuddy", Role::Admin);

        let page = PatientsPage::load(&store_for(&conn, &admin)).unwrap();
        assert!(page.empty_state("jane").is_none());
        let state = page.empty_state("zzz").unwrap();
        assert!(state.action.is_none());
    }

    #[test]
    fn admin_empty_state_offers_add() {
        let conn = open_memory_database().unwrap();
        let admin = seed_profile(&conn, "Lisa Cuddy", Role::Admin);

        let page = PatientsPage::load(&store_for(&conn, &admin)).unwrap();
        let state = page.empty_state("").unwrap();
        assert_eq!(state.action.as_deref(), Some("Add patient"));
        assert!(page.can_create());
    }

    #[test]
    fn patient_saves_own_details_and_page_refreshes() {
        let conn = open_memory_database().unwrap();
        let (jane, row) = seed_patient(&conn, "Jane Doe");
        let store = store_for(&conn, &jane);
        let mut page = PatientsPage::load(&store).unwrap();

        let outcome = page
            .update(
                &store,
                &row.id,
                PatientUpdate {
                    allergies: Some("Penicillin".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!outcome.dialog_open);
        assert_eq!(page.rows()[0].patient.allergies.as_deref(), Some("Penicillin"));
    }
}
