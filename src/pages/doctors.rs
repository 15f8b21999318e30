use uuid::Uuid;

use super::{matches_search, EmptyState, ListView, MutationOutcome, PageError, Searchable};
use crate::access::ScopedStore;
use crate::models::{Doctor, DoctorUpdate, DoctorWithProfile, Role};

const PAGE: &str = "doctors";

impl Searchable for DoctorWithProfile {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![
            self.full_name.as_str(),
            self.doctor.specialization.as_str(),
            self.doctor.license_number.as_str(),
        ];
        fields.extend(self.doctor.department.as_deref());
        fields
    }
}

/// Doctor directory, visible to every signed-in role.
#[derive(Debug)]
pub struct DoctorsPage {
    role: Role,
    rows: Vec<DoctorWithProfile>,
}

impl DoctorsPage {
    pub fn load(store: &ScopedStore<'_>) -> Result<Self, PageError> {
        let rows = store.list_doctors().map_err(PageError::load(PAGE))?;
        Ok(Self {
            role: store.viewer().role,
            rows,
        })
    }

    pub fn rows(&self) -> &[DoctorWithProfile] {
        &self.rows
    }

    pub fn visible(&self, search: &str) -> Vec<&DoctorWithProfile> {
        self.rows.iter().filter(|row| matches_search(*row, search)).collect()
    }

    pub fn can_create(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn empty_state(&self, search: &str) -> Option<EmptyState> {
        if !self.rows.is_empty() {
            return self.visible(search).is_empty().then(|| EmptyState::no_matches(PAGE));
        }
        let action = self.can_create().then_some("Add doctor");
        Some(EmptyState::new(
            "No doctors yet",
            "Doctors appear here once they sign up.",
            action,
        ))
    }

    pub fn view(&self, search: &str) -> ListView<'_, DoctorWithProfile> {
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
        update: DoctorUpdate,
    ) -> Result<MutationOutcome<Doctor>, PageError> {
        let saved = store.update_doctor(id, update).map_err(PageError::save("doctor"))?;
        let outcome = MutationOutcome::success(saved, "Doctor details saved");
        Ok(match store.list_doctors() {
            Ok(rows) => {
                self.rows = rows;
                outcome
            }
            Err(err) => {
                tracing::error!(error = %err, "Doctor list refresh failed");
                outcome.with_refresh_failure(PAGE)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::test_support::store_for;
    use crate::db::repository::fixtures::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn search_covers_specialization_and_department() {
        let conn = open_memory_database().unwrap();
        let (jane, _) = seed_patient(&conn, "Jane Doe");
        let (_, house) = seed_doctor(&conn, "Greg House", "Diagnostics");
        seed_doctor(&conn, "James Wilson", "Oncology");
        conn.execute(
            "UPDATE doctors SET department = 'Internal Medicine' WHERE id = ?1",
            [house.id.to_string()],
        )
        .unwrap();

        let page = DoctorsPage::load(&store_for(&conn, &jane)).unwrap();
        assert_eq!(page.visible("onco").len(), 1);
        assert_eq!(page.visible("internal")[0].full_name, "Greg House");
        assert_eq!(page.visible("LIC-").len(), 2);
    }

    #[test]
    fn empty_directory_has_no_action_for_patients() {
        let conn = open_memory_database().unwrap();
        let (jane, _) = seed_patient(&conn, "Jane Doe");
        let page = DoctorsPage::load(&store_for(&conn, &jane)).unwrap();
        let state = page.empty_state("").unwrap();
        assert_eq!(state.title, "No doctors yet");
        assert!(state.action.is_none());
    }

    #[test]
    fn doctor_edits_own_department() {
        let conn = open_memory_database().unwrap();
        let (house_profile, house) = seed_doctor(&conn, "Greg House", "Diagnostics");
        let store = store_for(&conn, &house_profile);
        let mut page = DoctorsPage::load(&store).unwrap();

        let outcome = page
            .update(
                &store,
                &house.id,
                DoctorUpdate {
                    department: Some("Nephrology".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(outcome.saved.department.as_deref(), Some("Nephrology"));
        assert_eq!(page.rows()[0].doctor.department.as_deref(), Some("Nephrology"));
    }
}
