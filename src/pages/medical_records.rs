use super::{matches_search, EmptyState, ListView, MutationOutcome, PageError, Searchable};
use crate::access::ScopedStore;
use crate::models::{MedicalRecord, MedicalRecordDetail, NewMedicalRecord, Role};

const PAGE: &str = "medical records";

impl Searchable for MedicalRecordDetail {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![
            self.record.diagnosis.as_str(),
            self.patient_name.as_str(),
            self.doctor_name.as_str(),
        ];
        fields.extend(self.record.symptoms.as_deref());
        fields
    }
}

/// Records list, newest first. Only doctors author records.
#[derive(Debug)]
pub struct MedicalRecordsPage {
    role: Role,
    rows: Vec<MedicalRecordDetail>,
}

impl MedicalRecordsPage {
    pub fn load(store: &ScopedStore<'_>) -> Result<Self, PageError> {
        let rows = store.list_medical_records().map_err(PageError::load(PAGE))?;
        Ok(Self {
            role: store.viewer().role,
            rows,
        })
    }

    pub fn rows(&self) -> &[MedicalRecordDetail] {
        &self.rows
    }

    pub fn visible(&self, search: &str) -> Vec<&MedicalRecordDetail> {
        self.rows.iter().filter(|row| matches_search(*row, search)).collect()
    }

    pub fn can_create(&self) -> bool {
        self.role == Role::Doctor
    }

    pub fn empty_state(&self, search: &str) -> Option<EmptyState> {
        if !self.rows.is_empty() {
            return self.visible(search).is_empty().then(|| EmptyState::no_matches(PAGE));
        }
        Some(match self.role {
            Role::Patient => EmptyState::new(
                "No records yet",
                "Records from your visits will appear here.",
                None,
            ),
            Role::Doctor => EmptyState::new(
                "No records yet",
                "Add a record after seeing a patient.",
                Some("Add record"),
            ),
            Role::Admin => EmptyState::new("No records yet", "No medical records have been written.", None),
        })
    }

    pub fn view(&self, search: &str) -> ListView<'_, MedicalRecordDetail> {
        ListView {
            rows: self.visible(search),
            total: self.rows.len(),
            empty_state: self.empty_state(search),
            can_create: self.can_create(),
        }
    }

    pub fn create(
        &mut self,
        store: &ScopedStore<'_>,
        form: NewMedicalRecord,
    ) -> Result<MutationOutcome<MedicalRecord>, PageError> {
        let saved = store
            .create_medical_record(form)
            .map_err(PageError::save("medical record"))?;
        let outcome = MutationOutcome::success(saved, "Medical record added");
        Ok(match store.list_medical_records() {
            Ok(rows) => {
                self.rows = rows;
                outcome
            }
            Err(err) => {
                tracing::error!(error = %err, "Medical record refresh failed");
                outcome.with_refresh_failure(PAGE)
            }
        })
    }
}
