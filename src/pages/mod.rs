//! Page view-models: fetch, filter, empty state and mutation outcome.
//!
//! Each list page loads its role-scoped rows once through a
//! `ScopedStore`, then answers search/status queries from memory. Writes
//! go back through the store and re-run the fetch on success.

pub mod appointments;
pub mod dashboard;
pub mod doctors;
pub mod medical_records;
pub mod patients;

pub use appointments::AppointmentsPage;
pub use dashboard::DashboardPage;
pub use doctors::DoctorsPage;
pub use medical_records::MedicalRecordsPage;
pub use patients::PatientsPage;

use std::str::FromStr;

use serde::Serialize;

use crate::access::AccessError;
use crate::models::AppointmentStatus;

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Rows that can be matched by the page search box.
pub trait Searchable {
    fn search_fields(&self) -> Vec<&str>;
}

/// Case-insensitive substring match over any searchable field.
/// An empty (or whitespace) query matches every row.
pub fn matches_search<T: Searchable>(row: &T, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    row.search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

// ---------------------------------------------------------------------------
// Status filter
// ---------------------------------------------------------------------------

/// Appointment status dropdown. `all` disables the filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(AppointmentStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: AppointmentStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => *wanted == status,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown status filter '{0}'")]
pub struct UnknownStatusFilter(pub String);

impl FromStr for StatusFilter {
    type Err = UnknownStatusFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(Self::All),
            other => AppointmentStatus::from_str(other)
                .map(Self::Only)
                .map_err(|_| UnknownStatusFilter(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Rendered pieces
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
}

/// Toast shown after a page action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

/// Placeholder rendered instead of an empty table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptyState {
    pub title: String,
    pub message: String,
    /// Call-to-action label, present only when the viewer may create rows.
    pub action: Option<String>,
}

impl EmptyState {
    fn new(title: &str, message: &str, action: Option<&str>) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            action: action.map(str::to_string),
        }
    }

    /// Rows exist but none survive the current filters.
    fn no_matches(entity_plural: &str) -> Self {
        Self::new(
            &format!("No matching {entity_plural}"),
            "Try a different search term or filter.",
            None,
        )
    }
}

/// What a list page renders for a given search.
#[derive(Debug, Serialize)]
pub struct ListView<'a, T> {
    pub rows: Vec<&'a T>,
    pub total: usize,
    pub empty_state: Option<EmptyState>,
    pub can_create: bool,
}

/// Result of a successful page write.
#[derive(Debug, Serialize)]
pub struct MutationOutcome<T> {
    pub saved: T,
    pub notices: Vec<Notice>,
    /// The input dialog closes after a successful save.
    pub dialog_open: bool,
}

impl<T> MutationOutcome<T> {
    fn success(saved: T, message: impl Into<String>) -> Self {
        Self {
            saved,
            notices: vec![Notice::success(message)],
            dialog_open: false,
        }
    }

    /// The write landed but the follow-up fetch did not: keep the old rows.
    fn with_refresh_failure(mut self, page: &str) -> Self {
        self.notices.push(Notice::error(format!("Failed to load {page}")));
        self
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Page-level failure as the user sees it. The underlying cause stays in
/// `source` for logging; the display text is generic.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Failed to load {page}")]
    Load {
        page: &'static str,
        #[source]
        source: AccessError,
    },
    #[error("Failed to save {entity}")]
    Save {
        entity: &'static str,
        #[source]
        source: AccessError,
    },
}

impl PageError {
    pub(crate) fn load(page: &'static str) -> impl FnOnce(AccessError) -> Self {
        move |source| {
            tracing::error!(page, error = %source, "Page load failed");
            Self::Load { page, source }
        }
    }

    pub(crate) fn save(entity: &'static str) -> impl FnOnce(AccessError) -> Self {
        move |source| {
            tracing::warn!(entity, error = %source, "Page save failed");
            Self::Save { entity, source }
        }
    }

    pub fn source_error(&self) -> &AccessError {
        match self {
            Self::Load { source, .. } | Self::Save { source, .. } => source,
        }
    }

    /// Form field to highlight, for validation failures.
    pub fn field(&self) -> Option<&'static str> {
        match self.source_error() {
            AccessError::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }

    /// Failed saves leave the input dialog open for a manual retry.
    pub fn dialog_open(&self) -> bool {
        matches!(self, Self::Save { .. })
    }
}
