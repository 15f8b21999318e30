//! Route table, auth guard and per-role menu.

use serde::Serialize;

use crate::identity::Session;
use crate::models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Auth,
    Dashboard,
    Patients,
    Doctors,
    Appointments,
    MedicalRecords,
    NotFound,
}

impl Route {
    pub fn from_path(path: &str) -> Self {
        let trimmed = path.split(['?', '#']).next().unwrap_or_default();
        let normalized = match trimmed.trim_end_matches('/') {
            "" => "/",
            other => other,
        };
        match normalized {
            "/auth" => Self::Auth,
            "/" => Self::Dashboard,
            "/patients" => Self::Patients,
            "/doctors" => Self::Doctors,
            "/appointments" => Self::Appointments,
            "/medical-records" => Self::MedicalRecords,
            _ => Self::NotFound,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Auth => "/auth",
            Self::Dashboard => "/",
            Self::Patients => "/patients",
            Self::Doctors => "/doctors",
            Self::Appointments => "/appointments",
            Self::MedicalRecords => "/medical-records",
            Self::NotFound => "*",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Auth => "Sign in",
            Self::Dashboard => "Dashboard",
            Self::Patients => "Patients",
            Self::Doctors => "Doctors",
            Self::Appointments => "Appointments",
            Self::MedicalRecords => "Medical Records",
            Self::NotFound => "Page not found",
        }
    }

    /// Everything except the sign-in page and the catch-all needs a session.
    pub fn requires_session(&self) -> bool {
        !matches!(self, Self::Auth | Self::NotFound)
    }
}

/// Outcome of visiting a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Navigation {
    Render { route: Route },
    Redirect { to: Route },
}

/// Guard a path against the current session. Signed-out visitors of a
/// protected page go to `/auth`; signed-in visitors of `/auth` go home.
pub fn resolve(path: &str, session: Option<&Session>) -> Navigation {
    let route = Route::from_path(path);
    match (route, session) {
        (Route::Auth, Some(_)) => Navigation::Redirect { to: Route::Dashboard },
        (route, None) if route.requires_session() => Navigation::Redirect { to: Route::Auth },
        (route, _) => Navigation::Render { route },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub route: Route,
    pub path: &'static str,
    pub label: &'static str,
}

impl MenuItem {
    fn new(route: Route) -> Self {
        Self {
            route,
            path: route.path(),
            label: route.title(),
        }
    }
}

/// Sidebar entries. The patient directory is hidden from patients.
pub fn menu_for(role: Role) -> Vec<MenuItem> {
    [
        Route::Dashboard,
        Route::Patients,
        Route::Doctors,
        Route::Appointments,
        Route::MedicalRecords,
    ]
    .into_iter()
    .filter(|route| !(role == Role::Patient && *route == Route::Patients))
    .map(MenuItem::new)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::{now, seed_profile};
    use crate::db::sqlite::open_memory_database;

    fn session(role: Role) -> Session {
        let conn = open_memory_database().unwrap();
        let profile = seed_profile(&conn, "Test User", role);
        Session {
            user_id: profile.user_id,
            profile,
            expires_at: now(),
        }
    }

    #[test]
    fn paths_map_to_routes() {
        assert_eq!(Route::from_path("/"), Route::Dashboard);
        assert_eq!(Route::from_path(""), Route::Dashboard);
        assert_eq!(Route::from_path("/patients/"), Route::Patients);
        assert_eq!(Route::from_path("/medical-records?search=flu"), Route::MedicalRecords);
        assert_eq!(Route::from_path("/settings"), Route::NotFound);
    }

    #[test]
    fn signed_out_protected_path_redirects_to_auth() {
        assert_eq!(
            resolve("/patients", None),
            Navigation::Redirect { to: Route::Auth }
        );
        assert_eq!(resolve("/auth", None), Navigation::Render { route: Route::Auth });
    }

    #[test]
    fn signed_in_auth_redirects_home() {
        let s = session(Role::Doctor);
        assert_eq!(
            resolve("/auth", Some(&s)),
            Navigation::Redirect { to: Route::Dashboard }
        );
        assert_eq!(
            resolve("/appointments", Some(&s)),
            Navigation::Render { route: Route::Appointments }
        );
    }

    #[test]
    fn unknown_path_is_not_found_either_way() {
        assert_eq!(resolve("/nope", None), Navigation::Render { route: Route::NotFound });
        let s = session(Role::Admin);
        assert_eq!(resolve("/nope", Some(&s)), Navigation::Render { route: Route::NotFound });
    }

    #[test]
    fn patient_menu_hides_patients() {
        let routes: Vec<Route> = menu_for(Role::Patient).into_iter().map(|m| m.route).collect();
        assert!(!routes.contains(&Route::Patients));
        assert_eq!(routes.len(), 4);

        for role in [Role::Doctor, Role::Admin] {
            assert!(menu_for(role).iter().any(|m| m.route == Route::Patients));
        }
    }
}
