use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "MedPortal";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DATABASE_FILE: &str = "medportal.db";
pub const DEFAULT_BIND: &str = "127.0.0.1:8787";
pub const DEFAULT_SESSION_TTL_SECS: i64 = 86_400;
/// Upper bound on session lifetime: one year.
pub const MAX_SESSION_TTL_SECS: i64 = 365 * 86_400;
/// Audit entries older than this are pruned on flush.
pub const AUDIT_RETENTION_DAYS: i64 = 90;

const ENV_DATA_DIR: &str = "MEDPORTAL_DATA_DIR";
const ENV_BIND: &str = "MEDPORTAL_BIND";
const ENV_SESSION_TTL: &str = "MEDPORTAL_SESSION_TTL_SECS";
const ENV_CORS_ORIGIN: &str = "MEDPORTAL_CORS_ORIGIN";
const ENV_ALLOW_ADMIN_SIGNUP: &str = "MEDPORTAL_ALLOW_ADMIN_SIGNUP";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot determine home directory; set {}", ENV_DATA_DIR)]
    NoHomeDir,
    #[error("Invalid {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Runtime configuration: defaults plus `MEDPORTAL_*` overrides.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub session_ttl_secs: i64,
    pub cors_origin: Option<String>,
    /// Self-service sign-up with role `admin`. Off by default.
    pub allow_admin_signup: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = match lookup(ENV_DATA_DIR) {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => app_data_dir()?,
        };

        let bind_raw = lookup(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            var: ENV_BIND,
            value: bind_raw.clone(),
        })?;

        let session_ttl_secs = match lookup(ENV_SESSION_TTL) {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(secs) if (1..=MAX_SESSION_TTL_SECS).contains(&secs) => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: ENV_SESSION_TTL,
                        value: raw,
                    })
                }
            },
            None => DEFAULT_SESSION_TTL_SECS,
        };

        let cors_origin = lookup(ENV_CORS_ORIGIN).filter(|o| !o.trim().is_empty());
        let allow_admin_signup = lookup(ENV_ALLOW_ADMIN_SIGNUP)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            data_dir,
            bind_addr,
            session_ttl_secs,
            cors_origin,
            allow_admin_signup,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl_secs)
    }
}

/// Get the application data directory
/// ~/MedPortal/ on all platforms
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(APP_NAME))
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    "medportal=info,tower_http=info".to_string()
}
