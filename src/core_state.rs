//! Shared application state.
//!
//! `CoreState` is built once at startup, wrapped in `Arc` and handed to
//! the axum router. It holds configuration, the identity service and the
//! request audit buffer. Database connections are opened per request.

use std::sync::Mutex;

use rusqlite::Connection;
use uuid::Uuid;

use crate::config::{AppConfig, AUDIT_RETENTION_DAYS};
use crate::db;
use crate::identity::IdentityService;

/// Maximum audit buffer size before flush.
const AUDIT_BUFFER_CAPACITY: usize = 100;

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    pub config: AppConfig,
    identity: IdentityService,
    /// Audit log for all API access events.
    audit: AuditLogger,
}

impl CoreState {
    pub fn new(config: AppConfig) -> Self {
        let identity = IdentityService::new(config.session_ttl(), config.allow_admin_signup);
        Self {
            config,
            identity,
            audit: AuditLogger::new(),
        }
    }

    /// Create the data directory, migrate the database and drop sessions
    /// that expired while the server was down.
    pub fn initialize(&self) -> Result<(), CoreError> {
        std::fs::create_dir_all(&self.config.data_dir)?;
        let conn = self.open_db()?;
        let purged = db::delete_expired_sessions(&conn)?;
        tracing::info!(
            path = %self.config.db_path().display(),
            purged_sessions = purged,
            "Database ready"
        );
        Ok(())
    }

    /// Open a database connection. One per request; SQLite handles the
    /// cross-connection locking.
    pub fn open_db(&self) -> Result<Connection, CoreError> {
        db::open_database(&self.config.db_path()).map_err(CoreError::Database)
    }

    pub fn identity(&self) -> &IdentityService {
        &self.identity
    }

    // ── Audit logging ───────────────────────────────────────

    /// Log an access event. Auto-flushes to DB when buffer is full.
    pub fn log_access(&self, user_id: Option<Uuid>, action: &str, entity: &str) {
        let needs_flush = self.audit.log(user_id, action, entity);
        if needs_flush {
            if let Err(e) = self.flush_and_prune_audit() {
                tracing::warn!("Auto-flush audit failed: {e}");
            }
        }
    }

    /// Get the current audit buffer contents (for testing/flush).
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.entries()
    }

    /// Flush audit buffer to DB and prune entries past retention.
    pub fn flush_and_prune_audit(&self) -> Result<(), CoreError> {
        let conn = self.open_db()?;
        self.audit.flush_to_db(&conn)?;
        if let Err(e) = db::prune_audit_log(&conn, AUDIT_RETENTION_DAYS) {
            tracing::warn!("Failed to prune audit log: {e}");
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// Error types
// ═══════════════════════════════════════════════════════════

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Cannot prepare data directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
}

// ═══════════════════════════════════════════════════════════
// Audit logger
// ═══════════════════════════════════════════════════════════

/// In-memory audit log buffer. Entries are flushed to SQLite
/// when the buffer reaches capacity or on explicit flush.
pub struct AuditLogger {
    buffer: Mutex<Vec<AuditEntry>>,
}

/// A single audit log entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub timestamp: String,
    /// Authenticated caller, `None` for anonymous requests.
    pub user_id: Option<Uuid>,
    pub action: String,
    pub entity: String,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(Vec::with_capacity(AUDIT_BUFFER_CAPACITY)),
        }
    }

    /// Log an access event to the in-memory buffer.
    /// Returns `true` if the buffer has reached flush threshold.
    pub fn log(&self, user_id: Option<Uuid>, action: &str, entity: &str) -> bool {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.push(AuditEntry {
                timestamp: db::now_timestamp(),
                user_id,
                action: action.to_string(),
                entity: entity.to_string(),
            });
            buf.len() >= AUDIT_BUFFER_CAPACITY
        } else {
            false
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.buffer
            .lock()
            .map(|buf| buf.clone())
            .unwrap_or_default()
    }

    /// Drain all buffered entries (for flush to SQLite).
    pub fn drain(&self) -> Vec<AuditEntry> {
        self.buffer
            .lock()
            .map(|mut buf| buf.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.lock().map(|buf| buf.len()).unwrap_or(0)
    }

    pub fn flush_to_db(&self, conn: &Connection) -> Result<usize, CoreError> {
        let entries = self.drain();
        if entries.is_empty() {
            return Ok(0);
        }

        let tuples: Vec<(String, Option<String>, String, String)> = entries
            .into_iter()
            .map(|e| (e.timestamp, e.user_id.map(|id| id.to_string()), e.action, e.entity))
            .collect();

        let count = tuples.len();
        db::insert_audit_entries(conn, &tuples)?;

        tracing::debug!(count, "Flushed audit entries to database");
        Ok(count)
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// State backed by a fresh file database in a temp directory.
    pub fn temp_state() -> (tempfile::TempDir, CoreState) {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            session_ttl_secs: 3600,
            cors_origin: None,
            allow_admin_signup: true,
        };
        let state = CoreState::new(config);
        state.initialize().unwrap();
        (dir, state)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::temp_state;
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn audit_logger_records_entries() {
        let logger = AuditLogger::new();
        assert_eq!(logger.buffer_len(), 0);

        let user = Uuid::new_v4();
        logger.log(Some(user), "GET /api/patients", "status:200");
        assert_eq!(logger.buffer_len(), 1);

        let entries = logger.entries();
        assert_eq!(entries[0].action, "GET /api/patients");
        assert_eq!(entries[0].user_id, Some(user));
    }

    #[test]
    fn audit_logger_drain_clears_buffer() {
        let logger = AuditLogger::new();
        logger.log(None, "action1", "entity1");
        logger.log(None, "action2", "entity2");

        let drained = logger.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(logger.buffer_len(), 0);
    }

    #[test]
    fn audit_log_returns_true_at_capacity() {
        let logger = AuditLogger::new();
        for i in 0..(AUDIT_BUFFER_CAPACITY - 1) {
            assert!(!logger.log(None, &format!("action_{i}"), "entity"), "Should not signal flush at {i}");
        }
        assert!(logger.log(None, "action_final", "entity"));
    }

    #[test]
    fn audit_flush_to_db_persists_entries() {
        let conn = open_memory_database().unwrap();
        let logger = AuditLogger::new();
        let user = Uuid::new_v4();
        logger.log(Some(user), "GET /api/appointments", "status:200");
        logger.log(None, "POST /api/auth/signin", "status:401");

        assert_eq!(logger.flush_to_db(&conn).unwrap(), 2);
        assert_eq!(logger.buffer_len(), 0);

        let stored: Option<String> = conn
            .query_row(
                "SELECT user_id FROM audit_log WHERE action = 'GET /api/appointments'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, Some(user.to_string()));
    }

    #[test]
    fn audit_flush_empty_buffer_is_noop() {
        let conn = open_memory_database().unwrap();
        assert_eq!(AuditLogger::new().flush_to_db(&conn).unwrap(), 0);
    }

    #[test]
    fn initialize_creates_database_file() {
        let (_dir, state) = temp_state();
        assert!(state.config.db_path().exists());
        let conn = state.open_db().unwrap();
        assert_eq!(db::count_tables(&conn), 9);
    }

    #[test]
    fn core_state_flushes_through_file_db() {
        let (_dir, state) = temp_state();
        state.log_access(None, "GET /api/health", "status:200");
        assert_eq!(state.audit_entries().len(), 1);

        state.flush_and_prune_audit().unwrap();
        assert!(state.audit_entries().is_empty());
        let conn = state.open_db().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
