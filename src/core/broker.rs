use crate::core::db;
use crate::core::error;
use crate::core::schemas;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use ulid::Ulid;

/// Single entry point for mirror database access. Every logical store
/// operation runs inside `with_conn`: open, execute, audit, release.
///
/// Serialization is in-process only. Two processes running a sync or
/// dispatch cycle against the same store race on the settings rotation
/// and on command firing; callers that need that guarantee must hold an
/// external single-instance lock.
pub struct DbBroker {
    audit_log_path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub db_id: String,
    pub status: String,
}

impl DbBroker {
    pub fn new(root: &Path) -> Self {
        Self {
            audit_log_path: root.join(schemas::BROKER_EVENTS_NAME),
        }
    }

    /// Execute a closure with a serialized connection to the mirror DB.
    /// The connection is released and the audit event written on every
    /// exit path, success or error.
    pub fn with_conn<F, R>(
        &self,
        db_path: &Path,
        actor: &str,
        op_name: &str,
        f: F,
    ) -> Result<R, error::IocsyncError>
    where
        F: FnOnce(&Connection) -> Result<R, error::IocsyncError>,
    {
        static DB_LOCK: Mutex<()> = Mutex::new(());
        let _lock = DB_LOCK.lock().unwrap();

        let db_id = db_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let conn = db::db_connect(&db_path.to_string_lossy())?;

        let result = f(&conn);

        let status = if result.is_ok() { "success" } else { "error" };
        self.log_event(actor, op_name, &db_id, status)?;

        result
    }

    fn log_event(
        &self,
        actor: &str,
        op: &str,
        db_id: &str,
        status: &str,
    ) -> Result<(), error::IocsyncError> {
        use std::fs::OpenOptions;
        use std::io::Write;

        let ev = BrokerEvent {
            ts: crate::core::time::now_epoch_z(),
            event_id: Ulid::new().to_string(),
            actor: actor.to_string(),
            op: op.to_string(),
            db_id: db_id.to_string(),
            status: status.to_string(),
        };

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log_path)
            .map_err(error::IocsyncError::IoError)?;

        writeln!(f, "{}", serde_json::to_string(&ev).unwrap())
            .map_err(error::IocsyncError::IoError)?;
        Ok(())
    }
}
