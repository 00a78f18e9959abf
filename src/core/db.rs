use crate::core::broker::DbBroker;
use crate::core::error;
use crate::core::schemas;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

pub fn db_connect(db_path: &str) -> Result<Connection, error::IocsyncError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::IocsyncError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::IocsyncError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::IocsyncError::RusqliteError)?;
    Ok(conn)
}

pub fn mirror_db_path(root: &Path) -> PathBuf {
    root.join(schemas::MIRROR_DB_NAME)
}

pub fn initialize_mirror_db(root: &Path) -> Result<(), error::IocsyncError> {
    fs::create_dir_all(root).map_err(error::IocsyncError::IoError)?;
    let broker = DbBroker::new(root);
    let db_path = mirror_db_path(root);
    broker.with_conn(&db_path, "iocsync", "mirror.init", |conn| {
        for stmt in schemas::MIRROR_DB_ALL_STATEMENTS {
            conn.execute(stmt, [])?;
        }
        Ok(())
    })?;
    Ok(())
}
