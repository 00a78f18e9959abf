//! Singleton run-state row: fetch filters plus the two rotation timestamps.
//!
//! The row follows the get-or-create pattern: `initialize` inserts it only
//! when absent, `read` returns exactly one struct and `write` replaces the
//! row wholesale. No history is kept.

use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error;
use crate::core::lifespan::LifeSpan;
use crate::core::store::Store;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub previous_run: i64,
    pub last_run: i64,
    pub data_type: String,
    pub data_life: String,
    pub analysis_level: i64,
    pub threat_level: i64,
}

impl Settings {
    pub fn life_span(&self) -> Result<LifeSpan, error::IocsyncError> {
        self.data_life.parse()
    }
}

fn read_row(conn: &Connection) -> Result<Option<Settings>, error::IocsyncError> {
    let row = conn
        .query_row(
            "SELECT previous_run, last_run, data_type, data_life, analysis_level, threat_level
             FROM settings LIMIT 1",
            [],
            |row| {
                Ok(Settings {
                    previous_run: row.get(0)?,
                    last_run: row.get(1)?,
                    data_type: row.get(2)?,
                    data_life: row.get(3)?,
                    analysis_level: row.get(4)?,
                    threat_level: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

fn write_row(conn: &Connection, settings: &Settings) -> Result<(), error::IocsyncError> {
    if read_row(conn)?.is_none() {
        conn.execute(
            "INSERT INTO settings(previous_run, last_run, data_type, data_life, analysis_level, threat_level)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                settings.previous_run,
                settings.last_run,
                settings.data_type,
                settings.data_life,
                settings.analysis_level,
                settings.threat_level
            ],
        )?;
    } else {
        conn.execute(
            "UPDATE settings
             SET previous_run = ?1, last_run = ?2, data_type = ?3,
                 data_life = ?4, analysis_level = ?5, threat_level = ?6",
            rusqlite::params![
                settings.previous_run,
                settings.last_run,
                settings.data_type,
                settings.data_life,
                settings.analysis_level,
                settings.threat_level
            ],
        )?;
    }
    Ok(())
}

/// Create the settings row with both run timestamps at zero. A store that
/// already holds settings is left untouched.
pub fn initialize(
    store: &Store,
    data_type: &str,
    data_life: &str,
    analysis_level: i64,
    threat_level: i64,
) -> Result<bool, error::IocsyncError> {
    // Reject a malformed lifespan before it can reach the row.
    let _: LifeSpan = data_life.parse()?;
    db::initialize_mirror_db(&store.root)?;
    let broker = DbBroker::new(&store.root);
    let db_path = db::mirror_db_path(&store.root);
    broker.with_conn(&db_path, "iocsync", "settings.init", |conn| {
        if read_row(conn)?.is_some() {
            return Ok(false);
        }
        write_row(
            conn,
            &Settings {
                previous_run: 0,
                last_run: 0,
                data_type: data_type.to_lowercase(),
                data_life: data_life.to_lowercase(),
                analysis_level,
                threat_level,
            },
        )?;
        Ok(true)
    })
}

pub fn read(store: &Store) -> Result<Settings, error::IocsyncError> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::mirror_db_path(&store.root);
    broker.with_conn(&db_path, "iocsync", "settings.read", |conn| {
        read_row(conn)?.ok_or_else(|| {
            error::IocsyncError::CorruptState(
                "settings row missing; re-run `iocsync init`".to_string(),
            )
        })
    })
}

/// Full replace of the singleton row (insert if absent, else update all
/// fields).
pub fn write(store: &Store, settings: &Settings) -> Result<(), error::IocsyncError> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::mirror_db_path(&store.root);
    broker.with_conn(&db_path, "iocsync", "settings.write", |conn| {
        write_row(conn, settings)
    })
}
