//! Indicator mirror: deduplicated records with a local first-seen age.

use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error;
use crate::core::store::Store;
use crate::core::time;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub value: String,
    pub kind: String,
    /// Local first-seen epoch timestamp. Never refreshed: re-fetching an
    /// indicator does not make it young again.
    pub age: i64,
}

/// Which side of the `previous_run` pivot a fetch returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// `age >= previous_run`: seen on or after the previous cycle.
    New,
    /// `age < previous_run`: seen before the previous cycle.
    Old,
}

/// Insert `(kind, value)` pairs age-stamped with the current time. The
/// composite primary key drops duplicates silently; an existing row keeps
/// its original age. Returns the number of rows actually inserted.
pub fn store_hits(store: &Store, hits: &[(String, String)]) -> Result<usize, error::IocsyncError> {
    let now = time::now_epoch();
    let broker = DbBroker::new(&store.root);
    let db_path = db::mirror_db_path(&store.root);
    broker.with_conn(&db_path, "iocsync", "records.store", |conn| {
        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO indicators(value, type, age) VALUES (?1, ?2, ?3)",
        )?;
        let mut inserted = 0usize;
        for (kind, value) in hits {
            inserted += stmt.execute(rusqlite::params![value, kind.to_lowercase(), now])?;
        }
        Ok(inserted)
    })
}

pub fn fetch_all(store: &Store) -> Result<Vec<Record>, error::IocsyncError> {
    fetch_where(store, "records.fetch_all", "", &[])
}

/// Fetch one side of the partition relative to `previous_run`. The two
/// sides are disjoint and together cover `fetch_all` for the same pivot.
pub fn fetch_partition(
    store: &Store,
    partition: Partition,
    previous_run: i64,
) -> Result<Vec<Record>, error::IocsyncError> {
    let (op, clause) = match partition {
        Partition::New => ("records.fetch_new", " WHERE age >= ?1"),
        Partition::Old => ("records.fetch_old", " WHERE age < ?1"),
    };
    fetch_where(store, op, clause, &[&previous_run])
}

fn fetch_where(
    store: &Store,
    op: &str,
    clause: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<Record>, error::IocsyncError> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::mirror_db_path(&store.root);
    broker.with_conn(&db_path, "iocsync", op, |conn| {
        let query = format!("SELECT value, type, age FROM indicators{} ORDER BY age, value", clause);
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(params, |row| {
            Ok(Record {
                value: row.get(0)?,
                kind: row.get(1)?,
                age: row.get(2)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    })
}

/// Delete every record with `age < cutoff`. Returns the eviction count.
pub fn evict(store: &Store, cutoff: i64) -> Result<usize, error::IocsyncError> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::mirror_db_path(&store.root);
    broker.with_conn(&db_path, "iocsync", "records.evict", |conn| {
        let deleted = conn.execute(
            "DELETE FROM indicators WHERE age < ?1",
            rusqlite::params![cutoff],
        )?;
        Ok(deleted)
    })
}
