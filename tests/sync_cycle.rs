use iocsync::core::db;
use iocsync::core::error::IocsyncError;
use iocsync::core::store::Store;
use iocsync::core::time;
use iocsync::plugins::feed::{FeedExtractor, FeedHit};
use iocsync::plugins::records;
use iocsync::plugins::settings;
use iocsync::plugins::sync;
use rusqlite::Connection;
use std::sync::Mutex;
use tempfile::TempDir;

/// Canned feed that records every requested window.
struct FakeFeed {
    hits: Vec<FeedHit>,
    windows: Mutex<Vec<String>>,
}

impl FakeFeed {
    fn with_hits(hits: Vec<FeedHit>) -> Self {
        Self {
            hits,
            windows: Mutex::new(Vec::new()),
        }
    }

    fn requested_windows(&self) -> Vec<String> {
        self.windows.lock().unwrap().clone()
    }
}

impl FeedExtractor for FakeFeed {
    fn fetch(
        &self,
        window: &str,
        _data_type: &str,
        _analysis_level: i64,
        _threat_level: i64,
    ) -> Result<Vec<FeedHit>, IocsyncError> {
        self.windows.lock().unwrap().push(window.to_string());
        Ok(self.hits.clone())
    }
}

struct FailingFeed;

impl FeedExtractor for FailingFeed {
    fn fetch(
        &self,
        _window: &str,
        _data_type: &str,
        _analysis_level: i64,
        _threat_level: i64,
    ) -> Result<Vec<FeedHit>, IocsyncError> {
        Err(IocsyncError::ValidationError("feed unreachable".to_string()))
    }
}

fn hit(kind: &str, value: &str) -> FeedHit {
    FeedHit {
        event_id: "1".to_string(),
        kind: kind.to_string(),
        value: value.to_string(),
    }
}

fn init_store(data_life: &str) -> (TempDir, Store) {
    let tmp = TempDir::new().expect("tempdir");
    let store = Store::at(tmp.path());
    settings::initialize(&store, "domains", data_life, 0, 4).expect("init");
    (tmp, store)
}

fn set_last_run(store: &Store, last_run: i64) {
    let mut config = settings::read(store).unwrap();
    config.last_run = last_run;
    settings::write(store, &config).unwrap();
}

fn set_age(store: &Store, value: &str, age: i64) {
    let conn = Connection::open(db::mirror_db_path(&store.root)).unwrap();
    conn.execute(
        "UPDATE indicators SET age = ?1 WHERE value = ?2",
        rusqlite::params![age, value],
    )
    .unwrap();
}

#[test]
fn test_window_is_clamped_to_lifetime() {
    let (_tmp, store) = init_store("60m");
    set_last_run(&store, time::now_epoch() - 10_000 * 60);

    let feed = FakeFeed::with_hits(vec![]);
    let report = sync::run_cycle(&store, &feed).unwrap();

    assert_eq!(feed.requested_windows(), vec!["60m".to_string()]);
    assert_eq!(report.window, "60m");
}

#[test]
fn test_unbounded_life_never_clamps_window() {
    let (_tmp, store) = init_store("all");
    set_last_run(&store, time::now_epoch() - 10_000 * 60);

    let feed = FakeFeed::with_hits(vec![]);
    let report = sync::run_cycle(&store, &feed).unwrap();

    // Within a minute of slack for the cycle's own clock read.
    let requested: i64 = report.window.trim_end_matches('m').parse().unwrap();
    assert!(requested >= 10_000, "window was clamped: {}", report.window);
}

#[test]
fn test_cycle_rotates_run_timestamps() {
    let (_tmp, store) = init_store("7d");
    let stale = time::now_epoch() - 600;
    set_last_run(&store, stale);

    let before = time::now_epoch();
    sync::run_cycle(&store, &FakeFeed::with_hits(vec![])).unwrap();

    let config = settings::read(&store).unwrap();
    assert_eq!(config.previous_run, stale);
    assert!(config.last_run >= before);
    assert!(config.previous_run <= config.last_run);
    assert_eq!(config.data_type, "domains");
    assert_eq!(config.data_life, "7d");
}

#[test]
fn test_cycle_stores_and_deduplicates_across_runs() {
    let (_tmp, store) = init_store("7d");
    let feed = FakeFeed::with_hits(vec![
        hit("domain", "evil.example"),
        hit("domain", "worse.example"),
    ]);

    let first = sync::run_cycle(&store, &feed).unwrap();
    assert_eq!(first.fetched, 2);
    assert_eq!(first.stored, 2);

    let second = sync::run_cycle(&store, &feed).unwrap();
    assert_eq!(second.fetched, 2);
    assert_eq!(second.stored, 0, "re-fetched records must be dropped");
    assert_eq!(records::fetch_all(&store).unwrap().len(), 2);
}

#[test]
fn test_cycle_evicts_expired_records() {
    let (_tmp, store) = init_store("60m");
    records::store_hits(
        &store,
        &[
            ("domain".to_string(), "ancient.example".to_string()),
            ("domain".to_string(), "fresh.example".to_string()),
        ],
    )
    .unwrap();
    set_age(&store, "ancient.example", time::now_epoch() - 3700);

    let report = sync::run_cycle(&store, &FakeFeed::with_hits(vec![])).unwrap();
    assert_eq!(report.evicted, 1);

    let remaining: Vec<String> = records::fetch_all(&store)
        .unwrap()
        .into_iter()
        .map(|r| r.value)
        .collect();
    assert_eq!(remaining, vec!["fresh.example".to_string()]);
}

#[test]
fn test_unbounded_life_skips_eviction() {
    let (_tmp, store) = init_store("all");
    records::store_hits(&store, &[("domain".to_string(), "fossil.example".to_string())]).unwrap();
    set_age(&store, "fossil.example", 1);

    let report = sync::run_cycle(&store, &FakeFeed::with_hits(vec![])).unwrap();
    assert_eq!(report.evicted, 0);
    assert_eq!(records::fetch_all(&store).unwrap().len(), 1);
}

#[test]
fn test_failed_fetch_leaves_settings_unrotated() {
    let (_tmp, store) = init_store("7d");
    let stale = time::now_epoch() - 600;
    set_last_run(&store, stale);

    let err = sync::run_cycle(&store, &FailingFeed).expect_err("feed failure must propagate");
    assert!(matches!(err, IocsyncError::ValidationError(_)), "{err}");

    // Stale timestamps mean the next cycle re-requests the same window.
    let config = settings::read(&store).unwrap();
    assert_eq!(config.last_run, stale);
    assert_eq!(config.previous_run, 0);
}

#[test]
fn test_new_partition_after_two_cycles() {
    let (_tmp, store) = init_store("7d");

    sync::run_cycle(
        &store,
        &FakeFeed::with_hits(vec![hit("domain", "first-wave.example")]),
    )
    .unwrap();
    // Push the first wave behind the next rotation pivot.
    set_age(&store, "first-wave.example", time::now_epoch() - 1000);
    set_last_run(&store, time::now_epoch() - 500);

    sync::run_cycle(
        &store,
        &FakeFeed::with_hits(vec![hit("domain", "second-wave.example")]),
    )
    .unwrap();

    let config = settings::read(&store).unwrap();
    let new = records::fetch_partition(&store, records::Partition::New, config.previous_run).unwrap();
    let old = records::fetch_partition(&store, records::Partition::Old, config.previous_run).unwrap();
    assert_eq!(new.len(), 1);
    assert_eq!(new[0].value, "second-wave.example");
    assert_eq!(old.len(), 1);
    assert_eq!(old[0].value, "first-wave.example");
}
