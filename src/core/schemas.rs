//! Database schema definitions for the indicator mirror.
//!
//! A store root holds a single SQLite database (`mirror.db`) with three
//! tables: the indicator mirror itself, the command templates and the
//! singleton settings row.

pub const MIRROR_DB_NAME: &str = "mirror.db";

/// Indicator mirror. `age` is the local first-seen epoch timestamp; the
/// composite key makes `INSERT OR IGNORE` the dedup mechanism.
pub const MIRROR_DB_SCHEMA_INDICATORS: &str = "
    CREATE TABLE IF NOT EXISTS indicators (
        value  TEXT    NOT NULL,
        type   TEXT    NOT NULL,
        age    INTEGER NOT NULL,
        PRIMARY KEY (value, type)
    )
";

pub const MIRROR_DB_INDEX_INDICATORS_AGE: &str =
    "CREATE INDEX IF NOT EXISTS idx_indicators_age ON indicators(age)";

/// Command templates. A type may appear more than once per scope; reads
/// resolve ties in favor of the most recently inserted row.
pub const MIRROR_DB_SCHEMA_COMMANDS: &str = "
    CREATE TABLE IF NOT EXISTS commands (
        type     TEXT NOT NULL,
        command  TEXT NOT NULL,
        scope    TEXT NOT NULL
    )
";

pub const MIRROR_DB_INDEX_COMMANDS_SCOPE: &str =
    "CREATE INDEX IF NOT EXISTS idx_commands_scope ON commands(scope)";

/// Singleton run-state row. Exactly one row exists once initialized;
/// `previous_run <= last_run` always holds.
pub const MIRROR_DB_SCHEMA_SETTINGS: &str = "
    CREATE TABLE IF NOT EXISTS settings (
        previous_run    INTEGER NOT NULL,
        last_run        INTEGER NOT NULL,
        data_type       TEXT    NOT NULL,
        data_life       TEXT    NOT NULL,
        analysis_level  INTEGER NOT NULL DEFAULT 0,
        threat_level    INTEGER NOT NULL DEFAULT 4
    )
";

pub const MIRROR_DB_ALL_STATEMENTS: &[&str] = &[
    MIRROR_DB_SCHEMA_INDICATORS,
    MIRROR_DB_INDEX_INDICATORS_AGE,
    MIRROR_DB_SCHEMA_COMMANDS,
    MIRROR_DB_INDEX_COMMANDS_SCOPE,
    MIRROR_DB_SCHEMA_SETTINGS,
];

pub const BROKER_EVENTS_NAME: &str = "broker.events.jsonl";
pub const FEED_CONFIG_NAME: &str = "feed.toml";
