use rusqlite;
use std::env;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IocsyncError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Feed transport error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] env::VarError),
    #[error("Corrupt state: {0}")]
    CorruptState(String),
    #[error("Invalid scope '{0}' (expected all, new or old)")]
    InvalidScope(String),
    #[error("Invalid lifespan '{0}' (expected <n>m, <n>h, <n>d or 'all')")]
    InvalidLifeSpan(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
}
