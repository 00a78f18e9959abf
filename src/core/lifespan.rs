//! Retention lifetime and fetch window parsing.
//!
//! Lifespans are written `<integer><unit>` with unit `m`, `h` or `d`, or
//! the literal `all` for unbounded retention. The same grammar covers the
//! stored `data_life` setting and ad-hoc window arguments.

use crate::core::error::IocsyncError;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn lifespan_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^\s*(\d+)\s*([mhd])\s*$").unwrap())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeSpan {
    /// Bounded lifetime, normalized to minutes.
    Minutes(i64),
    /// No retention limit; eviction is skipped and windows are not clamped.
    Unbounded,
}

impl LifeSpan {
    pub fn minutes(&self) -> Option<i64> {
        match self {
            LifeSpan::Minutes(m) => Some(*m),
            LifeSpan::Unbounded => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, LifeSpan::Unbounded)
    }

    /// Cap an elapsed-minutes window at the lifetime. Fetching wider than
    /// the retention limit only pulls records the next eviction deletes.
    pub fn clamp_minutes(&self, elapsed: i64) -> i64 {
        match self {
            LifeSpan::Minutes(m) => elapsed.min(*m),
            LifeSpan::Unbounded => elapsed,
        }
    }

    /// Eviction cutoff relative to `now`, or None when unbounded.
    pub fn cutoff(&self, now: i64) -> Option<i64> {
        self.minutes().map(|m| now - m * 60)
    }
}

impl FromStr for LifeSpan {
    type Err = IocsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(LifeSpan::Unbounded);
        }
        let caps = lifespan_pattern()
            .captures(s)
            .ok_or_else(|| IocsyncError::InvalidLifeSpan(s.to_string()))?;
        let count: i64 = caps[1]
            .parse()
            .map_err(|_| IocsyncError::InvalidLifeSpan(s.to_string()))?;
        let minutes = match &caps[2].to_ascii_lowercase()[..] {
            "m" => count,
            "h" => count * 60,
            "d" => count * 60 * 24,
            _ => unreachable!(),
        };
        Ok(LifeSpan::Minutes(minutes))
    }
}

impl fmt::Display for LifeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifeSpan::Minutes(m) => write!(f, "{}m", m),
            LifeSpan::Unbounded => write!(f, "all"),
        }
    }
}
