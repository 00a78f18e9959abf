//! Shared timestamp/event helpers for cycle math and audit envelopes.

use serde_json::Value as JsonValue;
use ulid::Ulid;

/// Returns unix-epoch seconds as a signed integer, the unit every stored
/// timestamp (`age`, `previous_run`, `last_run`) uses.
pub fn now_epoch() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Returns unix-epoch seconds with `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    format!("{}Z", now_epoch())
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// Elapsed minutes since `since`, rounded up. A run started one second
/// ago still requests a one-minute window.
pub fn elapsed_minutes(now: i64, since: i64) -> i64 {
    ((now - since).max(0) as u64).div_ceil(60) as i64
}

/// Standard command response envelope shape used across CLI surfaces.
pub fn command_envelope(cmd: &str, status: &str, extra: JsonValue) -> JsonValue {
    let mut base = serde_json::json!({
        "envelope_version": "1.0.0",
        "ts": now_epoch_z(),
        "event_id": new_event_id(),
        "cmd": cmd,
        "status": status
    });
    if let (Some(base_obj), Some(extra_obj)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra_obj {
            base_obj.insert(k.clone(), v.clone());
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_epoch_z_format() {
        let result = now_epoch_z();
        assert!(result.ends_with('Z'));
        let numeric_part = result.trim_end_matches('Z');
        assert!(numeric_part.parse::<u64>().is_ok());
    }

    #[test]
    fn test_elapsed_minutes_rounds_up() {
        assert_eq!(elapsed_minutes(61, 0), 2);
        assert_eq!(elapsed_minutes(60, 0), 1);
        assert_eq!(elapsed_minutes(1, 0), 1);
        assert_eq!(elapsed_minutes(0, 0), 0);
    }

    #[test]
    fn test_elapsed_minutes_clock_skew_is_zero() {
        assert_eq!(elapsed_minutes(100, 200), 0);
    }

    #[test]
    fn test_command_envelope_basic() {
        let envelope = command_envelope("sync", "ok", serde_json::json!({}));
        assert_eq!(envelope["cmd"], "sync");
        assert_eq!(envelope["status"], "ok");
        assert!(envelope["ts"].is_string());
        assert!(envelope["event_id"].is_string());
        assert_eq!(envelope["envelope_version"], "1.0.0");
    }

    #[test]
    fn test_command_envelope_with_extra() {
        let extra = serde_json::json!({"window": "60m", "stored": 42});
        let envelope = command_envelope("sync", "ok", extra);
        assert_eq!(envelope["window"], "60m");
        assert_eq!(envelope["stored"], 42);
    }
}
