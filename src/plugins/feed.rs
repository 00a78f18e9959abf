//! Feed extractor: pulls events from a MISP-style REST endpoint and
//! flattens them into typed indicator hits.
//!
//! The sync scheduler only consumes `kind` and `value`; everything else
//! about the remote payload stays behind this module. Transport failures
//! propagate untouched so a failed cycle leaves the run timestamps stale
//! and the next cycle re-requests the overlapping window.

use crate::core::error::IocsyncError;
use crate::core::schemas;
use crate::core::store::Store;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// One indicator extracted from the feed. `event_id` is carried for
/// operator-facing output only; the mirror keys on `(value, kind)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedHit {
    pub event_id: String,
    pub kind: String,
    pub value: String,
}

/// Seam between the sync scheduler and the remote feed. `window` uses the
/// lifespan grammar (`5m`, `3h`, `7d`, `all`).
pub trait FeedExtractor {
    fn fetch(
        &self,
        window: &str,
        data_type: &str,
        analysis_level: i64,
        threat_level: i64,
    ) -> Result<Vec<FeedHit>, IocsyncError>;
}

/// Searchable data types mapped to the attribute types they cover.
const SEARCHES: &[(&str, &[&str])] = &[
    ("domains", &["domain", "hostname"]),
    ("hashes", &["md5", "sha1", "sha256"]),
    ("filenames", &["filename"]),
    ("snort", &["snort"]),
    ("yara", &["yara"]),
];

pub fn known_data_types() -> Vec<&'static str> {
    SEARCHES.iter().map(|(name, _)| *name).collect()
}

fn attribute_types(data_type: &str) -> Result<&'static [&'static str], IocsyncError> {
    SEARCHES
        .iter()
        .find(|(name, _)| *name == data_type)
        .map(|(_, types)| *types)
        .ok_or_else(|| {
            IocsyncError::ValidationError(format!(
                "unknown data type '{}' (expected one of: {})",
                data_type,
                known_data_types().join(", ")
            ))
        })
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    response: Vec<FeedEventWrapper>,
}

#[derive(Debug, Deserialize)]
struct FeedEventWrapper {
    #[serde(rename = "Event")]
    event: FeedEvent,
}

#[derive(Debug, Deserialize)]
struct FeedEvent {
    #[serde(default)]
    id: String,
    /// Analysis maturity: 0 initial, 1 ongoing, 2 completed.
    #[serde(default)]
    analysis: String,
    /// Threat severity: 1 high through 4 undefined.
    #[serde(default)]
    threat_level_id: String,
    #[serde(rename = "Attribute", default)]
    attributes: Vec<EventAttribute>,
}

#[derive(Debug, Deserialize)]
struct EventAttribute {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    value: String,
}

/// Flatten a raw feed payload into hits for one data type. Events below
/// the analysis floor or above the threat ceiling are dropped whole.
pub fn extract_hits(
    payload: &str,
    data_type: &str,
    analysis_level: i64,
    threat_level: i64,
) -> Result<Vec<FeedHit>, IocsyncError> {
    let wanted = attribute_types(data_type)?;
    let parsed: FeedResponse = serde_json::from_str(payload)
        .map_err(|e| IocsyncError::ValidationError(format!("malformed feed payload: {}", e)))?;

    let mut hits = Vec::new();
    for wrapper in parsed.response {
        let event = wrapper.event;
        let analysis: i64 = event.analysis.parse().unwrap_or(0);
        let threat: i64 = event.threat_level_id.parse().unwrap_or(4);
        if analysis < analysis_level || threat > threat_level {
            continue;
        }
        for attr in event.attributes {
            if wanted.contains(&attr.kind.as_str()) {
                hits.push(FeedHit {
                    event_id: event.id.clone(),
                    kind: attr.kind,
                    value: attr.value,
                });
            }
        }
    }
    Ok(hits)
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FeedConfig {
    pub url: String,
    pub key: String,
}

impl FeedConfig {
    /// Load feed endpoint configuration: `IOCSYNC_FEED_URL` /
    /// `IOCSYNC_FEED_KEY` override `<store>/feed.toml`.
    pub fn load(store: &Store) -> Result<FeedConfig, IocsyncError> {
        let env_url = std::env::var("IOCSYNC_FEED_URL").ok();
        let env_key = std::env::var("IOCSYNC_FEED_KEY").ok();
        if let (Some(url), Some(key)) = (env_url.clone(), env_key.clone()) {
            return Ok(FeedConfig { url, key });
        }

        let config_path = store.root.join(schemas::FEED_CONFIG_NAME);
        if config_path.exists() {
            let content = fs::read_to_string(&config_path).map_err(IocsyncError::IoError)?;
            let mut config: FeedConfig = toml::from_str(&content)
                .map_err(|e| IocsyncError::ValidationError(e.to_string()))?;
            if let Some(url) = env_url {
                config.url = url;
            }
            if let Some(key) = env_key {
                config.key = key;
            }
            return Ok(config);
        }

        Err(IocsyncError::NotFound(format!(
            "feed configuration: set IOCSYNC_FEED_URL/IOCSYNC_FEED_KEY or write {}",
            config_path.display()
        )))
    }
}

/// Blocking HTTP client for a MISP-style `/events/restSearch` endpoint.
pub struct HttpFeed {
    config: FeedConfig,
    client: reqwest::blocking::Client,
}

impl HttpFeed {
    pub fn new(config: FeedConfig) -> Result<Self, IocsyncError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn from_store(store: &Store) -> Result<Self, IocsyncError> {
        Self::new(FeedConfig::load(store)?)
    }

    fn get_payload(&self, window: &str) -> Result<String, IocsyncError> {
        let url = format!("{}/events/restSearch", self.config.url.trim_end_matches('/'));
        let mut body = serde_json::json!({ "returnFormat": "json" });
        // "all" means no lower bound; the endpoint then returns every event.
        if !window.eq_ignore_ascii_case("all") {
            body["last"] = serde_json::Value::String(window.to_string());
        }
        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.config.key)
            .header("Accept", "application/json")
            .json(&body)
            .send()?
            .error_for_status()?;
        Ok(response.text()?)
    }
}

impl FeedExtractor for HttpFeed {
    fn fetch(
        &self,
        window: &str,
        data_type: &str,
        analysis_level: i64,
        threat_level: i64,
    ) -> Result<Vec<FeedHit>, IocsyncError> {
        let payload = self.get_payload(window)?;
        extract_hits(&payload, data_type, analysis_level, threat_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "response": [
            {"Event": {"id": "10", "analysis": "2", "threat_level_id": "1", "Attribute": [
                {"type": "domain", "value": "evil.example"},
                {"type": "md5", "value": "9e107d9d372bb6826bd81d3542a419d6"},
                {"type": "comment", "value": "ignore me"}
            ]}},
            {"Event": {"id": "11", "analysis": "0", "threat_level_id": "4", "Attribute": [
                {"type": "hostname", "value": "low-confidence.example"}
            ]}}
        ]
    }"#;

    #[test]
    fn test_extract_selects_only_matching_attribute_types() {
        let hits = extract_hits(PAYLOAD, "domains", 0, 4).unwrap();
        let values: Vec<_> = hits.iter().map(|h| h.value.as_str()).collect();
        assert_eq!(values, vec!["evil.example", "low-confidence.example"]);
    }

    #[test]
    fn test_extract_analysis_floor_drops_whole_event() {
        let hits = extract_hits(PAYLOAD, "domains", 1, 4).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].event_id, "10");
    }

    #[test]
    fn test_extract_threat_ceiling_drops_whole_event() {
        let hits = extract_hits(PAYLOAD, "domains", 0, 3).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, "evil.example");
    }

    #[test]
    fn test_extract_rejects_unknown_data_type() {
        assert!(extract_hits(PAYLOAD, "emails", 0, 4).is_err());
    }

    #[test]
    fn test_extract_tolerates_empty_response() {
        let hits = extract_hits("{}", "hashes", 0, 4).unwrap();
        assert!(hits.is_empty());
    }
}
