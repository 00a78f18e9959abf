//! One sync cycle: window → fetch → store → rotate → evict.

use crate::core::error;
use crate::core::store::Store;
use crate::core::time;
use crate::plugins::feed::FeedExtractor;
use crate::plugins::records;
use crate::plugins::settings::{self, Settings};
use serde::Serialize;

#[derive(Serialize, Debug, Clone)]
pub struct SyncReport {
    pub window: String,
    pub fetched: usize,
    pub stored: usize,
    pub evicted: usize,
}

/// Run one full cycle against the store. No step is retried and nothing
/// is rolled back: a failure after `store_hits` but before rotation
/// leaves `last_run` stale, so the next cycle re-requests the overlap and
/// the mirror's dedup absorbs the duplicates.
pub fn run_cycle(
    store: &Store,
    feed: &dyn FeedExtractor,
) -> Result<SyncReport, error::IocsyncError> {
    let config = settings::read(store)?;
    let now = time::now_epoch();

    // The fetch window is never wider than the retention lifetime; data
    // past it would be evicted at the end of this very cycle.
    let elapsed = time::elapsed_minutes(now, config.last_run);
    let window = format!("{}m", config.life_span()?.clamp_minutes(elapsed));

    let hits = feed.fetch(
        &window,
        &config.data_type,
        config.analysis_level,
        config.threat_level,
    )?;
    let pairs: Vec<(String, String)> = hits
        .into_iter()
        .map(|hit| (hit.kind, hit.value))
        .collect();
    let stored = records::store_hits(store, &pairs)?;

    // Rotation re-reads the row immediately before writing so an external
    // edit of the filters between fetch and rotation survives; only the
    // two timestamps change.
    let current = settings::read(store)?;
    let rotated = Settings {
        previous_run: current.last_run,
        last_run: now,
        ..current
    };
    settings::write(store, &rotated)?;

    let evicted = match rotated.life_span()?.cutoff(now) {
        Some(cutoff) => records::evict(store, cutoff)?,
        None => 0,
    };

    Ok(SyncReport {
        window,
        fetched: pairs.len(),
        stored,
        evicted,
    })
}
