use std::collections::BTreeMap;

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{Cached, Channel, Country};
use crate::error::TvPlanError;
use crate::store::Store;

/// The whole per-country channel mapping, persisted as one file and
/// rewritten after every committed key.
pub type ChannelCache = BTreeMap<String, Cached<Vec<Channel>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from disk; no network call was made.
    Fresh { timestamp: String },
    /// Fetched and the cache file rewritten.
    Refreshed,
}

pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339()
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// A record with a missing or unparseable timestamp is maximally stale.
pub fn is_stale(timestamp: &str, max_age: chrono::Duration, now: DateTime<Utc>) -> bool {
    match parse_timestamp(timestamp) {
        Some(fetched_at) => now.signed_duration_since(fetched_at) > max_age,
        None => true,
    }
}

/// The one reusable pattern in this tool: serve `path` from disk while it is
/// younger than `max_age`, otherwise call `fetch` and replace the file with
/// `{data, timestamp: now}`. A failed fetch propagates without touching the
/// existing file.
pub fn load_or_refresh<T, F>(
    path: &Utf8Path,
    max_age: chrono::Duration,
    fetch: F,
) -> Result<(T, CacheOutcome), TvPlanError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Result<T, TvPlanError>,
{
    if let Some(cached) = Store::read_json::<Cached<T>>(path)? {
        if !is_stale(&cached.timestamp, max_age, Utc::now()) {
            return Ok((
                cached.data,
                CacheOutcome::Fresh {
                    timestamp: cached.timestamp,
                },
            ));
        }
    }

    let data = fetch()?;
    let record = Cached {
        data,
        timestamp: utc_timestamp(),
    };
    Store::write_json_atomic(path, &record)?;
    Ok((record.data, CacheOutcome::Refreshed))
}

/// Fetch order for the per-key loop: countries with no cached channels
/// first (in input order), then cached ones oldest-first. Under a hard rate
/// limit this fills gaps before refreshing known data.
pub fn plan_fetch_order(
    countries: &[Country],
    cache: &ChannelCache,
) -> Vec<(Country, Option<DateTime<Utc>>)> {
    let mut planned: Vec<(Country, Option<DateTime<Utc>>)> = countries
        .iter()
        .map(|country| {
            let last_fetched = cache
                .get(&country.id)
                .and_then(|entry| parse_timestamp(&entry.timestamp));
            (country.clone(), last_fetched)
        })
        .collect();
    // None < Some, and the sort is stable, so missing entries keep their
    // input order at the front.
    planned.sort_by_key(|(_, last_fetched)| *last_fetched);
    planned
}
