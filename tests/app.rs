use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use chrono::Utc;

use tvplan_data::api::TvPlanClient;
use tvplan_data::app::{App, ProgressEvent, ProgressSink};
use tvplan_data::cache::ChannelCache;
use tvplan_data::config::Config;
use tvplan_data::domain::{Cached, Channel, Country};
use tvplan_data::error::TvPlanError;
use tvplan_data::store::Store;

struct SilentSink;

impl ProgressSink for SilentSink {
    fn event(&self, _event: ProgressEvent) {}
}

enum ChannelReply {
    Channels(usize),
    RateLimited,
    Fail,
}

#[derive(Default)]
struct MockClient {
    countries: Vec<Country>,
    countries_fail: bool,
    channel_replies: HashMap<String, ChannelReply>,
    country_calls: Arc<Mutex<usize>>,
    channel_calls: Arc<Mutex<Vec<String>>>,
}

impl TvPlanClient for MockClient {
    fn fetch_countries(&self) -> Result<Vec<Country>, TvPlanError> {
        *self.country_calls.lock().unwrap() += 1;
        if self.countries_fail {
            return Err(TvPlanError::ApiStatus {
                status: 500,
                message: "boom".to_string(),
            });
        }
        Ok(self.countries.clone())
    }

    fn fetch_channels(&self, country_id: &str) -> Result<Vec<Channel>, TvPlanError> {
        self.channel_calls
            .lock()
            .unwrap()
            .push(country_id.to_string());
        match self.channel_replies.get(country_id) {
            Some(ChannelReply::Channels(count)) => Ok((0..*count)
                .map(|index| channel(&format!("{country_id}-c{index}")))
                .collect()),
            Some(ChannelReply::RateLimited) => Err(TvPlanError::RateLimited),
            Some(ChannelReply::Fail) | None => Err(TvPlanError::ApiStatus {
                status: 500,
                message: "boom".to_string(),
            }),
        }
    }

    fn fetch_programs(&self, channel_id: &str) -> Result<serde_json::Value, TvPlanError> {
        match self.channel_replies.get(channel_id) {
            Some(ChannelReply::Channels(count)) => {
                Ok(serde_json::json!({ "channel": channel_id, "programs": count }))
            }
            Some(ChannelReply::RateLimited) => Err(TvPlanError::RateLimited),
            Some(ChannelReply::Fail) | None => Err(TvPlanError::ApiStatus {
                status: 500,
                message: "boom".to_string(),
            }),
        }
    }
}

fn country(id: &str) -> Country {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "name": format!("Country {id}"),
        "display_name": format!("Country {id}"),
    }))
    .unwrap()
}

fn channel(id: &str) -> Channel {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "display_name": format!("Channel {id}"),
    }))
    .unwrap()
}

fn test_config() -> Config {
    let mut config = Config::new(Some("token".to_string()), None);
    config.fetch_delay = Duration::ZERO;
    config
}

fn test_store(temp: &tempfile::TempDir) -> Store {
    let root = Utf8PathBuf::from_path_buf(temp.path().join("data")).unwrap();
    Store::new_with_root(root)
}

fn write_countries(store: &Store, countries: &[Country], timestamp: &str) {
    let record = Cached {
        data: countries.to_vec(),
        timestamp: timestamp.to_string(),
    };
    Store::write_json_atomic(&store.countries_path(), &record).unwrap();
}

#[test]
fn fresh_country_cache_makes_no_country_call() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let countries = vec![country("1")];
    write_countries(&store, &countries, &Utc::now().to_rfc3339());

    let mut client = MockClient::default();
    client
        .channel_replies
        .insert("1".to_string(), ChannelReply::Channels(2));
    let country_calls = client.country_calls.clone();
    let app = App::new(store, client, test_config());

    let result = app.fetch_channels(&SilentSink).unwrap();
    assert_eq!(result.countries_source, "cache");
    assert_eq!(result.items.len(), 1);
    assert_eq!(*country_calls.lock().unwrap(), 0);
}

#[test]
fn stale_country_cache_is_refreshed_once() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let old = (Utc::now() - chrono::Duration::days(8)).to_rfc3339();
    write_countries(&store, &[country("1")], &old);

    let mut client = MockClient {
        countries: vec![country("1")],
        ..MockClient::default()
    };
    client
        .channel_replies
        .insert("1".to_string(), ChannelReply::Channels(1));
    let country_calls = client.country_calls.clone();
    let app = App::new(test_store(&temp), client, test_config());

    let result = app.fetch_channels(&SilentSink).unwrap();
    assert_eq!(result.countries_source, "fetched");
    assert_eq!(*country_calls.lock().unwrap(), 1);

    let record: Cached<Vec<Country>> = Store::read_json(&test_store(&temp).countries_path())
        .unwrap()
        .unwrap();
    assert_ne!(record.timestamp, old);
}

#[test]
fn malformed_timestamp_counts_as_stale() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    write_countries(&store, &[country("1")], "not-a-timestamp");

    let mut client = MockClient {
        countries: vec![country("1")],
        ..MockClient::default()
    };
    client
        .channel_replies
        .insert("1".to_string(), ChannelReply::Channels(1));
    let app = App::new(store, client, test_config());

    let result = app.fetch_channels(&SilentSink).unwrap();
    assert_eq!(result.countries_source, "fetched");
}

#[test]
fn failed_country_refresh_leaves_cache_untouched() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let old = (Utc::now() - chrono::Duration::days(30)).to_rfc3339();
    write_countries(&store, &[country("1")], &old);
    let before = std::fs::read_to_string(store.countries_path().as_std_path()).unwrap();

    let client = MockClient {
        countries_fail: true,
        ..MockClient::default()
    };
    let app = App::new(test_store(&temp), client, test_config());

    let err = app.fetch_channels(&SilentSink).unwrap_err();
    assert_matches!(err, TvPlanError::ApiStatus { status: 500, .. });

    let after = std::fs::read_to_string(test_store(&temp).countries_path().as_std_path()).unwrap();
    assert_eq!(before, after);
}

#[test]
fn missing_countries_fetch_before_oldest() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let countries = vec![country("A"), country("B"), country("C")];
    write_countries(&store, &countries, &Utc::now().to_rfc3339());

    // B has a recent entry, C an older one, A none at all.
    let mut cache = ChannelCache::new();
    cache.insert(
        "B".to_string(),
        Cached {
            data: vec![channel("B-c0")],
            timestamp: "2024-03-01T00:00:00Z".to_string(),
        },
    );
    cache.insert(
        "C".to_string(),
        Cached {
            data: vec![channel("C-c0")],
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        },
    );
    Store::write_json_atomic(&store.channels_path(), &cache).unwrap();

    let mut client = MockClient::default();
    for id in ["A", "B", "C"] {
        client
            .channel_replies
            .insert(id.to_string(), ChannelReply::Channels(1));
    }
    let channel_calls = client.channel_calls.clone();
    let app = App::new(store, client, test_config());
    let result = app.fetch_channels(&SilentSink).unwrap();

    let order: Vec<&str> = result
        .items
        .iter()
        .map(|item| item.country_id.as_str())
        .collect();
    assert_eq!(order, vec!["A", "C", "B"]);
    assert_eq!(*channel_calls.lock().unwrap(), vec!["A", "C", "B"]);
}

#[test]
fn rate_limit_halts_batch_after_committed_prefix() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let countries = vec![country("A"), country("B"), country("C")];
    write_countries(&store, &countries, &Utc::now().to_rfc3339());

    let mut client = MockClient::default();
    client
        .channel_replies
        .insert("A".to_string(), ChannelReply::Channels(3));
    client
        .channel_replies
        .insert("B".to_string(), ChannelReply::RateLimited);
    client
        .channel_replies
        .insert("C".to_string(), ChannelReply::Channels(3));
    let app = App::new(store, client, test_config());

    let result = app.fetch_channels(&SilentSink).unwrap();
    assert!(result.rate_limited);
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].country_id, "A");

    // A is committed to disk, B and C are untouched.
    let cache: ChannelCache = Store::read_json(&test_store(&temp).channels_path())
        .unwrap()
        .unwrap();
    assert_eq!(cache.len(), 1);
    assert_eq!(cache["A"].data.len(), 3);
}

#[test]
fn ordinary_fetch_failure_skips_key_and_continues() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let countries = vec![country("A"), country("B")];
    write_countries(&store, &countries, &Utc::now().to_rfc3339());

    let mut client = MockClient::default();
    client
        .channel_replies
        .insert("A".to_string(), ChannelReply::Fail);
    client
        .channel_replies
        .insert("B".to_string(), ChannelReply::Channels(2));
    let app = App::new(store, client, test_config());

    let result = app.fetch_channels(&SilentSink).unwrap();
    assert!(!result.rate_limited);
    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[0].action, "skipped");
    assert!(result.items[0].error.is_some());
    assert_eq!(result.items[1].action, "fetched");

    let cache: ChannelCache = Store::read_json(&test_store(&temp).channels_path())
        .unwrap()
        .unwrap();
    assert!(!cache.contains_key("A"));
    assert!(cache.contains_key("B"));
}

#[test]
fn stub_data_writes_one_file_per_channel() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);

    let mut client = MockClient::default();
    client
        .channel_replies
        .insert("101".to_string(), ChannelReply::Channels(4));
    client
        .channel_replies
        .insert("202".to_string(), ChannelReply::Fail);

    let mut config = Config::new(
        Some("token".to_string()),
        Some(vec!["101".to_string(), "202".to_string()]),
    );
    config.fetch_delay = Duration::ZERO;

    let app = App::new(store, client, config);
    let result = app.fetch_stub_data(&SilentSink).unwrap();

    assert_eq!(result.requested, 2);
    assert_eq!(result.fetched, vec!["101"]);
    assert_eq!(result.failed, vec!["202"]);

    let store = test_store(&temp);
    let saved: serde_json::Value = Store::read_json(&store.stub_channel_path("101"))
        .unwrap()
        .unwrap();
    assert_eq!(saved["channel"], "101");
    assert!(Store::read_json::<serde_json::Value>(&store.stub_channel_path("202"))
        .unwrap()
        .is_none());
}

#[test]
fn stub_data_requires_test_channel_ids() {
    let temp = tempfile::tempdir().unwrap();
    let app = App::new(test_store(&temp), MockClient::default(), test_config());

    let err = app.fetch_stub_data(&SilentSink).unwrap_err();
    assert_matches!(err, TvPlanError::MissingTestChannelIds);
}

#[test]
fn stub_data_rate_limit_halts_remaining_ids() {
    let temp = tempfile::tempdir().unwrap();

    let mut client = MockClient::default();
    client
        .channel_replies
        .insert("101".to_string(), ChannelReply::Channels(1));
    client
        .channel_replies
        .insert("202".to_string(), ChannelReply::RateLimited);
    client
        .channel_replies
        .insert("303".to_string(), ChannelReply::Channels(1));

    let mut config = Config::new(
        Some("token".to_string()),
        Some(vec![
            "101".to_string(),
            "202".to_string(),
            "303".to_string(),
        ]),
    );
    config.fetch_delay = Duration::ZERO;

    let app = App::new(test_store(&temp), client, config);
    let result = app.fetch_stub_data(&SilentSink).unwrap();

    assert!(result.rate_limited);
    assert_eq!(result.fetched, vec!["101"]);
    assert!(result.failed.is_empty());
    assert!(
        Store::read_json::<serde_json::Value>(&test_store(&temp).stub_channel_path("303"))
            .unwrap()
            .is_none()
    );
}
