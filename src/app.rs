use std::time::Duration;

use serde::Serialize;

use crate::api::TvPlanClient;
use crate::cache::{self, CacheOutcome, ChannelCache};
use crate::config::Config;
use crate::domain::{Cached, Country};
use crate::error::TvPlanError;
use crate::options;
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchChannelsResult {
    pub countries: usize,
    /// "cache" when the country list was served fresh from disk, "fetched"
    /// when it was refreshed over the network.
    pub countries_source: String,
    pub items: Vec<FetchItemResult>,
    pub rate_limited: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchItemResult {
    pub country_id: String,
    pub country_name: String,
    pub action: String,
    pub channels: Option<usize>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptionsResult {
    pub countries: usize,
    pub countries_with_channels: usize,
    pub channel_count: usize,
    pub unknown_country_ids: Vec<String>,
    pub output_path: String,
    pub sample: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StubDataResult {
    pub requested: usize,
    pub fetched: Vec<String>,
    pub failed: Vec<String>,
    pub rate_limited: bool,
}

pub struct App<C: TvPlanClient> {
    store: Store,
    client: C,
    config: Config,
}

impl<C: TvPlanClient> App<C> {
    pub fn new(store: Store, client: C, config: Config) -> Self {
        Self {
            store,
            client,
            config,
        }
    }

    /// Refreshes the country list if stale, then fetches channel lists per
    /// country: missing countries first, then oldest-first. The whole keyed
    /// cache is rewritten after every committed key, so an interrupted run
    /// loses at most the in-flight country.
    pub fn fetch_channels(&self, sink: &dyn ProgressSink) -> Result<FetchChannelsResult, TvPlanError> {
        self.store.ensure_data_dir()?;

        let countries_path = self.store.countries_path();
        let (countries, outcome) =
            cache::load_or_refresh(&countries_path, self.config.countries_max_age, || {
                sink.event(ProgressEvent {
                    message: "fetching countries".to_string(),
                    elapsed: None,
                });
                self.client.fetch_countries()
            })?;
        let countries_source = match &outcome {
            CacheOutcome::Fresh { timestamp } => {
                sink.event(ProgressEvent {
                    message: format!("using cached countries (age: {timestamp})"),
                    elapsed: None,
                });
                "cache".to_string()
            }
            CacheOutcome::Refreshed => {
                sink.event(ProgressEvent {
                    message: format!("saved {} countries", countries.len()),
                    elapsed: None,
                });
                "fetched".to_string()
            }
        };

        let channels_path = self.store.channels_path();
        let mut channel_cache: ChannelCache =
            Store::read_json(&channels_path)?.unwrap_or_default();
        sink.event(ProgressEvent {
            message: format!(
                "found existing channel data for {} countries",
                channel_cache.len()
            ),
            elapsed: None,
        });

        let plan = cache::plan_fetch_order(&countries, &channel_cache);
        let mut result = FetchChannelsResult {
            countries: countries.len(),
            countries_source,
            items: Vec::new(),
            rate_limited: false,
        };

        let total = plan.len();
        for (index, (country, last_fetched)) in plan.into_iter().enumerate() {
            let country_name = country.display_name().to_string();
            let tag = match last_fetched {
                None => "[NEW]".to_string(),
                Some(fetched_at) => format!("[UPDATE {}]", fetched_at.to_rfc3339()),
            };
            sink.event(ProgressEvent {
                message: format!("{tag} {country_name} (id {})", country.id),
                elapsed: None,
            });

            match self.client.fetch_channels(&country.id) {
                Ok(channels) => {
                    let count = channels.len();
                    channel_cache.insert(
                        country.id.clone(),
                        Cached {
                            data: channels,
                            timestamp: cache::utc_timestamp(),
                        },
                    );
                    Store::write_json_atomic(&channels_path, &channel_cache)?;
                    sink.event(ProgressEvent {
                        message: format!("saved {count} channels for {country_name}"),
                        elapsed: None,
                    });
                    result.items.push(FetchItemResult {
                        country_id: country.id,
                        country_name,
                        action: "fetched".to_string(),
                        channels: Some(count),
                        error: None,
                    });
                }
                Err(TvPlanError::RateLimited) => {
                    // Stop, resume later: committed keys stay, keys after
                    // this one are untouched and will be retried first.
                    tracing::warn!(country_id = %country.id, "rate limit reached, halting batch");
                    sink.event(ProgressEvent {
                        message: "rate limit reached; run again later to continue".to_string(),
                        elapsed: None,
                    });
                    result.rate_limited = true;
                    break;
                }
                Err(err) => {
                    tracing::warn!(country_id = %country.id, error = %err, "fetch failed, skipping");
                    result.items.push(FetchItemResult {
                        country_id: country.id,
                        country_name,
                        action: "skipped".to_string(),
                        channels: None,
                        error: Some(err.to_string()),
                    });
                }
            }

            // Courtesy pause only, not a correctness mechanism.
            if index + 1 < total && !self.config.fetch_delay.is_zero() {
                std::thread::sleep(self.config.fetch_delay);
            }
        }

        Ok(result)
    }

    /// Joins the two cached datasets into the plugin's settings document.
    /// Requires both cache files to exist; unknown country ids in the
    /// channel cache are reported but never abort the run.
    pub fn generate_options(
        &self,
        sink: &dyn ProgressSink,
    ) -> Result<GenerateOptionsResult, TvPlanError> {
        let countries_path = self.store.countries_path();
        let countries: Cached<Vec<Country>> =
            Store::read_json(&countries_path)?.ok_or(TvPlanError::DataNotFound(countries_path))?;

        let channels_path = self.store.channels_path();
        let channel_cache: ChannelCache =
            Store::read_json(&channels_path)?.ok_or(TvPlanError::DataNotFound(channels_path))?;

        sink.event(ProgressEvent {
            message: format!(
                "loaded {} countries, channel data for {} countries",
                countries.data.len(),
                channel_cache.len()
            ),
            elapsed: None,
        });

        let outcome = options::build_channel_options(&countries.data, &channel_cache);
        for country_id in &outcome.unknown_country_ids {
            tracing::warn!(%country_id, "country id in channel cache not found in countries data");
        }
        sink.event(ProgressEvent {
            message: format!("generated {} channel options", outcome.options.len()),
            elapsed: None,
        });

        let sample = outcome
            .options
            .iter()
            .take(5)
            .map(|option| option.label.clone())
            .collect();
        let channel_count = outcome.options.len();

        let fields = options::build_custom_fields(outcome.options, channel_cache.len());
        let yaml = options::to_yaml(&fields)?;
        let output_path = self.store.options_path();
        Store::write_bytes_atomic(&output_path, yaml.as_bytes())?;
        sink.event(ProgressEvent {
            message: format!("wrote {output_path}"),
            elapsed: None,
        });

        Ok(GenerateOptionsResult {
            countries: countries.data.len(),
            countries_with_channels: channel_cache.len(),
            channel_count,
            unknown_country_ids: outcome.unknown_country_ids,
            output_path: output_path.to_string(),
            sample,
        })
    }

    /// Fetches program listings for the configured test channels and writes
    /// them as stub fixtures, one raw JSON file per channel. Individual
    /// failures are counted and skipped; a rate limit halts the rest.
    pub fn fetch_stub_data(&self, sink: &dyn ProgressSink) -> Result<StubDataResult, TvPlanError> {
        let channel_ids = self.config.test_channel_ids()?;
        self.store.ensure_data_dir()?;

        sink.event(ProgressEvent {
            message: format!(
                "fetching programs for {} test channels: {}",
                channel_ids.len(),
                channel_ids.join(", ")
            ),
            elapsed: None,
        });
        sink.event(ProgressEvent {
            message: format!(
                "saving to {}",
                self.store.data_dir().join("stub").join("channels")
            ),
            elapsed: None,
        });

        let mut result = StubDataResult {
            requested: channel_ids.len(),
            fetched: Vec::new(),
            failed: Vec::new(),
            rate_limited: false,
        };

        let total = channel_ids.len();
        for (index, channel_id) in channel_ids.iter().enumerate() {
            sink.event(ProgressEvent {
                message: format!("[{}/{total}] channel {channel_id}", index + 1),
                elapsed: None,
            });
            match self.client.fetch_programs(channel_id) {
                Ok(programs) => {
                    let path = self.store.stub_channel_path(channel_id);
                    Store::write_json_atomic(&path, &programs)?;
                    sink.event(ProgressEvent {
                        message: format!("saved {path}"),
                        elapsed: None,
                    });
                    result.fetched.push(channel_id.clone());
                }
                Err(TvPlanError::RateLimited) => {
                    tracing::warn!(%channel_id, "rate limit reached, halting batch");
                    result.rate_limited = true;
                    break;
                }
                Err(err) => {
                    tracing::warn!(%channel_id, error = %err, "fetch failed, skipping");
                    result.failed.push(channel_id.clone());
                }
            }

            if index + 1 < total && !self.config.fetch_delay.is_zero() {
                std::thread::sleep(self.config.fetch_delay);
            }
        }

        Ok(result)
    }
}
