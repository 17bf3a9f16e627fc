use std::time::Duration;

use camino::Utf8PathBuf;

use crate::error::TvPlanError;

pub const COUNTRIES_MAX_AGE_DAYS: i64 = 7;
pub const DEFAULT_BASE_URL: &str = "https://tv-plan.org/api-v1.php";
pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_millis(500);

/// Runtime configuration, built once at startup from the environment and
/// passed down explicitly. Business logic never reads the environment.
/// Reading never fails; each command demands what it needs through the
/// accessors before any work begins.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub data_dir: Option<Utf8PathBuf>,
    pub countries_max_age: chrono::Duration,
    pub fetch_delay: Duration,
    api_key: Option<String>,
    test_channel_ids: Option<Vec<String>>,
}

impl Config {
    pub fn from_env() -> Self {
        let api_key = non_empty_var("API_KEY");
        let base_url = non_empty_var("TVPLAN_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let data_dir = non_empty_var("TVPLAN_DATA_DIR").map(Utf8PathBuf::from);
        let test_channel_ids = non_empty_var("TEST_CHANNEL_IDS").map(|raw| parse_id_list(&raw));

        Self {
            base_url,
            data_dir,
            countries_max_age: chrono::Duration::days(COUNTRIES_MAX_AGE_DAYS),
            fetch_delay: DEFAULT_FETCH_DELAY,
            api_key,
            test_channel_ids,
        }
    }

    pub fn new(api_key: Option<String>, test_channel_ids: Option<Vec<String>>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: None,
            countries_max_age: chrono::Duration::days(COUNTRIES_MAX_AGE_DAYS),
            fetch_delay: DEFAULT_FETCH_DELAY,
            api_key,
            test_channel_ids,
        }
    }

    /// Required by the commands that talk to the API; `options` never
    /// touches it.
    pub fn api_key(&self) -> Result<&str, TvPlanError> {
        self.api_key.as_deref().ok_or(TvPlanError::MissingApiKey)
    }

    /// Required by the stub-data command only; `fetch` and `options` never
    /// touch the test ids.
    pub fn test_channel_ids(&self) -> Result<&[String], TvPlanError> {
        let ids = self
            .test_channel_ids
            .as_deref()
            .ok_or(TvPlanError::MissingTestChannelIds)?;
        if ids.is_empty() {
            return Err(TvPlanError::EmptyTestChannelIds);
        }
        Ok(ids)
    }
}

pub fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
