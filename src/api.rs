use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::config::Config;
use crate::domain::{Channel, Country};
use crate::error::TvPlanError;

/// The TV-Plan API, as the rest of the crate sees it: an opaque fetch keyed
/// by resource type. Only the transport knows about URLs and status codes; a
/// rate limit surfaces as the dedicated `RateLimited` error, never as text
/// to be matched.
pub trait TvPlanClient: Send + Sync {
    fn fetch_countries(&self) -> Result<Vec<Country>, TvPlanError>;
    fn fetch_channels(&self, country_id: &str) -> Result<Vec<Channel>, TvPlanError>;
    fn fetch_programs(&self, channel_id: &str) -> Result<Value, TvPlanError>;
}

#[derive(Clone)]
pub struct TvPlanHttpClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TvPlanHttpClient {
    pub fn new(config: &Config) -> Result<Self, TvPlanError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("tvplan-data/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| TvPlanError::ApiHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| TvPlanError::ApiHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key()?.to_string(),
        })
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        id_param: Option<(&str, &str)>,
    ) -> Result<T, TvPlanError> {
        let mut request = self.client.get(&self.base_url).query(&[
            ("apitoken", self.api_key.as_str()),
            ("resource", resource),
        ]);
        if let Some((name, value)) = id_param {
            request = request.query(&[(name, value)]);
        }

        // One shot, no retries: the caller decides whether a failure skips
        // a key or halts the batch, and re-invocation is the retry path.
        let response = request
            .send()
            .map_err(|err| TvPlanError::ApiHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| TvPlanError::ApiHttp(err.to_string()))
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, TvPlanError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TvPlanError::RateLimited);
        }
        let message = response
            .text()
            .unwrap_or_else(|_| "TV-Plan request failed".to_string());
        Err(TvPlanError::ApiStatus {
            status: status.as_u16(),
            message,
        })
    }
}

impl TvPlanClient for TvPlanHttpClient {
    fn fetch_countries(&self) -> Result<Vec<Country>, TvPlanError> {
        self.get_json("countries", None)
    }

    fn fetch_channels(&self, country_id: &str) -> Result<Vec<Channel>, TvPlanError> {
        self.get_json("channelsOfCountry", Some(("countryId", country_id)))
    }

    fn fetch_programs(&self, channel_id: &str) -> Result<Value, TvPlanError> {
        self.get_json("programsOfChannel", Some(("channelId", channel_id)))
    }
}
