use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TvPlanError {
    #[error("API_KEY not set in the environment")]
    MissingApiKey,

    #[error("TEST_CHANNEL_IDS not set in the environment")]
    MissingTestChannelIds,

    #[error("TEST_CHANNEL_IDS contains no channel ids")]
    EmptyTestChannelIds,

    #[error("TV-Plan request failed: {0}")]
    ApiHttp(String),

    #[error("TV-Plan returned status {status}: {message}")]
    ApiStatus { status: u16, message: String },

    #[error("TV-Plan rate limit reached; run again later to continue")]
    RateLimited,

    #[error("failed to parse cache file {path}: {message}")]
    CacheParse { path: Utf8PathBuf, message: String },

    #[error("required data file missing: {0} (run `tvplan-data fetch` first)")]
    DataNotFound(Utf8PathBuf),

    #[error("failed to serialize options document: {0}")]
    YamlEmit(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
