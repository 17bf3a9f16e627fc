use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::TvPlanError;

/// On-disk layout of the data directory. Every file here has exactly one
/// writer at a time by operational convention.
#[derive(Debug, Clone)]
pub struct Store {
    data_dir: Utf8PathBuf,
}

impl Store {
    pub fn new(config: &Config) -> Result<Self, TvPlanError> {
        if let Some(dir) = &config.data_dir {
            return Ok(Self::new_with_root(dir.clone()));
        }
        let cwd = std::env::current_dir().map_err(|err| TvPlanError::Filesystem(err.to_string()))?;
        let data_dir = Utf8PathBuf::from_path_buf(cwd.join("data"))
            .map_err(|_| TvPlanError::Filesystem("invalid data directory path".to_string()))?;
        Ok(Self::new_with_root(data_dir))
    }

    pub fn new_with_root(data_dir: Utf8PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Utf8Path {
        &self.data_dir
    }

    pub fn countries_path(&self) -> Utf8PathBuf {
        self.data_dir.join("countries.json")
    }

    pub fn channels_path(&self) -> Utf8PathBuf {
        self.data_dir.join("channels.json")
    }

    pub fn options_path(&self) -> Utf8PathBuf {
        self.data_dir.join("options.yml")
    }

    pub fn stub_channel_path(&self, channel_id: &str) -> Utf8PathBuf {
        self.data_dir
            .join("stub")
            .join("channels")
            .join(format!("{channel_id}.json"))
    }

    pub fn ensure_data_dir(&self) -> Result<(), TvPlanError> {
        fs::create_dir_all(self.data_dir.as_std_path())
            .map_err(|err| TvPlanError::Filesystem(err.to_string()))
    }

    /// Reads and parses a JSON file; `Ok(None)` when the file does not exist.
    /// A file that exists but does not parse is a hard error, never silently
    /// treated as empty.
    pub fn read_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<Option<T>, TvPlanError> {
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| TvPlanError::Filesystem(err.to_string()))?;
        let value = serde_json::from_str(&content).map_err(|err| TvPlanError::CacheParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Ok(Some(value))
    }

    /// Writes JSON through a temp file and rename, so a crash mid-write never
    /// leaves a truncated cache behind.
    pub fn write_json_atomic<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), TvPlanError> {
        let content = serde_json::to_vec_pretty(value)
            .map_err(|err| TvPlanError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(path, &content)
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), TvPlanError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| TvPlanError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("tmp");
        fs::write(tmp_path.as_std_path(), content)
            .map_err(|err| TvPlanError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| TvPlanError::Filesystem(err.to_string()))?;
        Ok(())
    }
}
