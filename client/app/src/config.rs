use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr, time::Duration};

use catalog::remote::{ApiConfig, DEFAULT_API_URL};
use tracing::{debug, info, warn};

use crate::{error::AppError, search::SearchSettings};

pub struct Config {
    pub api: ApiConfig,
    pub search: SearchSettings,
    pub export_dir: PathBuf,
    pub firebase_api_key: Option<String>,
}

/// Command line flags, applied on top of the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub debounce_ms: Option<u64>,
    pub min_query_len: Option<usize>,
    pub export_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        Ok(Self {
            api: ApiConfig {
                base_url: try_load("NUTRIVAULT_API_URL", DEFAULT_API_URL)?,
                timeout: Duration::from_secs(try_load("NUTRIVAULT_TIMEOUT_SECS", "10")?),
            },
            search: SearchSettings {
                debounce: Duration::from_millis(try_load("NUTRIVAULT_DEBOUNCE_MS", "1000")?),
                min_query_len: try_load("NUTRIVAULT_MIN_QUERY_LEN", "3")?,
            },
            export_dir: try_load("NUTRIVAULT_EXPORT_DIR", ".")?,
            firebase_api_key: read_secret("FIREBASE_API_KEY"),
        })
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self, AppError> {
        if let Some(api_url) = overrides.api_url {
            self.api.base_url = api_url;
        }

        if let Some(debounce_ms) = overrides.debounce_ms {
            self.search.debounce = Duration::from_millis(debounce_ms);
        }

        if let Some(min_query_len) = overrides.min_query_len {
            self.search.min_query_len = min_query_len;
        }

        if let Some(export_dir) = overrides.export_dir {
            self.export_dir = export_dir;
        }

        if self.search.min_query_len == 0 {
            return Err(AppError::Config(
                "minimum query length must be at least 1".to_string(),
            ));
        }

        Ok(self)
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        debug!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, AppError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            AppError::Config(format!("{key}: {e}"))
        })
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            debug!("Failed to read {secret_name} from file: {e}");
        })
        .or_else(|_| var(secret_name))
        .ok()
        .filter(|secret| !secret.is_empty())
        .or_else(|| {
            warn!("{secret_name} not provided, sign in is disabled");
            None
        })
}
