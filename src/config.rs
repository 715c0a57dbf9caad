use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::util::log::DATA_FOLDER;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAGE_SIZE: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "keyring" => Ok(StorageBackend::Keyring),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub with_credentials: bool,
    pub storage: StorageBackend,
    pub data_dir: PathBuf,
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            with_credentials: true,
            storage: StorageBackend::default(),
            data_dir: DATA_FOLDER.clone(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn load() -> Self {
        let defaults = Self::default();

        Self {
            base_url: normalize_base_url(&try_load(
                "STREAMCAT_API_URL",
                defaults.base_url,
            )),
            timeout: Duration::from_secs(try_load(
                "STREAMCAT_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )),
            with_credentials: defaults.with_credentials,
            storage: try_load("STREAMCAT_STORAGE", defaults.storage),
            data_dir: defaults.data_dir,
            page_size: try_load("STREAMCAT_PAGE_SIZE", DEFAULT_PAGE_SIZE).max(1),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    pub fn with_storage(mut self, storage: StorageBackend) -> Self {
        self.storage = storage;
        self
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value '{raw}': {e}, using default: {default:?}");
            default
        }),
        _ => {
            info!("{key} not set, using default: {default:?}");
            default
        }
    }
}
