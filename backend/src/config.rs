use std::path::PathBuf;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_API_KEY: &str = "dev-secret-key";
const DEFAULT_DATA_DIR: &str = "data";

/// Runtime configuration, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    /// `BACKEND_ADDR`: listen address.
    pub addr: String,
    /// `API_KEY`: the issuance authority's shared secret (sent as `X-API-KEY`).
    pub api_key: String,
    /// `DATA_DIR`: where the SQLite event log lives.
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let api_key = match std::env::var("API_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ => {
                tracing::warn!("API_KEY not set, falling back to the development key");
                DEFAULT_API_KEY.to_string()
            }
        };

        Self {
            addr: std::env::var("BACKEND_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string()),
            api_key,
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR)),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("ledger.sqlite")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}
