use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use crate::errors::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_SERVICE_ACCOUNT_PATH: &str = "service_account.json";
pub const DEFAULT_ECB_BASE_URL: &str = "https://sdw-wsrest.ecb.europa.eu/service/data/EXR";
pub const DEFAULT_PORT: u16 = 8080;

const LOCAL_SCRATCH_ROOT: &str = "temp";

/// Process-level configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub config_path: PathBuf,
    pub service_account_path: PathBuf,
    pub scratch_root: Option<PathBuf>,
    pub ecb_base_url: String,
    pub port: u16,
}

impl AppConfig {
    pub fn load(config_override: Option<PathBuf>) -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::from_lookup(|key| env::var(key).ok());
        if let Some(path) = config_override {
            config.config_path = path;
        }
        config
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        AppConfig {
            config_path: lookup("EXCHANGE_RATES_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
            service_account_path: lookup("SERVICE_ACCOUNT_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SERVICE_ACCOUNT_PATH)),
            scratch_root: lookup("SCRATCH_DIR").map(PathBuf::from),
            ecb_base_url: lookup("ECB_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ECB_BASE_URL.to_string()),
            port,
        }
    }
}

/// Run settings from `config.json`. Reloaded for every invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub use_locally: bool,
    pub currencies: Vec<String>,
    pub gcp_project_id: String,
    pub target_email_address: String,
    pub sender_email_address: String,
    pub sender_email_smtp_address: String,
    #[serde(deserialize_with = "port_from_number_or_string")]
    pub sender_email_smtp_port: u16,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
            .map_err(|e| AppError::Config(format!("Invalid settings in {}: {}", path.display(), e)))
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Local runs keep scratch files under `temp/`, hosted runs use the platform temp dir.
    pub fn scratch_root(&self, configured: Option<&Path>) -> PathBuf {
        match configured {
            Some(root) => root.to_path_buf(),
            None if self.use_locally => PathBuf::from(LOCAL_SCRATCH_ROOT),
            None => env::temp_dir(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

fn port_from_number_or_string<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    match PortValue::deserialize(deserializer)? {
        PortValue::Number(port) => Ok(port),
        PortValue::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid SMTP port '{}'", text))),
    }
}
