use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_ENV_VAR: &str = "ROLLCALL_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "rollcall.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Attendance REST endpoint. The web build reached it through a
    /// reverse-proxy path; here the backend URL is configured directly.
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            username: String::new(),
            password: String::new(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeConfig {
    #[serde(default = "default_reverse_url")]
    pub reverse_url: String,
    #[serde(default = "default_fallback_name")]
    pub fallback_name: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            reverse_url: default_reverse_url(),
            fallback_name: default_fallback_name(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationMode {
    #[default]
    Fixed,
    Ip,
    Disabled,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub mode: LocationMode,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default = "default_ip_lookup_url")]
    pub ip_lookup_url: String,
    #[serde(default = "default_location_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            mode: LocationMode::default(),
            latitude: None,
            longitude: None,
            ip_lookup_url: default_ip_lookup_url(),
            timeout_seconds: default_location_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    #[serde(default = "default_token_digits")]
    pub digits: u32,
    #[serde(default)]
    pub prefix: Option<String>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            digits: default_token_digits(),
            prefix: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RollcallConfig {
    /// Folder holding `store.json` (submission log, validation cache, device id).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub geocode: GeocodeConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub token: TokenConfig,
}

impl Default for RollcallConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            remote: RemoteConfig::default(),
            geocode: GeocodeConfig::default(),
            location: LocationConfig::default(),
            token: TokenConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".rollcall")
}

fn default_endpoint_url() -> String {
    "https://localhost:8100/sap/bc/rest/rest_webevent?sap-client=400".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    20
}

fn default_reverse_url() -> String {
    "https://nominatim.openstreetmap.org/reverse".to_string()
}

fn default_fallback_name() -> String {
    "Location unavailable".to_string()
}

fn default_user_agent() -> String {
    format!("rollcall/{}", env!("CARGO_PKG_VERSION"))
}

fn default_ip_lookup_url() -> String {
    "https://ipapi.co/json/".to_string()
}

fn default_location_timeout_seconds() -> u64 {
    15
}

fn default_token_digits() -> u32 {
    6
}

/// Resolves the config path from `ROLLCALL_CONFIG`, falling back to
/// `rollcall.toml` in the working directory.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

pub fn load_rollcall_config(config_path: &Path) -> Result<RollcallConfig, String> {
    if !config_path.exists() {
        info!(
            "{} not found, using defaults",
            config_path.display()
        );
        return Ok(RollcallConfig::default());
    }

    let raw = fs::read_to_string(config_path).map_err(|err| {
        format!(
            "Failed to read config at {}: {}",
            config_path.display(),
            err
        )
    })?;

    let config = toml::from_str::<RollcallConfig>(&raw).map_err(|err| {
        format!(
            "Failed to parse config at {}: {}",
            config_path.display(),
            err
        )
    })?;

    if !(5..=6).contains(&config.token.digits) {
        return Err(format!(
            "token.digits must be 5 or 6, got {}",
            config.token.digits
        ));
    }

    Ok(config)
}
