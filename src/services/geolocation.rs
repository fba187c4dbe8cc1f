use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::LocationFix;
use crate::services::config_loader::{LocationConfig, LocationMode};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location access denied. Please allow location access to continue.")]
    PermissionDenied,
    #[error("Location is unavailable: {0}")]
    Unavailable(String),
    #[error("Timed out while acquiring location")]
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest acceptable cached fix. Zero means always take a fresh one.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(15),
            maximum_age: Duration::ZERO,
        }
    }
}

impl From<&LocationConfig> for PositionOptions {
    fn from(config: &LocationConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_seconds),
            ..Self::default()
        }
    }
}

pub trait LocationProvider: Send + Sync {
    fn current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<LocationFix, LocationError>> + Send;
}

/// Runs the provider under `options.timeout`.
pub async fn acquire_position<P: LocationProvider>(
    provider: &P,
    options: &PositionOptions,
) -> Result<LocationFix, LocationError> {
    debug!(
        "Requesting position: high_accuracy={}, maximum_age={:?}, timeout={:?}",
        options.high_accuracy, options.maximum_age, options.timeout
    );
    match tokio::time::timeout(options.timeout, provider.current_position(options)).await {
        Ok(Ok(fix)) => {
            info!("Location fix acquired: {:.4}, {:.4}", fix.latitude, fix.longitude);
            Ok(fix)
        }
        Ok(Err(err)) => {
            warn!("Location request failed: {}", err);
            Err(err)
        }
        Err(_) => {
            warn!("Location request timed out after {:?}", options.timeout);
            Err(LocationError::Timeout)
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpLookupReply {
    latitude: Option<f64>,
    longitude: Option<f64>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl IpLookupReply {
    fn coordinates(&self) -> Option<(f64, f64)> {
        let latitude = self.latitude.or(self.lat)?;
        let longitude = self.longitude.or(self.lon)?;
        Some((latitude, longitude))
    }
}

/// Location source chosen by `[location] mode` in the config.
pub enum ConfiguredLocationProvider {
    Fixed { latitude: f64, longitude: f64 },
    Ip { client: Client, lookup_url: String },
    Unconfigured,
    Disabled,
}

impl ConfiguredLocationProvider {
    pub fn from_config(config: &LocationConfig) -> Self {
        match config.mode {
            LocationMode::Fixed => match (config.latitude, config.longitude) {
                (Some(latitude), Some(longitude)) => Self::Fixed { latitude, longitude },
                _ => {
                    warn!(
                        "location.mode = fixed but coordinates are missing; submissions will fail \
                         until [location] is set (see rollcall.example.toml)"
                    );
                    Self::Unconfigured
                }
            },
            LocationMode::Ip => Self::Ip {
                client: Client::new(),
                lookup_url: config.ip_lookup_url.clone(),
            },
            LocationMode::Disabled => Self::Disabled,
        }
    }
}

impl LocationProvider for ConfiguredLocationProvider {
    async fn current_position(&self, _options: &PositionOptions) -> Result<LocationFix, LocationError> {
        match self {
            Self::Fixed {
                latitude,
                longitude,
            } => Ok(LocationFix::new(*latitude, *longitude)),
            Self::Ip { client, lookup_url } => {
                let response = client
                    .get(lookup_url)
                    .send()
                    .await
                    .map_err(|err| LocationError::Unavailable(err.to_string()))?;
                if !response.status().is_success() {
                    return Err(LocationError::Unavailable(format!(
                        "lookup returned HTTP {}",
                        response.status()
                    )));
                }
                let reply: IpLookupReply = response
                    .json()
                    .await
                    .map_err(|err| LocationError::Unavailable(err.to_string()))?;
                let (latitude, longitude) = reply.coordinates().ok_or_else(|| {
                    LocationError::Unavailable("lookup reply has no coordinates".to_string())
                })?;
                Ok(LocationFix::new(latitude, longitude))
            }
            Self::Unconfigured => Err(LocationError::Unavailable(
                "no coordinates configured".to_string(),
            )),
            Self::Disabled => Err(LocationError::PermissionDenied),
        }
    }
}
