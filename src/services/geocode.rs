use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::services::config_loader::GeocodeConfig;

/// Best-effort reverse geocoding. `None` means "use the fallback name".
pub trait PlaceResolver: Send + Sync {
    fn resolve(&self, latitude: f64, longitude: f64) -> impl Future<Output = Option<String>> + Send;
}

#[derive(Debug, Deserialize)]
struct ReverseReply {
    display_name: Option<String>,
}

pub struct NominatimResolver {
    client: Client,
    reverse_url: String,
}

impl NominatimResolver {
    pub fn new(config: &GeocodeConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            reverse_url: config.reverse_url.clone(),
        })
    }

    async fn lookup(&self, latitude: f64, longitude: f64) -> Result<Option<String>, reqwest::Error> {
        let reply: ReverseReply = self
            .client
            .get(&self.reverse_url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(reply.display_name.filter(|name| !name.trim().is_empty()))
    }
}

impl PlaceResolver for NominatimResolver {
    async fn resolve(&self, latitude: f64, longitude: f64) -> Option<String> {
        match self.lookup(latitude, longitude).await {
            Ok(Some(name)) => {
                debug!("Resolved place name: {}", name);
                Some(name)
            }
            Ok(None) => {
                warn!("Reverse geocoding returned no display name");
                None
            }
            Err(err) => {
                warn!("Reverse geocoding failed: {}", err);
                None
            }
        }
    }
}

pub async fn resolve_or_fallback<R: PlaceResolver>(
    resolver: &R,
    latitude: f64,
    longitude: f64,
    fallback: &str,
) -> String {
    resolver
        .resolve(latitude, longitude)
        .await
        .unwrap_or_else(|| fallback.to_string())
}
