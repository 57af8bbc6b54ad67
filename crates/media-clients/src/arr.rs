//! Download-client enable/disable for the PVR suite.
//!
//! Sonarr, Radarr, and Lidarr expose the same `downloadclient` resource,
//! differing only in API path version (v3 for Sonarr/Radarr, v1 for
//! Lidarr), so a single client covers all three.

use crate::error::{ClientError, Result};
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info};

pub struct ArrClient {
    service: &'static str,
    base_url: String,
    api_key: String,
    api_version: u8,
    http: Client,
}

impl ArrClient {
    pub fn sonarr(url: &str, api_key: &str) -> Result<Self> {
        Self::new("Sonarr", url, api_key, 3)
    }

    pub fn radarr(url: &str, api_key: &str) -> Result<Self> {
        Self::new("Radarr", url, api_key, 3)
    }

    pub fn lidarr(url: &str, api_key: &str) -> Result<Self> {
        Self::new("Lidarr", url, api_key, 1)
    }

    fn new(service: &'static str, url: &str, api_key: &str, api_version: u8) -> Result<Self> {
        Ok(Self {
            service,
            base_url: url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_version,
            http: Client::builder().timeout(Duration::from_secs(10)).build()?,
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    fn clients_url(&self) -> String {
        format!("{}/api/v{}/downloadclient", self.base_url, self.api_version)
    }

    /// All configured download clients, as raw JSON so the full object can
    /// be echoed back on update.
    pub fn download_clients(&self) -> Result<Vec<Value>> {
        let resp = self
            .http
            .get(self.clients_url())
            .header("X-Api-Key", &self.api_key)
            .send()?;
        if !resp.status().is_success() {
            return Err(ClientError::Api {
                service: self.service,
                status: resp.status().as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }
        Ok(resp.json()?)
    }

    /// Flip every download client to `enable`. The PUT payload is the full
    /// client object with only the `enable` field changed, since the API
    /// replaces the resource wholesale. Clients already in the desired
    /// state are skipped; per-client update failures are logged and do not
    /// stop the remaining updates.
    pub fn set_download_clients_enabled(&self, enable: bool) -> Result<()> {
        let verb = if enable { "enabling" } else { "disabling" };
        info!("{verb} {} download clients", self.service);

        for client in self.download_clients()? {
            let Some(id) = client.get("id").and_then(Value::as_i64) else {
                error!("{}: download client without an id, skipping", self.service);
                continue;
            };
            let name = client
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("<unnamed>")
                .to_string();

            if client.get("enable").and_then(Value::as_bool) == Some(enable) {
                info!(
                    "download client {name} is already {}",
                    if enable { "enabled" } else { "disabled" }
                );
                continue;
            }

            let mut payload = client.clone();
            payload["enable"] = Value::Bool(enable);

            let resp = self
                .http
                .put(format!("{}/{id}", self.clients_url()))
                .header("X-Api-Key", &self.api_key)
                .json(&payload)
                .send()?;
            if resp.status().is_success() {
                info!(
                    "{} download client: {name}",
                    if enable { "enabled" } else { "disabled" }
                );
            } else {
                error!(
                    "failed to update {name}: {} {}",
                    resp.status().as_u16(),
                    resp.text().unwrap_or_default()
                );
            }
        }
        Ok(())
    }
}
