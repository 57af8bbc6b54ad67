//! Plex server client: connection probing and the butler maintenance
//! window.

use crate::error::{ClientError, Result};
use chrono::NaiveTime;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

/// Plex's scheduled maintenance window as whole-hour times of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButlerWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug)]
pub struct PlexClient {
    http: Client,
    base_url: String,
    token: String,
}

impl PlexClient {
    /// Connect to the Plex server, probing `/identity` with a bounded
    /// number of retries and a fixed delay between attempts. Exhaustion is
    /// an error the caller treats as fatal.
    pub fn connect(url: &str, token: &str, retries: u32, delay: Duration) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        let client = Self {
            http,
            base_url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        };

        let mut last = String::new();
        for attempt in 1..=retries {
            info!("attempting to connect to Plex server (attempt {attempt}/{retries})");
            match client.identity() {
                Ok(()) => {
                    info!("connected to Plex server at {}", client.base_url);
                    return Ok(client);
                }
                Err(e) => {
                    warn!("failed to connect to Plex server: {e}");
                    last = e.to_string();
                    if attempt < retries {
                        info!("retrying in {} seconds", delay.as_secs());
                        std::thread::sleep(delay);
                    }
                }
            }
        }
        Err(ClientError::ConnectFailed {
            url: client.base_url,
            attempts: retries,
            last,
        })
    }

    fn identity(&self) -> Result<()> {
        let resp = self
            .http
            .get(format!("{}/identity", self.base_url))
            .header("X-Plex-Token", &self.token)
            .header("Accept", "application/json")
            .send()?;
        if !resp.status().is_success() {
            return Err(ClientError::Api {
                service: "Plex",
                status: resp.status().as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// The server's butler maintenance window from its preference store.
    pub fn butler_window(&self) -> Result<ButlerWindow> {
        let resp = self
            .http
            .get(format!("{}/:/prefs", self.base_url))
            .header("X-Plex-Token", &self.token)
            .header("Accept", "application/json")
            .send()?;
        if !resp.status().is_success() {
            return Err(ClientError::Api {
                service: "Plex",
                status: resp.status().as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }
        let prefs: PrefsResponse = resp.json()?;

        let start = prefs.hour_setting("butlerStartHour")?;
        let end = prefs.hour_setting("butlerEndHour")?;
        let window = ButlerWindow {
            start: hour_to_time(start)?,
            end: hour_to_time(end)?,
        };
        info!(
            "scheduled maintenance: {:02}:00 to {:02}:00",
            start, end
        );
        Ok(window)
    }
}

fn hour_to_time(hour: u32) -> Result<NaiveTime> {
    NaiveTime::from_hms_opt(hour, 0, 0).ok_or(ClientError::Unexpected {
        service: "Plex",
        reason: format!("butler hour {hour} out of range"),
    })
}

// ---------------------------------------------------------------------------
// Preference payload
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PrefsResponse {
    #[serde(rename = "MediaContainer")]
    container: PrefsContainer,
}

#[derive(Debug, Deserialize)]
struct PrefsContainer {
    #[serde(rename = "Setting", default)]
    settings: Vec<Setting>,
}

#[derive(Debug, Deserialize)]
struct Setting {
    id: String,
    #[serde(default)]
    value: serde_json::Value,
}

impl PrefsResponse {
    /// Look up a named setting and coerce its value to an hour. Plex
    /// serializes preference values as either numbers or strings.
    fn hour_setting(&self, id: &str) -> Result<u32> {
        let setting = self
            .container
            .settings
            .iter()
            .find(|s| s.id == id)
            .ok_or(ClientError::Unexpected {
                service: "Plex",
                reason: format!("setting '{id}' not present in preferences"),
            })?;
        setting
            .value
            .as_u64()
            .map(|v| v as u32)
            .or_else(|| setting.value.as_str().and_then(|s| s.trim().parse().ok()))
            .ok_or(ClientError::Unexpected {
                service: "Plex",
                reason: format!("setting '{id}' has a non-numeric value"),
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
