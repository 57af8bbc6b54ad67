//! Pause/resume for the three supported download clients.

use crate::error::{ClientError, Result};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::info;

fn http_client(cookies: bool) -> Result<Client> {
    Ok(Client::builder()
        .cookie_store(cookies)
        .timeout(Duration::from_secs(10))
        .build()?)
}

// ---------------------------------------------------------------------------
// qBittorrent
// ---------------------------------------------------------------------------

/// qBittorrent WebUI client. Authentication is cookie-based: a login call
/// precedes each pause/resume so a restarted qBittorrent never leaves the
/// client holding a stale session.
pub struct QbitClient {
    base_url: String,
    username: String,
    password: String,
    http: Client,
}

impl QbitClient {
    pub fn new(url: &str, username: &str, password: &str) -> Result<Self> {
        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            http: http_client(true)?,
        })
    }

    fn login(&self) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/api/v2/auth/login", self.base_url))
            .form(&[("username", &self.username), ("password", &self.password)])
            .send()?;
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        if !status.is_success() || body.trim() == "Fails." {
            return Err(ClientError::Api {
                service: "qBittorrent",
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    fn torrents(&self, op: &str) -> Result<()> {
        self.login()?;
        let resp = self
            .http
            .post(format!("{}/api/v2/torrents/{op}", self.base_url))
            .form(&[("hashes", "all")])
            .send()?;
        if !resp.status().is_success() {
            return Err(ClientError::Api {
                service: "qBittorrent",
                status: resp.status().as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Pause every torrent.
    pub fn pause_all(&self) -> Result<()> {
        info!("pausing qBittorrent downloads");
        self.torrents("pause")
    }

    /// Resume every torrent.
    pub fn resume_all(&self) -> Result<()> {
        info!("resuming qBittorrent downloads");
        self.torrents("resume")
    }
}

// ---------------------------------------------------------------------------
// SABnzbd
// ---------------------------------------------------------------------------

pub struct SabnzbdClient {
    base_url: String,
    api_key: String,
    http: Client,
}

impl SabnzbdClient {
    pub fn new(url: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http: http_client(false)?,
        })
    }

    fn api(&self, mode: &str) -> Result<()> {
        let resp = self
            .http
            .get(format!("{}/api", self.base_url))
            .query(&[("mode", mode), ("apikey", &self.api_key)])
            .send()?;
        if !resp.status().is_success() {
            return Err(ClientError::Api {
                service: "SABnzbd",
                status: resp.status().as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        info!("pausing SABnzbd downloads");
        self.api("pause")
    }

    pub fn resume(&self) -> Result<()> {
        info!("resuming SABnzbd downloads");
        self.api("resume")
    }
}

// ---------------------------------------------------------------------------
// NZBGet
// ---------------------------------------------------------------------------

pub struct NzbgetClient {
    base_url: String,
    username: String,
    password: String,
    http: Client,
}

impl NzbgetClient {
    pub fn new(url: &str, username: &str, password: &str) -> Result<Self> {
        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            http: http_client(false)?,
        })
    }

    fn rpc(&self, method: &str) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/jsonrpc", self.base_url))
            .basic_auth(&self.username, Some(&self.password))
            .json(&serde_json::json!({ "method": method }))
            .send()?;
        if !resp.status().is_success() {
            return Err(ClientError::Api {
                service: "NZBGet",
                status: resp.status().as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        info!("pausing NZBGet downloads");
        self.rpc("pausedownload")
    }

    pub fn resume(&self) -> Result<()> {
        info!("resuming NZBGet downloads");
        self.rpc("resumedownload")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn qbit_logs_in_before_pausing() {
        let mut server = mockito::Server::new();
        let login = server
            .mock("POST", "/api/v2/auth/login")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("username".into(), "admin".into()),
                Matcher::UrlEncoded("password".into(), "secret".into()),
            ]))
            .with_status(200)
            .with_body("Ok.")
            .create();
        let pause = server
            .mock("POST", "/api/v2/torrents/pause")
            .match_body(Matcher::UrlEncoded("hashes".into(), "all".into()))
            .with_status(200)
            .create();

        let client = QbitClient::new(&server.url(), "admin", "secret").unwrap();
        client.pause_all().unwrap();
        login.assert();
        pause.assert();
    }

    #[test]
    fn qbit_rejected_login_is_an_error() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/api/v2/auth/login")
            .with_status(200)
            .with_body("Fails.")
            .create();

        let client = QbitClient::new(&server.url(), "admin", "wrong").unwrap();
        let err = client.resume_all().unwrap_err();
        assert!(matches!(err, ClientError::Api { .. }));
    }

    #[test]
    fn sabnzbd_resume_sends_mode_and_key() {
        let mut server = mockito::Server::new();
        let resume = server
            .mock("GET", "/api")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("mode".into(), "resume".into()),
                Matcher::UrlEncoded("apikey".into(), "k".into()),
            ]))
            .with_status(200)
            .with_body("{\"status\": true}")
            .create();

        let client = SabnzbdClient::new(&server.url(), "k").unwrap();
        client.resume().unwrap();
        resume.assert();
    }

    #[test]
    fn nzbget_pause_is_a_jsonrpc_call() {
        let mut server = mockito::Server::new();
        let pause = server
            .mock("POST", "/jsonrpc")
            .match_body(Matcher::PartialJson(
                serde_json::json!({"method": "pausedownload"}),
            ))
            .with_status(200)
            .with_body("{\"result\": true}")
            .create();

        let client = NzbgetClient::new(&server.url(), "nzbget", "pw").unwrap();
        client.pause().unwrap();
        pause.assert();
    }

    #[test]
    fn http_failure_maps_to_api_error() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/api")
            .match_query(Matcher::Any)
            .with_status(500)
            .create();

        let client = SabnzbdClient::new(&server.url(), "k").unwrap();
        let err = client.pause().unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 500, .. }));
    }
}
