//! Adapters between the core orchestrator seams and the real HTTP clients.

use crate::settings::Settings;
use media_clients::{ArrClient, NzbgetClient, PlexClient, QbitClient, SabnzbdClient};
use plexorc_core::error::{OrcError, Result};
use plexorc_core::executor::ActionDispatcher;
use plexorc_core::oracle::Window;
use plexorc_core::orchestrator::{Integration, ScheduleSource};
use plexorc_core::tasklist::ActionKind;
use std::sync::Arc;
use tracing::info;

fn integration_err(e: media_clients::ClientError) -> OrcError {
    OrcError::Integration(e.to_string())
}

// ---------------------------------------------------------------------------
// Schedule source
// ---------------------------------------------------------------------------

/// Plex's butler window as the live maintenance schedule.
pub struct PlexScheduleSource {
    pub client: PlexClient,
}

impl ScheduleSource for PlexScheduleSource {
    fn maintenance_window(&self) -> Result<Window> {
        let window = self
            .client
            .butler_window()
            .map_err(|e| OrcError::Schedule(e.to_string()))?;
        Ok(Window {
            start: window.start,
            end: window.end,
        })
    }
}

// ---------------------------------------------------------------------------
// Client bundle
// ---------------------------------------------------------------------------

/// Every integration client the actions and shutdown cleanup can reach.
/// The arr clients are optional: they exist only when their URL and API key
/// are configured.
pub struct Clients {
    pub sonarr: Option<ArrClient>,
    pub radarr: Option<ArrClient>,
    pub lidarr: Option<ArrClient>,
    pub qbittorrent: QbitClient,
    pub sabnzbd: SabnzbdClient,
    pub nzbget: NzbgetClient,
}

impl Clients {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let arr = |cfg: &Option<crate::settings::ArrSettings>,
                   build: fn(&str, &str) -> media_clients::Result<ArrClient>|
         -> anyhow::Result<Option<ArrClient>> {
            match cfg {
                Some(s) => Ok(Some(build(&s.url, &s.api_key)?)),
                None => Ok(None),
            }
        };
        Ok(Self {
            sonarr: arr(&settings.sonarr, ArrClient::sonarr)?,
            radarr: arr(&settings.radarr, ArrClient::radarr)?,
            lidarr: arr(&settings.lidarr, ArrClient::lidarr)?,
            qbittorrent: QbitClient::new(
                &settings.qbittorrent_url,
                &settings.qbittorrent_username,
                &settings.qbittorrent_password,
            )?,
            sabnzbd: SabnzbdClient::new(&settings.sabnzbd_url, &settings.sabnzbd_api_key)?,
            nzbget: NzbgetClient::new(
                &settings.nzbget_url,
                &settings.nzbget_username,
                &settings.nzbget_password,
            )?,
        })
    }

    fn arr(&self, which: &'static str) -> Result<&ArrClient> {
        let client = match which {
            "Sonarr" => &self.sonarr,
            "Radarr" => &self.radarr,
            _ => &self.lidarr,
        };
        client
            .as_ref()
            .ok_or_else(|| OrcError::Integration(format!("{which} is not configured")))
    }
}

// ---------------------------------------------------------------------------
// Action dispatch
// ---------------------------------------------------------------------------

/// Static dispatch table from validated action names to client calls.
pub struct ClientActionDispatcher {
    pub clients: Arc<Clients>,
}

impl ActionDispatcher for ClientActionDispatcher {
    fn run(&self, action: ActionKind) -> Result<()> {
        let c = &self.clients;
        match action {
            ActionKind::DisableSonarrClients => c
                .arr("Sonarr")?
                .set_download_clients_enabled(false)
                .map_err(integration_err),
            ActionKind::EnableSonarrClients => c
                .arr("Sonarr")?
                .set_download_clients_enabled(true)
                .map_err(integration_err),
            ActionKind::DisableRadarrClients => c
                .arr("Radarr")?
                .set_download_clients_enabled(false)
                .map_err(integration_err),
            ActionKind::EnableRadarrClients => c
                .arr("Radarr")?
                .set_download_clients_enabled(true)
                .map_err(integration_err),
            ActionKind::DisableLidarrClients => c
                .arr("Lidarr")?
                .set_download_clients_enabled(false)
                .map_err(integration_err),
            ActionKind::EnableLidarrClients => c
                .arr("Lidarr")?
                .set_download_clients_enabled(true)
                .map_err(integration_err),
            ActionKind::PauseQbittorrent => c.qbittorrent.pause_all().map_err(integration_err),
            ActionKind::ResumeQbittorrent => c.qbittorrent.resume_all().map_err(integration_err),
            ActionKind::PauseSabnzbd => c.sabnzbd.pause().map_err(integration_err),
            ActionKind::ResumeSabnzbd => c.sabnzbd.resume().map_err(integration_err),
            ActionKind::PauseNzbget => c.nzbget.pause().map_err(integration_err),
            ActionKind::ResumeNzbget => c.nzbget.resume().map_err(integration_err),
        }
    }
}

// ---------------------------------------------------------------------------
// Shutdown integrations
// ---------------------------------------------------------------------------

enum RestoreKind {
    Sonarr,
    Radarr,
    Lidarr,
    Qbittorrent,
    Sabnzbd,
    Nzbget,
}

struct RestoreTask {
    name: &'static str,
    kind: RestoreKind,
    clients: Arc<Clients>,
}

impl Integration for RestoreTask {
    fn name(&self) -> &str {
        self.name
    }

    fn restore(&self) -> Result<()> {
        let c = &self.clients;
        match self.kind {
            RestoreKind::Sonarr => c
                .arr("Sonarr")?
                .set_download_clients_enabled(true)
                .map_err(integration_err),
            RestoreKind::Radarr => c
                .arr("Radarr")?
                .set_download_clients_enabled(true)
                .map_err(integration_err),
            RestoreKind::Lidarr => c
                .arr("Lidarr")?
                .set_download_clients_enabled(true)
                .map_err(integration_err),
            RestoreKind::Qbittorrent => c.qbittorrent.resume_all().map_err(integration_err),
            RestoreKind::Sabnzbd => c.sabnzbd.resume().map_err(integration_err),
            RestoreKind::Nzbget => c.nzbget.resume().map_err(integration_err),
        }
    }
}

/// The full set of integrations shutdown cleanup re-enables. Arr services
/// without configuration are left out (and noted), the download clients
/// always have defaults and are always attempted.
pub fn shutdown_integrations(clients: &Arc<Clients>) -> Vec<Box<dyn Integration>> {
    let mut out: Vec<Box<dyn Integration>> = Vec::new();
    let arr_kinds = [
        ("Sonarr", clients.sonarr.is_some(), RestoreKind::Sonarr),
        ("Radarr", clients.radarr.is_some(), RestoreKind::Radarr),
        ("Lidarr", clients.lidarr.is_some(), RestoreKind::Lidarr),
    ];
    for (name, configured, kind) in arr_kinds {
        if configured {
            out.push(Box::new(RestoreTask {
                name,
                kind,
                clients: Arc::clone(clients),
            }));
        } else {
            info!("{name} is not configured, skipping shutdown re-enable");
        }
    }
    for (name, kind) in [
        ("qBittorrent", RestoreKind::Qbittorrent),
        ("SABnzbd", RestoreKind::Sabnzbd),
        ("NZBGet", RestoreKind::Nzbget),
    ] {
        out.push(Box::new(RestoreTask {
            name,
            kind,
            clients: Arc::clone(clients),
        }));
    }
    out
}
