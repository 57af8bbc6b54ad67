//! Environment-driven settings with the defaults the orchestrator has
//! always shipped. Values come from the process environment, optionally
//! seeded from a `.env` file loaded in `main`.

use plexorc_core::executor::PollConfig;
use std::str::FromStr;
use std::time::Duration;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: f64) -> Duration {
    let secs = env_parse(key, default).max(0.0);
    Duration::from_secs_f64(secs)
}

#[derive(Debug, Clone)]
pub struct ArrSettings {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mock_flag_file: String,
    pub log_divider: String,
    pub task_divider: String,
    pub max_logs: usize,
    pub poll: PollConfig,
    pub loop_delay: Duration,

    pub plex_url: Option<String>,
    pub plex_token: Option<String>,
    pub plex_retries: u32,
    pub plex_retry_delay: Duration,

    pub sonarr: Option<ArrSettings>,
    pub radarr: Option<ArrSettings>,
    pub lidarr: Option<ArrSettings>,

    pub qbittorrent_url: String,
    pub qbittorrent_username: String,
    pub qbittorrent_password: String,
    pub sabnzbd_url: String,
    pub sabnzbd_api_key: String,
    pub nzbget_url: String,
    pub nzbget_username: String,
    pub nzbget_password: String,
}

fn arr_settings(url_key: &str, api_key_key: &str) -> Option<ArrSettings> {
    match (env_opt(url_key), env_opt(api_key_key)) {
        (Some(url), Some(api_key)) => Some(ArrSettings { url, api_key }),
        _ => None,
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            mock_flag_file: env_or("MOCK_FLAG_FILE", "mock.flg"),
            log_divider: env_or("LOG_DIVIDER", "=").repeat(80),
            task_divider: env_or("TASK_DIVIDER", "*").repeat(80),
            max_logs: env_parse("MAX_LOGS", 5),
            poll: PollConfig {
                initial_delay: Duration::from_millis(env_parse("POLL_INITIAL_MS", 100)),
                interval: env_secs("POLL_INTERVAL_SECS", 5.0),
                maintenance_interval: env_secs("MAINTENANCE_POLL_SECS", 5.0),
                heartbeat_every: env_parse("LOG_EVERY_N_CHECKS", 12),
            },
            loop_delay: env_secs("LOOP_DELAY_SECS", 60.0),

            plex_url: env_opt("PLEX_URL"),
            plex_token: env_opt("PLEX_TOKEN"),
            plex_retries: env_parse("PLEX_CONNECT_RETRIES", 3),
            plex_retry_delay: env_secs("PLEX_CONNECT_DELAY_SECS", 5.0),

            sonarr: arr_settings("SONARR_URL", "SONARR_API_KEY"),
            radarr: arr_settings("RADARR_URL", "RADARR_API_KEY"),
            lidarr: arr_settings("LIDARR_URL", "LIDARR_API_KEY"),

            qbittorrent_url: env_or("QBITTORRENT_URL", "http://localhost:6881/"),
            qbittorrent_username: env_or("QBITTORRENT_USERNAME", "admin"),
            qbittorrent_password: env_or("QBITTORRENT_PASSWORD", "adminadmin"),
            sabnzbd_url: env_or("SABNZBD_URL", "http://localhost:8080/"),
            sabnzbd_api_key: env_or("SABNZBD_API_KEY", "the_key"),
            nzbget_url: env_or("NZBGET_URL", "http://localhost:6789"),
            nzbget_username: env_or("NZBGET_USERNAME", "nzbget"),
            nzbget_password: env_or("NZBGET_PASSWORD", "tegbzn6789"),
        }
    }
}
