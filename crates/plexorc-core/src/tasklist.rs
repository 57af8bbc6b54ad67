//! Task-list loading and validation.
//!
//! The task list (`tasks.yml` by default) is the declarative input to the
//! orchestration loop: an ordered sequence of tasks, each either an external
//! script invocation or one of the statically known in-process actions.
//! Validation is fail-fast: any schema violation aborts before the first
//! loop iteration, with an error naming the 1-based task index and field.

use crate::error::{OrcError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

/// The fixed set of in-process actions a task may name.
///
/// Action names are resolved at config-load time, so a typo in `tasks.yml`
/// is a startup error rather than a runtime surprise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    DisableSonarrClients,
    EnableSonarrClients,
    DisableRadarrClients,
    EnableRadarrClients,
    DisableLidarrClients,
    EnableLidarrClients,
    PauseQbittorrent,
    ResumeQbittorrent,
    PauseSabnzbd,
    ResumeSabnzbd,
    PauseNzbget,
    ResumeNzbget,
}

impl ActionKind {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "disable_sonarr_download_clients" => Self::DisableSonarrClients,
            "enable_sonarr_download_clients" => Self::EnableSonarrClients,
            "disable_radarr_download_clients" => Self::DisableRadarrClients,
            "enable_radarr_download_clients" => Self::EnableRadarrClients,
            "disable_lidarr_download_clients" => Self::DisableLidarrClients,
            "enable_lidarr_download_clients" => Self::EnableLidarrClients,
            "pause_qbittorrent_downloads" => Self::PauseQbittorrent,
            "resume_qbittorrent_downloads" => Self::ResumeQbittorrent,
            "pause_sabnzbd_downloads" => Self::PauseSabnzbd,
            "resume_sabnzbd_downloads" => Self::ResumeSabnzbd,
            "pause_nzbget_downloads" => Self::PauseNzbget,
            "resume_nzbget_downloads" => Self::ResumeNzbget,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DisableSonarrClients => "disable_sonarr_download_clients",
            Self::EnableSonarrClients => "enable_sonarr_download_clients",
            Self::DisableRadarrClients => "disable_radarr_download_clients",
            Self::EnableRadarrClients => "enable_radarr_download_clients",
            Self::DisableLidarrClients => "disable_lidarr_download_clients",
            Self::EnableLidarrClients => "enable_lidarr_download_clients",
            Self::PauseQbittorrent => "pause_qbittorrent_downloads",
            Self::ResumeQbittorrent => "resume_qbittorrent_downloads",
            Self::PauseSabnzbd => "pause_sabnzbd_downloads",
            Self::ResumeSabnzbd => "resume_sabnzbd_downloads",
            Self::PauseNzbget => "pause_nzbget_downloads",
            Self::ResumeNzbget => "resume_nzbget_downloads",
        }
    }
}

// ---------------------------------------------------------------------------
// Task / TaskKind
// ---------------------------------------------------------------------------

/// An external script invocation with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptTask {
    pub path: PathBuf,
    pub args: Vec<String>,
    /// Virtualenv root whose interpreter should run the script instead of
    /// the system one.
    pub use_venv: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    Script(ScriptTask),
    Action(ActionKind),
}

/// One validated unit of orchestrated work. Immutable once loaded; the task
/// list's order defines execution order within a loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub description: String,
    pub kind: TaskKind,
}

// ---------------------------------------------------------------------------
// Raw YAML shape
// ---------------------------------------------------------------------------

/// Pre-validation shape. Fields are untyped YAML values so validation can
/// report "field X must be a list" with the task index instead of a serde
/// path error.
#[derive(Debug, Deserialize)]
struct RawTaskList {
    #[serde(default)]
    tasks: Vec<RawTask>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTask {
    #[serde(default)]
    description: Option<serde_yaml::Value>,
    #[serde(default)]
    script_path: Option<serde_yaml::Value>,
    #[serde(default)]
    args: Option<serde_yaml::Value>,
    #[serde(default)]
    use_venv: Option<serde_yaml::Value>,
    #[serde(default)]
    action: Option<serde_yaml::Value>,
}

// ---------------------------------------------------------------------------
// TaskList
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TaskList {
    pub tasks: Vec<Task>,
}

impl TaskList {
    /// Load and validate a task list from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(OrcError::ConfigNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Err(OrcError::ConfigEmpty(path.to_path_buf()));
        }
        let raw: RawTaskList = serde_yaml::from_str(&data)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawTaskList) -> Result<Self> {
        let mut tasks = Vec::with_capacity(raw.tasks.len());
        for (i, raw_task) in raw.tasks.into_iter().enumerate() {
            tasks.push(validate_task(i + 1, raw_task)?);
        }
        Ok(Self { tasks })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

fn validate_task(index: usize, raw: RawTask) -> Result<Task> {
    let description = match raw.description {
        None | Some(serde_yaml::Value::Null) => {
            return Err(OrcError::MissingField {
                index,
                field: "description",
            })
        }
        Some(serde_yaml::Value::String(s)) => s,
        Some(_) => {
            return Err(OrcError::InvalidField {
                index,
                field: "description",
                expected: "a string",
            })
        }
    };

    // args and use_venv are type-checked for every task, not just scripts,
    // so a malformed list fails fast even when it would never be used.
    let args = validate_args(index, raw.args)?;
    let use_venv = validate_use_venv(index, raw.use_venv)?;

    let kind = match (&raw.script_path, &raw.action) {
        (Some(_), Some(_)) => {
            return Err(OrcError::TaskKindConflict {
                index,
                found: "both",
            })
        }
        (None, None) => {
            return Err(OrcError::TaskKindConflict {
                index,
                found: "neither",
            })
        }
        (Some(script_path), None) => {
            let path = match script_path {
                serde_yaml::Value::String(s) => PathBuf::from(s),
                _ => {
                    return Err(OrcError::InvalidField {
                        index,
                        field: "script_path",
                        expected: "a string",
                    })
                }
            };
            TaskKind::Script(ScriptTask {
                path,
                args,
                use_venv,
            })
        }
        (None, Some(action)) => {
            let name = match action {
                serde_yaml::Value::String(s) => s.as_str(),
                _ => {
                    return Err(OrcError::InvalidField {
                        index,
                        field: "action",
                        expected: "a string",
                    })
                }
            };
            let kind = ActionKind::from_name(name).ok_or_else(|| OrcError::UnknownAction {
                index,
                name: name.to_string(),
            })?;
            TaskKind::Action(kind)
        }
    };

    Ok(Task { description, kind })
}

fn validate_args(index: usize, args: Option<serde_yaml::Value>) -> Result<Vec<String>> {
    match args {
        None | Some(serde_yaml::Value::Null) => Ok(Vec::new()),
        Some(serde_yaml::Value::Sequence(seq)) => seq
            .into_iter()
            .map(|v| match v {
                serde_yaml::Value::String(s) => Ok(s),
                serde_yaml::Value::Number(n) => Ok(n.to_string()),
                serde_yaml::Value::Bool(b) => Ok(b.to_string()),
                _ => Err(OrcError::InvalidField {
                    index,
                    field: "args",
                    expected: "a list of scalars",
                }),
            })
            .collect(),
        Some(_) => Err(OrcError::InvalidField {
            index,
            field: "args",
            expected: "a list",
        }),
    }
}

fn validate_use_venv(index: usize, use_venv: Option<serde_yaml::Value>) -> Result<Option<String>> {
    match use_venv {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(OrcError::InvalidField {
            index,
            field: "use_venv",
            expected: "a string or null",
        }),
    }
}
