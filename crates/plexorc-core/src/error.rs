use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrcError {
    #[error("configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("configuration file is empty: {0}")]
    ConfigEmpty(PathBuf),

    #[error("task {index}: missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("task {index}: field '{field}' must be {expected}")]
    InvalidField {
        index: usize,
        field: &'static str,
        expected: &'static str,
    },

    #[error("task {index}: exactly one of 'script_path' or 'action' is required (found {found})")]
    TaskKindConflict { index: usize, found: &'static str },

    #[error("task {index}: unknown action '{name}'")]
    UnknownAction { index: usize, name: String },

    #[error("unsupported script type '{0}': only .py and .sh are supported")]
    UnsupportedScript(String),

    #[error("no compatible shell found: install bash or sh")]
    ShellNotFound,

    #[error("interrupted by operator")]
    Interrupted,

    #[error("process control error: {0}")]
    ProcessControl(String),

    #[error("integration error: {0}")]
    Integration(String),

    #[error("schedule error: {0}")]
    Schedule(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OrcError>;
