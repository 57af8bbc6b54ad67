//! In-flight marker files left behind by the external task scripts.
//!
//! Each script integration writes `temp/Posterizarr.Running` next to itself
//! to signal work in progress. The orchestrator removes every such marker
//! both before a run starts and during shutdown, regardless of why shutdown
//! was triggered, so a crash never leaves a stale "running" signal behind.

use crate::tasklist::{Task, TaskKind};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const IN_FLIGHT_MARKER: &str = "Posterizarr.Running";

/// Marker paths derived from the script tasks' directories, deduplicated.
pub fn marker_paths(tasks: &[Task]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for task in tasks {
        if let TaskKind::Script(script) = &task.kind {
            let dir = script.path.parent().unwrap_or(Path::new("."));
            let marker = dir.join("temp").join(IN_FLIGHT_MARKER);
            if seen.insert(marker.clone()) {
                out.push(marker);
            }
        }
    }
    out
}

/// Delete every known marker file, logging each outcome individually.
pub fn delete_markers(tasks: &[Task]) {
    for path in marker_paths(tasks) {
        if path.exists() {
            match std::fs::remove_file(&path) {
                Ok(()) => info!("deleted marker file: {}", path.display()),
                Err(e) => error!("error deleting marker file {}: {e}", path.display()),
            }
        } else {
            info!("marker file not found, skipping: {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasklist::ScriptTask;
    use tempfile::TempDir;

    fn script_task(path: PathBuf) -> Task {
        Task {
            description: "script".into(),
            kind: TaskKind::Script(ScriptTask {
                path,
                args: vec![],
                use_venv: None,
            }),
        }
    }

    #[test]
    fn paths_are_per_script_dir_and_deduplicated() {
        let tasks = vec![
            script_task(PathBuf::from("/srv/a/run.py")),
            script_task(PathBuf::from("/srv/a/other.py")),
            script_task(PathBuf::from("/srv/b/run.sh")),
        ];
        let paths = marker_paths(&tasks);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/srv/a/temp/Posterizarr.Running"),
                PathBuf::from("/srv/b/temp/Posterizarr.Running"),
            ]
        );
    }

    #[test]
    fn action_tasks_contribute_no_markers() {
        let tasks = vec![Task {
            description: "action".into(),
            kind: TaskKind::Action(crate::tasklist::ActionKind::PauseSabnzbd),
        }];
        assert!(marker_paths(&tasks).is_empty());
    }

    #[test]
    fn delete_removes_existing_and_skips_missing() {
        let dir = TempDir::new().unwrap();
        let temp = dir.path().join("temp");
        std::fs::create_dir_all(&temp).unwrap();
        let marker = temp.join(IN_FLIGHT_MARKER);
        std::fs::write(&marker, b"").unwrap();

        let tasks = vec![
            script_task(dir.path().join("run.py")),
            script_task(PathBuf::from("/nonexistent/run.py")),
        ];
        delete_markers(&tasks);
        assert!(!marker.exists());
    }
}
