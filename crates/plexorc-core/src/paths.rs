use crate::error::Result;
use crate::io::ensure_dir;
use std::path::{Path, PathBuf};
use tracing::info;

pub fn logs_dir(root: &Path) -> PathBuf {
    root.join("logs")
}

pub fn images_dir(root: &Path) -> PathBuf {
    root.join("images")
}

pub fn stats_file(root: &Path) -> PathBuf {
    root.join("stats").join("task_stats.json")
}

/// Create the logs/, images/, and stats/ directories under `root`.
pub fn setup_directories(root: &Path) -> Result<()> {
    ensure_dir(&logs_dir(root))?;
    ensure_dir(&images_dir(root))?;
    ensure_dir(&root.join("stats"))?;
    info!("directories set up: logs/, images/, stats/");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn setup_creates_all_directories() {
        let dir = TempDir::new().unwrap();
        setup_directories(dir.path()).unwrap();
        assert!(dir.path().join("logs").is_dir());
        assert!(dir.path().join("images").is_dir());
        assert!(dir.path().join("stats").is_dir());
    }

    #[test]
    fn setup_is_idempotent() {
        let dir = TempDir::new().unwrap();
        setup_directories(dir.path()).unwrap();
        setup_directories(dir.path()).unwrap();
    }

    #[test]
    fn stats_file_lives_under_stats() {
        let p = stats_file(Path::new("/srv/orc"));
        assert_eq!(p, Path::new("/srv/orc/stats/task_stats.json"));
    }
}
