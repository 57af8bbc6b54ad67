//! Maintenance-window detection.
//!
//! Answers "is now inside a maintenance window?" on every poll tick by
//! combining the live schedule (butler hours fetched once per loop) with a
//! local override: a sentinel file in the orchestrator's directory forces
//! mock maintenance for as long as it exists. The sentinel is re-checked on
//! every call, so the mock window slides forward in time and never expires
//! until the file is removed.

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveTime};
use std::path::PathBuf;
use tracing::{error, info};

/// A maintenance window as times of day, non-wrapping. An `end` earlier
/// than `start` is a caller error and simply never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MaintStatus {
    Mock,
    Real,
    Inactive,
}

impl MaintStatus {
    fn active(self) -> bool {
        !matches!(self, MaintStatus::Inactive)
    }
}

/// Polling oracle with once-per-flip transition logging.
///
/// Only the last reported status is retained between calls; repeated polls
/// with an unchanged status log nothing, so a multi-minute window does not
/// flood the log at sub-second poll rates.
pub struct MaintenanceOracle {
    flag_dir: PathBuf,
    flag_name: String,
    mock_extension: ChronoDuration,
    last_status: Option<MaintStatus>,
    transitions: u32,
}

impl MaintenanceOracle {
    /// `flag_dir` is the directory scanned for the mock sentinel,
    /// `flag_name` the filename matched case-insensitively.
    pub fn new(flag_dir: PathBuf, flag_name: impl Into<String>) -> Self {
        Self {
            flag_dir,
            flag_name: flag_name.into(),
            mock_extension: ChronoDuration::seconds(120),
            last_status: None,
            transitions: 0,
        }
    }

    /// Whether "now" is inside a maintenance window. `window` is the live
    /// schedule, or `None` when it could not be retrieved this loop; the
    /// oracle then reports no maintenance (fail-open: tasks are not paused
    /// when the schedule is unknown).
    pub fn is_maintenance(&mut self, ctx: &str, window: Option<&Window>) -> bool {
        let now = Local::now();
        let status = if let Some((mock_start, mock_end)) = self.mock_window(now) {
            if mock_start <= now && now <= mock_end {
                MaintStatus::Mock
            } else {
                MaintStatus::Inactive
            }
        } else {
            match window {
                Some(w) => {
                    let now_time = now.time();
                    if w.start <= now_time && now_time <= w.end {
                        MaintStatus::Real
                    } else {
                        MaintStatus::Inactive
                    }
                }
                None => MaintStatus::Inactive,
            }
        };

        if self.last_status != Some(status) {
            self.last_status = Some(status);
            self.transitions += 1;
            if status.active() {
                info!("{ctx}: entered maintenance window");
            } else {
                info!("{ctx}: left maintenance window");
            }
        }

        status.active()
    }

    /// Derive the sliding mock window from the sentinel file, if present.
    /// The filename match is case-insensitive.
    fn mock_window(&self, now: DateTime<Local>) -> Option<(DateTime<Local>, DateTime<Local>)> {
        let entries = match std::fs::read_dir(&self.flag_dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!("failed to scan {} for mock flag: {e}", self.flag_dir.display());
                return None;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name
                .to_str()
                .is_some_and(|n| n.eq_ignore_ascii_case(&self.flag_name))
            {
                return Some((now, now + self.mock_extension));
            }
        }
        None
    }
}
