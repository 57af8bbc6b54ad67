//! The orchestration loop.
//!
//! State machine: connect to the media server (done by the caller),
//! load and validate the task list (done by the caller), then iterate:
//! re-derive the maintenance schedule once per loop, execute every task in
//! declared order, log and persist a loop summary, sleep, repeat. Shutdown
//! cleanup runs unconditionally whether the loop ended by operator
//! interrupt or by an unrecoverable error: markers are deleted, tracked
//! PIDs are terminated, and every integration is returned to a fully
//! operational state so a crash never leaves downstream systems paused.

use crate::error::{OrcError, Result};
use crate::executor::{ActionDispatcher, ExecResult, Executor, LoopCtx, PollConfig};
use crate::markers::delete_markers;
use crate::oracle::{MaintenanceOracle, Window};
use crate::proctree::ProcessControl;
use crate::registry::ProcessRegistry;
use crate::stats::{LoopSummary, LoopTotals, StatsStore, TaskStat};
use crate::tasklist::TaskList;
use crate::timefmt::format_hms;
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Provides the live maintenance schedule, queried once per loop iteration.
pub trait ScheduleSource {
    fn maintenance_window(&self) -> Result<Window>;
}

/// An external system the loop may have disabled and must re-enable during
/// shutdown, no matter why shutdown was triggered.
pub trait Integration {
    fn name(&self) -> &str;
    /// Return the integration to its fully operational state.
    fn restore(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// LoopOptions / Orchestrator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct LoopOptions {
    /// Delay between loop iterations.
    pub loop_delay: Duration,
    /// Stop after this many iterations; 0 runs forever.
    pub max_loops: u64,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            loop_delay: Duration::from_secs(60),
            max_loops: 0,
        }
    }
}

pub struct Orchestrator {
    pub tasks: TaskList,
    pub schedule: Box<dyn ScheduleSource>,
    pub dispatcher: Box<dyn ActionDispatcher>,
    pub integrations: Vec<Box<dyn Integration>>,
    pub control: Box<dyn ProcessControl>,
    pub oracle: MaintenanceOracle,
    pub registry: ProcessRegistry,
    pub stats: StatsStore,
    pub poll: PollConfig,
    pub opts: LoopOptions,
    pub shutdown: Arc<AtomicBool>,
    pub loop_divider: String,
    pub task_divider: String,
}

impl Orchestrator {
    /// Run loops until interrupted (or until `max_loops`), then clean up.
    ///
    /// A clean operator interrupt returns `Ok(())`; any other error is
    /// propagated after cleanup has run.
    pub fn run(&mut self) -> Result<()> {
        delete_markers(&self.tasks.tasks);
        let result = self.run_loops();
        self.cleanup();
        match result {
            Err(OrcError::Interrupted) => {
                info!("interrupt received, exiting");
                Ok(())
            }
            other => other,
        }
    }

    fn run_loops(&mut self) -> Result<()> {
        let tasks = self.tasks.tasks.clone();
        let total_tasks = tasks.len();
        let mut loop_count: u64 = 0;

        loop {
            loop_count += 1;
            info!("starting loop {loop_count}");

            // One schedule fetch per iteration; a failure is fail-open so an
            // unreachable media server does not pause tasks.
            let window = match self.schedule.maintenance_window() {
                Ok(w) => {
                    info!("scheduled maintenance: {} to {}", w.start, w.end);
                    Some(w)
                }
                Err(e) => {
                    error!("failed to get maintenance window: {e}");
                    None
                }
            };

            let mut task_stats: Vec<TaskStat> = Vec::with_capacity(total_tasks);
            let mut total_time = Duration::ZERO;
            let mut total_active = Duration::ZERO;
            let mut total_maintenance = Duration::ZERO;

            for (idx, task) in tasks.iter().enumerate() {
                if self.shutdown.load(Ordering::SeqCst) {
                    return Err(OrcError::Interrupted);
                }
                let ctx = LoopCtx {
                    loop_count,
                    task_idx: idx + 1,
                    total_tasks,
                };
                info!("{ctx}: {}", task.description);

                let mut exec = Executor {
                    control: self.control.as_mut(),
                    registry: &mut self.registry,
                    oracle: &mut self.oracle,
                    poll: self.poll,
                    shutdown: Arc::clone(&self.shutdown),
                    task_divider: self.task_divider.clone(),
                };
                let res = match exec.execute(task, window.as_ref(), &ctx, self.dispatcher.as_ref())
                {
                    Ok(res) => res,
                    Err(OrcError::Interrupted) => return Err(OrcError::Interrupted),
                    Err(e) => {
                        error!("{ctx}: error during task: {e}");
                        ExecResult::zero()
                    }
                };

                total_time += res.total;
                total_active += res.active();
                total_maintenance += res.maintenance;
                task_stats.push(TaskStat {
                    description: task.description.clone(),
                    total_time: format_hms(res.total),
                    active_time: format_hms(res.active()),
                    maintenance_time: format_hms(res.maintenance),
                });
            }

            self.log_loop_summary(loop_count, &task_stats, total_time, total_active, total_maintenance);

            let summary = LoopSummary {
                loop_count,
                timestamp: Local::now().to_rfc3339(),
                tasks: task_stats,
                totals: LoopTotals {
                    total_tasks,
                    total_task_time: format_hms(total_time),
                    total_active_time: format_hms(total_active),
                    total_maintenance_time: format_hms(total_maintenance),
                },
            };
            // The summary must be durable before the next loop may start.
            self.stats.append(&summary)?;

            if self.opts.max_loops > 0 && loop_count >= self.opts.max_loops {
                info!("reached configured loop limit ({}), stopping", self.opts.max_loops);
                return Ok(());
            }

            info!("loop {loop_count}: all tasks completed, restarting after delay");
            self.sleep_interruptible(self.opts.loop_delay)?;
        }
    }

    fn log_loop_summary(
        &self,
        loop_count: u64,
        task_stats: &[TaskStat],
        total_time: Duration,
        total_active: Duration,
        total_maintenance: Duration,
    ) {
        info!("{}", self.loop_divider);
        info!("Loop {loop_count} summary:");
        for (i, stat) in task_stats.iter().enumerate() {
            info!(
                "  Task {}/{}: {} - total time: {}, active time: {}, maintenance time: {}",
                i + 1,
                task_stats.len(),
                stat.description,
                stat.total_time,
                stat.active_time,
                stat.maintenance_time
            );
        }
        info!("Overall loop summary:");
        info!("  total tasks: {}", task_stats.len());
        info!(
            "  total loop time (including maintenance): {}",
            format_hms(total_time)
        );
        info!(
            "  total loop time (excluding maintenance): {}",
            format_hms(total_active)
        );
        info!("  total maintenance time: {}", format_hms(total_maintenance));
        info!("{}", self.loop_divider);
    }

    /// Sleep in small steps so an interrupt is observed promptly.
    fn sleep_interruptible(&self, total: Duration) -> Result<()> {
        let step = Duration::from_millis(250);
        let deadline = Instant::now() + total;
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return Err(OrcError::Interrupted);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            std::thread::sleep(step.min(remaining));
        }
    }

    /// Unconditional shutdown cleanup: markers, subprocesses, integrations.
    fn cleanup(&mut self) {
        info!("performing cleanup: terminating subprocesses and restoring integrations");
        delete_markers(&self.tasks.tasks);
        self.terminate_all();
        for integration in &self.integrations {
            match integration.restore() {
                Ok(()) => info!("restored integration: {}", integration.name()),
                Err(e) => error!("failed to restore integration {}: {e}", integration.name()),
            }
        }
        info!("{}", self.loop_divider);
    }

    /// Terminate every tracked PID with a short grace period before a
    /// forceful kill, then empty the registry.
    fn terminate_all(&mut self) {
        let pids = self.registry.all();
        if !pids.is_empty() {
            warn!("terminating all tracked subprocesses");
        }
        for pid in pids {
            if !self.control.exists(pid) {
                info!("process {pid} already terminated");
                self.registry.remove(pid);
                continue;
            }
            // A stopped process cannot act on a termination request; wake it
            // first.
            if self.registry.is_paused(pid) {
                let _ = self.control.resume(pid);
            }
            info!("terminating process {pid}");
            if let Err(e) = self.control.terminate(pid) {
                error!("error terminating process {pid}: {e}");
            }
            let deadline = Instant::now() + Duration::from_secs(5);
            while self.control.exists(pid) && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(100));
            }
            if self.control.exists(pid) {
                warn!("process {pid} did not exit in time, killing");
                let _ = self.control.kill(pid);
            }
            self.registry.remove(pid);
        }
        self.registry.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
