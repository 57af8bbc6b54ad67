//! Task execution with maintenance-aware suspend/resume.
//!
//! Runs one task to completion, polling the maintenance oracle while the
//! task's subprocess is alive and suspending/resuming the whole process
//! tree whenever a window opens or closes. Every error except a deliberate
//! operator interrupt is caught here and converted into a zero-duration
//! result, so one failing task can never abort the orchestration loop.

use crate::error::{OrcError, Result};
use crate::oracle::{MaintenanceOracle, Window};
use crate::proctree::{pause_tree, resume_tree, ProcessControl};
use crate::registry::ProcessRegistry;
use crate::tasklist::{ActionKind, ScriptTask, Task, TaskKind};
use crate::timefmt::format_hms;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// ActionDispatcher
// ---------------------------------------------------------------------------

/// Executes one of the statically known in-process actions. Implemented at
/// the binary level, where the integration clients live.
pub trait ActionDispatcher {
    fn run(&self, action: ActionKind) -> Result<()>;
}

// ---------------------------------------------------------------------------
// PollConfig / LoopCtx / ExecResult
// ---------------------------------------------------------------------------

/// Explicit polling cadence so tests can inject near-zero intervals.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Delay before the first subprocess check.
    pub initial_delay: Duration,
    /// Steady-state poll interval while the subprocess runs.
    pub interval: Duration,
    /// Wait interval while inside a maintenance window.
    pub maintenance_interval: Duration,
    /// Emit a heartbeat log line every this many poll ticks (0 disables).
    pub heartbeat_every: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            interval: Duration::from_secs(5),
            maintenance_interval: Duration::from_secs(5),
            heartbeat_every: 12,
        }
    }
}

/// Position of a task within the run, used to prefix every log line with
/// enough context to locate a failure.
#[derive(Debug, Clone, Copy)]
pub struct LoopCtx {
    pub loop_count: u64,
    /// 1-based index of the current task.
    pub task_idx: usize,
    pub total_tasks: usize,
}

impl fmt::Display for LoopCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loop {} - Task {} / {}",
            self.loop_count, self.task_idx, self.total_tasks
        )
    }
}

/// Timing outcome of one task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    /// Wall-clock duration including any suspended time.
    pub total: Duration,
    /// Time spent suspended inside maintenance windows.
    pub maintenance: Duration,
}

impl ExecResult {
    pub fn zero() -> Self {
        Self {
            total: Duration::ZERO,
            maintenance: Duration::ZERO,
        }
    }

    /// Time the process actually ran: `total - maintenance`, never negative.
    pub fn active(&self) -> Duration {
        self.total.saturating_sub(self.maintenance)
    }
}

// ---------------------------------------------------------------------------
// Command resolution
// ---------------------------------------------------------------------------

/// Pick the shell used for `.sh` scripts, preferring bash.
fn detect_shell() -> Option<&'static str> {
    if which::which("bash").is_ok() {
        return Some("bash");
    }
    if which::which("sh").is_ok() {
        return Some("sh");
    }
    None
}

/// Resolve the command line for a script task. The child's working
/// directory is the script's own directory, so relative paths inside the
/// script resolve as authored; the orchestrator's cwd is never touched.
fn script_command(script: &ScriptTask) -> Result<(Command, String)> {
    let path = &script.path;
    let file_name = path
        .file_name()
        .ok_or_else(|| OrcError::UnsupportedScript(path.display().to_string()))?
        .to_os_string();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let program: PathBuf = match ext {
        "py" => match &script.use_venv {
            Some(venv) => Path::new(venv).join("bin").join("python"),
            None => PathBuf::from("python3"),
        },
        "sh" => {
            let shell = detect_shell().ok_or(OrcError::ShellNotFound)?;
            PathBuf::from(shell)
        }
        _ => return Err(OrcError::UnsupportedScript(path.display().to_string())),
    };

    let mut cmd = Command::new(&program);
    cmd.arg(&file_name);
    cmd.args(&script.args);
    cmd.current_dir(&dir);

    let mut display = format!("{} {}", program.display(), file_name.to_string_lossy());
    if !script.args.is_empty() {
        display.push(' ');
        display.push_str(&script.args.join(" "));
    }
    Ok((cmd, display))
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Runs one task at a time against the shared registry and oracle.
pub struct Executor<'a> {
    pub control: &'a mut dyn ProcessControl,
    pub registry: &'a mut ProcessRegistry,
    pub oracle: &'a mut MaintenanceOracle,
    pub poll: PollConfig,
    pub shutdown: Arc<AtomicBool>,
    pub task_divider: String,
}

impl Executor<'_> {
    /// Execute `task` to completion. Never fails except on operator
    /// interrupt: all other errors are logged and become a `(0, 0)` result.
    pub fn execute(
        &mut self,
        task: &Task,
        window: Option<&Window>,
        ctx: &LoopCtx,
        dispatcher: &dyn ActionDispatcher,
    ) -> Result<ExecResult> {
        info!("{ctx}: executing task: {}", task.description);
        let outcome = match &task.kind {
            TaskKind::Action(kind) => dispatcher.run(*kind).map(|()| ExecResult::zero()),
            TaskKind::Script(script) => self.run_script(script, window, ctx),
        };
        match outcome {
            Err(OrcError::Interrupted) => Err(OrcError::Interrupted),
            Err(e) => {
                error!("{ctx}: error executing task '{}': {e}", task.description);
                Ok(ExecResult::zero())
            }
            ok => ok,
        }
    }

    fn run_script(
        &mut self,
        script: &ScriptTask,
        window: Option<&Window>,
        ctx: &LoopCtx,
    ) -> Result<ExecResult> {
        let (cmd, cmd_display) = script_command(script)?;
        info!("{}", self.task_divider);
        info!(
            "{ctx}: running script '{}' from '{}'",
            script.path.display(),
            cmd.get_current_dir().unwrap_or(Path::new(".")).display()
        );
        info!("{ctx}: starting task with command: {}", cmd_display);
        self.run_with_pause_check(cmd, window, ctx)
    }

    fn run_with_pause_check(
        &mut self,
        mut cmd: Command,
        window: Option<&Window>,
        ctx: &LoopCtx,
    ) -> Result<ExecResult> {
        let mut child = cmd.spawn()?;
        let pid = child.id();
        self.registry.mark_running(pid);
        let start = Instant::now();
        let mut maintenance = Duration::ZERO;

        let poll_result =
            self.poll_until_exit(&mut child, pid, window, ctx, start, &mut maintenance);

        // Teardown runs on every path: deregister unconditionally (idempotent
        // even if already absent) and reap a still-live child.
        self.registry.remove(pid);
        self.prune_dead();
        if let Ok(None) = child.try_wait() {
            let _ = self.control.terminate(pid);
            let _ = child.wait();
        }
        poll_result?;

        let total = start.elapsed();
        info!("{ctx}: task completed");
        info!("{ctx}: total time: {}", format_hms(total));
        info!(
            "{ctx}: active task time (excluding maintenance): {}",
            format_hms(total.saturating_sub(maintenance))
        );
        info!("{ctx}: total maintenance time: {}", format_hms(maintenance));
        Ok(ExecResult { total, maintenance })
    }

    fn poll_until_exit(
        &mut self,
        child: &mut Child,
        pid: u32,
        window: Option<&Window>,
        ctx: &LoopCtx,
        start: Instant,
        maintenance: &mut Duration,
    ) -> Result<()> {
        let ctx_s = ctx.to_string();
        std::thread::sleep(self.poll.initial_delay);
        self.log_tree(pid, &ctx_s);

        let mut ticks: u32 = 0;
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                warn!("{ctx_s}: interrupt received, terminating subprocess {pid}");
                let _ = self.control.terminate(pid);
                let _ = child.wait();
                return Err(OrcError::Interrupted);
            }
            if child.try_wait()?.is_some() {
                return Ok(());
            }
            if self.oracle.is_maintenance(&ctx_s, window) {
                info!("{ctx_s}: maintenance detected, pausing task");
                let pause_start = Instant::now();
                pause_tree(self.control, self.registry, pid);

                while self.oracle.is_maintenance(&ctx_s, window) {
                    info!("{ctx_s}: still within the maintenance window, waiting");
                    if self.shutdown.load(Ordering::SeqCst) {
                        warn!(
                            "{ctx_s}: interrupt received during maintenance, \
                             terminating subprocess {pid}"
                        );
                        resume_tree(self.control, self.registry, pid);
                        let _ = self.control.terminate(pid);
                        let _ = child.wait();
                        return Err(OrcError::Interrupted);
                    }
                    std::thread::sleep(self.poll.maintenance_interval);
                }

                *maintenance += pause_start.elapsed();
                info!("{ctx_s}: maintenance ended, resuming task");
                resume_tree(self.control, self.registry, pid);
            }

            ticks += 1;
            if self.poll.heartbeat_every > 0 && ticks % self.poll.heartbeat_every == 0 {
                info!(
                    "{ctx_s}: task running for {}, maintenance so far {}",
                    format_hms(start.elapsed()),
                    format_hms(*maintenance)
                );
            }
            std::thread::sleep(self.poll.interval);
        }
    }

    fn log_tree(&mut self, pid: u32, ctx: &str) {
        info!("{ctx}: parent process {pid}");
        for child in self.control.children(pid) {
            info!("{ctx}: child process {child}");
        }
    }

    /// Drop registry entries whose OS process no longer exists.
    fn prune_dead(&mut self) {
        for pid in self.registry.all() {
            if !self.control.exists(pid) {
                self.registry.remove(pid);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
