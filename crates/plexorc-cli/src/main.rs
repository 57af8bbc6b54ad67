mod logging;
mod settings;
mod wiring;

use anyhow::Context;
use clap::Parser;
use media_clients::PlexClient;
use plexorc_core::oracle::MaintenanceOracle;
use plexorc_core::orchestrator::{LoopOptions, Orchestrator};
use plexorc_core::paths;
use plexorc_core::proctree::SysProcessControl;
use plexorc_core::registry::ProcessRegistry;
use plexorc_core::stats::StatsStore;
use plexorc_core::tasklist::TaskList;
use settings::Settings;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{error, info};
use wiring::{ClientActionDispatcher, Clients, PlexScheduleSource};

#[derive(Parser)]
#[command(
    name = "plexorc",
    about = "Maintenance-aware task orchestrator for a Plex media library",
    version
)]
struct Cli {
    /// Path to the tasks configuration file
    #[arg(long, default_value = "tasks.yml")]
    config: PathBuf,

    /// Stop after this many loop iterations (0 = run forever)
    #[arg(long, default_value = "0")]
    max_loops: u64,
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let settings = Settings::from_env();

    let root = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("error: cannot determine working directory: {e}");
            std::process::exit(1);
        }
    };

    let _guard = match logging::init(&paths::logs_dir(&root), settings.max_logs) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: failed to set up logging: {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&cli, &settings, &root) {
        // Print the full error chain (anyhow's alternate Display), mirrored
        // into the log file.
        error!("{e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli, settings: &Settings, root: &Path) -> anyhow::Result<()> {
    paths::setup_directories(root)?;
    info!("{}", settings.log_divider);
    info!("orchestrator started");

    // Connect first: no task can be scheduling-aware without the
    // maintenance schedule, so an unreachable server is fatal.
    let plex_url = settings.plex_url.clone().context("PLEX_URL is not set")?;
    let plex_token = settings
        .plex_token
        .clone()
        .context("PLEX_TOKEN is not set")?;
    let plex = PlexClient::connect(
        &plex_url,
        &plex_token,
        settings.plex_retries,
        settings.plex_retry_delay,
    )
    .context("failed to connect to Plex server")?;

    info!("using configuration file: {}", cli.config.display());
    let tasks = TaskList::load(&cli.config)
        .with_context(|| format!("error in configuration file {}", cli.config.display()))?;

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))?;

    let clients = Arc::new(Clients::from_settings(settings)?);

    let mut orchestrator = Orchestrator {
        tasks,
        schedule: Box::new(PlexScheduleSource { client: plex }),
        dispatcher: Box::new(ClientActionDispatcher {
            clients: Arc::clone(&clients),
        }),
        integrations: wiring::shutdown_integrations(&clients),
        control: Box::new(SysProcessControl::new()),
        oracle: MaintenanceOracle::new(root.to_path_buf(), settings.mock_flag_file.clone()),
        registry: ProcessRegistry::new(),
        stats: StatsStore::new(paths::stats_file(root)),
        poll: settings.poll,
        opts: LoopOptions {
            loop_delay: settings.loop_delay,
            max_loops: cli.max_loops,
        },
        shutdown,
        loop_divider: settings.log_divider.clone(),
        task_divider: settings.task_divider.clone(),
    };
    orchestrator.run()?;
    info!("orchestrator stopped");
    Ok(())
}
