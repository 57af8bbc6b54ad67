#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::time::Duration;
use tempfile::TempDir;

/// Stand-in Plex server: identity probe plus butler hours pinned to a
/// window that only matches exactly midnight, so scheduled maintenance
/// never triggers during a test run.
fn plex_stub() -> mockito::ServerGuard {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/identity")
        .with_status(200)
        .with_body("{}")
        .create();
    server
        .mock("GET", "/:/prefs")
        .with_status(200)
        .with_body(
            serde_json::json!({
                "MediaContainer": {
                    "size": 2,
                    "Setting": [
                        {"id": "butlerStartHour", "value": 0},
                        {"id": "butlerEndHour", "value": 0},
                    ]
                }
            })
            .to_string(),
        )
        .create();
    server
}

fn plexorc(dir: &TempDir, plex_url: &str) -> Command {
    let mut cmd = Command::cargo_bin("plexorc").unwrap();
    cmd.current_dir(dir.path())
        .env("PLEX_URL", plex_url)
        .env("PLEX_TOKEN", "test-token")
        .env("PLEX_CONNECT_RETRIES", "2")
        .env("PLEX_CONNECT_DELAY_SECS", "0")
        .env("POLL_INITIAL_MS", "50")
        .env("POLL_INTERVAL_SECS", "0.1")
        .env("MAINTENANCE_POLL_SECS", "0.1")
        .env("LOOP_DELAY_SECS", "0")
        // Unroutable download clients: shutdown restore attempts fail fast
        // and are logged, which is the expected degraded behavior.
        .env("QBITTORRENT_URL", "http://127.0.0.1:9")
        .env("SABNZBD_URL", "http://127.0.0.1:9")
        .env("NZBGET_URL", "http://127.0.0.1:9")
        .timeout(Duration::from_secs(60));
    cmd
}

fn write_tasks(dir: &TempDir, yaml: &str) {
    std::fs::write(dir.path().join("tasks.yml"), yaml).unwrap();
}

fn hms_to_secs(hms: &str) -> u64 {
    hms.split(':')
        .fold(0u64, |acc, part| acc * 60 + part.parse::<u64>().unwrap())
}

fn read_stats(dir: &TempDir) -> serde_json::Value {
    let data = std::fs::read_to_string(dir.path().join("stats/task_stats.json")).unwrap();
    serde_json::from_str(&data).unwrap()
}

// ---------------------------------------------------------------------------
// Startup validation
// ---------------------------------------------------------------------------

#[test]
fn missing_description_aborts_with_index_and_field() {
    let server = plex_stub();
    let dir = TempDir::new().unwrap();
    write_tasks(&dir, "tasks:\n  - script_path: x.py\n");

    plexorc(&dir, &server.url())
        .args(["--max-loops", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("task 1").and(predicate::str::contains("description")));
}

#[test]
fn unknown_action_aborts_before_any_task() {
    let server = plex_stub();
    let dir = TempDir::new().unwrap();
    write_tasks(
        &dir,
        "tasks:\n  - description: typo\n    action: pause_everything\n",
    );

    plexorc(&dir, &server.url())
        .args(["--max-loops", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown action 'pause_everything'"));
}

#[test]
fn missing_plex_url_is_fatal() {
    let dir = TempDir::new().unwrap();
    write_tasks(&dir, "tasks: []\n");

    let mut cmd = plexorc(&dir, "ignored");
    cmd.env_remove("PLEX_URL");
    cmd.args(["--max-loops", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("PLEX_URL"));
}

#[test]
fn unreachable_plex_aborts_after_retries() {
    let dir = TempDir::new().unwrap();
    write_tasks(&dir, "tasks: []\n");

    plexorc(&dir, "http://127.0.0.1:9")
        .args(["--max-loops", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to connect to Plex server"));
}

// ---------------------------------------------------------------------------
// Loop execution and stats
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn one_loop_runs_every_task_and_writes_stats() {
    let server = plex_stub();
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("first.sh"), "sleep 0.2\n").unwrap();
    std::fs::write(dir.path().join("second.sh"), "sleep 0.2\n").unwrap();
    write_tasks(
        &dir,
        r#"
tasks:
  - description: First script
    script_path: first.sh
  - description: Second script
    script_path: second.sh
"#,
    );

    plexorc(&dir, &server.url())
        .args(["--max-loops", "1"])
        .assert()
        .success();

    let stats = read_stats(&dir);
    let entries = stats.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["loop"], 1);
    let tasks = entries[0]["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["description"], "First script");
    assert_eq!(entries[0]["totals"]["total_tasks"], 2);
}

#[cfg(unix)]
#[test]
fn a_failing_task_does_not_abort_the_loop() {
    let server = plex_stub();
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("fine.sh"), "sleep 0.1\n").unwrap();
    // The first task's interpreter does not exist, so the spawn itself
    // fails and the task is recorded with the zero fallback result.
    write_tasks(
        &dir,
        r#"
tasks:
  - description: Broken interpreter
    script_path: ghost.py
    use_venv: /nonexistent-venv
  - description: Fine script
    script_path: fine.sh
"#,
    );

    plexorc(&dir, &server.url())
        .args(["--max-loops", "1"])
        .assert()
        .success();

    let stats = read_stats(&dir);
    let tasks = stats[0]["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["total_time"], "00:00:00");
    assert_eq!(tasks[1]["description"], "Fine script");
}

#[cfg(unix)]
#[test]
fn two_loops_append_two_summaries() {
    let server = plex_stub();
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("quick.sh"), "sleep 0.1\n").unwrap();
    write_tasks(
        &dir,
        r#"
tasks:
  - description: Quick
    script_path: quick.sh
"#,
    );

    plexorc(&dir, &server.url())
        .args(["--max-loops", "2"])
        .assert()
        .success();

    let stats = read_stats(&dir);
    let entries = stats.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["loop"], 1);
    assert_eq!(entries[1]["loop"], 2);
}

// ---------------------------------------------------------------------------
// Mock-maintenance end to end
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn mock_window_pauses_first_task_only() {
    let server = plex_stub();
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("long.sh"), "sleep 3\n").unwrap();
    std::fs::write(dir.path().join("short.sh"), "sleep 0.2\n").unwrap();
    write_tasks(
        &dir,
        r#"
tasks:
  - description: Long task
    script_path: long.sh
  - description: Short task
    script_path: short.sh
"#,
    );

    // Open the mock window shortly into the first task and close it before
    // that task can finish, so the second task runs unpaused.
    let flag = dir.path().join("mock.flg");
    let helper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(500));
        std::fs::write(&flag, b"").unwrap();
        std::thread::sleep(Duration::from_millis(2000));
        std::fs::remove_file(&flag).unwrap();
    });

    plexorc(&dir, &server.url())
        .args(["--max-loops", "1"])
        .assert()
        .success();
    helper.join().unwrap();

    let stats = read_stats(&dir);
    let tasks = stats[0]["tasks"].as_array().unwrap();
    let first_maintenance = hms_to_secs(tasks[0]["maintenance_time"].as_str().unwrap());
    let second_maintenance = hms_to_secs(tasks[1]["maintenance_time"].as_str().unwrap());

    assert!(
        first_maintenance >= 1,
        "first task should have accrued maintenance time, stats: {stats}"
    );
    assert_eq!(
        second_maintenance, 0,
        "second task ran outside the window, stats: {stats}"
    );

    let total = hms_to_secs(tasks[0]["total_time"].as_str().unwrap());
    let active = hms_to_secs(tasks[0]["active_time"].as_str().unwrap());
    assert!(active < total, "active {active} should exclude the pause from total {total}");
}
