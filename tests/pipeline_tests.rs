//! End-to-end tests for the arrival pipeline
//!
//! Drives the full orchestrator against filesystem-backed collaborators
//! in a temporary directory: files arrive in an inbox, statuses come
//! from marker files, and shutdown comes from the trigger marker.

use arrival_warden::config::WardenConfig;
use arrival_warden::orchestrator::Orchestrator;
use arrival_warden::shutdown::DrainState;
use arrival_warden::source::{
    DirArrivalSource, FsManifestStore, LogAlertSink, MarkerStatusSource,
};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn fast_config(root: &Path) -> WardenConfig {
    WardenConfig {
        watch_dir: root.join("inbox"),
        status_dir: root.join("status"),
        manifest_dir: root.join("manifests"),
        trigger_path: root.join("shutdown.trigger"),
        gather_period: Duration::from_millis(40),
        arrival_polls_per_cycle: 2,
        arrival_poll_spacing: Duration::from_millis(5),
        status_poll_interval: Duration::from_millis(5),
        max_poll_attempts: 5,
        pool_size: 2,
        queue_capacity: 64,
        trigger_poll_interval: Duration::from_millis(10),
        show_progress: false,
        verbose: false,
    }
}

fn build(config: &WardenConfig) -> Orchestrator {
    let arrivals = Arc::new(DirArrivalSource::new(&config.watch_dir));
    let status = Arc::new(MarkerStatusSource::new(&config.status_dir));
    let alerts = Arc::new(LogAlertSink);
    let manifests = Arc::new(FsManifestStore::new(&config.manifest_dir));
    Orchestrator::new(config.clone(), arrivals, status, alerts, manifests).unwrap()
}

#[tokio::test]
async fn test_pipeline_resolves_files_and_drains_on_trigger() {
    let dir = tempdir().unwrap();
    let config = fast_config(dir.path());

    std::fs::create_dir_all(&config.watch_dir).unwrap();
    std::fs::create_dir_all(&config.status_dir).unwrap();
    std::fs::create_dir_all(&config.manifest_dir).unwrap();

    // One file completes, one fails, one never gets a status marker
    std::fs::write(config.watch_dir.join("ok.txt"), b"payload").unwrap();
    std::fs::write(config.watch_dir.join("bad.txt"), b"payload").unwrap();
    std::fs::write(config.watch_dir.join("stuck.txt"), b"payload").unwrap();
    std::fs::write(config.status_dir.join("ok.txt.status"), "complete").unwrap();
    std::fs::write(config.status_dir.join("bad.txt.status"), "failed").unwrap();

    let orchestrator = build(&config);
    let coordinator = orchestrator.coordinator();
    let runner = tokio::spawn(async move { orchestrator.run(|_| {}).await });

    // Let at least one full cycle gather and its records resolve
    // (stuck.txt needs 5 attempts x 5ms to time out)
    tokio::time::sleep(Duration::from_millis(200)).await;
    std::fs::write(&config.trigger_path, b"").unwrap();

    let summary = tokio::time::timeout(Duration::from_secs(10), runner)
        .await
        .expect("pipeline did not drain")
        .unwrap()
        .unwrap();

    assert!(summary.cycles_completed >= 1);
    assert!(summary.files_discovered >= 3);
    assert!(summary.files_completed >= 1);
    assert!(summary.files_failed >= 1);
    assert!(summary.files_timed_out >= 1);
    // Failure and timeout both alert
    assert!(summary.alerts_raised >= 2);

    // Drain finished and the trigger was claimed
    assert_eq!(coordinator.state(), DrainState::Drained);
    assert!(!config.trigger_path.exists());
    assert!(coordinator.in_progress_path().exists());

    // Each completed cycle left a deterministic manifest artifact
    let manifests: Vec<_> = std::fs::read_dir(&config.manifest_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert!(!manifests.is_empty());
    assert!(manifests
        .iter()
        .all(|name| name.ends_with("_arrival_file_name.manifest")));
}

#[tokio::test]
async fn test_drain_without_work_exits_cleanly() {
    let dir = tempdir().unwrap();
    let config = fast_config(dir.path());

    std::fs::create_dir_all(&config.watch_dir).unwrap();
    std::fs::create_dir_all(&config.status_dir).unwrap();
    std::fs::create_dir_all(&config.manifest_dir).unwrap();

    let orchestrator = build(&config);
    let coordinator = orchestrator.coordinator();
    let runner = tokio::spawn(async move { orchestrator.run(|_| {}).await });

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(coordinator.request_drain());
    // Second request is a no-op while the first drain proceeds
    assert!(!coordinator.request_drain());

    let summary = tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("pipeline did not drain")
        .unwrap()
        .unwrap();

    assert_eq!(summary.files_completed, 0);
    assert_eq!(summary.files_failed, 0);
    assert_eq!(coordinator.state(), DrainState::Drained);
}

#[tokio::test]
async fn test_missing_arrival_dir_keeps_pipeline_alive() {
    // The inbox does not exist: every arrival poll is skipped, batches
    // are empty, and drain still works
    let dir = tempdir().unwrap();
    let config = fast_config(dir.path());
    std::fs::create_dir_all(&config.manifest_dir).unwrap();

    let orchestrator = build(&config);
    let coordinator = orchestrator.coordinator();
    let runner = tokio::spawn(async move { orchestrator.run(|_| {}).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    coordinator.request_drain();

    let summary = tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("pipeline did not drain")
        .unwrap()
        .unwrap();

    assert!(summary.skipped_arrival_polls >= 1);
    assert_eq!(summary.files_discovered, 0);
}
