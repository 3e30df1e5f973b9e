//! arrival-warden - File-arrival orchestration engine
//!
//! Thin binary around the library: logging setup, argument parsing,
//! signal handling, and progress display.

use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

use arrival_warden::config::{CliArgs, WardenConfig};
use arrival_warden::orchestrator::{Orchestrator, PipelineProgress};
use arrival_warden::source::{
    DirArrivalSource, FsManifestStore, LogAlertSink, MarkerStatusSource,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("arrival_warden=info".parse().unwrap()),
        )
        .init();

    // Parse CLI arguments
    let args = CliArgs::parse();
    let config = WardenConfig::from_args(&args)?;

    // The manifest directory is ours to create; the watch and status
    // directories belong to the external systems that fill them
    std::fs::create_dir_all(&config.manifest_dir)?;

    let arrivals = Arc::new(DirArrivalSource::new(&config.watch_dir));
    let status = Arc::new(MarkerStatusSource::new(&config.status_dir));
    let alerts = Arc::new(LogAlertSink);
    let manifests = Arc::new(FsManifestStore::new(&config.manifest_dir));

    println!(
        "{} Watching {} with {} pollers",
        style("[Warden]").cyan().bold(),
        style(config.watch_dir.display()).green(),
        style(config.pool_size).yellow()
    );
    println!(
        "  Gather: every {}s, {} polls {}s apart",
        config.gather_period.as_secs(),
        config.arrival_polls_per_cycle,
        config.arrival_poll_spacing.as_secs()
    );
    println!(
        "  Monitor: every {}s, up to {} attempts per file",
        config.status_poll_interval.as_secs(),
        config.max_poll_attempts
    );
    println!(
        "  Shutdown trigger: {}",
        style(config.trigger_path.display()).dim()
    );
    println!();

    let show_progress = config.show_progress;
    let orchestrator = Orchestrator::new(config, arrivals, status, alerts, manifests)?;

    // Ctrl+C requests the same cooperative drain as the trigger marker
    let coordinator = orchestrator.coordinator();
    ctrlc::set_handler(move || {
        if !coordinator.request_drain() {
            eprintln!("\nForce shutdown!");
            std::process::exit(130);
        }
        eprintln!("\nDraining... (press Ctrl+C again to force)");
    })?;

    // Progress spinner
    let pb = if show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let pb_clone = pb.clone();
    let summary = orchestrator
        .run(move |progress: PipelineProgress| {
            if let Some(ref pb) = pb_clone {
                pb.set_message(format!(
                    "Cycles: {} | Discovered: {} | Queued: {} | Working: {} | Done: {} ({} failed, {} timed out)",
                    style(progress.cycles_completed).cyan(),
                    style(progress.files_discovered).green(),
                    style(progress.queued).blue(),
                    style(progress.working).magenta(),
                    style(progress.files_completed).green(),
                    if progress.files_failed > 0 {
                        style(progress.files_failed).red().to_string()
                    } else {
                        style(progress.files_failed).dim().to_string()
                    },
                    if progress.files_timed_out > 0 {
                        style(progress.files_timed_out).red().to_string()
                    } else {
                        style(progress.files_timed_out).dim().to_string()
                    },
                ));
            }
        })
        .await?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    // Print summary
    println!();
    println!("{}", style("Drained").green().bold());
    println!("  Gather cycles: {}", style(summary.cycles_completed).cyan());
    println!("  Files discovered: {}", style(summary.files_discovered).green());
    println!("  Completed: {}", style(summary.files_completed).green());
    if summary.files_failed > 0 {
        println!("  Failed: {}", style(summary.files_failed).red());
    }
    if summary.files_timed_out > 0 {
        println!("  Timed out: {}", style(summary.files_timed_out).red());
    }
    if summary.files_refused > 0 {
        println!(
            "  Refused after drain: {}",
            style(summary.files_refused).yellow()
        );
    }
    if summary.alerts_raised > 0 {
        println!("  Alerts raised: {}", style(summary.alerts_raised).yellow());
    }
    if summary.poll_errors > 0 || summary.skipped_arrival_polls > 0 {
        println!(
            "  Transient errors: {} status, {} arrival",
            summary.poll_errors, summary.skipped_arrival_polls
        );
    }
    if summary.manifest_failures > 0 {
        println!(
            "  Manifest failures: {}",
            style(summary.manifest_failures).yellow()
        );
    }
    println!("  Duration: {:.1}s", summary.duration.as_secs_f64());

    Ok(())
}
