//! Configuration types for arrival-warden
//!
//! Defines CLI arguments and the validated runtime configuration the
//! orchestrator takes as an explicit parameter object.

use crate::error::ConfigError;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// File-arrival orchestration engine
#[derive(Parser, Debug, Clone)]
#[command(
    name = "arrival-warden",
    version,
    about = "Watches an arrival location, batches new files, and monitors each to a terminal status",
    long_about = "A file-arrival orchestration engine.\n\n\
                  Runs three cooperating loops:\n\
                  1. Gather: polls the arrival location over a bounded window and batches new files\n\
                  2. Monitor: a fixed worker pool polls each file's status until it completes or fails\n\
                  3. Shutdown watch: drains the system when the trigger marker appears",
    after_help = "EXAMPLES:\n    \
        # Watch /data/inbox, statuses and manifests beside it\n    \
        arrival-warden /data/inbox\n\n    \
        # Faster cadence for a busy inbox, five pollers\n    \
        arrival-warden /data/inbox --gather-period 60 --poll-interval 30 --pool-size 5\n\n    \
        # Trigger a graceful drain from another shell\n    \
        touch /data/inbox/.shutdown.trigger"
)]
pub struct CliArgs {
    /// Directory watched for newly arrived files
    #[arg(value_name = "WATCH_DIR", env = "WARDEN_WATCH_DIR")]
    pub watch_dir: PathBuf,

    /// Directory holding `<file>.status` markers (defaults to WATCH_DIR/status)
    #[arg(long, value_name = "DIR")]
    pub status_dir: Option<PathBuf>,

    /// Directory manifests are written into (defaults to WATCH_DIR/manifests)
    #[arg(long, value_name = "DIR")]
    pub manifest_dir: Option<PathBuf>,

    /// Shutdown trigger marker (defaults to WATCH_DIR/.shutdown.trigger;
    /// dotfiles in the watch directory are never treated as arrivals)
    #[arg(long, value_name = "FILE")]
    pub trigger_file: Option<PathBuf>,

    /// Seconds between gather cycles
    #[arg(long, default_value = "300", value_name = "SECS")]
    pub gather_period: u64,

    /// Arrival polls per gather cycle
    #[arg(long, default_value = "3", value_name = "NUM")]
    pub polls_per_cycle: u32,

    /// Seconds between arrival polls within one cycle
    #[arg(long, default_value = "60", value_name = "SECS")]
    pub poll_spacing: u64,

    /// Seconds between status polls for a monitored file
    #[arg(long, default_value = "120", value_name = "SECS")]
    pub poll_interval: u64,

    /// Status polls allotted to one file before it is treated as timed out
    #[arg(long, default_value = "15", value_name = "NUM")]
    pub max_attempts: u32,

    /// Number of concurrent status pollers
    #[arg(short = 'w', long, default_value_t = default_pool_size(), value_name = "NUM")]
    pub pool_size: usize,

    /// Queue capacity ceiling (gatherer blocks when full)
    #[arg(long, default_value = "1024", value_name = "NUM")]
    pub queue_capacity: usize,

    /// Seconds between shutdown-trigger checks
    #[arg(long, default_value = "5", value_name = "SECS")]
    pub trigger_poll: u64,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn default_pool_size() -> usize {
    num_cpus::get().clamp(1, MAX_WORKERS)
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct WardenConfig {
    /// Directory watched for arrivals
    pub watch_dir: PathBuf,
    /// Directory holding status markers
    pub status_dir: PathBuf,
    /// Directory manifests are written into
    pub manifest_dir: PathBuf,
    /// Shutdown trigger marker path
    pub trigger_path: PathBuf,
    /// Outer period between gather cycles
    pub gather_period: Duration,
    /// Arrival polls per gather cycle (the cycle's observation window)
    pub arrival_polls_per_cycle: u32,
    /// Spacing between arrival polls within one cycle
    pub arrival_poll_spacing: Duration,
    /// Interval between status polls for one file
    pub status_poll_interval: Duration,
    /// Attempt budget per file
    pub max_poll_attempts: u32,
    /// Worker pool size
    pub pool_size: usize,
    /// Queue capacity ceiling
    pub queue_capacity: usize,
    /// Interval between shutdown-trigger checks
    pub trigger_poll_interval: Duration,
    /// Show progress
    pub show_progress: bool,
    /// Verbose logging
    pub verbose: bool,
}

impl WardenConfig {
    /// Build and validate a configuration from CLI arguments
    pub fn from_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let config = Self {
            watch_dir: args.watch_dir.clone(),
            status_dir: args
                .status_dir
                .clone()
                .unwrap_or_else(|| args.watch_dir.join("status")),
            manifest_dir: args
                .manifest_dir
                .clone()
                .unwrap_or_else(|| args.watch_dir.join("manifests")),
            trigger_path: args
                .trigger_file
                .clone()
                .unwrap_or_else(|| args.watch_dir.join(".shutdown.trigger")),
            gather_period: Duration::from_secs(args.gather_period),
            arrival_polls_per_cycle: args.polls_per_cycle,
            arrival_poll_spacing: Duration::from_secs(args.poll_spacing),
            status_poll_interval: Duration::from_secs(args.poll_interval),
            max_poll_attempts: args.max_attempts,
            pool_size: args.pool_size,
            queue_capacity: args.queue_capacity,
            trigger_poll_interval: Duration::from_secs(args.trigger_poll),
            show_progress: !args.quiet,
            verbose: args.verbose,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants nothing downstream re-checks
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 || self.pool_size > MAX_WORKERS {
            return Err(ConfigError::InvalidPoolSize {
                count: self.pool_size,
                max: MAX_WORKERS,
            });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity(self.queue_capacity));
        }
        if self.arrival_polls_per_cycle == 0 {
            return Err(ConfigError::ZeroBudget {
                name: "polls-per-cycle",
            });
        }
        if self.max_poll_attempts == 0 {
            return Err(ConfigError::ZeroBudget {
                name: "max-attempts",
            });
        }
        Ok(())
    }

    /// Small, fast configuration for unit tests
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            watch_dir: PathBuf::from("/tmp/warden/inbox"),
            status_dir: PathBuf::from("/tmp/warden/status"),
            manifest_dir: PathBuf::from("/tmp/warden/manifests"),
            trigger_path: PathBuf::from("/tmp/warden/shutdown.trigger"),
            gather_period: Duration::from_millis(20),
            arrival_polls_per_cycle: 2,
            arrival_poll_spacing: Duration::from_millis(1),
            status_poll_interval: Duration::from_millis(1),
            max_poll_attempts: 15,
            pool_size: 2,
            queue_capacity: 64,
            trigger_poll_interval: Duration::from_millis(5),
            show_progress: false,
            verbose: false,
        }
    }
}
