//! Watch mode
//!
//! Runs the pipeline on a fixed interval in the foreground until ctrl-c.
//! Every cycle is a complete run with a fresh roster fetch and, in live
//! mode, a fresh Bluesky session. A cycle that fails is logged and the loop
//! keeps going; a run in progress is never cancelled mid-flight.

use anyhow::Result;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::scan::{self, RunOptions, RunSummary};

/// Misconfiguration detected when resolving the watch interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntervalWarning {
    /// Interval longer than the window: repositories created in the gap
    /// between one window's end and the next cycle are never announced.
    LeavesGaps,
    /// Interval shorter than the window: consecutive windows overlap and
    /// repositories are announced more than once.
    Reannounces,
}

/// Pick the effective cycle interval for a window.
///
/// Defaults to the window itself, which is the only interval that neither
/// skips nor repeats announcements. A zero interval is clamped to one
/// minute. Mismatches are reported, not rejected.
fn resolve_interval(
    window_minutes: u32,
    every_minutes: Option<u32>,
) -> (u32, Option<IntervalWarning>) {
    let every = every_minutes.unwrap_or(window_minutes).max(1);
    let warning = if every > window_minutes {
        Some(IntervalWarning::LeavesGaps)
    } else if every < window_minutes {
        Some(IntervalWarning::Reannounces)
    } else {
        None
    };
    (every, warning)
}

/// Run the pipeline every `every_minutes` until interrupted.
///
/// A ctrl-c that arrives while a cycle is in flight is latched by the
/// pinned listener and stops the watch as soon as that cycle finishes.
pub async fn run_watch(
    config: &Config,
    opts: &RunOptions,
    every_minutes: Option<u32>,
) -> Result<()> {
    let window_minutes = opts.minutes.unwrap_or(config.check_minutes);
    let (every, warning) = resolve_interval(window_minutes, every_minutes);

    match warning {
        Some(IntervalWarning::LeavesGaps) => warn!(
            "Interval ({every} min) exceeds the window ({window_minutes} min): \
             repositories created in the gap will never be announced"
        ),
        Some(IntervalWarning::Reannounces) => warn!(
            "Interval ({every} min) is shorter than the window ({window_minutes} min): \
             repositories may be announced more than once"
        ),
        None => {}
    }

    info!("Watching every {every} minutes, press ctrl-c to stop");

    let mut timer = interval(Duration::from_secs(u64::from(every) * 60));
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Shutdown signal received, stopping watch");
                return Ok(());
            }
            _ = timer.tick() => {
                match scan::execute_run(config, opts).await {
                    Ok(summary) => log_cycle(&summary),
                    Err(err) => error!("Run failed, will retry next cycle: {err:#}"),
                }
            }
        }
    }
}

fn log_cycle(summary: &RunSummary) {
    info!(
        "Cycle complete: {} organizations checked, {} failed, {} new repositories, {} announced",
        summary.orgs_checked, summary.orgs_failed, summary.total_found, summary.total_announced
    );
}
