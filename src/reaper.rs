//! Stale run cleanup and the quiescence verdict that gates new runs.
use crate::config::PollSettings;
use crate::platform::{Platform, Run, RunStatus};
use crate::poll::Clock;
use anyhow::{Context, Result};

/// Comment attached to every discard request.
pub const DISCARD_COMMENT: &str = "Discarded by automation";

/// What a reap pass did to one workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    pub discarded: Vec<String>,
    pub discard_failures: Vec<String>,
    /// Runs left alone because they are mid-apply.
    pub applying: Vec<String>,
}

impl ReapReport {
    pub fn any_still_active(&self) -> bool {
        !self.applying.is_empty()
    }
}

/// Whether a workspace may receive a new run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Quiescence {
    Quiescent,
    Busy { run_id: String, status: RunStatus },
}

/// Discard every pending, planning, cost-estimating or planned run.
///
/// Applying runs are never touched. Each discard is independent: a failure is
/// logged and the scan moves on to the next run.
pub fn reap_stale_runs(platform: &dyn Platform, workspace_id: &str) -> Result<ReapReport> {
    let runs = platform
        .list_runs(workspace_id)
        .with_context(|| format!("list runs for {workspace_id}"))?;
    let mut report = ReapReport::default();
    for run in runs {
        if run.status.is_discardable() {
            tracing::info!(workspace_id, run_id = %run.id, status = %run.status, "discarding run");
            match platform.discard_run(&run.id, DISCARD_COMMENT) {
                Ok(()) => report.discarded.push(run.id),
                Err(err) => {
                    tracing::warn!(
                        workspace_id,
                        run_id = %run.id,
                        error = %format!("{err:#}"),
                        "failed to discard run"
                    );
                    report.discard_failures.push(run.id);
                }
            }
        } else if run.status == RunStatus::Applying {
            tracing::info!(workspace_id, run_id = %run.id, "run is applying; leaving it alone");
            report.applying.push(run.id);
        } else {
            tracing::debug!(workspace_id, run_id = %run.id, status = %run.status, "run needs no discard");
        }
    }
    Ok(report)
}

fn first_blocking(runs: &[Run]) -> Option<&Run> {
    runs.iter().find(|run| run.status.blocks_trigger())
}

/// Reap, then decide whether the workspace is quiet enough for a new run.
///
/// An applying run seen during the reap makes the workspace `Busy` at once,
/// with no settle delay and no re-check. An apply that would have finished
/// inside the settle window therefore still skips the workspace for this
/// pass; the next execution picks it up. Otherwise the
/// platform gets `settle_delay` to process the discards and the run list is
/// fetched once more; anything still queued or applying keeps the workspace
/// busy. The platform can still enqueue a run between this re-check and the
/// create request, so the verdict is best-effort.
pub fn reconcile(
    platform: &dyn Platform,
    clock: &dyn Clock,
    poll: &PollSettings,
    workspace_id: &str,
) -> Result<Quiescence> {
    let report = reap_stale_runs(platform, workspace_id)?;
    tracing::debug!(
        workspace_id,
        discarded = report.discarded.len(),
        discard_failures = report.discard_failures.len(),
        still_active = report.any_still_active(),
        "reap complete"
    );
    if let Some(run_id) = report.applying.first() {
        return Ok(Quiescence::Busy {
            run_id: run_id.clone(),
            status: RunStatus::Applying,
        });
    }

    clock.sleep(poll.settle_delay);
    let runs = platform
        .list_runs(workspace_id)
        .with_context(|| format!("re-check runs for {workspace_id}"))?;
    Ok(match first_blocking(&runs) {
        Some(run) => {
            tracing::info!(workspace_id, run_id = %run.id, status = %run.status, "run still active; not triggering");
            Quiescence::Busy {
                run_id: run.id.clone(),
                status: run.status.clone(),
            }
        }
        None => Quiescence::Quiescent,
    })
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
