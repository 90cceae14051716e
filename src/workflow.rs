//! One execution pass across every selected workspace.
//!
//! Workspaces are handled strictly one after another: reconcile, then
//! trigger and monitor, before the next workspace starts. A failure in one
//! workspace is logged and counted; it never stops the pass.
use crate::config::PassConfig;
use crate::decision::Disposition;
use crate::lifecycle::{LifecycleOutcome, RunController};
use crate::locator::{find_workspaces, WorkspaceFilter};
use crate::platform::Platform;
use crate::poll::Clock;
use crate::reaper::reconcile;
use crate::review::ReviewLog;
use anyhow::Result;

/// Per-pass tallies, logged when the pass ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub workspaces: usize,
    pub busy: usize,
    pub failed: usize,
    pub trigger_failed: usize,
    pub finished: usize,
    pub run_timeouts: usize,
    pub missing_plan: usize,
    pub count_timeouts: usize,
    pub no_op: usize,
    pub skipped: usize,
    pub reviewed: usize,
    pub applied: usize,
    pub apply_failed: usize,
}

impl PassSummary {
    fn tally(&mut self, outcome: &LifecycleOutcome) {
        match outcome {
            LifecycleOutcome::NotTriggered { .. } => self.busy += 1,
            LifecycleOutcome::TriggerFailed { .. } => self.trigger_failed += 1,
            LifecycleOutcome::Finished { .. } => self.finished += 1,
            LifecycleOutcome::RunTimedOut { .. } => self.run_timeouts += 1,
            LifecycleOutcome::MissingPlan { .. } => self.missing_plan += 1,
            LifecycleOutcome::CountsTimedOut { .. } => self.count_timeouts += 1,
            LifecycleOutcome::Decided { disposition, .. } => match disposition {
                Disposition::NoOp => self.no_op += 1,
                Disposition::Skipped => self.skipped += 1,
                Disposition::Reviewed { .. } => self.reviewed += 1,
                Disposition::Applied => self.applied += 1,
                Disposition::ApplyFailed { .. } => self.apply_failed += 1,
            },
        }
    }
}

/// Run a full pass. Only setup problems (bad filter, unwritable review log)
/// are returned as errors.
pub fn run_pass(
    platform: &dyn Platform,
    clock: &dyn Clock,
    config: &PassConfig,
) -> Result<PassSummary> {
    let filter = WorkspaceFilter::new(config.name_pattern.as_deref(), config.tag.as_deref())?;
    let review_log = ReviewLog::create(&config.review_log)?;
    let workspace_ids = find_workspaces(platform, &config.organization, &filter);
    let controller = RunController::new(
        platform,
        clock,
        config.poll,
        &review_log,
        config.auto_apply,
    );

    let mut summary = PassSummary::default();
    for workspace_id in &workspace_ids {
        summary.workspaces += 1;
        let _span = tracing::info_span!("workspace", workspace_id = %workspace_id).entered();
        tracing::info!("processing workspace");
        let result = reconcile(platform, clock, &config.poll, workspace_id)
            .and_then(|verdict| controller.trigger_and_monitor(workspace_id, &verdict));
        match result {
            Ok(outcome) => {
                tracing::info!(outcome = %outcome, "workspace done");
                summary.tally(&outcome);
            }
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "workspace pass failed");
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        workspaces = summary.workspaces,
        busy = summary.busy,
        failed = summary.failed + summary.trigger_failed,
        applied = summary.applied,
        apply_failed = summary.apply_failed,
        reviewed = summary.reviewed,
        skipped = summary.skipped,
        no_op = summary.no_op,
        timeouts = summary.run_timeouts + summary.count_timeouts,
        review_log = %review_log.path().display(),
        "pass complete"
    );
    Ok(summary)
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
