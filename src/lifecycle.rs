//! Run lifecycle controller.
//!
//! Drives one freshly queued run through two bounded waits:
//!
//! ```text
//! quiescent? ──no──> NotTriggered
//!     │yes
//! create run ──err──> TriggerFailed
//!     │
//! await run status (run_attempts × interval)
//!     ├── errored | canceled | applied ──> Finished
//!     ├── exhausted ─────────────────────> RunTimedOut
//!     └── planned | planned_and_finished
//!             ├── no plan relation ──────> MissingPlan
//!             └── await plan counts (plan_attempts × interval)
//!                     ├── exhausted ─────> CountsTimedOut
//!                     └── counts ────────> Decided (decision::dispatch)
//! ```
//!
//! Once the run is plan-ready the controller never returns to status
//! polling, whatever the plan outcome.
use crate::config::PollSettings;
use crate::decision::{self, Disposition};
use crate::platform::{ChangeSummary, Platform, RunStatus};
use crate::poll::{Clock, PollOutcome, Poller, Probe};
use crate::reaper::Quiescence;
use crate::review::ReviewLog;
use anyhow::{Context, Result};

/// Terminal disposition of one workspace's trigger-and-monitor pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// Another run was still active, so nothing was queued.
    NotTriggered { run_id: String, status: RunStatus },
    TriggerFailed { error: String },
    /// The run reached errored, canceled or applied on its own.
    Finished { run_id: String, status: RunStatus },
    RunTimedOut { run_id: String, attempts: u32 },
    /// Plan-ready run without a plan relation.
    MissingPlan { run_id: String },
    CountsTimedOut {
        run_id: String,
        plan_id: String,
        attempts: u32,
    },
    Decided {
        run_id: String,
        summary: ChangeSummary,
        disposition: Disposition,
    },
}

impl std::fmt::Display for LifecycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotTriggered { run_id, status } => {
                write!(f, "not triggered: {run_id} is {status}")
            }
            Self::TriggerFailed { error } => write!(f, "trigger failed: {error}"),
            Self::Finished { run_id, status } => write!(f, "{run_id} ended as {status}"),
            Self::RunTimedOut { run_id, attempts } => {
                write!(f, "{run_id} did not plan within {attempts} polls")
            }
            Self::MissingPlan { run_id } => write!(f, "{run_id} has no plan"),
            Self::CountsTimedOut {
                run_id,
                plan_id,
                attempts,
            } => write!(
                f,
                "{run_id}: {plan_id} had no resource counts after {attempts} polls"
            ),
            Self::Decided {
                run_id,
                summary,
                disposition,
            } => match disposition {
                Disposition::NoOp => write!(f, "{run_id} ({summary}): nothing to do"),
                Disposition::Skipped => write!(f, "{run_id} ({summary}): apply skipped"),
                Disposition::Reviewed { run_url } => {
                    write!(f, "{run_id} ({summary}): needs review at {run_url}")
                }
                Disposition::Applied => write!(f, "{run_id} ({summary}): applied"),
                Disposition::ApplyFailed { error } => {
                    write!(f, "{run_id} ({summary}): apply failed: {error}")
                }
            },
        }
    }
}

enum RunCheckpoint {
    Finished(RunStatus),
    PlanReady(Option<String>),
}

pub struct RunController<'a> {
    platform: &'a dyn Platform,
    clock: &'a dyn Clock,
    poll: PollSettings,
    review_log: &'a ReviewLog,
    auto_apply: bool,
}

impl<'a> RunController<'a> {
    pub fn new(
        platform: &'a dyn Platform,
        clock: &'a dyn Clock,
        poll: PollSettings,
        review_log: &'a ReviewLog,
        auto_apply: bool,
    ) -> Self {
        Self {
            platform,
            clock,
            poll,
            review_log,
            auto_apply,
        }
    }

    /// Queue a run in a quiescent workspace and follow it to a disposition.
    ///
    /// Platform errors while following the run are returned as `Err`; every
    /// other stop condition is an ordinary [`LifecycleOutcome`].
    pub fn trigger_and_monitor(
        &self,
        workspace_id: &str,
        quiescence: &Quiescence,
    ) -> Result<LifecycleOutcome> {
        if let Quiescence::Busy { run_id, status } = quiescence {
            return Ok(LifecycleOutcome::NotTriggered {
                run_id: run_id.clone(),
                status: status.clone(),
            });
        }

        tracing::info!(workspace_id, "no active runs; triggering a new one");
        let run_id = match self.platform.create_run(workspace_id) {
            Ok(run_id) => run_id,
            Err(err) => {
                let error = format!("{err:#}");
                tracing::warn!(workspace_id, error = %error, "failed to trigger a new run");
                return Ok(LifecycleOutcome::TriggerFailed { error });
            }
        };
        tracing::info!(workspace_id, run_id = %run_id, "run created");
        self.monitor(workspace_id, &run_id)
    }

    fn monitor(&self, workspace_id: &str, run_id: &str) -> Result<LifecycleOutcome> {
        let poller = Poller::new(self.clock, self.poll.run_attempts, self.poll.interval);
        let checkpoint = poller.run(|attempt| {
            let state = self
                .platform
                .get_run(run_id)
                .with_context(|| format!("poll run {run_id}"))?;
            tracing::info!(workspace_id, run_id, attempt, status = %state.status, "run status");
            Ok(if state.status.is_final() {
                Probe::Ready(RunCheckpoint::Finished(state.status))
            } else if state.status.is_plan_ready() {
                Probe::Ready(RunCheckpoint::PlanReady(state.plan_id))
            } else {
                Probe::Pending
            })
        })?;

        match checkpoint {
            PollOutcome::Exhausted { attempts } => {
                tracing::warn!(workspace_id, run_id, attempts, "timed out waiting for the run to plan");
                Ok(LifecycleOutcome::RunTimedOut {
                    run_id: run_id.to_string(),
                    attempts,
                })
            }
            PollOutcome::Ready(RunCheckpoint::Finished(status)) => {
                tracing::info!(workspace_id, run_id, status = %status, "run ended without a decision");
                Ok(LifecycleOutcome::Finished {
                    run_id: run_id.to_string(),
                    status,
                })
            }
            PollOutcome::Ready(RunCheckpoint::PlanReady(None)) => {
                tracing::warn!(workspace_id, run_id, "plan id not found; skipping evaluation");
                Ok(LifecycleOutcome::MissingPlan {
                    run_id: run_id.to_string(),
                })
            }
            PollOutcome::Ready(RunCheckpoint::PlanReady(Some(plan_id))) => {
                self.evaluate_plan(workspace_id, run_id, plan_id)
            }
        }
    }

    fn evaluate_plan(
        &self,
        workspace_id: &str,
        run_id: &str,
        plan_id: String,
    ) -> Result<LifecycleOutcome> {
        let poller = Poller::new(self.clock, self.poll.plan_attempts, self.poll.interval);
        let counts = poller.run(|attempt| {
            // Error responses here usually mean the plan record is not
            // readable yet; they consume an attempt like an empty read.
            let resolved = match self.platform.get_plan(&plan_id) {
                Ok(counts) => counts.resolved(),
                Err(err) => {
                    tracing::debug!(plan_id = %plan_id, attempt, error = %format!("{err:#}"), "plan not ready");
                    None
                }
            };
            Ok(resolved.map_or(Probe::Pending, Probe::Ready))
        })?;

        let summary = match counts {
            PollOutcome::Ready(summary) => summary,
            PollOutcome::Exhausted { attempts } => {
                tracing::warn!(
                    workspace_id,
                    run_id,
                    plan_id = %plan_id,
                    attempts,
                    "timed out waiting for plan resource counts"
                );
                return Ok(LifecycleOutcome::CountsTimedOut {
                    run_id: run_id.to_string(),
                    plan_id,
                    attempts,
                });
            }
        };

        let disposition = decision::dispatch(
            self.platform,
            self.review_log,
            workspace_id,
            run_id,
            &summary,
            self.auto_apply,
        )?;
        Ok(LifecycleOutcome::Decided {
            run_id: run_id.to_string(),
            summary,
            disposition,
        })
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
