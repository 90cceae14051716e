//! Plan triage policy.
//!
//! Precedence is fixed: an empty plan is a no-op; any change or destruction
//! goes to a human; a pure-addition plan is applied only when auto-apply was
//! requested.
use crate::platform::{ChangeSummary, Platform};
use crate::review::{ReviewEntry, ReviewLog};
use anyhow::Result;

/// Comment attached to apply requests issued by this tool.
pub const APPLY_COMMENT: &str = "Auto-applied by script";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NoOp,
    AutoApply,
    ManualReview,
    /// Additions only, but auto-apply is disabled.
    Skipped,
}

pub fn decide(summary: &ChangeSummary, auto_apply: bool) -> Outcome {
    if summary.additions == 0 && summary.changes == 0 && summary.destructions == 0 {
        Outcome::NoOp
    } else if summary.changes > 0 || summary.destructions > 0 {
        Outcome::ManualReview
    } else if auto_apply {
        Outcome::AutoApply
    } else {
        Outcome::Skipped
    }
}

/// What actually happened after a decision was acted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    NoOp,
    Skipped,
    Reviewed { run_url: String },
    Applied,
    /// The apply request was rejected. Not retried.
    ApplyFailed { error: String },
}

/// Decide and act on a resolved plan for `run_id`.
///
/// A failed apply is reported in the returned disposition rather than as an
/// error; a failed review-log write is an error.
pub fn dispatch(
    platform: &dyn Platform,
    review_log: &ReviewLog,
    workspace_id: &str,
    run_id: &str,
    summary: &ChangeSummary,
    auto_apply: bool,
) -> Result<Disposition> {
    let outcome = decide(summary, auto_apply);
    tracing::info!(workspace_id, run_id, plan = %summary, ?outcome, "plan evaluated");
    match outcome {
        Outcome::NoOp => {
            tracing::info!(workspace_id, run_id, "no changes to apply");
            Ok(Disposition::NoOp)
        }
        Outcome::Skipped => {
            tracing::info!(
                workspace_id,
                run_id,
                "only additions found; apply skipped (use --apply to enable)"
            );
            Ok(Disposition::Skipped)
        }
        Outcome::ManualReview => {
            let entry = ReviewEntry {
                workspace_id: workspace_id.to_string(),
                run_id: run_id.to_string(),
                run_url: platform.run_url(workspace_id, run_id),
                summary: summary.to_string(),
            };
            review_log.record(&entry)?;
            tracing::info!(workspace_id, run_id, run_url = %entry.run_url, "logged for manual review");
            Ok(Disposition::Reviewed {
                run_url: entry.run_url,
            })
        }
        Outcome::AutoApply => match platform.apply_run(run_id, APPLY_COMMENT) {
            Ok(()) => {
                tracing::info!(workspace_id, run_id, "auto-applied addition-only plan");
                Ok(Disposition::Applied)
            }
            Err(err) => {
                let error = format!("{err:#}");
                tracing::warn!(workspace_id, run_id, error = %error, "auto-apply failed");
                Ok(Disposition::ApplyFailed { error })
            }
        },
    }
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;
