//! Typed view of the remote run platform.
//!
//! The orchestration layers only ever talk to the platform through the
//! [`Platform`] trait so they can be driven by a scripted fake in tests. The
//! HTTP implementation lives in [`http`].
//!
//! Every value returned here is a snapshot; callers re-fetch on each poll
//! instead of holding on to earlier copies.
use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;

pub mod http;

#[cfg(test)]
pub mod fake;

pub use http::HttpPlatform;

/// Run status as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Planning,
    CostEstimating,
    Planned,
    PlannedAndFinished,
    PolicyChecking,
    Applying,
    Applied,
    Errored,
    Canceled,
    Discarded,
    /// Any status this tool does not act on (queued states, policy overrides...).
    #[serde(other)]
    Other,
}

impl RunStatus {
    /// Non-terminal and not yet applying: safe to discard.
    pub fn is_discardable(&self) -> bool {
        matches!(
            self,
            Self::Pending | Self::Planning | Self::CostEstimating | Self::Planned
        )
    }

    /// Blocks a new run from being queued in the same workspace.
    pub fn blocks_trigger(&self) -> bool {
        self.is_discardable() || *self == Self::Applying
    }

    /// The run will make no further progress on its own.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Errored | Self::Canceled | Self::Applied)
    }

    /// Plan output is available for evaluation.
    pub fn is_plan_ready(&self) -> bool {
        matches!(self, Self::Planned | Self::PlannedAndFinished)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Planning => "planning",
            Self::CostEstimating => "cost_estimating",
            Self::Planned => "planned",
            Self::PlannedAndFinished => "planned_and_finished",
            Self::PolicyChecking => "policy_checking",
            Self::Applying => "applying",
            Self::Applied => "applied",
            Self::Errored => "errored",
            Self::Canceled => "canceled",
            Self::Discarded => "discarded",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub tags: BTreeSet<String>,
}

/// One page of the organization's workspace listing.
#[derive(Debug, Clone, Default)]
pub struct WorkspacePage {
    pub workspaces: Vec<Workspace>,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
}

/// Current state of a single run, including its plan relation once attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub status: RunStatus,
    pub plan_id: Option<String>,
}

/// Resource counts of a plan. Each field stays `None` until the platform has
/// finished computing it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanCounts {
    pub additions: Option<u64>,
    pub changes: Option<u64>,
    pub destructions: Option<u64>,
}

impl PlanCounts {
    #[cfg(test)]
    pub fn ready(additions: u64, changes: u64, destructions: u64) -> Self {
        Self {
            additions: Some(additions),
            changes: Some(changes),
            destructions: Some(destructions),
        }
    }

    /// Fully populated counts, or `None` while any of them is still pending.
    pub fn resolved(&self) -> Option<ChangeSummary> {
        Some(ChangeSummary {
            additions: self.additions?,
            changes: self.changes?,
            destructions: self.destructions?,
        })
    }
}

/// Known resource-change counts of a finished plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeSummary {
    pub additions: u64,
    pub changes: u64,
    pub destructions: u64,
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{} ~{} -{}",
            self.additions, self.changes, self.destructions
        )
    }
}

/// Operations the orchestrator needs from the remote platform.
///
/// Implementations own no orchestration state. A non-success response is an
/// `Err` carrying the status and response body.
pub trait Platform {
    fn list_workspaces(&self, organization: &str, page: u32) -> Result<WorkspacePage>;
    fn list_runs(&self, workspace_id: &str) -> Result<Vec<Run>>;
    /// Queue a non-destructive run and return its id.
    fn create_run(&self, workspace_id: &str) -> Result<String>;
    fn get_run(&self, run_id: &str) -> Result<RunState>;
    fn get_plan(&self, plan_id: &str) -> Result<PlanCounts>;
    fn discard_run(&self, run_id: &str, comment: &str) -> Result<()>;
    fn apply_run(&self, run_id: &str, comment: &str) -> Result<()>;
    /// Browser link for a run, used in review records.
    fn run_url(&self, workspace_id: &str, run_id: &str) -> String;
}

#[cfg(test)]
#[path = "platform_tests.rs"]
mod tests;
