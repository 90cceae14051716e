//! Scripted in-memory platform for tests.
//!
//! Responses are queued per key; the last queued response repeats once the
//! queue drains so a script only needs to describe the transitions it cares
//! about. Every call is recorded for assertions.
use super::{PlanCounts, Platform, Run, RunState, RunStatus, Workspace, WorkspacePage};
use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListWorkspaces(u32),
    ListRuns(String),
    CreateRun(String),
    GetRun(String),
    GetPlan(String),
    Discard(String, String),
    Apply(String, String),
}

type Scripted<T> = RefCell<BTreeMap<String, VecDeque<Result<T, String>>>>;

#[derive(Default)]
pub struct FakePlatform {
    pages: RefCell<Vec<Result<Vec<Workspace>, String>>>,
    runs: Scripted<Vec<Run>>,
    created: Scripted<String>,
    run_states: Scripted<RunState>,
    plans: Scripted<PlanCounts>,
    failing_discards: RefCell<BTreeSet<String>>,
    failing_applies: RefCell<BTreeSet<String>>,
    calls: RefCell<Vec<Call>>,
}

pub fn workspace(id: &str, name: &str, tags: &[&str]) -> Workspace {
    Workspace {
        id: id.to_string(),
        name: name.to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}

pub fn run(id: &str, status: RunStatus) -> Run {
    Run {
        id: id.to_string(),
        status,
    }
}

pub fn state(status: RunStatus, plan_id: Option<&str>) -> RunState {
    RunState {
        status,
        plan_id: plan_id.map(str::to_string),
    }
}

fn next<T: Clone>(script: &Scripted<T>, key: &str, what: &str) -> Result<T> {
    let mut script = script.borrow_mut();
    let queue = script
        .get_mut(key)
        .ok_or_else(|| anyhow!("{what} returned 404: no script for {key}"))?;
    let entry = if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    };
    match entry {
        Some(Ok(value)) => Ok(value),
        Some(Err(body)) => Err(anyhow!("{what} returned 500: {body}")),
        None => Err(anyhow!("{what} returned 404: empty script for {key}")),
    }
}

fn push<T>(script: &Scripted<T>, key: &str, value: Result<T, String>) {
    script
        .borrow_mut()
        .entry(key.to_string())
        .or_default()
        .push_back(value);
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, workspaces: Vec<Workspace>) {
        self.pages.borrow_mut().push(Ok(workspaces));
    }

    pub fn add_failing_page(&self, body: &str) {
        self.pages.borrow_mut().push(Err(body.to_string()));
    }

    /// Queue one `list_runs` snapshot for a workspace.
    pub fn push_runs(&self, workspace_id: &str, runs: Vec<Run>) {
        push(&self.runs, workspace_id, Ok(runs));
    }

    pub fn fail_runs(&self, workspace_id: &str, body: &str) {
        push(&self.runs, workspace_id, Err(body.to_string()));
    }

    pub fn on_create(&self, workspace_id: &str, run_id: &str) {
        push(&self.created, workspace_id, Ok(run_id.to_string()));
    }

    pub fn fail_create(&self, workspace_id: &str, body: &str) {
        push(&self.created, workspace_id, Err(body.to_string()));
    }

    pub fn push_run_state(&self, run_id: &str, state: RunState) {
        push(&self.run_states, run_id, Ok(state));
    }

    pub fn fail_run_state(&self, run_id: &str, body: &str) {
        push(&self.run_states, run_id, Err(body.to_string()));
    }

    pub fn push_plan(&self, plan_id: &str, counts: PlanCounts) {
        push(&self.plans, plan_id, Ok(counts));
    }

    pub fn fail_plan(&self, plan_id: &str, body: &str) {
        push(&self.plans, plan_id, Err(body.to_string()));
    }

    pub fn fail_discard(&self, run_id: &str) {
        self.failing_discards.borrow_mut().insert(run_id.to_string());
    }

    pub fn fail_apply(&self, run_id: &str) {
        self.failing_applies.borrow_mut().insert(run_id.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn discarded(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Discard(run_id, _) => Some(run_id),
                _ => None,
            })
            .collect()
    }

    pub fn applied(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Apply(run_id, _) => Some(run_id),
                _ => None,
            })
            .collect()
    }

    pub fn created(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CreateRun(workspace_id) => Some(workspace_id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl Platform for FakePlatform {
    fn list_workspaces(&self, _organization: &str, page: u32) -> Result<WorkspacePage> {
        self.record(Call::ListWorkspaces(page));
        let pages = self.pages.borrow();
        let index = page.saturating_sub(1) as usize;
        match pages.get(index) {
            Some(Ok(workspaces)) => Ok(WorkspacePage {
                workspaces: workspaces.clone(),
                has_more: index + 1 < pages.len(),
            }),
            Some(Err(body)) => Err(anyhow!("list workspaces returned 500: {body}")),
            None => Ok(WorkspacePage::default()),
        }
    }

    fn list_runs(&self, workspace_id: &str) -> Result<Vec<Run>> {
        self.record(Call::ListRuns(workspace_id.to_string()));
        if !self.runs.borrow().contains_key(workspace_id) {
            return Ok(Vec::new());
        }
        next(&self.runs, workspace_id, "list runs")
    }

    fn create_run(&self, workspace_id: &str) -> Result<String> {
        self.record(Call::CreateRun(workspace_id.to_string()));
        next(&self.created, workspace_id, "create run")
    }

    fn get_run(&self, run_id: &str) -> Result<RunState> {
        self.record(Call::GetRun(run_id.to_string()));
        next(&self.run_states, run_id, "get run")
    }

    fn get_plan(&self, plan_id: &str) -> Result<PlanCounts> {
        self.record(Call::GetPlan(plan_id.to_string()));
        next(&self.plans, plan_id, "get plan")
    }

    fn discard_run(&self, run_id: &str, comment: &str) -> Result<()> {
        self.record(Call::Discard(run_id.to_string(), comment.to_string()));
        if self.failing_discards.borrow().contains(run_id) {
            return Err(anyhow!("discard run returned 409: run {run_id} locked"));
        }
        Ok(())
    }

    fn apply_run(&self, run_id: &str, comment: &str) -> Result<()> {
        self.record(Call::Apply(run_id.to_string(), comment.to_string()));
        if self.failing_applies.borrow().contains(run_id) {
            return Err(anyhow!("apply run returned 409: run {run_id} not confirmable"));
        }
        Ok(())
    }

    fn run_url(&self, workspace_id: &str, run_id: &str) -> String {
        format!("https://ui.test/app/{workspace_id}/runs/{run_id}")
    }
}
