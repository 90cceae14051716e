//! JSON:API client for the run platform.
//!
//! Each method maps to one REST call. Non-success responses become errors
//! that carry the status code and response body so the caller can report
//! them verbatim.
use super::{PlanCounts, Platform, Run, RunState, RunStatus, Workspace, WorkspacePage};
use crate::config::PlatformConfig;
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use ureq::http::Response;
use ureq::{Agent, Body};

const JSON_API: &str = "application/vnd.api+json";

/// Message attached to runs queued by this tool.
pub const RUN_MESSAGE: &str = "Triggered by automation after discarding runs";

pub struct HttpPlatform {
    agent: Agent,
    config: PlatformConfig,
}

impl HttpPlatform {
    pub fn new(config: PlatformConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(config.request_timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent, config }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base, path.trim_start_matches('/'))
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.token)
    }

    fn get(&self, label: &str, url: &str) -> Result<Response<Body>> {
        let response = self
            .agent
            .get(url)
            .header("Authorization", self.bearer())
            .header("Content-Type", JSON_API)
            .call()
            .with_context(|| format!("{label}: GET {url}"))?;
        tracing::debug!(url, status = response.status().as_u16(), "platform GET");
        Ok(response)
    }

    fn post<B: Serialize>(&self, label: &str, url: &str, body: &B) -> Result<Response<Body>> {
        let payload = serde_json::to_vec(body).with_context(|| format!("{label}: encode body"))?;
        let response = self
            .agent
            .post(url)
            .header("Authorization", self.bearer())
            .header("Content-Type", JSON_API)
            .send(payload.as_slice())
            .with_context(|| format!("{label}: POST {url}"))?;
        tracing::debug!(url, status = response.status().as_u16(), "platform POST");
        Ok(response)
    }

    fn post_action(&self, label: &str, run_id: &str, action: &str, comment: &str) -> Result<()> {
        let url = self.endpoint(&format!("runs/{run_id}/actions/{action}"));
        let response = self.post(label, &url, &json!({ "comment": comment }))?;
        expect_status(label, response, 200).map(|_| ())
    }
}

/// Pass the response through when its status is `expected`, otherwise turn
/// it into an error carrying the body text.
fn expect_status(label: &str, response: Response<Body>, expected: u16) -> Result<Response<Body>> {
    let status = response.status().as_u16();
    if status == expected {
        return Ok(response);
    }
    let body = response
        .into_body()
        .read_to_string()
        .unwrap_or_else(|err| format!("<unreadable body: {err}>"));
    Err(anyhow!("{label} returned {status}: {}", body.trim()))
}

fn read_json<T: DeserializeOwned>(label: &str, response: Response<Body>) -> Result<T> {
    response
        .into_body()
        .read_json::<T>()
        .with_context(|| format!("{label}: decode response"))
}

#[derive(Debug, Deserialize)]
struct Document<T> {
    data: T,
    #[serde(default)]
    meta: Option<Meta>,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    #[serde(rename = "next-page", default)]
    next_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Resource<A> {
    id: String,
    attributes: A,
}

#[derive(Debug, Deserialize)]
struct WorkspaceAttributes {
    name: String,
    #[serde(default, alias = "tag-names")]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RunAttributes {
    status: RunStatus,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunResource {
    attributes: RunAttributes,
    #[serde(default)]
    relationships: Option<RunRelationships>,
}

#[derive(Debug, Default, Deserialize)]
struct RunRelationships {
    #[serde(default)]
    plan: Option<Relation>,
}

#[derive(Debug, Default, Deserialize)]
struct Relation {
    #[serde(default)]
    data: Option<Identifier>,
}

#[derive(Debug, Deserialize)]
struct Identifier {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PlanResource {
    #[serde(default)]
    attributes: PlanAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct PlanAttributes {
    #[serde(rename = "resource-additions", default)]
    additions: Option<u64>,
    #[serde(rename = "resource-changes", default)]
    changes: Option<u64>,
    #[serde(rename = "resource-destructions", default)]
    destructions: Option<u64>,
}

fn workspace_page(doc: Document<Vec<Resource<WorkspaceAttributes>>>) -> WorkspacePage {
    let pagination = doc.meta.and_then(|meta| meta.pagination);
    let has_more = match pagination {
        Some(pagination) => pagination.next_page.is_some(),
        None => !doc.data.is_empty(),
    };
    let workspaces = doc
        .data
        .into_iter()
        .map(|resource| Workspace {
            id: resource.id,
            name: resource.attributes.name,
            tags: resource.attributes.tags.into_iter().collect(),
        })
        .collect();
    WorkspacePage {
        workspaces,
        has_more,
    }
}

fn run_state(doc: Document<RunResource>) -> RunState {
    let plan_id = doc
        .data
        .relationships
        .and_then(|rel| rel.plan)
        .and_then(|plan| plan.data)
        .map(|ident| ident.id);
    RunState {
        status: doc.data.attributes.status,
        plan_id,
    }
}

fn create_run_body(workspace_id: &str) -> serde_json::Value {
    json!({
        "data": {
            "type": "runs",
            "attributes": {
                "is-destroy": false,
                "message": RUN_MESSAGE,
            },
            "relationships": {
                "workspace": {
                    "data": { "type": "workspaces", "id": workspace_id }
                }
            }
        }
    })
}

impl Platform for HttpPlatform {
    fn list_workspaces(&self, organization: &str, page: u32) -> Result<WorkspacePage> {
        let label = "list workspaces";
        let url = format!(
            "{}?page%5Bnumber%5D={page}",
            self.endpoint(&format!("organizations/{organization}/workspaces"))
        );
        let response = expect_status(label, self.get(label, &url)?, 200)?;
        let doc: Document<Vec<Resource<WorkspaceAttributes>>> = read_json(label, response)?;
        Ok(workspace_page(doc))
    }

    fn list_runs(&self, workspace_id: &str) -> Result<Vec<Run>> {
        let label = "list runs";
        let url = self.endpoint(&format!("workspaces/{workspace_id}/runs"));
        let response = expect_status(label, self.get(label, &url)?, 200)?;
        let doc: Document<Vec<Resource<RunAttributes>>> = read_json(label, response)?;
        Ok(doc
            .data
            .into_iter()
            .map(|resource| Run {
                id: resource.id,
                status: resource.attributes.status,
            })
            .collect())
    }

    fn create_run(&self, workspace_id: &str) -> Result<String> {
        let label = "create run";
        let url = self.endpoint("runs");
        let response = self.post(label, &url, &create_run_body(workspace_id))?;
        let response = expect_status(label, response, 201)?;
        let doc: Document<Created> = read_json(label, response)?;
        Ok(doc.data.id)
    }

    fn get_run(&self, run_id: &str) -> Result<RunState> {
        let label = "get run";
        let url = self.endpoint(&format!("runs/{run_id}"));
        let response = expect_status(label, self.get(label, &url)?, 200)?;
        let doc: Document<RunResource> = read_json(label, response)?;
        Ok(run_state(doc))
    }

    fn get_plan(&self, plan_id: &str) -> Result<PlanCounts> {
        let label = "get plan";
        let url = self.endpoint(&format!("plans/{plan_id}"));
        let response = expect_status(label, self.get(label, &url)?, 200)?;
        let doc: Document<PlanResource> = read_json(label, response)?;
        let attrs = doc.data.attributes;
        Ok(PlanCounts {
            additions: attrs.additions,
            changes: attrs.changes,
            destructions: attrs.destructions,
        })
    }

    fn discard_run(&self, run_id: &str, comment: &str) -> Result<()> {
        self.post_action("discard run", run_id, "discard", comment)
    }

    fn apply_run(&self, run_id: &str, comment: &str) -> Result<()> {
        self.post_action("apply run", run_id, "apply", comment)
    }

    fn run_url(&self, workspace_id: &str, run_id: &str) -> String {
        format!("{}/{workspace_id}/runs/{run_id}", self.config.ui_base)
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
