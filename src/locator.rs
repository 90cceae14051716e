//! Workspace discovery for an organization.
use crate::platform::{Platform, Workspace};
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeSet;

/// Name and tag predicates applied to every listed workspace.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceFilter {
    name_pattern: Option<Regex>,
    tag: Option<String>,
}

impl WorkspaceFilter {
    /// Compile the name pattern up front so an invalid regex fails before any
    /// platform call is made.
    pub fn new(name_pattern: Option<&str>, tag: Option<&str>) -> Result<Self> {
        let name_pattern = name_pattern
            .map(|pattern| {
                Regex::new(pattern).with_context(|| format!("invalid name pattern {pattern:?}"))
            })
            .transpose()?;
        Ok(Self {
            name_pattern,
            tag: tag.map(str::to_string),
        })
    }

    /// The pattern may match anywhere in the name.
    pub fn matches(&self, workspace: &Workspace) -> bool {
        let name_ok = self
            .name_pattern
            .as_ref()
            .is_none_or(|pattern| pattern.is_match(&workspace.name));
        let tag_ok = self
            .tag
            .as_ref()
            .is_none_or(|tag| workspace.tags.contains(tag));
        name_ok && tag_ok
    }
}

/// Collect matching workspace ids in listing order, each id at most once.
///
/// Page-number listings shift when workspaces are created or deleted
/// mid-scan; a workspace seen on more than one page keeps its first position.
/// Pages are requested from 1 until one comes back empty or the platform
/// reports no further pages. A failed page fetch ends pagination early and
/// the ids gathered so far are returned.
pub fn find_workspaces(
    platform: &dyn Platform,
    organization: &str,
    filter: &WorkspaceFilter,
) -> Vec<String> {
    let mut ids = Vec::new();
    let mut seen = BTreeSet::new();
    let mut page = 1;
    loop {
        let listing = match platform.list_workspaces(organization, page) {
            Ok(listing) => listing,
            Err(err) => {
                tracing::warn!(
                    organization,
                    page,
                    error = %format!("{err:#}"),
                    "failed to fetch workspaces; continuing with partial list"
                );
                break;
            }
        };
        if listing.workspaces.is_empty() {
            break;
        }
        let before = ids.len();
        ids.extend(
            listing
                .workspaces
                .iter()
                .filter(|workspace| filter.matches(workspace))
                .filter(|workspace| seen.insert(workspace.id.clone()))
                .map(|workspace| workspace.id.clone()),
        );
        tracing::debug!(
            page,
            listed = listing.workspaces.len(),
            matched = ids.len() - before,
            "workspace page"
        );
        if !listing.has_more {
            break;
        }
        page += 1;
    }
    tracing::info!(organization, count = ids.len(), "workspaces selected");
    ids
}

#[cfg(test)]
#[path = "locator_tests.rs"]
mod tests;
