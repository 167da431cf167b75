//! `gco claim <TASK>`: an agent takes an open task for itself.

use crate::agent;
use crate::cmd::{Project, handle_for, store_failure};
use crate::git::CommandGit;
use crate::output::{CliError, OutputMode, fail, render};
use anyhow::Result;
use clap::Args;
use gco_core::board::StoreError;
use gco_core::error::ErrorCode;
use gco_core::git::GitService;
use gco_core::model::{EntryKind, Status, Task, TaskPatch};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

#[derive(Args, Debug)]
pub struct ClaimArgs {
    /// Task ID.
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClaimOutput {
    ok: bool,
    task_id: String,
    agent: String,
    status: Status,
    branch: String,
    base: String,
}

/// Why `handle` may not claim `task`, if anything stops it.
fn claim_refusal(task: &Task, handle: &str) -> Option<CliError> {
    if task.status == Status::Completed {
        return Some(CliError::with_details(
            format!("{} is completed and cannot be claimed", task.id),
            format!("Reopen it first: gco task status {} pending", task.id),
            "invalid_state",
        ));
    }
    if task.is_assigned() && task.assigned != handle {
        return Some(CliError::coded(
            format!("{} is already assigned to {}", task.id, task.assigned),
            ErrorCode::TaskAlreadyAssigned,
            None,
        ));
    }
    None
}

pub fn run_claim(
    args: &ClaimArgs,
    agent_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let project = Project::discover(project_root, output)?;

    let git = CommandGit::new(&project.root);
    let branch = git.current_branch().unwrap_or_else(|err| {
        debug!(error = %err, "no branch to detect the agent from");
        None
    });
    let identity = agent::resolve_identity(
        agent_flag,
        Some(args.id.as_str()),
        branch.as_deref(),
        &project.config.branch_prefix,
    );
    let Some(agent) = identity.agent else {
        return Err(fail(
            output,
            &CliError::with_details(
                "could not determine the agent",
                "Pass --agent or set GCO_AGENT",
                "missing_agent",
            ),
        ));
    };
    let handle = handle_for(output, &agent)?;

    let task = match project.store.find_task(&args.id) {
        Ok(Some(task)) => task,
        Ok(None) => {
            return Err(store_failure(output, &StoreError::NotFound(args.id.clone())));
        }
        Err(err) => return Err(store_failure(output, &err)),
    };
    if let Some(refusal) = claim_refusal(&task, &handle) {
        return Err(fail(output, &refusal));
    }

    let patch = TaskPatch {
        assigned: Some(handle.clone()),
        status: Some(Status::InProgress),
        ..TaskPatch::default()
    };
    let task = project
        .store
        .update_task(&task.id, patch)
        .map_err(|err| store_failure(output, &err))?;
    project.record(
        &agent,
        &task.id,
        EntryKind::Start,
        &format!("Tarea reclamada por {handle}"),
    );

    let policy = project.config.branch_policy();
    let result = ClaimOutput {
        ok: true,
        branch: policy.branch_for(&task),
        base: policy.base,
        task_id: task.id,
        agent: handle,
        status: task.status,
    };
    render(output, &result, |r, w| {
        writeln!(w, "✓ {} claimed by {} ({})", r.task_id, r.agent, r.status)?;
        writeln!(w, "Next: git checkout -b {} {}", r.branch, r.base)
    })
}
