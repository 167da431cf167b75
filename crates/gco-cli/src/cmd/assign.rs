//! `gco assign <TASK> <AGENT>`: hand a task to an agent.
//!
//! The task goes back to `pending` under the new handle; the agent creates
//! `<prefix>/<agent>/<TASK>` from the main branch when it starts work.

use crate::cmd::{Project, handle_for, store_failure};
use crate::output::{CliError, OutputMode, fail, render};
use anyhow::Result;
use clap::Args;
use gco_core::board::StoreError;
use gco_core::model::{Status, TaskPatch};
use serde::Serialize;
use std::path::Path;
use tracing::warn;

#[derive(Args, Debug)]
pub struct AssignArgs {
    /// Task ID.
    pub id: String,

    /// Agent to assign (with or without `@`).
    #[arg(value_name = "AGENT")]
    pub assignee: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssignOutput {
    ok: bool,
    task_id: String,
    agent: String,
    previous: Option<String>,
    branch: String,
    base: String,
}

pub fn run_assign(args: &AssignArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::discover(project_root, output)?;
    let task = match project.store.find_task(&args.id) {
        Ok(Some(task)) => task,
        Ok(None) => {
            return Err(store_failure(output, &StoreError::NotFound(args.id.clone())));
        }
        Err(err) => return Err(store_failure(output, &err)),
    };

    if task.status == Status::Completed {
        return Err(fail(
            output,
            &CliError::with_details(
                format!("{} is completed and cannot be assigned", task.id),
                format!("Reopen it first: gco task status {} pending", task.id),
                "invalid_state",
            ),
        ));
    }

    let handle = handle_for(output, &args.assignee)?;
    if handle.is_empty() {
        return Err(fail(
            output,
            &CliError::with_details(
                "missing agent name",
                "Pass the agent to assign, e.g. gco assign TASK-001 copilot",
                "missing_agent",
            ),
        ));
    }
    let previous = task.is_assigned().then(|| task.assigned.clone());
    if let Some(previous) = previous.as_deref().filter(|p| *p != handle) {
        warn!(task = %task.id, from = previous, to = %handle, "reassigning task");
    }

    let patch = TaskPatch {
        assigned: Some(handle.clone()),
        status: Some(Status::Pending),
        ..TaskPatch::default()
    };
    let task = project
        .store
        .update_task(&task.id, patch)
        .map_err(|err| store_failure(output, &err))?;

    let policy = project.config.branch_policy();
    let branch = policy.branch_for(&task);
    project.record_system(
        &task.id,
        &format!("Tarea asignada a {handle}. Rama: {branch}."),
    );

    let result = AssignOutput {
        ok: true,
        task_id: task.id,
        agent: handle,
        previous,
        branch,
        base: policy.base,
    };
    render(output, &result, |r, w| {
        writeln!(w, "✓ {} assigned to {}", r.task_id, r.agent)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  git checkout -b {} {}", r.branch, r.base)?;
        writeln!(
            w,
            "  gco log --agent {} --task {} --type start \"Starting work\"",
            r.agent.trim_start_matches('@'),
            r.task_id
        )
    })
}
