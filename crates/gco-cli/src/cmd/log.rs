//! `gco log`: append an entry to the activity journal.

use crate::agent;
use crate::cmd::Project;
use crate::git::CommandGit;
use crate::output::{CliError, OutputMode, fail, render};
use anyhow::Result;
use clap::Args;
use gco_core::git::GitService;
use gco_core::model::EntryKind;
use gco_core::model::task::is_task_id;
use std::path::Path;
use tracing::debug;

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Entry text.
    pub message: String,

    /// Task the entry is about; detected from the branch when omitted.
    #[arg(long = "task", value_name = "TASK")]
    pub task: Option<String>,

    /// Entry type: start, progress, decision, block, question, answer, complete, system.
    #[arg(long = "type", value_name = "TYPE", default_value = "progress")]
    pub kind: EntryKind,
}

pub fn run_log(
    args: &LogArgs,
    agent_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let project = Project::discover(project_root, output)?;

    let branch = CommandGit::new(&project.root)
        .current_branch()
        .unwrap_or_else(|err| {
            debug!(error = %err, "no branch to detect the agent from");
            None
        });
    let identity = agent::resolve_identity(
        agent_flag,
        args.task.as_deref(),
        branch.as_deref(),
        &project.config.branch_prefix,
    );

    let Some(agent) = identity.agent else {
        return Err(fail(
            output,
            &CliError::with_details(
                "could not determine the agent",
                "Pass --agent, set GCO_AGENT, or work on an <prefix>/<agent>/<TASK> branch",
                "missing_agent",
            ),
        ));
    };
    let Some(task_id) = identity.task_id else {
        return Err(fail(
            output,
            &CliError::with_details(
                "could not determine the task",
                "Pass --task TASK-XXX or work on an <prefix>/<agent>/<TASK> branch",
                "missing_task",
            ),
        ));
    };
    if !is_task_id(&task_id) {
        return Err(fail(
            output,
            &CliError::with_details(
                format!("invalid task ID '{task_id}'"),
                "Task IDs look like TASK-001",
                "invalid_task_id",
            ),
        ));
    }
    if args.message.trim().is_empty() {
        return Err(fail(
            output,
            &CliError::with_details("empty message", "Describe what happened", "empty_message"),
        ));
    }

    let entry = project
        .journal
        .append(&agent, &task_id, args.kind, args.message.trim())
        .map_err(|err| fail(output, &CliError::from(&err)))?;

    render(output, &entry, |e, w| {
        writeln!(w, "✓ [{}] @{} / {}: {}", e.kind, e.agent, e.task_id, e.message)
    })
}
