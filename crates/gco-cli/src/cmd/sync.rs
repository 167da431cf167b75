//! `gco sync --file <issues.json>`: import GitHub issues onto the board.
//!
//! The file is the JSON the GitHub issues API (or `gh issue list --json
//! number,title,body,state`) returns: an array of issues or one issue.

use crate::cmd::{Project, store_failure};
use crate::output::{CliError, OutputMode, fail, render};
use anyhow::{Context as _, Result};
use clap::Args;
use gco_core::clock::{Clock, SystemClock};
use gco_core::import::{SyncPlan, parse_issues, sync_issues};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// JSON file with the issues to import.
    #[arg(long, value_name = "PATH")]
    pub file: PathBuf,

    /// Show what would change without writing anything.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncOutput {
    dry_run: bool,
    #[serde(flatten)]
    plan: SyncPlan,
}

pub fn run_sync(args: &SyncArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::discover(project_root, output)?;
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let issues = parse_issues(&content).map_err(|err| {
        fail(
            output,
            &CliError::with_details(
                format!("{} is not valid issue JSON: {err}", args.file.display()),
                "Export with: gh issue list --state all --json number,title,body,state",
                "invalid_issue_json",
            ),
        )
    })?;

    let mut board = project
        .store
        .load()
        .map_err(|err| store_failure(output, &err))?;
    let plan = sync_issues(&board, &issues);

    if !args.dry_run && !plan.is_empty() {
        let now = SystemClock.timestamp();
        plan.clone().apply(&mut board.tasks, &now);
        board.metadata.last_sync = Some(now);
        project
            .store
            .save(&board)
            .map_err(|err| store_failure(output, &err))?;

        for task in &plan.created {
            let issue = task.github_issue.unwrap_or_default();
            project.record_system(&task.id, &format!("Tarea creada desde issue #{issue}"));
        }
        for id in &plan.closed {
            project.record_system(id, "Issue cerrado, tarea completada");
        }
    }

    let result = SyncOutput {
        dry_run: args.dry_run,
        plan,
    };
    render(output, &result, |r, w| {
        for task in &r.plan.created {
            writeln!(w, "+ {} {}", task.id, task.title)?;
        }
        for id in &r.plan.closed {
            writeln!(w, "~ {id} → completed")?;
        }
        let (created, closed) = (r.plan.created.len(), r.plan.closed.len());
        if r.dry_run {
            writeln!(
                w,
                "dry run: would create {created}, complete {closed}; {} unchanged",
                r.plan.unchanged
            )
        } else {
            writeln!(
                w,
                "created {created}, completed {closed}; {} unchanged",
                r.plan.unchanged
            )
        }
    })
}
