//! `gco review`, `gco approve`, `gco reject`: the human side of a task's
//! life cycle.
//!
//! Approval merges `<prefix>/<agent>/<TASK>` into the base branch when that
//! branch exists and completes the task; rejection sends it back to the
//! agent with a reason in the journal.

use crate::cmd::read::write_entry;
use crate::cmd::task::{write_task_detail, write_task_line};
use crate::cmd::{Project, SYSTEM_AGENT, store_failure};
use crate::git::CommandGit;
use crate::output::{CliError, OutputMode, fail, pretty_kv, pretty_section, render, render_mode};
use anyhow::Result;
use clap::Args;
use gco_core::board::StoreError;
use gco_core::clock::{Clock, SystemClock};
use gco_core::model::{EntryKind, Task};
use gco_core::review::{self, Approval, ReviewDetail, review_queue};
use serde::Serialize;
use std::path::Path;
use tracing::warn;

#[derive(Args, Debug)]
pub struct ReviewArgs {
    /// Task to inspect; lists the review queue when omitted.
    pub id: Option<String>,

    /// List the review queue even when a task is given.
    #[arg(long)]
    pub list: bool,
}

#[derive(Args, Debug)]
pub struct ApproveArgs {
    /// Task ID.
    pub id: String,

    /// Delete the agent branch after merging it.
    #[arg(long)]
    pub delete_branch: bool,
}

#[derive(Args, Debug)]
pub struct RejectArgs {
    /// Task ID.
    pub id: String,

    /// What the agent has to fix; written to the journal.
    #[arg(long, value_name = "TEXT")]
    pub reason: String,
}

#[derive(Serialize)]
struct ReviewQueue<'a> {
    total: usize,
    tasks: Vec<&'a Task>,
}

pub fn run_review(args: &ReviewArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::discover(project_root, output)?;
    match args.id.as_deref().filter(|_| !args.list) {
        Some(id) => run_detail(id, output, &project),
        None => run_queue(output, &project),
    }
}

fn run_queue(output: OutputMode, project: &Project) -> Result<()> {
    let board = project
        .store
        .load()
        .map_err(|err| store_failure(output, &err))?;
    let tasks = review_queue(&board.tasks);
    let queue = ReviewQueue {
        total: tasks.len(),
        tasks,
    };

    render_mode(
        output,
        &queue,
        |q, w| {
            for t in &q.tasks {
                writeln!(w, "{}\t{}\t{}", t.id, t.assigned, t.title)?;
            }
            Ok(())
        },
        |q, w| {
            pretty_section(w, &format!("Waiting for review ({})", q.total))?;
            if q.tasks.is_empty() {
                return writeln!(w, "Nothing to review.");
            }
            for t in &q.tasks {
                write_task_line(w, t)?;
            }
            writeln!(w)?;
            writeln!(w, "Inspect one with: gco review <TASK>")
        },
    )
}

fn run_detail(id: &str, output: OutputMode, project: &Project) -> Result<()> {
    let task = match project.store.find_task(id) {
        Ok(Some(task)) => task,
        Ok(None) => return Err(store_failure(output, &StoreError::NotFound(id.to_string()))),
        Err(err) => return Err(store_failure(output, &err)),
    };
    let history = project.journal.entries_for(&task.id).unwrap_or_else(|err| {
        warn!(task = %task.id, error = %err, "journal unreadable; showing no history");
        Vec::new()
    });
    let git = CommandGit::new(&project.root);
    let detail = ReviewDetail::gather(task, history, &git, &project.config.branch_policy());

    render_mode(
        output,
        &detail,
        |d, w| {
            writeln!(w, "{}\t{}\t{}\t{}", d.task.id, d.task.status, d.branch, d.branch_exists)?;
            for file in &d.changed_files {
                writeln!(w, "{file}")?;
            }
            Ok(())
        },
        |d, w| {
            write_task_detail(w, &d.task)?;
            writeln!(w)?;
            pretty_section(w, "Branch")?;
            pretty_kv(w, "Name", &d.branch)?;
            pretty_kv(w, "Base", &d.base)?;
            if !d.branch_exists {
                writeln!(w, "Branch not found; approving only updates the board.")?;
            }
            if !d.commits.is_empty() {
                writeln!(w, "Commits:")?;
                for commit in &d.commits {
                    writeln!(w, "  {commit}")?;
                }
            }
            if !d.changed_files.is_empty() {
                writeln!(w, "Changed files:")?;
                for file in &d.changed_files {
                    writeln!(w, "  {file}")?;
                }
            }
            if !d.history.is_empty() {
                writeln!(w)?;
                pretty_section(w, "History")?;
                for entry in &d.history {
                    write_entry(w, entry)?;
                }
            }
            writeln!(w)?;
            writeln!(w, "Next: gco approve {0} | gco reject {0} --reason \"...\"", d.task.id)
        },
    )
}

fn approval_message(approval: &Approval) -> String {
    if approval.merged {
        format!("✅ Tarea aprobada por humano y mergeada a {}", approval.base)
    } else {
        "✅ Tarea aprobada por humano".to_string()
    }
}

pub fn run_approve(args: &ApproveArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::discover(project_root, output)?;
    let git = CommandGit::new(&project.root);
    let approval = review::approve(
        &project.store,
        &git,
        &project.config.branch_policy(),
        &args.id,
        args.delete_branch,
        &SystemClock.timestamp(),
    )
    .map_err(|err| fail(output, &CliError::from(&err)))?;
    project.record(
        SYSTEM_AGENT,
        &approval.task.id,
        EntryKind::Complete,
        &approval_message(&approval),
    );

    render(output, &approval, |a, w| {
        writeln!(w, "✓ {} approved ({} → {})", a.task.id, a.previous_status, a.task.status)?;
        if a.merged {
            writeln!(w, "  merged {} into {}", a.branch, a.base)?;
        } else {
            writeln!(w, "  no branch {}; board updated only", a.branch)?;
        }
        if a.branch_deleted {
            writeln!(w, "  deleted {}", a.branch)?;
        }
        Ok(())
    })
}

pub fn run_reject(args: &RejectArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let reason = args.reason.trim();
    if reason.is_empty() {
        return Err(fail(
            output,
            &CliError::with_details(
                "empty rejection reason",
                "Tell the agent what to fix: --reason \"...\"",
                "empty_reason",
            ),
        ));
    }
    let project = Project::discover(project_root, output)?;
    let task = review::reject(&project.store, &args.id).map_err(|err| store_failure(output, &err))?;
    project.record_system(&task.id, &format!("❌ Tarea rechazada: {reason}"));

    render(output, &task, |t, w| {
        writeln!(w, "✓ {} rejected → {}", t.id, t.status)?;
        writeln!(w, "  reason: {reason}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gco_core::model::Status;

    fn approval(merged: bool) -> Approval {
        Approval {
            task: Task::new("TASK-001", "Login"),
            previous_status: Status::Review,
            branch: "agent/vscode/TASK-001".into(),
            base: "develop".into(),
            merged,
            branch_deleted: false,
        }
    }

    #[test]
    fn approval_message_names_base_only_after_merge() {
        assert_eq!(
            approval_message(&approval(true)),
            "✅ Tarea aprobada por humano y mergeada a develop"
        );
        assert_eq!(approval_message(&approval(false)), "✅ Tarea aprobada por humano");
    }
}
