//! `gco task`: create, list, inspect and edit tasks on the board.

use crate::cmd::{Project, handle_for, store_failure};
use crate::output::{CliError, OutputMode, fail, pretty_kv, pretty_section, render, render_mode};
use anyhow::Result;
use clap::{Args, Subcommand};
use gco_core::board::StoreError;
use gco_core::board::labels::{EMPTY, NO_DEPENDENCIES};
use gco_core::clock::{Clock, SystemClock};
use gco_core::model::task::{agent_handle, is_task_id};
use gco_core::model::{Criterion, Status, Task, TaskPatch};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Create a task (ID allocated after the highest on the board)
    Create(CreateArgs),
    /// List tasks, hiding completed ones unless filtered or --all
    List(ListArgs),
    /// Show every field of one task
    Show(ShowArgs),
    /// Change a task's status, stamping block or completion times
    Status(StatusArgs),
    /// Edit task fields in place
    Update(UpdateArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Task title.
    #[arg(long)]
    pub title: String,

    /// Explicit ID (`TASK-<digits>`); allocated automatically when omitted.
    #[arg(long)]
    pub id: Option<String>,

    /// Short description.
    #[arg(long, default_value = "")]
    pub description: String,

    /// Acceptance criterion; repeat for several.
    #[arg(long = "criterion", value_name = "TEXT")]
    pub criteria: Vec<String>,

    /// Dependencies, e.g. "TASK-001, TASK-004".
    #[arg(long = "depends-on", value_name = "IDS", default_value = "")]
    pub depends_on: String,

    /// Technical notes.
    #[arg(long, default_value = "")]
    pub notes: String,

    /// Suggested agent (with or without `@`).
    #[arg(long = "assign", value_name = "AGENT")]
    pub assign: Option<String>,

    /// Linked GitHub issue number.
    #[arg(long)]
    pub issue: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only tasks in this status.
    #[arg(long)]
    pub status: Option<Status>,

    /// Only tasks assigned to this agent, or `unassigned`.
    #[arg(long)]
    pub assigned: Option<String>,

    /// Include completed tasks.
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Task ID.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Task ID.
    pub id: String,

    /// New status: pending, in-progress, blocked, review, completed.
    pub status: Status,

    /// Why the task is blocked (used with `blocked`).
    #[arg(long)]
    pub reason: Option<String>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Task ID.
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Replace the acceptance criteria; repeat for several.
    #[arg(long = "criterion", value_name = "TEXT")]
    pub criteria: Vec<String>,

    /// Mark the criterion at this 1-based position done.
    #[arg(long, value_name = "N")]
    pub check: Vec<usize>,

    #[arg(long = "depends-on", value_name = "IDS")]
    pub depends_on: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    #[arg(long)]
    pub issue: Option<u64>,
}

pub fn run_task(args: &TaskArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::discover(project_root, output)?;
    match &args.command {
        TaskCommand::Create(args) => run_create(args, output, &project),
        TaskCommand::List(args) => run_list(args, output, &project),
        TaskCommand::Show(args) => run_show(args, output, &project),
        TaskCommand::Status(args) => run_status(args, output, &project),
        TaskCommand::Update(args) => run_update(args, output, &project),
    }
}

fn invalid_id(output: OutputMode, id: &str) -> anyhow::Error {
    fail(
        output,
        &CliError::with_details(
            format!("invalid task ID '{id}'"),
            "Task IDs look like TASK-001",
            "invalid_task_id",
        ),
    )
}

fn load_task(project: &Project, id: &str, output: OutputMode) -> Result<Task> {
    match project.store.find_task(id) {
        Ok(Some(task)) => Ok(task),
        Ok(None) => Err(store_failure(output, &StoreError::NotFound(id.to_string()))),
        Err(err) => Err(store_failure(output, &err)),
    }
}

fn run_create(args: &CreateArgs, output: OutputMode, project: &Project) -> Result<()> {
    let id = match &args.id {
        Some(id) if !is_task_id(id) => return Err(invalid_id(output, id)),
        Some(id) => id.clone(),
        None => project
            .store
            .next_id()
            .map_err(|err| store_failure(output, &err))?,
    };

    let mut task = Task::new(id, args.title.trim());
    task.description.clone_from(&args.description);
    task.criteria = args.criteria.iter().map(Criterion::open).collect();
    task.dependencies.clone_from(&args.depends_on);
    task.notes.clone_from(&args.notes);
    task.assigned = match args.assign.as_deref() {
        Some(name) => handle_for(output, name)?,
        None => String::new(),
    };
    task.github_issue = args.issue;

    let task = project
        .store
        .add_task(task)
        .map_err(|err| store_failure(output, &err))?;
    project.record_system(&task.id, &format!("Tarea creada: {}", task.title));

    render(output, &task, |t, w| {
        writeln!(w, "✓ Created {}: {}", t.id, t.title)
    })
}

fn matches_assignee(task: &Task, filter: &str) -> bool {
    if filter == "unassigned" {
        !task.is_assigned()
    } else {
        agent_handle(filter).is_some_and(|handle| task.assigned == handle)
    }
}

/// Tasks passing the list filters, in board order.
fn filter_tasks<'a>(tasks: &'a [Task], args: &ListArgs) -> Vec<&'a Task> {
    let hide_completed = !args.all && args.status.is_none() && args.assigned.is_none();
    tasks
        .iter()
        .filter(|t| args.status.is_none_or(|s| t.status == s))
        .filter(|t| {
            args.assigned
                .as_deref()
                .is_none_or(|a| matches_assignee(t, a))
        })
        .filter(|t| !(hide_completed && t.status == Status::Completed))
        .collect()
}

#[derive(Serialize)]
struct TaskList<'a> {
    total: usize,
    tasks: Vec<&'a Task>,
}

fn or_dash(text: &str) -> &str {
    if text.is_empty() { "-" } else { text }
}

fn run_list(args: &ListArgs, output: OutputMode, project: &Project) -> Result<()> {
    let board = project
        .store
        .load()
        .map_err(|err| store_failure(output, &err))?;
    let list = TaskList {
        total: board.tasks.len(),
        tasks: filter_tasks(&board.tasks, args),
    };

    render_mode(
        output,
        &list,
        |list, w| {
            for t in &list.tasks {
                writeln!(w, "{}\t{}\t{}\t{}", t.id, t.status, or_dash(&t.assigned), t.title)?;
            }
            Ok(())
        },
        |list, w| {
            pretty_section(w, &format!("Tasks ({}/{})", list.tasks.len(), list.total))?;
            if list.tasks.is_empty() {
                return writeln!(w, "No tasks match the given filters.");
            }
            for t in &list.tasks {
                write_task_line(w, t)?;
            }
            Ok(())
        },
    )
}

pub(crate) fn write_task_line(w: &mut dyn Write, task: &Task) -> io::Result<()> {
    let assigned = if task.is_assigned() {
        format!(" ({})", task.assigned)
    } else {
        String::new()
    };
    writeln!(
        w,
        "{} {:<9} {:<12} {}{assigned}",
        task.status.icon(),
        task.id,
        task.status,
        task.title
    )
}

pub(crate) fn write_task_detail(w: &mut dyn Write, task: &Task) -> io::Result<()> {
    pretty_section(w, &format!("{} - {}", task.id, task.title))?;
    pretty_kv(w, "Status", format!("{} {}", task.status.icon(), task.status))?;
    pretty_kv(w, "Assigned", or_dash(&task.assigned))?;
    pretty_kv(w, "Description", or_dash(&task.description))?;
    writeln!(w, "Criteria:")?;
    for (i, c) in task.criteria.iter().enumerate() {
        let mark = if c.done { '✓' } else { '○' };
        writeln!(w, "  {mark} {}. {}", i + 1, c.text)?;
    }
    let deps = if task.dependencies.is_empty() {
        NO_DEPENDENCIES
    } else {
        task.dependencies.as_str()
    };
    pretty_kv(w, "Dependencies", deps)?;
    pretty_kv(w, "Notes", if task.notes.is_empty() { EMPTY } else { task.notes.as_str() })?;
    if !task.completed.is_empty() {
        pretty_kv(w, "Completed", &task.completed)?;
    }
    if task.status == Status::Blocked {
        pretty_kv(w, "Blocked since", or_dash(&task.blocked_since))?;
        pretty_kv(w, "Block reason", or_dash(&task.block_reason))?;
    }
    if let Some(issue) = task.github_issue {
        pretty_kv(w, "GitHub issue", format!("#{issue}"))?;
    }
    Ok(())
}

fn run_show(args: &ShowArgs, output: OutputMode, project: &Project) -> Result<()> {
    let task = load_task(project, &args.id, output)?;
    render_mode(
        output,
        &task,
        |t, w| {
            writeln!(w, "{}\t{}\t{}\t{}", t.id, t.status, or_dash(&t.assigned), t.title)?;
            for c in &t.criteria {
                writeln!(w, "- [{}] {}", if c.done { 'x' } else { ' ' }, c.text)?;
            }
            Ok(())
        },
        |t, w| write_task_detail(w, t),
    )
}

fn status_message(status: Status, reason: Option<&str>) -> String {
    match reason.filter(|r| !r.is_empty()) {
        Some(reason) => format!("Estado cambiado a {status}: {reason}"),
        None => format!("Estado cambiado a {status}"),
    }
}

fn run_status(args: &StatusArgs, output: OutputMode, project: &Project) -> Result<()> {
    let patch = TaskPatch::transition(
        args.status,
        &SystemClock.timestamp(),
        args.reason.as_deref(),
    );
    let task = project
        .store
        .update_task(&args.id, patch)
        .map_err(|err| store_failure(output, &err))?;
    project.record_system(&task.id, &status_message(args.status, args.reason.as_deref()));

    render(output, &task, |t, w| writeln!(w, "✓ {} → {}", t.id, t.status))
}

/// The patch `task update` applies. `--check` edits the criteria that are
/// being set, or the task's current ones.
fn build_update(args: &UpdateArgs, current: &Task) -> Result<TaskPatch, usize> {
    let mut criteria = if args.criteria.is_empty() {
        current.criteria.clone()
    } else {
        args.criteria.iter().map(Criterion::open).collect()
    };
    for &n in &args.check {
        let criterion = n
            .checked_sub(1)
            .and_then(|i| criteria.get_mut(i))
            .ok_or(n)?;
        criterion.done = true;
    }
    let criteria_changed = !args.criteria.is_empty() || !args.check.is_empty();

    Ok(TaskPatch {
        title: args.title.clone(),
        description: args.description.clone(),
        criteria: criteria_changed.then_some(criteria),
        dependencies: args.depends_on.clone(),
        notes: args.notes.clone(),
        github_issue: args.issue.map(Some),
        ..TaskPatch::default()
    })
}

fn run_update(args: &UpdateArgs, output: OutputMode, project: &Project) -> Result<()> {
    let current = load_task(project, &args.id, output)?;
    let patch = build_update(args, &current).map_err(|n| {
        fail(
            output,
            &CliError::with_details(
                format!("{} has no criterion {n}", current.id),
                format!("Criteria are numbered 1..={}", current.criteria.len()),
                "invalid_criterion",
            ),
        )
    })?;
    if patch.is_empty() {
        return Err(fail(
            output,
            &CliError::with_details(
                "nothing to update",
                "Pass at least one field flag, e.g. --title or --notes",
                "empty_update",
            ),
        ));
    }

    let task = project
        .store
        .update_task(&args.id, patch)
        .map_err(|err| store_failure(output, &err))?;
    project.record_system(&task.id, "Tarea actualizada");

    render(output, &task, |t, w| writeln!(w, "✓ Updated {}", t.id))
}
