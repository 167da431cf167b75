//! `gco status`: project overview.
//!
//! Also rewrites the agent table at the top of the journal so humans reading
//! `DEVELOP_LOG.md` see the same picture.

use crate::cmd::{Project, store_failure};
use crate::git::CommandGit;
use crate::output::{OutputMode, pretty_section, render_mode};
use anyhow::Result;
use gco_core::journal::AgentStatusRow;
use gco_core::model::{Status, Task};
use gco_core::report::{Summary, status_rows};
use gco_core::validate::{Issue, validate_all};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskRef {
    id: String,
    title: String,
    assigned: String,
    block_reason: String,
}

impl From<&Task> for TaskRef {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            assigned: task.assigned.clone(),
            block_reason: task.block_reason.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    summary: Summary,
    agents: Vec<AgentStatusRow>,
    blocked: Vec<TaskRef>,
    unassigned: Vec<TaskRef>,
    review: Vec<TaskRef>,
    issues: Vec<Issue>,
}

fn refs(tasks: &[Task], keep: impl Fn(&Task) -> bool) -> Vec<TaskRef> {
    tasks.iter().filter(|t| keep(t)).map(TaskRef::from).collect()
}

fn write_text(report: &StatusReport, w: &mut dyn Write) -> io::Result<()> {
    let counts: Vec<String> = report
        .summary
        .by_status
        .iter()
        .map(|(status, n)| format!("{status}={n}"))
        .collect();
    writeln!(w, "total={} {}", report.summary.total, counts.join(" "))?;
    for row in &report.agents {
        writeln!(w, "agent\t{}\t{}\t{}", row.agent, row.task_id, row.branch)?;
    }
    for t in &report.blocked {
        writeln!(w, "blocked\t{}\t{}", t.id, t.block_reason)?;
    }
    for t in &report.unassigned {
        writeln!(w, "unassigned\t{}\t{}", t.id, t.title)?;
    }
    for t in &report.review {
        writeln!(w, "review\t{}\t{}", t.id, t.title)?;
    }
    for issue in &report.issues {
        writeln!(w, "{}\t{}\t{}", issue.level, issue.task_id, issue.message)?;
    }
    Ok(())
}

fn write_pretty(report: &StatusReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Project status")?;
    writeln!(w, "📊 Summary ({} tasks):", report.summary.total)?;
    for (status, n) in &report.summary.by_status {
        writeln!(w, "  {} {status}: {n}", status.icon())?;
    }

    if !report.agents.is_empty() {
        writeln!(w)?;
        writeln!(w, "🤖 Active agents:")?;
        for row in &report.agents {
            writeln!(w, "  {} → {}", row.agent, row.task_id)?;
            writeln!(w, "    Branch: {}  Last activity: {}", row.branch, row.last_activity)?;
        }
    }
    if !report.blocked.is_empty() {
        writeln!(w)?;
        writeln!(w, "{} Blocked:", Status::Blocked.icon())?;
        for t in &report.blocked {
            writeln!(w, "  {} {}", t.id, t.title)?;
            if !t.block_reason.is_empty() {
                writeln!(w, "    Reason: {}", t.block_reason)?;
            }
        }
    }
    if !report.unassigned.is_empty() {
        writeln!(w)?;
        writeln!(w, "{} Pending, unassigned:", Status::Pending.icon())?;
        for t in &report.unassigned {
            writeln!(w, "  {} {}", t.id, t.title)?;
        }
    }
    if !report.review.is_empty() {
        writeln!(w)?;
        writeln!(w, "{} Awaiting review:", Status::Review.icon())?;
        for t in &report.review {
            let who = if t.assigned.is_empty() { "no agent" } else { t.assigned.as_str() };
            writeln!(w, "  {} {} ({who})", t.id, t.title)?;
        }
    }
    if !report.issues.is_empty() {
        writeln!(w)?;
        writeln!(w, "🚨 Alerts:")?;
        for issue in &report.issues {
            writeln!(w, "  [{}] {}: {}", issue.level, issue.task_id, issue.message)?;
        }
    }
    Ok(())
}

pub fn run_status(output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::discover(project_root, output)?;
    let board = project
        .store
        .load()
        .map_err(|err| store_failure(output, &err))?;
    let git = CommandGit::new(&project.root);
    let policy = project.config.branch_policy();

    let entries = project.journal.entries().unwrap_or_else(|err| {
        warn!(error = %err, "journal unreadable; last activity unknown");
        Vec::new()
    });
    let agents = status_rows(&board.tasks, &entries, &git, &policy);
    if let Err(err) = project.journal.update_status_table(&agents) {
        warn!(error = %err, "failed to refresh the journal agent table");
    }

    let tasks = &board.tasks;
    let report = StatusReport {
        summary: Summary::of(tasks),
        agents,
        blocked: refs(tasks, |t| t.status == Status::Blocked),
        unassigned: refs(tasks, |t| t.status == Status::Pending && !t.is_assigned()),
        review: refs(tasks, |t| t.status == Status::Review),
        issues: validate_all(tasks, &git, &policy),
    };

    render_mode(output, &report, |r, w| write_text(r, w), |r, w| write_pretty(r, w))
}
