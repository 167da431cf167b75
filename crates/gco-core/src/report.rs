//! Project status: per-status counts, per-agent statistics and the agent
//! table rows.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::git::GitService;
use crate::journal::AgentStatusRow;
use crate::model::{JournalEntry, Status, Task};
use crate::validate::BranchPolicy;

/// Shown in the branch column when an active task has no branch.
pub const NO_BRANCH: &str = "(sin rama)";
const IN_PROGRESS_TEXT: &str = "En progreso";
const NO_BLOCKS: &str = "Ninguno";
const NO_ACTIVITY: &str = "-";

/// Task counts per status, in status order. Statuses with no tasks are
/// omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub by_status: BTreeMap<Status, usize>,
}

impl Summary {
    #[must_use]
    pub fn of(tasks: &[Task]) -> Self {
        let mut by_status = BTreeMap::new();
        for task in tasks {
            *by_status.entry(task.status).or_insert(0) += 1;
        }
        Self {
            total: tasks.len(),
            by_status,
        }
    }

    #[must_use]
    pub fn count(&self, status: Status) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Key used in [`Stats::by_agent`] for tasks nobody holds.
pub const UNASSIGNED: &str = "unassigned";

/// Per-agent task counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStats {
    pub total: usize,
    pub completed: usize,
}

/// Board-wide statistics for `gco stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(flatten)]
    pub summary: Summary,
    /// Keyed by handle (`@vscode`), or [`UNASSIGNED`].
    pub by_agent: BTreeMap<String, AgentStats>,
    pub completed: usize,
    pub blocked: usize,
    /// Completed share of all tasks, rounded to a whole percent.
    pub completion_percent: usize,
}

impl Stats {
    #[must_use]
    pub fn of(tasks: &[Task]) -> Self {
        let summary = Summary::of(tasks);
        let mut by_agent: BTreeMap<String, AgentStats> = BTreeMap::new();
        for task in tasks {
            let key = if task.is_assigned() {
                task.assigned.clone()
            } else {
                UNASSIGNED.to_string()
            };
            let stats = by_agent.entry(key).or_default();
            stats.total += 1;
            if task.status == Status::Completed {
                stats.completed += 1;
            }
        }
        let completed = summary.count(Status::Completed);
        let completion_percent = if summary.total == 0 {
            0
        } else {
            (completed * 200 + summary.total) / (summary.total * 2)
        };
        Self {
            blocked: summary.count(Status::Blocked),
            completed,
            completion_percent,
            by_agent,
            summary,
        }
    }
}

/// One row per active task for the journal's agent table.
///
/// Last activity is the time of the task's latest entry in `entries`.
/// A failed branch lookup is logged and shown as no branch.
#[must_use]
pub fn status_rows(
    tasks: &[Task],
    entries: &[JournalEntry],
    git: &dyn GitService,
    policy: &BranchPolicy,
) -> Vec<AgentStatusRow> {
    tasks
        .iter()
        .filter(|t| t.is_active())
        .map(|task| {
            let branch = policy.branch_for(task);
            let exists = git.branch_exists(&branch).unwrap_or_else(|err| {
                warn!(task = %task.id, branch = %branch, error = %err, "branch lookup failed");
                false
            });
            let last_activity = entries
                .iter()
                .rev()
                .find(|e| e.task_id == task.id)
                .map_or_else(|| NO_ACTIVITY.to_string(), |e| e.time.clone());
            AgentStatusRow {
                agent: task.assigned.clone(),
                task_id: task.id.clone(),
                status: task.status,
                status_text: IN_PROGRESS_TEXT.to_string(),
                branch: if exists { branch } else { NO_BRANCH.to_string() },
                last_activity,
                blocks: NO_BLOCKS.to_string(),
            }
        })
        .collect()
}
