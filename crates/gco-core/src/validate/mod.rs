//! Read-only consistency checks over a board snapshot.
//!
//! Issues are advisory data, never errors: every check runs, and results are
//! concatenated in check order. Only the branch check touches git, and a
//! failed lookup for one task is logged and skipped.

pub mod collisions;

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::git::{GitService, branch_name};
use crate::model::{Status, Task};

pub use collisions::{Collision, Touch, check_file_collisions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl Level {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub level: Level,
    /// One task ID, or several joined with `, ` for per-agent findings.
    pub task_id: String,
    pub message: String,
}

impl Issue {
    fn new(level: Level, task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            task_id: task_id.into(),
            message: message.into(),
        }
    }
}

/// Where agent branches live and what they are diffed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchPolicy {
    pub prefix: String,
    pub base: String,
}

impl Default for BranchPolicy {
    fn default() -> Self {
        Self {
            prefix: "agent".to_string(),
            base: "develop".to_string(),
        }
    }
}

impl BranchPolicy {
    /// Expected branch of an active task.
    #[must_use]
    pub fn branch_for(&self, task: &Task) -> String {
        branch_name(&self.prefix, &task.assigned, &task.id)
    }
}

/// Blocked tasks need a reason (warning) and a blocked-since date (info).
#[must_use]
pub fn check_blocked(tasks: &[Task]) -> Vec<Issue> {
    let mut issues = Vec::new();
    for task in tasks.iter().filter(|t| t.status == Status::Blocked) {
        if task.block_reason.is_empty() {
            issues.push(Issue::new(
                Level::Warning,
                &task.id,
                "blocked task has no block reason",
            ));
        }
        if task.blocked_since.is_empty() {
            issues.push(Issue::new(
                Level::Info,
                &task.id,
                "blocked task has no blocked-since date",
            ));
        }
    }
    issues
}

/// Unknown dependency IDs, and cycles back to the task itself.
///
/// The cycle search is a breadth-first walk from the task's direct
/// dependencies; visited nodes are not re-expanded and the walk stops at the
/// first return to the origin, so each task reports at most one cycle.
#[must_use]
pub fn check_dependencies(tasks: &[Task]) -> Vec<Issue> {
    let graph: HashMap<&str, Vec<String>> = tasks
        .iter()
        .map(|t| (t.id.as_str(), t.dependency_ids()))
        .collect();

    let mut issues = Vec::new();
    for task in tasks {
        let deps = task.dependency_ids();
        if deps.is_empty() {
            continue;
        }
        for dep in &deps {
            if !graph.contains_key(dep.as_str()) {
                issues.push(Issue::new(
                    Level::Error,
                    &task.id,
                    format!("dependency {dep} does not exist"),
                ));
            }
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = deps.iter().map(String::as_str).collect();
        while let Some(current) = queue.pop_front() {
            if current == task.id {
                issues.push(Issue::new(
                    Level::Error,
                    &task.id,
                    "circular dependency detected",
                ));
                break;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(next) = graph.get(current) {
                queue.extend(next.iter().map(String::as_str));
            }
        }
    }
    issues
}

/// In-progress tasks need an agent; completed tasks should carry a date.
#[must_use]
pub fn check_assignments(tasks: &[Task]) -> Vec<Issue> {
    let mut issues = Vec::new();
    for task in tasks {
        match task.status {
            Status::InProgress if !task.is_assigned() => issues.push(Issue::new(
                Level::Warning,
                &task.id,
                "in-progress task has no assigned agent",
            )),
            Status::Completed if task.completed.is_empty() => issues.push(Issue::new(
                Level::Info,
                &task.id,
                "completed task has no completion date",
            )),
            _ => {}
        }
    }
    issues
}

/// Every active task should have its branch.
#[must_use]
pub fn check_branches(tasks: &[Task], git: &dyn GitService, policy: &BranchPolicy) -> Vec<Issue> {
    let mut issues = Vec::new();
    for task in tasks.iter().filter(|t| t.is_active()) {
        let branch = policy.branch_for(task);
        match git.branch_exists(&branch) {
            Ok(true) => {}
            Ok(false) => issues.push(Issue::new(
                Level::Warning,
                &task.id,
                format!("branch {branch} not found for in-progress task"),
            )),
            Err(err) => {
                warn!(task = %task.id, branch = %branch, error = %err, "branch lookup failed; skipping");
            }
        }
    }
    issues
}

/// One warning per agent holding more than one in-progress task.
#[must_use]
pub fn check_agent_overlap(tasks: &[Task]) -> Vec<Issue> {
    let mut by_agent: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for task in tasks.iter().filter(|t| t.is_active()) {
        by_agent
            .entry(task.assigned.as_str())
            .or_default()
            .push(task.id.as_str());
    }

    by_agent
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(agent, ids)| {
            let joined = ids.join(", ");
            Issue::new(
                Level::Warning,
                joined.clone(),
                format!("{agent} has multiple tasks in progress: {joined}"),
            )
        })
        .collect()
}

/// All five checks, in order.
#[must_use]
pub fn validate_all(tasks: &[Task], git: &dyn GitService, policy: &BranchPolicy) -> Vec<Issue> {
    let mut issues = check_blocked(tasks);
    issues.extend(check_dependencies(tasks));
    issues.extend(check_assignments(tasks));
    issues.extend(check_branches(tasks, git, policy));
    issues.extend(check_agent_overlap(tasks));
    debug!(issues = issues.len(), "validation finished");
    issues
}

/// Issues and file collisions for one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub issues: Vec<Issue>,
    pub collisions: Vec<Collision>,
}

impl Report {
    /// Run every check plus collision detection.
    #[must_use]
    pub fn run(tasks: &[Task], git: &dyn GitService, policy: &BranchPolicy) -> Self {
        Self {
            issues: validate_all(tasks, git, policy),
            collisions: check_file_collisions(tasks, git, policy),
        }
    }

    #[must_use]
    pub fn count(&self, level: Level) -> usize {
        self.issues.iter().filter(|i| i.level == level).count()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.count(Level::Error) > 0
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty() && self.collisions.is_empty()
    }
}
