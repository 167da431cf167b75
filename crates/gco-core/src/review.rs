//! Human review of finished work: the review queue, approval (merge into
//! the base branch) and rejection (back to in progress).

use serde::Serialize;
use tracing::{info, warn};

use crate::board::{StoreError, TaskStore};
use crate::error::ErrorCode;
use crate::git::{GitError, GitService};
use crate::model::{JournalEntry, Status, Task, TaskPatch};
use crate::validate::BranchPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("task {0} has no assigned agent")]
    NotAssigned(String),

    #[error("failed to merge {branch} into {base}: {source}")]
    Merge {
        branch: String,
        base: String,
        #[source]
        source: GitError,
    },
}

impl ReviewError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Store(err) => err.code(),
            Self::NotAssigned(_) => ErrorCode::TaskNotAssigned,
            Self::Merge { .. } => ErrorCode::GitCommandFailed,
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Merge { .. } => {
                Some("Resolve the conflict on the branch, then approve again.")
            }
            Self::Store(_) | Self::NotAssigned(_) => self.code().hint(),
        }
    }
}

/// Tasks waiting for a human, in board order.
#[must_use]
pub fn review_queue(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|t| t.status == Status::Review).collect()
}

/// Everything a reviewer looks at for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDetail {
    pub task: Task,
    pub branch: String,
    pub base: String,
    pub branch_exists: bool,
    pub changed_files: Vec<String>,
    pub commits: Vec<String>,
    pub history: Vec<JournalEntry>,
}

impl ReviewDetail {
    /// Gather the branch diff and log for `task`. Git failures are logged
    /// and leave the branch sections empty.
    #[must_use]
    pub fn gather(
        task: Task,
        history: Vec<JournalEntry>,
        git: &dyn GitService,
        policy: &BranchPolicy,
    ) -> Self {
        let branch = policy.branch_for(&task);
        let base = policy.base.clone();
        let exists = task.is_assigned()
            && git.branch_exists(&branch).unwrap_or_else(|err| {
                warn!(task = %task.id, branch = %branch, error = %err, "branch lookup failed");
                false
            });

        let (changed_files, commits) = if exists {
            let files = git.changed_files(&branch, &base).unwrap_or_else(|err| {
                warn!(branch = %branch, error = %err, "diff failed");
                Vec::new()
            });
            let commits = git.commits(&branch, &base).unwrap_or_else(|err| {
                warn!(branch = %branch, error = %err, "log failed");
                Vec::new()
            });
            (files, commits)
        } else {
            (Vec::new(), Vec::new())
        };

        Self {
            task,
            branch,
            base,
            branch_exists: exists,
            changed_files,
            commits,
            history,
        }
    }
}

/// Result of [`approve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub task: Task,
    pub previous_status: Status,
    pub branch: String,
    pub base: String,
    pub merged: bool,
    pub branch_deleted: bool,
}

/// Merge commit message for an approved task.
#[must_use]
pub fn merge_message(task: &Task) -> String {
    format!("feat({}): {} [skip ci]", task.id, task.title)
}

/// Approve a task: merge its branch into the base when the branch exists,
/// then mark it completed. With `delete_branch` the merged branch is
/// removed; a failed delete is only logged.
///
/// Approving a task that is neither in review nor in progress is allowed
/// but logged. A failed merge leaves the board untouched.
///
/// # Errors
///
/// Returns [`ReviewError::NotAssigned`] for an unassigned task,
/// [`ReviewError::Merge`] if the merge fails, or [`ReviewError::Store`] for
/// a missing task or a board read/write failure.
pub fn approve(
    store: &TaskStore,
    git: &dyn GitService,
    policy: &BranchPolicy,
    id: &str,
    delete_branch: bool,
    timestamp: &str,
) -> Result<Approval, ReviewError> {
    let task = store
        .find_task(id)?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
    if !matches!(task.status, Status::Review | Status::InProgress) {
        warn!(task = %task.id, status = %task.status, "approving a task that is not in review");
    }
    if !task.is_assigned() {
        return Err(ReviewError::NotAssigned(task.id));
    }

    let branch = policy.branch_for(&task);
    let base = policy.base.clone();
    let exists = git.branch_exists(&branch).unwrap_or_else(|err| {
        warn!(task = %task.id, branch = %branch, error = %err, "branch lookup failed");
        false
    });
    if exists {
        git.merge_branch(&branch, &base, &merge_message(&task))
            .map_err(|source| ReviewError::Merge {
                branch: branch.clone(),
                base: base.clone(),
                source,
            })?;
        info!(task = %task.id, branch = %branch, base = %base, "branch merged");
    }

    let previous_status = task.status;
    let updated = store.update_task(
        &task.id,
        TaskPatch::transition(Status::Completed, timestamp, None),
    )?;

    let branch_deleted = exists
        && delete_branch
        && git.delete_branch(&branch).map_or_else(
            |err| {
                warn!(branch = %branch, error = %err, "failed to delete merged branch");
                false
            },
            |()| true,
        );

    Ok(Approval {
        task: updated,
        previous_status,
        branch,
        base,
        merged: exists,
        branch_deleted,
    })
}

/// Send a task back to its agent: status in progress, completion time
/// cleared.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] for a missing task, or
/// [`StoreError::Io`] on board read/write failure.
pub fn reject(store: &TaskStore, id: &str) -> Result<Task, StoreError> {
    let patch = TaskPatch {
        status: Some(Status::InProgress),
        completed: Some(String::new()),
        ..TaskPatch::default()
    };
    let task = store.update_task(id, patch)?;
    info!(task = %task.id, "task rejected");
    Ok(task)
}
