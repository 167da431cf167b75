//! The git operations the validator and the review flow need, behind a
//! trait.
//!
//! The core never spawns `git` itself. The binary supplies a subprocess
//! implementation; tests and dry runs use [`InMemoryGit`].

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::ErrorCode;
use crate::model::task::is_task_id;

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("failed to spawn git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("`git {command}` failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("git produced non-UTF-8 output")]
    Utf8,
}

impl GitError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::GitCommandFailed
    }
}

/// Git queries, each independently callable per task, plus the merge and
/// delete steps of an approval.
pub trait GitService {
    /// Whether a local branch with this exact name exists.
    ///
    /// # Errors
    ///
    /// Returns [`GitError`] if the lookup itself fails.
    fn branch_exists(&self, branch: &str) -> Result<bool, GitError>;

    /// Paths changed on `branch` since it diverged from `base`.
    ///
    /// # Errors
    ///
    /// Returns [`GitError`] if either branch is unknown or the diff fails.
    fn changed_files(&self, branch: &str, base: &str) -> Result<Vec<String>, GitError>;

    /// One-line summaries of the commits on `branch` that `base` lacks,
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns [`GitError`] if either branch is unknown or the log fails.
    fn commits(&self, branch: &str, base: &str) -> Result<Vec<String>, GitError>;

    /// Check out `base` and merge `branch` into it with a merge commit.
    ///
    /// # Errors
    ///
    /// Returns [`GitError`] if the checkout or the merge fails.
    fn merge_branch(&self, branch: &str, base: &str, message: &str) -> Result<(), GitError>;

    /// Force-delete a local branch.
    ///
    /// # Errors
    ///
    /// Returns [`GitError`] if the branch cannot be deleted.
    fn delete_branch(&self, branch: &str) -> Result<(), GitError>;

    /// The checked-out branch, if any.
    ///
    /// # Errors
    ///
    /// Returns [`GitError`] if the lookup fails.
    fn current_branch(&self) -> Result<Option<String>, GitError> {
        Ok(None)
    }
}

/// `<prefix>/<agent>/<task_id>`, with any `@` dropped from the agent.
#[must_use]
pub fn branch_name(prefix: &str, agent: &str, task_id: &str) -> String {
    format!("{prefix}/{}/{task_id}", agent.trim_start_matches('@'))
}

/// Inverse of [`branch_name`]: `(agent, task_id)` for a conforming branch.
#[must_use]
pub fn parse_branch_name<'a>(prefix: &str, name: &'a str) -> Option<(&'a str, &'a str)> {
    let rest = name.strip_prefix(prefix)?.strip_prefix('/')?;
    let (agent, task_id) = rest.split_once('/')?;
    (!agent.is_empty() && is_task_id(task_id)).then_some((agent, task_id))
}

/// Branches, their changed files and commits held in memory. Merges and
/// deletions are recorded rather than performed.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGit {
    branches: BTreeMap<String, Vec<String>>,
    commits: BTreeMap<String, Vec<String>>,
    failing: BTreeSet<String>,
    merged: RefCell<Vec<(String, String)>>,
    deleted: RefCell<BTreeSet<String>>,
}

impl InMemoryGit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a branch whose diff against any base is `files`.
    #[must_use]
    pub fn with_branch<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        files: impl IntoIterator<Item = S>,
    ) -> Self {
        self.branches
            .insert(name.into(), files.into_iter().map(Into::into).collect());
        self
    }

    /// Make every lookup of `name` fail.
    #[must_use]
    pub fn with_failure(mut self, name: impl Into<String>) -> Self {
        self.failing.insert(name.into());
        self
    }

    /// Commit summaries reported for `name`, newest first.
    #[must_use]
    pub fn with_commits<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        commits: impl IntoIterator<Item = S>,
    ) -> Self {
        self.commits
            .insert(name.into(), commits.into_iter().map(Into::into).collect());
        self
    }

    /// `(branch, base)` pairs merged so far, in order.
    #[must_use]
    pub fn merged(&self) -> Vec<(String, String)> {
        self.merged.borrow().clone()
    }

    #[must_use]
    pub fn is_deleted(&self, branch: &str) -> bool {
        self.deleted.borrow().contains(branch)
    }

    fn known(&self, branch: &str) -> bool {
        self.branches.contains_key(branch) && !self.is_deleted(branch)
    }

    fn unknown_revision(command: String, branch: &str) -> GitError {
        GitError::Command {
            command,
            stderr: format!("unknown revision '{branch}'"),
        }
    }

    fn check(&self, branch: &str) -> Result<(), GitError> {
        if self.failing.contains(branch) {
            return Err(GitError::Command {
                command: format!("rev-parse {branch}"),
                stderr: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

impl GitService for InMemoryGit {
    fn branch_exists(&self, branch: &str) -> Result<bool, GitError> {
        self.check(branch)?;
        Ok(self.known(branch))
    }

    fn changed_files(&self, branch: &str, base: &str) -> Result<Vec<String>, GitError> {
        self.check(branch)?;
        if !self.known(branch) {
            return Err(Self::unknown_revision(
                format!("diff --name-only {base}...{branch}"),
                branch,
            ));
        }
        Ok(self.branches.get(branch).cloned().unwrap_or_default())
    }

    fn commits(&self, branch: &str, base: &str) -> Result<Vec<String>, GitError> {
        self.check(branch)?;
        if !self.known(branch) {
            return Err(Self::unknown_revision(
                format!("log --oneline {base}..{branch}"),
                branch,
            ));
        }
        Ok(self.commits.get(branch).cloned().unwrap_or_default())
    }

    fn merge_branch(&self, branch: &str, base: &str, _message: &str) -> Result<(), GitError> {
        self.check(branch)?;
        if !self.known(branch) {
            return Err(Self::unknown_revision(format!("merge --no-ff {branch}"), branch));
        }
        self.merged
            .borrow_mut()
            .push((branch.to_string(), base.to_string()));
        Ok(())
    }

    fn delete_branch(&self, branch: &str) -> Result<(), GitError> {
        self.check(branch)?;
        if !self.known(branch) {
            return Err(GitError::Command {
                command: format!("branch -D {branch}"),
                stderr: format!("branch '{branch}' not found"),
            });
        }
        self.deleted.borrow_mut().insert(branch.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_name_strips_at() {
        assert_eq!(branch_name("agent", "@vscode", "TASK-001"), "agent/vscode/TASK-001");
        assert_eq!(branch_name("feat", "claude", "TASK-12"), "feat/claude/TASK-12");
    }

    #[test]
    fn parse_branch_name_roundtrip() {
        assert_eq!(
            parse_branch_name("agent", "agent/vscode/TASK-001"),
            Some(("vscode", "TASK-001"))
        );
        assert_eq!(parse_branch_name("agent", "agent/vscode/TASK-x"), None);
        assert_eq!(parse_branch_name("agent", "agents/vscode/TASK-001"), None);
        assert_eq!(parse_branch_name("agent", "agent/a/b/TASK-001"), None);
        assert_eq!(parse_branch_name("agent", "develop"), None);
    }

    #[test]
    fn in_memory_git_lookups() {
        let git = InMemoryGit::new()
            .with_branch("agent/a/TASK-001", ["src/app.js"])
            .with_failure("agent/b/TASK-002");
        assert!(git.branch_exists("agent/a/TASK-001").expect("lookup"));
        assert!(!git.branch_exists("agent/c/TASK-003").expect("lookup"));
        assert!(git.branch_exists("agent/b/TASK-002").is_err());
        assert!(git.changed_files("agent/c/TASK-003", "develop").is_err());
        assert_eq!(git.current_branch().expect("current"), None);
    }

    #[test]
    fn in_memory_merge_and_delete_are_recorded() {
        let git = InMemoryGit::new()
            .with_branch("agent/a/TASK-001", ["src/app.js"])
            .with_commits("agent/a/TASK-001", ["abc1234 feat: form"]);
        assert_eq!(
            git.commits("agent/a/TASK-001", "develop").expect("log"),
            vec!["abc1234 feat: form"]
        );
        git.merge_branch("agent/a/TASK-001", "develop", "merge")
            .expect("merge");
        assert_eq!(
            git.merged(),
            vec![("agent/a/TASK-001".to_string(), "develop".to_string())]
        );
        git.delete_branch("agent/a/TASK-001").expect("delete");
        assert!(git.is_deleted("agent/a/TASK-001"));
        assert!(!git.branch_exists("agent/a/TASK-001").expect("lookup"));
        assert!(git.delete_branch("agent/a/TASK-001").is_err());
        assert!(git.merge_branch("agent/z/TASK-009", "develop", "m").is_err());
    }
}
