//! Files touched by more than one active task.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::BranchPolicy;
use crate::git::GitService;
use crate::model::Task;

/// One task's branch touching a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Touch {
    /// Board handle, `@` included.
    pub agent: String,
    pub task_id: String,
}

impl fmt::Display for Touch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.agent, self.task_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collision {
    pub file: String,
    pub touches: Vec<Touch>,
}

/// Best-effort: tasks whose diff cannot be read contribute nothing.
/// Results are sorted by file path.
#[must_use]
pub fn check_file_collisions(
    tasks: &[Task],
    git: &dyn GitService,
    policy: &BranchPolicy,
) -> Vec<Collision> {
    let mut by_file: BTreeMap<String, Vec<Touch>> = BTreeMap::new();

    for task in tasks.iter().filter(|t| t.is_active()) {
        let branch = policy.branch_for(task);
        let files = match git.changed_files(&branch, &policy.base) {
            Ok(files) => files,
            Err(err) => {
                debug!(task = %task.id, branch = %branch, error = %err, "no diff for collision check");
                continue;
            }
        };
        for file in files {
            let touches = by_file.entry(file).or_default();
            if !touches.iter().any(|t| t.task_id == task.id) {
                touches.push(Touch {
                    agent: task.assigned.clone(),
                    task_id: task.id.clone(),
                });
            }
        }
    }

    by_file
        .into_iter()
        .filter(|(_, touches)| touches.len() > 1)
        .map(|(file, touches)| Collision { file, touches })
        .collect()
}
