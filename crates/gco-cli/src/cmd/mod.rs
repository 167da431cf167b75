pub mod archive;
pub mod assign;
pub mod claim;
pub mod completions;
pub mod config;
pub mod init;
pub mod log;
pub mod read;
pub mod review;
pub mod stats;
pub mod status;
pub mod sync;
pub mod task;
pub mod validate;

use crate::output::{CliError, OutputMode, fail};
use anyhow::Result;
use gco_core::board::{StoreError, TaskStore};
use gco_core::config::{ProjectConfig, find_project_root, load_project_config};
use gco_core::error::ErrorCode;
use gco_core::journal::Journal;
use gco_core::model::EntryKind;
use gco_core::model::task::agent_handle;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Journal author for entries the tool writes on its own behalf.
pub const SYSTEM_AGENT: &str = "sistema";

/// An initialized project found at or above the working directory.
#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
    pub store: TaskStore,
    pub journal: Journal,
}

impl Project {
    /// Locate `.gco/` from `start` upward and load its config.
    ///
    /// # Errors
    ///
    /// Fails (after rendering the error) when no project is found or the
    /// config cannot be parsed.
    pub fn discover(start: &Path, output: OutputMode) -> Result<Self> {
        let Some(root) = find_project_root(start) else {
            return Err(fail(
                output,
                &CliError::coded(
                    "not a gco project: .gco directory not found",
                    ErrorCode::NotInitialized,
                    None,
                ),
            ));
        };
        let config = load_project_config(&root).map_err(|err| {
            fail(
                output,
                &CliError::coded(format!("{err:#}"), ErrorCode::ConfigParseError, None),
            )
        })?;
        Ok(Self {
            store: TaskStore::open(root.clone()),
            journal: Journal::open(root.clone()),
            config,
            root,
        })
    }

    /// Append a journal entry about a board change that is already saved,
    /// so a journal failure is only logged.
    pub fn record(&self, agent: &str, task_id: &str, kind: EntryKind, message: &str) {
        if let Err(err) = self.journal.append(agent, task_id, kind, message) {
            warn!(task = task_id, error = %err, "failed to record journal entry");
        }
    }

    /// [`Project::record`] as the tool itself, with type `system`.
    pub fn record_system(&self, task_id: &str, message: &str) {
        self.record(SYSTEM_AGENT, task_id, EntryKind::System, message);
    }
}

/// Normalize an agent name to a board handle, failing on names that would
/// break the task header.
pub fn handle_for(output: OutputMode, name: &str) -> Result<String> {
    agent_handle(name).ok_or_else(|| {
        fail(
            output,
            &CliError::coded(
                format!("invalid agent name '{}'", name.trim()),
                ErrorCode::InvalidAgentHandle,
                None,
            ),
        )
    })
}

/// Render a store failure and convert it for `?`.
pub fn store_failure(output: OutputMode, err: &StoreError) -> anyhow::Error {
    fail(output, &CliError::from(err))
}
