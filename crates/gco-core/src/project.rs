//! Project scaffolding for `gco init`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::board::TaskStore;
use crate::clock::Clock;
use crate::config::{CONFIG_FILE, GCO_DIR, ProjectConfig, save_project_config};
use crate::journal::Journal;

/// Which pieces `init_project` had to create.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOutcome {
    pub created_config: bool,
    pub created_board: bool,
    pub created_journal: bool,
}

impl InitOutcome {
    #[must_use]
    pub const fn already_initialized(&self) -> bool {
        !self.created_config && !self.created_board && !self.created_journal
    }
}

/// Create `.gco/`, the default config, an empty board and the journal.
/// Anything that already exists is left alone, so this is safe to re-run.
pub fn init_project<C>(root: &Path, config: &ProjectConfig, clock: &C) -> Result<InitOutcome>
where
    C: Clock + Clone + 'static,
{
    let dir = root.join(GCO_DIR);
    std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let created_config = !root.join(CONFIG_FILE).exists();
    if created_config {
        save_project_config(root, config)?;
    }

    let created_board = TaskStore::with_clock(root, Box::new(clock.clone()))
        .init()
        .context("Failed to create task board")?;

    let journal = Journal::with_clock(root, Box::new(clock.clone()));
    let created_journal = !journal.current_path().exists();
    journal.ensure().context("Failed to create journal")?;

    let outcome = InitOutcome {
        created_config,
        created_board,
        created_journal,
    };
    info!(root = %root.display(), ?outcome, "project initialized");
    Ok(outcome)
}
