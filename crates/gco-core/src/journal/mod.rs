//! Append-only activity journal.
//!
//! Two views are kept in step on every append: the markdown partition at
//! `.gco-logs/current.md` (mirrored to `DEVELOP_LOG.md` at the project root)
//! and the structured index at `.gco-logs/index.json`. Archival moves the
//! partition into `.gco-logs/<date>.md` and starts a fresh one; the index is
//! never truncated.

pub mod format;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::ErrorCode;
use crate::model::task::is_agent_name;
use crate::model::{EntryKind, JournalEntry};

pub use format::{AgentStatusRow, parse_entries};

pub const LOGS_DIR: &str = ".gco-logs";
pub const CURRENT_FILE: &str = ".gco-logs/current.md";
pub const INDEX_FILE: &str = ".gco-logs/index.json";
pub const PUBLIC_FILE: &str = "DEVELOP_LOG.md";

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("journal index {} is not valid JSON: {source}", path.display())]
    Index {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid agent name '{0}'")]
    InvalidAgent(String),

    #[error("invalid task reference '{0}'")]
    InvalidTask(String),
}

impl JournalError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } | Self::Index { .. } => ErrorCode::JournalWriteFailed,
            Self::InvalidAgent(_) => ErrorCode::InvalidAgentHandle,
            Self::InvalidTask(_) => ErrorCode::InvalidTaskId,
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Index { .. } => {
                Some("Repair or delete .gco-logs/index.json; current.md is unaffected.")
            }
            Self::Io { .. } | Self::InvalidAgent(_) | Self::InvalidTask(_) => self.code().hint(),
        }
    }
}

/// Contents of `index.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalIndex {
    #[serde(default)]
    pub entries: Vec<JournalEntry>,
}

/// Journal rooted at a project directory.
pub struct Journal {
    root: PathBuf,
    project_name: String,
    clock: Box<dyn Clock>,
}

impl fmt::Debug for Journal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Journal")
            .field("root", &self.root)
            .field("project_name", &self.project_name)
            .finish_non_exhaustive()
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> JournalError {
    move |source| JournalError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, JournalError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path)(err)),
    }
}

fn write(path: &Path, content: &str) -> Result<(), JournalError> {
    fs::write(path, content).map_err(io_err(path))
}

impl Journal {
    /// Journal using the local wall clock.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self::with_clock(root, Box::new(SystemClock))
    }

    /// The project name shown in partition headers is the root's directory
    /// name.
    pub fn with_clock(root: impl Into<PathBuf>, clock: Box<dyn Clock>) -> Self {
        let root = root.into();
        let project_name = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            root,
            project_name,
            clock,
        }
    }

    #[must_use]
    pub fn current_path(&self) -> PathBuf {
        self.root.join(CURRENT_FILE)
    }

    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    #[must_use]
    pub fn public_path(&self) -> PathBuf {
        self.root.join(PUBLIC_FILE)
    }

    #[must_use]
    pub fn archive_path(&self, date: &str) -> PathBuf {
        self.root.join(LOGS_DIR).join(format!("{date}.md"))
    }

    fn fresh_header(&self) -> String {
        format::header(&self.clock.date(), &self.project_name)
    }

    /// Create the log directory, partition and index if absent. Existing
    /// files are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Io`] if a directory or file cannot be created.
    pub fn ensure(&self) -> Result<(), JournalError> {
        let dir = self.root.join(LOGS_DIR);
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;

        let current = self.current_path();
        if !current.exists() {
            write(&current, &self.fresh_header())?;
            debug!(path = %current.display(), "created journal partition");
        }
        let index = self.index_path();
        if !index.exists() {
            self.write_index(&JournalIndex::default())?;
        }
        Ok(())
    }

    /// Append one entry to the partition and the index, then refresh the
    /// public copy.
    ///
    /// A leading `@` on `agent` is dropped; the block header adds its own.
    /// The index is read before anything is written, so a corrupt index
    /// leaves all three files as they were.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::InvalidAgent`] or [`JournalError::InvalidTask`]
    /// if the entry header would not parse back, and [`JournalError::Io`] or
    /// [`JournalError::Index`] if a file cannot be read or written.
    pub fn append(
        &self,
        agent: &str,
        task_id: &str,
        kind: EntryKind,
        message: &str,
    ) -> Result<JournalEntry, JournalError> {
        let agent = agent.trim();
        let agent = agent.strip_prefix('@').unwrap_or(agent);
        if !is_agent_name(agent) {
            return Err(JournalError::InvalidAgent(agent.to_string()));
        }
        if !format::is_token(task_id) {
            return Err(JournalError::InvalidTask(task_id.to_string()));
        }

        self.ensure()?;
        let mut index = self.index()?;

        let entry = JournalEntry {
            date: Some(self.clock.date()),
            agent: agent.to_string(),
            task_id: task_id.to_string(),
            kind,
            message: message.to_string(),
            time: self.clock.time(),
        };

        let current = self.current_path();
        let mut content = read_optional(&current)?.unwrap_or_default();
        content.push_str(&format::entry_block(&entry));
        write(&current, &content)?;
        self.refresh_public(&content)?;

        index.entries.push(entry.clone());
        self.write_index(&index)?;

        info!(agent = %entry.agent, task = %entry.task_id, kind = %entry.kind, "journal entry appended");
        Ok(entry)
    }

    /// Raw partition text; empty if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Io`] if the partition exists but is unreadable.
    pub fn read_current(&self) -> Result<String, JournalError> {
        Ok(read_optional(&self.current_path())?.unwrap_or_default())
    }

    /// Every entry block in the current partition, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Io`] if the partition is unreadable.
    pub fn entries(&self) -> Result<Vec<JournalEntry>, JournalError> {
        Ok(parse_entries(&self.read_current()?))
    }

    /// Entries in the current partition for one task, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Io`] if the partition is unreadable.
    pub fn entries_for(&self, task_id: &str) -> Result<Vec<JournalEntry>, JournalError> {
        let mut entries = self.entries()?;
        entries.retain(|e| e.task_id == task_id);
        Ok(entries)
    }

    /// The structured index. Missing index reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Index`] if the index is not valid JSON.
    pub fn index(&self) -> Result<JournalIndex, JournalError> {
        let path = self.index_path();
        let Some(raw) = read_optional(&path)? else {
            return Ok(JournalIndex::default());
        };
        serde_json::from_str(&raw).map_err(|source| JournalError::Index { path, source })
    }

    fn write_index(&self, index: &JournalIndex) -> Result<(), JournalError> {
        let path = self.index_path();
        let json = serde_json::to_string_pretty(index).map_err(|source| JournalError::Index {
            path: path.clone(),
            source,
        })?;
        write(&path, &json)
    }

    fn refresh_public(&self, content: &str) -> Result<(), JournalError> {
        write(&self.public_path(), content)
    }

    /// Rewrite the agent status table. Returns `false`, writing nothing, if
    /// the partition is missing or its table delimiters were edited away.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Io`] on read/write failure.
    pub fn update_status_table(&self, rows: &[AgentStatusRow]) -> Result<bool, JournalError> {
        let Some(content) = read_optional(&self.current_path())? else {
            return Ok(false);
        };
        let Some(updated) = format::replace_status_table(&content, rows) else {
            debug!("status table delimiters not found; leaving journal untouched");
            return Ok(false);
        };
        write(&self.current_path(), &updated)?;
        self.refresh_public(&updated)?;
        Ok(true)
    }

    /// Move the current partition into today's archive file and start a
    /// fresh one. Appends to an existing same-day archive. Returns `None` if
    /// there was nothing to archive.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Io`] on read/write failure.
    pub fn archive(&self) -> Result<Option<PathBuf>, JournalError> {
        let current = self.current_path();
        let content = read_optional(&current)?.unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(None);
        }

        let archive = self.archive_path(&self.clock.date());
        let merged = match read_optional(&archive)? {
            Some(existing) => format!("{existing}\n{content}"),
            None => content,
        };
        write(&archive, &merged)?;

        let header = self.fresh_header();
        write(&current, &header)?;
        self.refresh_public(&header)?;

        info!(path = %archive.display(), "journal archived");
        Ok(Some(archive))
    }
}
