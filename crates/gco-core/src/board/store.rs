//! Load/save access to `tasks.md`.
//!
//! Every mutating operation is a full read-modify-write of the file. There is
//! no locking: two processes racing on the same board resolve as last writer
//! wins.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{Board, BoardMetadata, parse_board, write_board};
use crate::clock::{Clock, SystemClock};
use crate::error::ErrorCode;
use crate::model::task::is_handle;
use crate::model::{Task, TaskPatch};

/// Board file name, relative to the project root.
pub const TASKS_FILE: &str = "tasks.md";

/// Errors from reading or writing the board.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("task {0} not found")]
    NotFound(String),

    #[error("task {0} already exists")]
    DuplicateId(String),

    #[error("invalid agent handle '{0}'")]
    InvalidHandle(String),
}

impl StoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::BoardWriteFailed,
            Self::NotFound(_) => ErrorCode::TaskNotFound,
            Self::DuplicateId(_) => ErrorCode::DuplicateTaskId,
            Self::InvalidHandle(_) => ErrorCode::InvalidAgentHandle,
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

/// Board access rooted at a project directory.
pub struct TaskStore {
    root: PathBuf,
    clock: Box<dyn Clock>,
}

impl fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStore").field("root", &self.root).finish_non_exhaustive()
    }
}

impl TaskStore {
    /// Store using the local wall clock.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self::with_clock(root, Box::new(SystemClock))
    }

    pub fn with_clock(root: impl Into<PathBuf>, clock: Box<dyn Clock>) -> Self {
        Self {
            root: root.into(),
            clock,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the board file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.root.join(TASKS_FILE)
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path(),
            source,
        }
    }

    /// Parse the board. A missing file is an empty board.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be read.
    pub fn load(&self) -> Result<Board, StoreError> {
        match fs::read_to_string(self.path()) {
            Ok(content) => Ok(parse_board(&content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path().display(), "no task board yet");
                Ok(Board::default())
            }
            Err(err) => Err(self.io_error(err)),
        }
    }

    /// Regenerate and overwrite the board.
    ///
    /// A missing `last_sync` is stamped with the current time. Unreadable
    /// blocks are written back unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidHandle`] if a task's handle would not
    /// read back, or [`StoreError::Io`] if the file cannot be written.
    pub fn save(&self, board: &Board) -> Result<(), StoreError> {
        if let Some(task) = board.tasks.iter().find(|t| !is_handle(&t.assigned)) {
            return Err(StoreError::InvalidHandle(task.assigned.clone()));
        }
        let mut board = board.clone();
        if board.metadata.last_sync.is_none() {
            board.metadata.last_sync = Some(self.clock.timestamp());
        }
        let content = write_board(&board);
        fs::write(self.path(), content).map_err(|err| self.io_error(err))?;
        debug!(
            tasks = board.tasks.len(),
            unreadable = board.unreadable.len(),
            "wrote task board"
        );
        Ok(())
    }

    /// Append a task to the end of the board.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateId`] if the ID is already on the board
    /// (unreadable blocks included), [`StoreError::InvalidHandle`] for a
    /// malformed `assigned`, or [`StoreError::Io`] on read/write failure.
    pub fn add_task(&self, task: Task) -> Result<Task, StoreError> {
        let mut board = self.load()?;
        if board.contains(&task.id) {
            return Err(StoreError::DuplicateId(task.id));
        }
        board.tasks.push(task.clone());
        self.save(&board)?;
        info!(task = %task.id, "task created");
        Ok(task)
    }

    /// Apply `patch` to one task and persist. Other tasks and their order are
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no task has `id`,
    /// [`StoreError::InvalidHandle`] if the patch sets a malformed
    /// `assigned`, or [`StoreError::Io`] on read/write failure.
    pub fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Task, StoreError> {
        let mut board = self.load()?;
        let task = board
            .find_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch.apply(task);
        let updated = task.clone();
        self.save(&board)?;
        info!(task = %id, status = %updated.status, "task updated");
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the board cannot be read.
    pub fn find_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.load()?.find(id).cloned())
    }

    /// Next free task ID on the current board.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the board cannot be read.
    pub fn next_id(&self) -> Result<String, StoreError> {
        Ok(self.load()?.next_id())
    }

    /// Rewrite the board with a fresh `last_sync` stamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on read/write failure.
    pub fn touch_sync(&self) -> Result<(), StoreError> {
        let mut board = self.load()?;
        board.metadata = BoardMetadata {
            last_sync: Some(self.clock.timestamp()),
            ..board.metadata
        };
        self.save(&board)
    }

    /// Write an empty board if none exists. Returns `true` if one was created.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the board cannot be written.
    pub fn init(&self) -> Result<bool, StoreError> {
        if self.path().exists() {
            return Ok(false);
        }
        self.save(&Board::default())?;
        Ok(true)
    }
}
