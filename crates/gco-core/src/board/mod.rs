//! The task board: `tasks.md` at the project root.
//!
//! The board is a markdown document that carries its own schema. Each task
//! is a block opened by a header line
//!
//! ```text
//! ## TASK-001 [STATUS:in-progress] [ASSIGNED:@vscode]
//! ```
//!
//! followed by bold-label field lines and closed by a `---` separator. The
//! [`parser`] never fails: anything it cannot attribute to a field stays in
//! the task's `extra_lines` bucket, and a block whose header cannot be read
//! is kept verbatim as a [`RawBlock`]. The [`writer`] regenerates the whole
//! document deterministically from the in-memory list, so a round trip
//! through both preserves every field the writer emits.

pub mod parser;
pub mod store;
pub mod writer;

use serde::{Deserialize, Serialize};

use crate::model::Task;
use crate::model::task::{TASK_ID_PREFIX, task_digits};

pub use parser::parse_board;
pub use store::{StoreError, TASKS_FILE, TaskStore};
pub use writer::{generate_board, write_board};

/// Bold field labels, exactly as written on the board.
pub mod labels {
    pub const TITLE: &str = "**Título:**";
    pub const DESCRIPTION: &str = "**Descripción:**";
    pub const CRITERIA: &str = "**Criterios de aceptación:**";
    pub const DEPENDENCIES: &str = "**Dependencias:**";
    pub const NOTES: &str = "**Notas técnicas:**";
    pub const COMPLETED: &str = "**Completada:**";
    pub const BLOCKED_SINCE: &str = "**Bloqueada desde:**";
    pub const BLOCK_REASON: &str = "**Razón bloqueo:**";
    pub const GITHUB_ISSUE: &str = "**GitHub Issue:**";

    /// Written for an empty dependency list.
    pub const NO_DEPENDENCIES: &str = "Ninguna";
    /// Written for empty notes, completion time and last sync.
    pub const EMPTY: &str = "(vacío)";

    pub const LAST_SYNC: &str = "Última sincronización:";
    pub const TOTAL: &str = "Total tareas:";
    pub const COMPLETED_COUNT: &str = "Completadas:";
    pub const IN_PROGRESS_COUNT: &str = "En progreso:";
    pub const PENDING_COUNT: &str = "Pendientes:";
}

/// Summary block at the top of the board.
///
/// Only `last_sync` survives a rewrite; the counts are re-derived from the
/// task list every time the board is generated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardMetadata {
    pub last_sync: Option<String>,
    pub total: Option<usize>,
    pub completed: Option<usize>,
    pub in_progress: Option<usize>,
    pub pending: Option<usize>,
}

/// A `## TASK-` block whose header line does not fit the header grammar.
///
/// Its lines are carried through rewrites untouched, and its ID stays taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    /// First token after `## `, e.g. `TASK-002`.
    pub id: String,
    /// Header line first, then the body up to the next heading.
    pub lines: Vec<String>,
}

/// A parsed board: tasks in document order plus the summary block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    pub tasks: Vec<Task>,
    /// Blocks with an unreadable header, written back after the tasks.
    pub unreadable: Vec<RawBlock>,
    pub metadata: BoardMetadata,
}

impl Board {
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Every ID on the board, unreadable blocks included.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.tasks
            .iter()
            .map(|t| t.id.as_str())
            .chain(self.unreadable.iter().map(|b| b.id.as_str()))
    }

    /// `true` if a task or an unreadable block already uses `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids().any(|taken| taken == id)
    }

    #[must_use]
    pub fn next_id(&self) -> String {
        next_id(self.ids())
    }
}

/// Allocate the ID after the highest numeric suffix among `ids`.
///
/// Zero-padded to three digits; IDs past 999 simply grow wider. The suffix
/// is incremented as a decimal string, so there is no upper bound. IDs are
/// never reused because the board never deletes tasks.
#[must_use]
pub fn next_id<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    let highest = ids
        .into_iter()
        .filter_map(task_digits)
        .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    let next = highest.map_or_else(|| "1".to_string(), increment_decimal);
    format!("{TASK_ID_PREFIX}{next:0>3}")
}

fn increment_decimal(digits: &str) -> String {
    let mut bytes = digits.as_bytes().to_vec();
    for byte in bytes.iter_mut().rev() {
        if *byte == b'9' {
            *byte = b'0';
        } else {
            *byte += 1;
            return String::from_utf8_lossy(&bytes).into_owned();
        }
    }
    bytes.insert(0, b'1');
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_id_on_empty_board() {
        assert_eq!(Board::default().next_id(), "TASK-001");
    }

    #[test]
    fn next_id_uses_max_not_count() {
        assert_eq!(next_id(["TASK-001", "TASK-003", "TASK-002"]), "TASK-004");
    }

    #[test]
    fn next_id_grows_past_999() {
        assert_eq!(next_id(["TASK-999"]), "TASK-1000");
        assert_eq!(next_id(["TASK-1000", "TASK-5"]), "TASK-1001");
        assert_eq!(next_id(["TASK-0099", "TASK-7"]), "TASK-100");
    }

    #[test]
    fn next_id_ignores_foreign_ids() {
        assert_eq!(next_id(["SYNC", "TASK-002"]), "TASK-003");
    }

    #[test]
    fn next_id_past_u64_range() {
        assert_eq!(
            next_id(["TASK-18446744073709551615"]),
            "TASK-18446744073709551616"
        );
        assert_eq!(
            next_id(["TASK-99999999999999999999999", "TASK-12"]),
            "TASK-100000000000000000000000"
        );
    }

    #[test]
    fn unreadable_blocks_hold_their_ids() {
        let board = Board {
            tasks: vec![Task::new("TASK-001", "a")],
            unreadable: vec![RawBlock {
                id: "TASK-004".into(),
                lines: vec!["## TASK-004 [STATUS:done] [ASSIGNED:]".into()],
            }],
            metadata: BoardMetadata::default(),
        };
        assert!(board.contains("TASK-004"));
        assert!(board.find("TASK-004").is_none());
        assert_eq!(board.next_id(), "TASK-005");
    }
}
