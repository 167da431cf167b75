use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{ParseEnumError, normalize};

/// What an agent is reporting in a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Start,
    Progress,
    Decision,
    Block,
    Question,
    Answer,
    Complete,
    System,
}

impl EntryKind {
    pub const ALL: [Self; 8] = [
        Self::Start,
        Self::Progress,
        Self::Decision,
        Self::Block,
        Self::Question,
        Self::Answer,
        Self::Complete,
        Self::System,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Progress => "progress",
            Self::Decision => "decision",
            Self::Block => "block",
            Self::Question => "question",
            Self::Answer => "answer",
            Self::Complete => "complete",
            Self::System => "system",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseEnumError {
                expected: "entry type",
                got: s.to_string(),
            })
    }
}

/// One appended journal record. Immutable once written.
///
/// Field order and names match the records in `.gco-logs/index.json`.
/// `date` is only known for index records; entries recovered from the
/// markdown partition carry the time alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub agent: String,
    pub task_id: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub message: String,
    pub time: String,
}
