use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{ParseEnumError, normalize};

/// Prefix shared by every task identifier (`TASK-001`).
pub const TASK_ID_PREFIX: &str = "TASK-";

/// The five board states. The set is closed; transitions are unrestricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Pending,
    InProgress,
    Blocked,
    Review,
    Completed,
}

impl Status {
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::InProgress,
        Self::Blocked,
        Self::Review,
        Self::Completed,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Blocked => "blocked",
            Self::Review => "review",
            Self::Completed => "completed",
        }
    }

    /// Icon used in the journal's agent status table.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Pending => "⏳",
            Self::InProgress => "🟡",
            Self::Blocked => "🔴",
            Self::Review => "👀",
            Self::Completed => "✅",
        }
    }

    /// Exact, case-sensitive match as written in a board header.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == label)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "in-progress" | "in_progress" => Ok(Self::InProgress),
            "blocked" => Ok(Self::Blocked),
            "review" => Ok(Self::Review),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

/// One acceptance-criteria checkbox. Order on the board is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub done: bool,
    pub text: String,
}

impl Criterion {
    pub fn open(text: impl Into<String>) -> Self {
        Self {
            done: false,
            text: text.into(),
        }
    }
}

/// A task record as stored on the board.
///
/// Empty strings mean "not set" for every optional text field, matching how
/// the board writes placeholders. `extra_lines` holds lines inside the task
/// block the parser could not attribute to a field; the writer re-emits them
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: Status,
    /// Agent handle including the leading `@`, or empty when unassigned.
    pub assigned: String,
    pub criteria: Vec<Criterion>,
    /// Raw dependency text; see [`Task::dependency_ids`].
    pub dependencies: String,
    pub notes: String,
    pub completed: String,
    pub blocked_since: String,
    pub block_reason: String,
    pub github_issue: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_lines: Vec<String>,
}

impl Task {
    /// A fresh, unassigned, pending task.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            status: Status::Pending,
            assigned: String::new(),
            criteria: Vec::new(),
            dependencies: String::new(),
            notes: String::new(),
            completed: String::new(),
            blocked_since: String::new(),
            block_reason: String::new(),
            github_issue: None,
            extra_lines: Vec::new(),
        }
    }

    /// Every `TASK-<digits>` token in the dependency text, in order.
    ///
    /// Anything else in the text (`Ninguna`, prose, malformed IDs) is ignored.
    #[must_use]
    pub fn dependency_ids(&self) -> Vec<String> {
        extract_task_ids(&self.dependencies)
    }

    /// Assigned handle without the `@` prefix; empty when unassigned.
    #[must_use]
    pub fn agent_name(&self) -> &str {
        self.assigned.trim_start_matches('@')
    }

    #[must_use]
    pub fn is_assigned(&self) -> bool {
        !self.assigned.is_empty()
    }

    /// In progress with an agent on it: the tasks that own a working branch.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == Status::InProgress && self.is_assigned()
    }
}

/// Agent names are word characters and hyphens (`claude-code`, `gpt_4`).
#[must_use]
pub fn is_agent_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Empty (unassigned), or `@` followed by an agent name.
#[must_use]
pub fn is_handle(handle: &str) -> bool {
    handle.is_empty() || handle.strip_prefix('@').is_some_and(is_agent_name)
}

/// Normalize an agent name to a board handle (`claude` → `@claude`).
///
/// Blank input is the unassigned handle. Returns `None` when the name would
/// not survive in a task header.
#[must_use]
pub fn agent_handle(name: &str) -> Option<String> {
    let name = name.trim();
    let name = name.strip_prefix('@').unwrap_or(name);
    if name.is_empty() {
        Some(String::new())
    } else {
        is_agent_name(name).then(|| format!("@{name}"))
    }
}

/// Extract every `TASK-<digits>` token from free text.
#[must_use]
pub fn extract_task_ids(text: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find(TASK_ID_PREFIX) {
        let after = &rest[pos + TASK_ID_PREFIX.len()..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 {
            ids.push(format!("{TASK_ID_PREFIX}{}", &after[..digits]));
        }
        rest = &after[digits..];
    }
    ids
}

/// Numeric suffix of a task ID without leading zeros (`TASK-007` → `7`).
#[must_use]
pub fn task_digits(id: &str) -> Option<&str> {
    let digits = id.strip_prefix(TASK_ID_PREFIX)?;
    let len = digits.bytes().take_while(u8::is_ascii_digit).count();
    if len == 0 {
        return None;
    }
    let trimmed = digits[..len].trim_start_matches('0');
    Some(if trimmed.is_empty() { "0" } else { trimmed })
}

/// `true` for exactly `TASK-` followed by one or more ASCII digits.
#[must_use]
pub fn is_task_id(id: &str) -> bool {
    id.strip_prefix(TASK_ID_PREFIX)
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// A shallow, field-by-field update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<Status>,
    pub assigned: Option<String>,
    pub criteria: Option<Vec<Criterion>>,
    pub dependencies: Option<String>,
    pub notes: Option<String>,
    pub completed: Option<String>,
    pub blocked_since: Option<String>,
    pub block_reason: Option<String>,
    pub github_issue: Option<Option<u64>>,
}

impl TaskPatch {
    /// The status change `gco task status` performs, stamped with `timestamp`.
    ///
    /// Blocking records when and why; review and completion record the
    /// completion time.
    #[must_use]
    pub fn transition(status: Status, timestamp: &str, reason: Option<&str>) -> Self {
        let mut patch = Self {
            status: Some(status),
            ..Self::default()
        };
        match status {
            Status::Blocked => {
                patch.blocked_since = Some(timestamp.to_string());
                patch.block_reason = Some(reason.unwrap_or_default().to_string());
            }
            Status::Review | Status::Completed => {
                patch.completed = Some(timestamp.to_string());
            }
            Status::Pending | Status::InProgress => {}
        }
        patch
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the provided fields over `task`.
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(assigned) = self.assigned {
            task.assigned = assigned;
        }
        if let Some(criteria) = self.criteria {
            task.criteria = criteria;
        }
        if let Some(dependencies) = self.dependencies {
            task.dependencies = dependencies;
        }
        if let Some(notes) = self.notes {
            task.notes = notes;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(blocked_since) = self.blocked_since {
            task.blocked_since = blocked_since;
        }
        if let Some(block_reason) = self.block_reason {
            task.block_reason = block_reason;
        }
        if let Some(github_issue) = self.github_issue {
            task.github_issue = github_issue;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_json_uses_board_labels() {
        assert_eq!(
            serde_json::to_string(&Status::InProgress).unwrap(),
            "\"in-progress\""
        );
        assert_eq!(
            serde_json::from_str::<Status>("\"review\"").unwrap(),
            Status::Review
        );
    }

    #[test]
    fn display_parse_roundtrips() {
        for value in Status::ALL {
            let rendered = value.to_string();
            assert_eq!(Status::from_str(&rendered).unwrap(), value);
            assert_eq!(Status::from_label(&rendered), Some(value));
        }
    }

    #[test]
    fn header_labels_are_case_sensitive() {
        assert_eq!(Status::from_str(" Blocked ").unwrap(), Status::Blocked);
        assert_eq!(Status::from_label("Blocked"), None);
        assert!(Status::from_str("done").is_err());
    }

    #[test]
    fn dependency_ids_ignore_non_ids() {
        let mut task = Task::new("TASK-004", "x");
        task.dependencies = "TASK-001, TASK-3 (after review), foo, TASK-".into();
        assert_eq!(task.dependency_ids(), vec!["TASK-001", "TASK-3"]);

        task.dependencies = "Ninguna".into();
        assert!(task.dependency_ids().is_empty());
    }

    #[test]
    fn task_numbers() {
        assert_eq!(task_digits("TASK-007"), Some("7"));
        assert_eq!(task_digits("TASK-1234"), Some("1234"));
        assert_eq!(task_digits("TASK-000"), Some("0"));
        assert_eq!(task_digits("BUG-7"), None);
        assert!(is_task_id("TASK-01"));
        assert!(!is_task_id("TASK-01a"));
        assert!(!is_task_id("TASK-"));
    }

    #[test]
    fn handles_are_normalized() {
        assert_eq!(agent_handle("claude").as_deref(), Some("@claude"));
        assert_eq!(agent_handle("@claude").as_deref(), Some("@claude"));
        assert_eq!(agent_handle("  ").as_deref(), Some(""));
    }

    #[test]
    fn handles_that_break_the_header_are_refused() {
        assert_eq!(agent_handle("gpt 4"), None);
        assert_eq!(agent_handle("a]b"), None);
        assert_eq!(agent_handle("@"), Some(String::new()));
        assert!(is_handle("@claude-code"));
        assert!(is_handle(""));
        assert!(!is_handle("@gpt 4"));
        assert!(!is_handle("claude"));
    }

    #[test]
    fn active_requires_assignee() {
        let mut task = Task::new("TASK-001", "x");
        task.status = Status::InProgress;
        assert!(!task.is_active());
        task.assigned = "@vscode".into();
        assert!(task.is_active());
        assert_eq!(task.agent_name(), "vscode");
    }

    #[test]
    fn transition_stamps_blocked_fields() {
        let patch = TaskPatch::transition(Status::Blocked, "2024-01-15 10:00:00", Some("waiting"));
        let mut task = Task::new("TASK-001", "x");
        patch.apply(&mut task);
        assert_eq!(task.status, Status::Blocked);
        assert_eq!(task.blocked_since, "2024-01-15 10:00:00");
        assert_eq!(task.block_reason, "waiting");
        assert!(task.completed.is_empty());
    }

    #[test]
    fn transition_to_review_stamps_completion() {
        let patch = TaskPatch::transition(Status::Review, "2024-01-15 10:00:00", None);
        assert_eq!(patch.completed.as_deref(), Some("2024-01-15 10:00:00"));
        assert!(patch.block_reason.is_none());
    }

    #[test]
    fn patch_is_shallow() {
        let mut task = Task::new("TASK-001", "old");
        task.notes = "keep me".into();
        TaskPatch {
            title: Some("new".into()),
            github_issue: Some(Some(12)),
            ..TaskPatch::default()
        }
        .apply(&mut task);
        assert_eq!(task.title, "new");
        assert_eq!(task.notes, "keep me");
        assert_eq!(task.github_issue, Some(12));
        assert!(TaskPatch::default().is_empty());
    }
}
