use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    TaskNotFound,
    DuplicateTaskId,
    InvalidAgentHandle,
    InvalidTaskId,
    TaskNotAssigned,
    TaskAlreadyAssigned,
    BoardWriteFailed,
    JournalWriteFailed,
    GitCommandFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::TaskNotFound => "E2001",
            Self::DuplicateTaskId => "E2002",
            Self::InvalidAgentHandle => "E2003",
            Self::InvalidTaskId => "E2004",
            Self::TaskNotAssigned => "E2005",
            Self::TaskAlreadyAssigned => "E2006",
            Self::BoardWriteFailed => "E5001",
            Self::JournalWriteFailed => "E5002",
            Self::GitCommandFailed => "E7001",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `gco init` to initialize this repository."),
            Self::ConfigParseError => Some("Fix syntax in .gco/config.json and retry."),
            Self::TaskNotFound => Some("Check the task ID with `gco task list --all`."),
            Self::DuplicateTaskId => Some("Omit --id to let gco allocate the next free ID."),
            Self::InvalidAgentHandle => {
                Some("Agent names use letters, digits, '_' and '-' (e.g. claude-code).")
            }
            Self::InvalidTaskId => Some("Task IDs look like TASK-001."),
            Self::TaskNotAssigned => Some("Assign it first with `gco assign <TASK> <AGENT>`."),
            Self::TaskAlreadyAssigned => {
                Some("Ask the orchestrator to reassign it with `gco assign`.")
            }
            Self::BoardWriteFailed | Self::JournalWriteFailed => {
                Some("Check disk space and write permissions.")
            }
            Self::GitCommandFailed => Some("Make sure this is a git repository and git is on PATH."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
