//! Turning external issue records into board tasks.
//!
//! Records use the GitHub REST field names, so a saved API response can be
//! fed in directly. The issue number is the de-duplication key: a task with
//! a matching `github_issue` is never created twice.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::board::{Board, next_id};
use crate::board::parser::parse_checkbox;
use crate::model::{Criterion, Status, Task};

const DESCRIPTION_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    #[default]
    #[serde(alias = "OPEN")]
    Open,
    #[serde(alias = "CLOSED")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: IssueState,
    /// Present on pull requests, which the issues API also returns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
}

impl IssueRecord {
    #[must_use]
    pub const fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<IssueRecord>),
    One(IssueRecord),
}

/// Parse a JSON array of issues, or a single issue object.
///
/// # Errors
///
/// Returns the serde error if `json` is neither shape.
pub fn parse_issues(json: &str) -> Result<Vec<IssueRecord>, serde_json::Error> {
    Ok(match serde_json::from_str(json)? {
        OneOrMany::Many(issues) => issues,
        OneOrMany::One(issue) => vec![issue],
    })
}

/// A pending, unassigned task for `issue`.
///
/// Checkbox lines in the body become criteria; the first body line, cut to
/// 200 characters, becomes the description.
#[must_use]
pub fn issue_to_task(issue: &IssueRecord, id: &str) -> Task {
    let body = issue.body.as_deref().unwrap_or_default();
    let mut task = Task::new(id, issue.title.as_str());
    task.description = body
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(DESCRIPTION_LIMIT)
        .collect();
    task.criteria = body
        .lines()
        .filter_map(|line| parse_checkbox(line.trim_start()))
        .map(|(done, text)| Criterion {
            done,
            text: text.to_string(),
        })
        .collect();
    task.github_issue = Some(issue.number);
    task
}

/// What a sync would change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPlan {
    /// New tasks, with IDs already allocated after the board's highest.
    pub created: Vec<Task>,
    /// IDs of board tasks whose issue was closed.
    pub closed: Vec<String>,
    /// Records that changed nothing (already synced, or pull requests).
    pub unchanged: usize,
}

impl SyncPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.closed.is_empty()
    }

    /// Apply to an in-memory task list: completes closed tasks, then appends
    /// new ones.
    pub fn apply(self, tasks: &mut Vec<Task>, timestamp: &str) {
        for task in tasks.iter_mut().filter(|t| self.closed.contains(&t.id)) {
            task.status = Status::Completed;
            task.completed = timestamp.to_string();
        }
        tasks.extend(self.created);
    }
}

/// Compare `issues` against the board.
///
/// Open unseen issues become tasks, numbered past every ID on the board
/// (unreadable blocks included). A closed issue completes its task unless
/// the task is already completed; closed issues with no task are ignored.
#[must_use]
pub fn sync_issues(board: &Board, issues: &[IssueRecord]) -> SyncPlan {
    let tasks = &board.tasks;
    let mut seen: HashSet<u64> = tasks.iter().filter_map(|t| t.github_issue).collect();
    let mut plan = SyncPlan::default();
    let mut taken: Vec<String> = board.ids().map(str::to_string).collect();

    for issue in issues {
        if issue.is_pull_request() {
            plan.unchanged += 1;
            continue;
        }
        if seen.contains(&issue.number) {
            let to_close = tasks.iter().find(|t| {
                t.github_issue == Some(issue.number)
                    && issue.state == IssueState::Closed
                    && t.status != Status::Completed
            });
            match to_close {
                Some(task) if !plan.closed.contains(&task.id) => plan.closed.push(task.id.clone()),
                _ => plan.unchanged += 1,
            }
            continue;
        }
        if issue.state == IssueState::Closed {
            plan.unchanged += 1;
            continue;
        }
        let task = issue_to_task(issue, &next_id(taken.iter().map(String::as_str)));
        seen.insert(issue.number);
        taken.push(task.id.clone());
        plan.created.push(task);
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::RawBlock;

    fn board(tasks: Vec<Task>) -> Board {
        Board {
            tasks,
            ..Board::default()
        }
    }

    fn issue(number: u64, state: IssueState, body: Option<&str>) -> IssueRecord {
        IssueRecord {
            number,
            title: format!("Issue {number}"),
            body: body.map(str::to_string),
            state,
            pull_request: None,
        }
    }

    #[test]
    fn parses_array_and_single_object() {
        let many = parse_issues(r#"[{"number":1,"title":"a"},{"number":2,"title":"b","state":"closed","body":null}]"#)
            .expect("array");
        assert_eq!(many.len(), 2);
        assert_eq!(many[1].state, IssueState::Closed);
        let one = parse_issues(r#"{"number":7,"title":"c","extra":true}"#).expect("object");
        assert_eq!(one[0].number, 7);
        assert!(parse_issues("42").is_err());
    }

    #[test]
    fn accepts_gh_cli_uppercase_states() {
        let issues = parse_issues(r#"[{"number":3,"title":"x","body":"","state":"CLOSED"}]"#)
            .expect("gh output");
        assert_eq!(issues[0].state, IssueState::Closed);
    }

    #[test]
    fn issue_body_feeds_description_and_criteria() {
        let body = format!("{}\n\n- [ ] uno\n  - [x] dos\nnot - [ ] inline", "d".repeat(250));
        let task = issue_to_task(&issue(5, IssueState::Open, Some(&body)), "TASK-010");
        assert_eq!(task.description.chars().count(), 200);
        assert_eq!(task.criteria.len(), 2);
        assert!(task.criteria[1].done);
        assert_eq!(task.github_issue, Some(5));
        assert_eq!(task.status, Status::Pending);
    }

    #[test]
    fn plan_creates_closes_and_skips() {
        let mut linked = Task::new("TASK-003", "linked");
        linked.github_issue = Some(10);
        let tasks = vec![Task::new("TASK-001", "a"), linked];

        let mut pr = issue(12, IssueState::Open, None);
        pr.pull_request = Some(serde_json::json!({"url": "x"}));
        let issues = [
            issue(10, IssueState::Closed, None),
            issue(11, IssueState::Open, Some("body")),
            pr,
            issue(13, IssueState::Closed, None),
            issue(14, IssueState::Open, None),
        ];

        let plan = sync_issues(&board(tasks.clone()), &issues);
        assert_eq!(plan.closed, vec!["TASK-003"]);
        let ids: Vec<_> = plan.created.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["TASK-004", "TASK-005"]);
        assert_eq!(plan.unchanged, 2);

        let mut applied = tasks;
        plan.apply(&mut applied, "2024-01-15 12:00:00");
        assert_eq!(applied.len(), 4);
        assert_eq!(applied[1].status, Status::Completed);
        assert_eq!(applied[1].completed, "2024-01-15 12:00:00");
    }

    #[test]
    fn resync_is_a_no_op() {
        let issues = [issue(1, IssueState::Open, None)];
        let mut current = Board::default();
        sync_issues(&current, &issues).apply(&mut current.tasks, "t");
        let again = sync_issues(&current, &issues);
        assert!(again.is_empty());
        assert_eq!(again.unchanged, 1);
    }

    #[test]
    fn new_ids_skip_unreadable_blocks() {
        let mut current = board(vec![Task::new("TASK-001", "a")]);
        current.unreadable.push(RawBlock {
            id: "TASK-007".into(),
            lines: vec!["## TASK-007 [STATUS:hecho] [ASSIGNED:]".into()],
        });
        let plan = sync_issues(&current, &[issue(3, IssueState::Open, None)]);
        assert_eq!(plan.created[0].id, "TASK-008");
    }
}
