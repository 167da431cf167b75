use gco_core::git::InMemoryGit;
use gco_core::model::{Status, Task};
use gco_core::validate::{BranchPolicy, Level, Report, check_blocked, check_file_collisions, validate_all};

fn task(id: &str, status: Status, assigned: &str, deps: &str) -> Task {
    let mut t = Task::new(id, format!("title {id}"));
    t.status = status;
    t.assigned = assigned.to_string();
    t.dependencies = deps.to_string();
    t
}

fn cycle_errors(tasks: &[Task]) -> Vec<String> {
    validate_all(tasks, &InMemoryGit::new(), &BranchPolicy::default())
        .into_iter()
        .filter(|i| i.level == Level::Error && i.message.contains("circular"))
        .map(|i| i.task_id)
        .collect()
}

#[test]
fn two_task_cycle_reports_once_per_task() {
    // The search runs from every task, so each member of a cycle gets its own
    // error rather than one error for the whole cycle.
    let tasks = [
        task("TASK-001", Status::Pending, "", "TASK-002"),
        task("TASK-002", Status::Pending, "", "TASK-001"),
    ];
    assert_eq!(cycle_errors(&tasks), vec!["TASK-001", "TASK-002"]);
}

#[test]
fn chain_has_no_cycle() {
    let tasks = [
        task("TASK-001", Status::Pending, "", "TASK-002"),
        task("TASK-002", Status::Pending, "", "TASK-003"),
        task("TASK-003", Status::Pending, "", ""),
    ];
    assert!(cycle_errors(&tasks).is_empty());
}

#[test]
fn shared_file_collides_once() {
    let tasks = [
        task("TASK-001", Status::InProgress, "@vscode", ""),
        task("TASK-002", Status::InProgress, "@copilot", ""),
    ];
    let git = InMemoryGit::new()
        .with_branch("agent/vscode/TASK-001", ["src/app.js", "a.txt"])
        .with_branch("agent/copilot/TASK-002", ["src/app.js", "b.txt"]);
    let collisions = check_file_collisions(&tasks, &git, &BranchPolicy::default());
    assert_eq!(collisions.len(), 1);
    assert_eq!(collisions[0].file, "src/app.js");
    let pairs: Vec<_> = collisions[0]
        .touches
        .iter()
        .map(|t| (t.agent.as_str(), t.task_id.as_str()))
        .collect();
    assert_eq!(pairs, vec![("@vscode", "TASK-001"), ("@copilot", "TASK-002")]);
}

#[test]
fn no_overlap_no_collisions() {
    let tasks = [
        task("TASK-001", Status::InProgress, "@vscode", ""),
        task("TASK-002", Status::InProgress, "@copilot", ""),
    ];
    let git = InMemoryGit::new()
        .with_branch("agent/vscode/TASK-001", ["a.txt"])
        .with_branch("agent/copilot/TASK-002", ["b.txt"]);
    assert!(check_file_collisions(&tasks, &git, &BranchPolicy::default()).is_empty());
}

#[test]
fn blocked_without_reason_is_one_warning() {
    let mut blocked = task("TASK-001", Status::Blocked, "", "");
    blocked.blocked_since = "2024-01-15 09:00:00".into();
    let issues = check_blocked(std::slice::from_ref(&blocked));
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].level, Level::Warning);
    assert_eq!(issues[0].task_id, "TASK-001");

    blocked.block_reason = "esperando API".into();
    assert!(check_blocked(&[blocked]).is_empty());
}

#[test]
fn one_failing_lookup_does_not_hide_other_results() {
    let tasks = [
        task("TASK-001", Status::InProgress, "@a", "TASK-404"),
        task("TASK-002", Status::InProgress, "@b", ""),
        task("TASK-003", Status::InProgress, "@c", ""),
    ];
    let git = InMemoryGit::new()
        .with_failure("agent/a/TASK-001")
        .with_branch("agent/b/TASK-002", ["shared.rs"])
        .with_branch("agent/c/TASK-003", ["shared.rs"]);
    let policy = BranchPolicy::default();
    let report = Report::run(&tasks, &git, &policy);

    assert_eq!(report.count(Level::Error), 1);
    assert_eq!(report.count(Level::Warning), 0);
    assert_eq!(report.collisions.len(), 1);
    assert_eq!(report.collisions[0].touches.len(), 2);
}

#[test]
fn checks_run_in_order() {
    let tasks = [
        task("TASK-001", Status::Blocked, "", "TASK-404"),
        task("TASK-002", Status::InProgress, "", ""),
        task("TASK-003", Status::InProgress, "@x", ""),
        task("TASK-004", Status::InProgress, "@x", ""),
    ];
    let git = InMemoryGit::new()
        .with_branch("agent/x/TASK-003", Vec::<String>::new())
        .with_branch("agent/x/TASK-004", Vec::<String>::new());
    let messages: Vec<_> = validate_all(&tasks, &git, &BranchPolicy::default())
        .into_iter()
        .map(|i| i.message)
        .collect();
    assert_eq!(
        messages,
        vec![
            "blocked task has no block reason",
            "blocked task has no blocked-since date",
            "dependency TASK-404 does not exist",
            "in-progress task has no assigned agent",
            "@x has multiple tasks in progress: TASK-003, TASK-004",
        ]
    );
}
