//! End-to-end workflow tests for the `gco` binary.
//!
//! Each test runs `gco` as a subprocess in an isolated temp directory that is
//! not a git repository, so branch lookups fail and are skipped.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the gco binary, rooted in `dir`.
fn gco(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gco"));
    cmd.current_dir(dir);
    // Keep stderr quiet and output selection deterministic.
    cmd.env("GCO_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join(".xdg"));
    cmd.env_remove("FORMAT");
    cmd.env_remove("GCO_AGENT");
    cmd.env_remove("AGENT");
    cmd
}

fn init_project(dir: &Path) {
    gco(dir).arg("init").assert().success();
}

fn json_of(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("gco should not crash");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
}

fn create_task(dir: &Path, title: &str, extra: &[&str]) -> String {
    let json = json_of(
        gco(dir)
            .args(["task", "create", "--title", title, "--json"])
            .args(extra),
    );
    json["id"].as_str().expect("id field").to_string()
}

fn journal(dir: &Path) -> String {
    fs::read_to_string(dir.join(".gco-logs/current.md")).expect("journal exists")
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_project_files() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());

    assert!(dir.path().join(".gco/config.json").is_file());
    assert!(dir.path().join("tasks.md").is_file());
    assert!(dir.path().join(".gco-logs/current.md").is_file());
    assert!(dir.path().join(".gco-logs/index.json").is_file());

    let config: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join(".gco/config.json")).unwrap())
            .unwrap();
    assert_eq!(config["mainBranch"], "develop");
    assert_eq!(config["branchPrefix"], "agent");
}

#[test]
fn init_twice_changes_nothing() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let board = fs::read_to_string(dir.path().join("tasks.md")).unwrap();

    let json = json_of(gco(dir.path()).args(["init", "--json"]));
    assert_eq!(json["createdConfig"], false);
    assert_eq!(json["createdBoard"], false);
    assert_eq!(json["createdJournal"], false);
    assert_eq!(fs::read_to_string(dir.path().join("tasks.md")).unwrap(), board);
}

#[test]
fn commands_outside_a_project_fail_with_code() {
    let dir = TempDir::new().unwrap();
    gco(dir.path())
        .args(["task", "list", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"));
}

// ---------------------------------------------------------------------------
// tasks
// ---------------------------------------------------------------------------

#[test]
fn create_allocates_sequential_ids_and_writes_board() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());

    let first = create_task(dir.path(), "Login form", &["--criterion", "Validates email"]);
    let second = create_task(dir.path(), "Signup", &["--assign", "copilot"]);
    assert_eq!(first, "TASK-001");
    assert_eq!(second, "TASK-002");

    let board = fs::read_to_string(dir.path().join("tasks.md")).unwrap();
    assert!(board.contains("## TASK-001 [STATUS:pending] [ASSIGNED:]"));
    assert!(board.contains("## TASK-002 [STATUS:pending] [ASSIGNED:@copilot]"));
    assert!(board.contains("- [ ] Validates email"));
    assert!(board.contains("> Total tareas: 2 | Completadas: 0 | En progreso: 0 | Pendientes: 2"));

    assert!(journal(dir.path()).contains("@sistema - TASK-001 - system\nTarea creada: Login form"));
}

#[test]
fn create_rejects_duplicate_and_malformed_ids() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    create_task(dir.path(), "First", &["--id", "TASK-010"]);

    gco(dir.path())
        .args(["task", "create", "--title", "Again", "--id", "TASK-010", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2002"));
    gco(dir.path())
        .args(["task", "create", "--title", "Bad", "--id", "T-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid task ID"));

    // The next allocated ID follows the highest existing one.
    assert_eq!(create_task(dir.path(), "Next", &[]), "TASK-011");
}

#[test]
fn list_hides_completed_unless_all() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let done = create_task(dir.path(), "Done", &[]);
    create_task(dir.path(), "Open", &[]);
    gco(dir.path())
        .args(["task", "status", &done, "completed"])
        .assert()
        .success();

    let json = json_of(gco(dir.path()).args(["task", "list", "--json"]));
    assert_eq!(json["total"], 2);
    assert_eq!(json["tasks"].as_array().unwrap().len(), 1);
    assert_eq!(json["tasks"][0]["title"], "Open");

    let json = json_of(gco(dir.path()).args(["task", "list", "--all", "--json"]));
    assert_eq!(json["tasks"].as_array().unwrap().len(), 2);
}

#[test]
fn blocking_records_reason_and_journal_entry() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let id = create_task(dir.path(), "API client", &[]);

    gco(dir.path())
        .args(["task", "status", &id, "blocked", "--reason", "Waiting on API keys"])
        .assert()
        .success();

    let task = json_of(gco(dir.path()).args(["task", "show", &id, "--json"]));
    assert_eq!(task["status"], "blocked");
    assert_eq!(task["blockReason"], "Waiting on API keys");
    assert!(!task["blockedSince"].as_str().unwrap().is_empty());

    assert!(journal(dir.path()).contains("Estado cambiado a blocked: Waiting on API keys"));
}

#[test]
fn unknown_status_is_rejected_by_the_parser() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let id = create_task(dir.path(), "x", &[]);
    gco(dir.path())
        .args(["task", "status", &id, "finished"])
        .assert()
        .failure();
}

#[test]
fn update_merges_only_given_fields() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let id = create_task(
        dir.path(),
        "Cache",
        &["--description", "LRU cache", "--criterion", "a", "--criterion", "b"],
    );

    let task = json_of(gco(dir.path()).args([
        "task", "update", &id, "--notes", "use moka", "--check", "2", "--json",
    ]));
    assert_eq!(task["title"], "Cache");
    assert_eq!(task["description"], "LRU cache");
    assert_eq!(task["notes"], "use moka");
    assert_eq!(task["criteria"][0]["done"], false);
    assert_eq!(task["criteria"][1]["done"], true);

    gco(dir.path())
        .args(["task", "update", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to update"));
}

#[test]
fn show_missing_task_reports_not_found() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    gco(dir.path())
        .args(["task", "show", "TASK-404", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"));
}

// ---------------------------------------------------------------------------
// assign
// ---------------------------------------------------------------------------

#[test]
fn assign_sets_handle_and_reports_branch() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let id = create_task(dir.path(), "Navbar", &[]);

    let json = json_of(gco(dir.path()).args(["assign", &id, "copilot", "--json"]));
    assert_eq!(json["agent"], "@copilot");
    assert_eq!(json["branch"], format!("agent/copilot/{id}"));
    assert_eq!(json["base"], "develop");

    let task = json_of(gco(dir.path()).args(["task", "show", &id, "--json"]));
    assert_eq!(task["assigned"], "@copilot");
    assert_eq!(task["status"], "pending");
    assert!(journal(dir.path()).contains("Tarea asignada a @copilot"));
}

#[test]
fn assign_refuses_completed_task() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let id = create_task(dir.path(), "Old", &[]);
    gco(dir.path())
        .args(["task", "status", &id, "completed"])
        .assert()
        .success();
    gco(dir.path())
        .args(["assign", &id, "copilot"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be assigned"));
}

#[test]
fn names_that_break_the_header_are_refused() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    gco(dir.path())
        .args(["task", "create", "--title", "X", "--assign", "gpt 4", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2003"));
    let id = create_task(dir.path(), "Y", &[]);
    gco(dir.path())
        .args(["assign", &id, "bad]agent", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2003"));

    let board = fs::read_to_string(dir.path().join("tasks.md")).unwrap();
    assert!(!board.contains("gpt 4"));
    assert!(!board.contains("bad]agent"));
}

// ---------------------------------------------------------------------------
// claim
// ---------------------------------------------------------------------------

#[test]
fn claim_takes_open_task_and_logs_start() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let id = create_task(dir.path(), "Footer", &[]);

    let json = json_of(gco(dir.path()).args(["--agent", "copilot", "claim", &id, "--json"]));
    assert_eq!(json["agent"], "@copilot");
    assert_eq!(json["status"], "in-progress");
    assert_eq!(json["branch"], format!("agent/copilot/{id}"));

    let history = json_of(gco(dir.path()).args(["history", &id, "--json"]));
    let last = history["entries"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["agent"], "copilot");
    assert_eq!(last["type"], "start");

    // Another agent cannot take it over.
    gco(dir.path())
        .env("GCO_AGENT", "vscode")
        .args(["claim", &id, "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2006"));
}

#[test]
fn claim_without_agent_fails() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let id = create_task(dir.path(), "Footer", &[]);
    gco(dir.path())
        .args(["claim", &id, "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing_agent"));
}

// ---------------------------------------------------------------------------
// review, approve, reject
// ---------------------------------------------------------------------------

fn task_in_review(dir: &Path, title: &str) -> String {
    let id = create_task(dir, title, &["--assign", "vscode"]);
    gco(dir)
        .args(["task", "status", &id, "review"])
        .assert()
        .success();
    id
}

#[test]
fn review_lists_queue_and_shows_detail() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let id = task_in_review(dir.path(), "Login");
    create_task(dir.path(), "Not yet", &[]);

    let queue = json_of(gco(dir.path()).args(["review", "--json"]));
    assert_eq!(queue["total"], 1);
    assert_eq!(queue["tasks"][0]["id"], id.as_str());

    let detail = json_of(gco(dir.path()).args(["review", &id, "--json"]));
    assert_eq!(detail["task"]["id"], id.as_str());
    assert_eq!(detail["branch"], format!("agent/vscode/{id}"));
    // Not a git repository, so the branch reads as missing.
    assert_eq!(detail["branchExists"], false);
    assert!(!detail["history"].as_array().unwrap().is_empty());

    gco(dir.path())
        .args(["review", "--format", "pretty"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Waiting for review (1)"));
}

#[test]
fn approve_without_branch_completes_task() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let id = task_in_review(dir.path(), "Login");

    let json = json_of(gco(dir.path()).args(["approve", &id, "--json"]));
    assert_eq!(json["merged"], false);
    assert_eq!(json["previousStatus"], "review");
    assert_eq!(json["task"]["status"], "completed");
    assert!(!json["task"]["completed"].as_str().unwrap().is_empty());
    assert!(journal(dir.path()).contains("✅ Tarea aprobada por humano"));

    let queue = json_of(gco(dir.path()).args(["review", "--json"]));
    assert_eq!(queue["total"], 0);
}

#[test]
fn approve_unassigned_task_fails() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let id = create_task(dir.path(), "Orphan", &[]);
    gco(dir.path())
        .args(["approve", &id, "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2005"));
}

#[test]
fn reject_reopens_with_reason() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let id = task_in_review(dir.path(), "Login");

    let json = json_of(gco(dir.path()).args([
        "reject",
        &id,
        "--reason",
        "Missing tests",
        "--json",
    ]));
    assert_eq!(json["status"], "in-progress");
    assert_eq!(json["assigned"], "@vscode");
    assert_eq!(json["completed"], "");
    assert!(journal(dir.path()).contains("❌ Tarea rechazada: Missing tests"));

    gco(dir.path())
        .args(["reject", &id, "--reason", "  "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty rejection reason"));
}

// ---------------------------------------------------------------------------
// journal
// ---------------------------------------------------------------------------

#[test]
fn log_and_history_round_trip() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let id = create_task(dir.path(), "Form", &[]);

    gco(dir.path())
        .args(["log", "--agent", "copilot", "--task", &id, "--type", "start", "Starting"])
        .assert()
        .success();
    gco(dir.path())
        .env("GCO_AGENT", "copilot")
        .args(["log", "--task", &id, "Halfway there"])
        .assert()
        .success();

    let history = json_of(gco(dir.path()).args(["history", &id, "--json"]));
    let entries = history["entries"].as_array().unwrap();
    // The creation entry from `task create` comes first.
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["agent"], "sistema");
    assert_eq!(entries[1]["type"], "start");
    assert_eq!(entries[2]["message"], "Halfway there");
    assert_eq!(entries[2]["type"], "progress");

    let public = fs::read_to_string(dir.path().join("DEVELOP_LOG.md")).unwrap();
    assert_eq!(public, journal(dir.path()));
}

#[test]
fn log_without_agent_or_branch_fails() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    gco(dir.path())
        .args(["log", "--task", "TASK-001", "hello", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing_agent"));
}

#[test]
fn log_refuses_agent_name_with_spaces() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let id = create_task(dir.path(), "Form", &[]);
    let before = journal(dir.path());
    gco(dir.path())
        .args(["log", "--agent", "my agent", "--task", &id, "hi", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2003"));
    assert_eq!(journal(dir.path()), before);
}

#[test]
fn archive_moves_current_partition() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let id = create_task(dir.path(), "Archive me", &[]);

    let json = json_of(gco(dir.path()).args(["archive", "--json"]));
    assert_eq!(json["archived"], true);
    let archived = json["path"].as_str().unwrap();
    assert!(fs::read_to_string(archived).unwrap().contains("Tarea creada: Archive me"));
    assert!(!journal(dir.path()).contains(&id));
}

#[test]
fn read_prints_the_partition() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    gco(dir.path())
        .arg("read")
        .assert()
        .success()
        .stdout(predicate::str::contains("# DEVELOP_LOG - "));
}

// ---------------------------------------------------------------------------
// status, validate
// ---------------------------------------------------------------------------

#[test]
fn status_reports_counts_and_blocked_tasks() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let blocked = create_task(dir.path(), "Stuck", &[]);
    create_task(dir.path(), "Free", &[]);
    gco(dir.path())
        .args(["task", "status", &blocked, "blocked", "--reason", "CI down"])
        .assert()
        .success();

    let json = json_of(gco(dir.path()).args(["status", "--json"]));
    assert_eq!(json["summary"]["total"], 2);
    assert_eq!(json["summary"]["byStatus"]["blocked"], 1);
    assert_eq!(json["blocked"][0]["id"], blocked);
    assert_eq!(json["unassigned"].as_array().unwrap().len(), 1);
}

#[test]
fn status_writes_active_agents_into_the_journal_table() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let id = create_task(dir.path(), "Active", &["--assign", "copilot"]);
    gco(dir.path())
        .args(["task", "status", &id, "in-progress"])
        .assert()
        .success();

    gco(dir.path()).arg("status").assert().success();
    let row = format!("| @copilot | {id} | 🟡 En progreso | `(sin rama)` |");
    assert!(journal(dir.path()).contains(&row), "{}", journal(dir.path()));
}

#[test]
fn validate_strict_fails_on_circular_dependencies() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    create_task(dir.path(), "A", &["--depends-on", "TASK-002"]);
    create_task(dir.path(), "B", &["--depends-on", "TASK-001"]);

    let json = json_of(gco(dir.path()).args(["validate", "--json"]));
    assert_eq!(json["ok"], false);
    assert_eq!(json["counts"]["error"], 2);

    gco(dir.path())
        .args(["validate", "--strict"])
        .assert()
        .failure();
}

#[test]
fn validate_clean_board_passes_strict() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    create_task(dir.path(), "A", &[]);
    create_task(dir.path(), "B", &["--depends-on", "TASK-001"]);
    gco(dir.path())
        .args(["validate", "--strict"])
        .assert()
        .success();
}

// ---------------------------------------------------------------------------
// sync, config
// ---------------------------------------------------------------------------

#[test]
fn stats_count_by_status_and_agent() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let a = create_task(dir.path(), "A", &["--assign", "vscode"]);
    create_task(dir.path(), "B", &["--assign", "vscode"]);
    create_task(dir.path(), "C", &[]);
    gco(dir.path())
        .args(["task", "status", &a, "completed"])
        .assert()
        .success();

    let stats = json_of(gco(dir.path()).args(["stats", "--json"]));
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["completionPercent"], 33);
    assert_eq!(stats["byAgent"]["@vscode"]["total"], 2);
    assert_eq!(stats["byAgent"]["@vscode"]["completed"], 1);
    assert_eq!(stats["byAgent"]["unassigned"]["total"], 1);

    gco(dir.path())
        .args(["stats", "--format", "pretty"])
        .assert()
        .success()
        .stdout(predicate::str::contains("33% (1/3)"));
}

#[test]
fn sync_dry_run_then_apply() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());
    let issues = dir.path().join("issues.json");
    fs::write(
        &issues,
        r#"[
            {"number": 12, "title": "Dark mode", "body": "Add a toggle\n- [ ] persists", "state": "open"},
            {"number": 13, "title": "Old bug", "state": "closed"},
            {"number": 14, "title": "A PR", "pull_request": {"url": "x"}}
        ]"#,
    )
    .unwrap();
    let issues = issues.to_str().unwrap();

    let plan = json_of(gco(dir.path()).args(["sync", "--file", issues, "--dry-run", "--json"]));
    assert_eq!(plan["dryRun"], true);
    assert_eq!(plan["created"].as_array().unwrap().len(), 1);
    assert!(!fs::read_to_string(dir.path().join("tasks.md")).unwrap().contains("Dark mode"));

    json_of(gco(dir.path()).args(["sync", "--file", issues, "--json"]));
    let task = json_of(gco(dir.path()).args(["task", "show", "TASK-001", "--json"]));
    assert_eq!(task["title"], "Dark mode");
    assert_eq!(task["githubIssue"], 12);
    assert_eq!(task["criteria"][0]["text"], "persists");

    // Second run is a no-op.
    let again = json_of(gco(dir.path()).args(["sync", "--file", issues, "--json"]));
    assert_eq!(again["created"].as_array().unwrap().len(), 0);
}

#[test]
fn config_set_then_get() {
    let dir = TempDir::new().unwrap();
    init_project(dir.path());

    gco(dir.path())
        .args(["config", "set", "github.owner", "acme"])
        .assert()
        .success();
    gco(dir.path())
        .args(["config", "set", "log.autoArchive", "true"])
        .assert()
        .success();

    gco(dir.path())
        .args(["config", "get", "github.owner"])
        .assert()
        .success()
        .stdout("acme\n");
    let json = json_of(gco(dir.path()).args(["config", "get", "log.autoArchive", "--json"]));
    assert_eq!(json["value"], true);

    gco(dir.path())
        .args(["config", "get", "no.such.key"])
        .assert()
        .failure();
}

#[test]
fn completions_emit_a_script() {
    let dir = TempDir::new().unwrap();
    gco(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gco"));
}
