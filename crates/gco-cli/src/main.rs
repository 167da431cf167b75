#![forbid(unsafe_code)]

mod agent;
mod cmd;
mod git;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "gco",
    author,
    version,
    about = "gco: shared task board and activity journal for coding agents",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (pretty, text, json).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Override agent identity (skips env and branch detection).
    #[arg(long, global = true)]
    agent: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }

    fn agent_flag(&self) -> Option<&str> {
        self.agent.as_deref()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a gco project",
        long_about = "Create .gco/config.json, an empty tasks.md and the activity journal in the current directory.",
        after_help = "EXAMPLES:\n    # Initialize with defaults\n    gco init\n\n    # Agents branch from main instead of develop\n    gco init --main-branch main"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Tasks",
        about = "Create, list, show and edit tasks",
        long_about = "Manage the tasks in tasks.md. Every change is also recorded in the journal.",
        after_help = "EXAMPLES:\n    # Create a task\n    gco task create --title \"Login form\" --criterion \"Validates email\"\n\n    # Open tasks for one agent\n    gco task list --assigned copilot\n\n    # Block a task\n    gco task status TASK-003 blocked --reason \"Waiting on API\""
    )]
    Task(cmd::task::TaskArgs),

    #[command(
        next_help_heading = "Tasks",
        about = "Assign a task to an agent",
        long_about = "Set the task's agent, reset it to pending and print the branch the agent should work on.",
        after_help = "EXAMPLES:\n    # Hand TASK-002 to copilot\n    gco assign TASK-002 copilot"
    )]
    Assign(cmd::assign::AssignArgs),

    #[command(
        next_help_heading = "Tasks",
        about = "Claim a task for the current agent",
        long_about = "Assign an unassigned task to the agent resolved from --agent, GCO_AGENT/AGENT or the current branch, and mark it in progress.",
        after_help = "EXAMPLES:\n    gco --agent copilot claim TASK-004"
    )]
    Claim(cmd::claim::ClaimArgs),

    #[command(
        next_help_heading = "Review",
        about = "List tasks awaiting review, or inspect one",
        long_about = "Without a task, list the review queue. With one, show the task, its branch commits and changed files, and its journal history.",
        after_help = "EXAMPLES:\n    gco review\n\n    gco review TASK-002"
    )]
    Review(cmd::review::ReviewArgs),

    #[command(
        next_help_heading = "Review",
        about = "Approve a task and merge its branch",
        long_about = "Merge <prefix>/<agent>/<TASK> into the base branch (when it exists) and mark the task completed.",
        after_help = "EXAMPLES:\n    gco approve TASK-002\n\n    # Also remove the agent branch\n    gco approve TASK-002 --delete-branch"
    )]
    Approve(cmd::review::ApproveArgs),

    #[command(
        next_help_heading = "Review",
        about = "Send a task back to its agent",
        long_about = "Set the task back to in-progress and record the reason in the journal.",
        after_help = "EXAMPLES:\n    gco reject TASK-002 --reason \"Missing tests for empty email\""
    )]
    Reject(cmd::review::RejectArgs),

    #[command(
        next_help_heading = "Journal",
        about = "Add an entry to the activity journal",
        long_about = "Append an entry to .gco-logs/current.md and DEVELOP_LOG.md. Agent and task default to the ones encoded in the current <prefix>/<agent>/<TASK> branch.",
        after_help = "EXAMPLES:\n    # On branch agent/copilot/TASK-002\n    gco log \"Form validation done\"\n\n    # Explicit agent, task and type\n    gco log --agent copilot --task TASK-002 --type decision \"Use zod for validation\""
    )]
    Log(cmd::log::LogArgs),

    #[command(
        next_help_heading = "Journal",
        about = "Print the current journal",
        after_help = "EXAMPLES:\n    gco read\n\n    # Parsed entries\n    gco read --json"
    )]
    Read(cmd::read::ReadArgs),

    #[command(
        next_help_heading = "Journal",
        about = "Journal entries for one task",
        after_help = "EXAMPLES:\n    gco history TASK-002"
    )]
    History(cmd::read::HistoryArgs),

    #[command(
        next_help_heading = "Journal",
        about = "Archive the current journal",
        long_about = "Move .gco-logs/current.md to .gco-logs/<date>.md and start a fresh journal.",
        after_help = "EXAMPLES:\n    gco archive"
    )]
    Archive,

    #[command(
        next_help_heading = "Overview",
        about = "Show project status",
        long_about = "Summarize the board, list active agents, blocked and review tasks, and refresh the journal's agent table.",
        after_help = "EXAMPLES:\n    gco status\n\n    gco status --json"
    )]
    Status,

    #[command(
        next_help_heading = "Overview",
        about = "Check board consistency",
        long_about = "Report blocked tasks without reason, missing or circular dependencies, unassigned active tasks, missing branches, agents with several active tasks and files changed by more than one agent.",
        after_help = "EXAMPLES:\n    gco validate\n\n    # Fail CI on errors\n    gco validate --strict"
    )]
    Validate(cmd::validate::ValidateArgs),

    #[command(
        next_help_heading = "Overview",
        about = "Board statistics",
        long_about = "Count tasks by status and by agent, with the completion percentage.",
        after_help = "EXAMPLES:\n    gco stats\n\n    gco stats --json"
    )]
    Stats,

    #[command(
        next_help_heading = "Integrations",
        about = "Import GitHub issues from a JSON file",
        long_about = "Create tasks for open issues not yet on the board and complete tasks whose issue was closed.",
        after_help = "EXAMPLES:\n    gh issue list --state all --json number,title,body,state > issues.json\n    gco sync --file issues.json --dry-run\n    gco sync --file issues.json"
    )]
    Sync(cmd::sync::SyncArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Read or change .gco/config.json",
        after_help = "EXAMPLES:\n    gco config get mainBranch\n    gco config set github.owner acme\n    gco config list"
    )]
    Config(cmd::config::ConfigArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    gco completions bash > /etc/bash_completion.d/gco"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("GCO_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "gco=debug,info"
        } else {
            "gco=info,warn"
        })
    });

    let format = env::var("GCO_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let output = cli.output_mode();

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, output, &project_root),
        Commands::Task(args) => cmd::task::run_task(args, output, &project_root),
        Commands::Assign(args) => cmd::assign::run_assign(args, output, &project_root),
        Commands::Claim(args) => {
            cmd::claim::run_claim(args, cli.agent_flag(), output, &project_root)
        }
        Commands::Review(args) => cmd::review::run_review(args, output, &project_root),
        Commands::Approve(args) => cmd::review::run_approve(args, output, &project_root),
        Commands::Reject(args) => cmd::review::run_reject(args, output, &project_root),
        Commands::Log(args) => cmd::log::run_log(args, cli.agent_flag(), output, &project_root),
        Commands::Read(args) => cmd::read::run_read(args, output, &project_root),
        Commands::History(args) => cmd::read::run_history(args, output, &project_root),
        Commands::Archive => cmd::archive::run_archive(output, &project_root),
        Commands::Status => cmd::status::run_status(output, &project_root),
        Commands::Validate(args) => cmd::validate::run_validate(args, output, &project_root),
        Commands::Stats => cmd::stats::run_stats(output, &project_root),
        Commands::Sync(args) => cmd::sync::run_sync(args, output, &project_root),
        Commands::Config(args) => cmd::config::run_config(args, output, &project_root),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args, &mut command)
        }
    }
}
