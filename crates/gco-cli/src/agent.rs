//! Agent identity resolution for CLI commands.
//!
//! The resolution chain: `--agent` flag > `GCO_AGENT` env > `AGENT` env >
//! the agent segment of the checked-out `<prefix>/<agent>/<TASK-ID>` branch.
//! The task for `gco log` comes from `--task`, then from the same branch.

use gco_core::git::parse_branch_name;
use std::env;

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
}

/// Real environment reader.
struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }
}

/// Who is writing and about which task. Either side may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub agent: Option<String>,
    pub task_id: Option<String>,
}

fn resolve_agent_with(cli_flag: Option<&str>, env: &dyn EnvReader) -> Option<String> {
    if let Some(agent) = cli_flag.filter(|a| !a.is_empty()) {
        return Some(agent.to_string());
    }
    env.get("GCO_AGENT").or_else(|| env.get("AGENT"))
}

fn resolve_identity_with(
    agent_flag: Option<&str>,
    task_flag: Option<&str>,
    branch: Option<&str>,
    prefix: &str,
    env: &dyn EnvReader,
) -> Identity {
    let from_branch = branch.and_then(|name| parse_branch_name(prefix, name));
    let agent = resolve_agent_with(agent_flag, env)
        .or_else(|| from_branch.map(|(agent, _)| agent.to_string()))
        .map(|agent| agent.trim_start_matches('@').to_string());
    let task_id = task_flag
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| from_branch.map(|(_, task)| task.to_string()));
    Identity { agent, task_id }
}

/// Resolve agent and task, falling back to the checked-out branch name.
pub fn resolve_identity(
    agent_flag: Option<&str>,
    task_flag: Option<&str>,
    branch: Option<&str>,
    prefix: &str,
) -> Identity {
    resolve_identity_with(agent_flag, task_flag, branch, prefix, &RealEnv)
}
