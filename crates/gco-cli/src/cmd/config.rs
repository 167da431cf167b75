use crate::cmd::Project;
use crate::output::{CliError, OutputMode, fail, render};
use anyhow::Result;
use clap::{Args, Subcommand};
use gco_core::config::{get_value, load_config_value, save_config_value, set_value};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print one value by dotted key (e.g. github.owner)
    Get(GetArgs),
    /// Set a value by dotted key; true/false and numbers are stored typed
    Set(SetArgs),
    /// Print the effective project configuration
    List,
}

#[derive(Args, Debug)]
struct GetArgs {
    /// Dot path key (e.g. mainBranch, log.archiveTime)
    key: String,
}

#[derive(Args, Debug)]
struct SetArgs {
    /// Dot path key (e.g. mainBranch, log.archiveTime)
    key: String,

    /// New value
    value: String,
}

#[derive(Debug, Serialize)]
struct KeyValue<'a> {
    key: &'a str,
    value: &'a Value,
}

pub fn run_config(args: &ConfigArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::discover(project_root, output)?;
    match &args.command {
        ConfigCommand::Get(get) => run_get(get, output, &project.root),
        ConfigCommand::Set(set) => run_set(set, output, &project.root),
        ConfigCommand::List => run_list(output, &project.root),
    }
}

/// Strings print bare; everything else as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn run_get(args: &GetArgs, output: OutputMode, root: &Path) -> Result<()> {
    let config = load_config_value(root)?;
    let Some(value) = get_value(&config, &args.key) else {
        return Err(fail(
            output,
            &CliError::with_details(
                format!("config key '{}' is not set", args.key),
                "List the keys with `gco config list`",
                "config_key_not_found",
            ),
        ));
    };
    let kv = KeyValue {
        key: &args.key,
        value,
    };
    render(output, &kv, |kv, w| writeln!(w, "{}", display_value(kv.value)))
}

fn run_set(args: &SetArgs, output: OutputMode, root: &Path) -> Result<()> {
    let mut config = load_config_value(root)?;
    set_value(&mut config, &args.key, &args.value);
    save_config_value(root, &config)?;

    let value = get_value(&config, &args.key).cloned().unwrap_or(Value::Null);
    let kv = KeyValue {
        key: &args.key,
        value: &value,
    };
    render(output, &kv, |kv, w| {
        writeln!(w, "✓ {} = {}", kv.key, display_value(kv.value))
    })
}

fn run_list(output: OutputMode, root: &Path) -> Result<()> {
    let config = load_config_value(root)?;
    render(output, &config, |config, w| {
        let pretty = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;
        writeln!(w, "{pretty}")
    })
}
