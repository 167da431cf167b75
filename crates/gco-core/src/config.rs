use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::validate::BranchPolicy;

/// Marker directory that identifies a project root.
pub const GCO_DIR: &str = ".gco";
pub const CONFIG_FILE: &str = ".gco/config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_main_branch")]
    pub main_branch: String,
    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default = "default_agents")]
    pub agents: BTreeMap<String, AgentConfig>,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub templates: TemplateConfig,
    /// Keys this version does not know about, kept on rewrite.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            main_branch: default_main_branch(),
            branch_prefix: default_branch_prefix(),
            github: GithubConfig::default(),
            agents: default_agents(),
            log: LogConfig::default(),
            templates: TemplateConfig::default(),
            extra: Map::new(),
        }
    }
}

impl ProjectConfig {
    #[must_use]
    pub fn branch_policy(&self) -> BranchPolicy {
        BranchPolicy {
            prefix: self.branch_prefix.clone(),
            base: self.main_branch.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    #[serde(default)]
    pub auto_archive: bool,
    #[serde(default = "default_archive_time")]
    pub archive_time: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            auto_archive: false,
            archive_time: default_archive_time(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(rename = "type", default = "default_template")]
    pub kind: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            kind: default_template(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

/// Nearest directory at or above `start` containing `.gco/`.
#[must_use]
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(GCO_DIR).is_dir())
        .map(Path::to_path_buf)
}

fn read_config_file(project_root: &Path) -> Result<Option<Value>> {
    let path = project_root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    serde_json::from_str(&content)
        .map(Some)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let Some(raw) = read_config_file(project_root)? else {
        return Ok(ProjectConfig::default());
    };
    serde_json::from_value(raw)
        .with_context(|| format!("Failed to parse {}", project_root.join(CONFIG_FILE).display()))
}

/// The project config as loose JSON: defaults deep-merged with the file.
pub fn load_config_value(project_root: &Path) -> Result<Value> {
    let mut merged = serde_json::to_value(ProjectConfig::default())
        .context("Failed to serialize default config")?;
    if let Some(raw) = read_config_file(project_root)? {
        merge_values(&mut merged, raw);
    }
    Ok(merged)
}

pub fn save_config_value(project_root: &Path, config: &Value) -> Result<()> {
    let dir = project_root.join(GCO_DIR);
    std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = project_root.join(CONFIG_FILE);
    let mut json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    json.push('\n');
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn save_project_config(project_root: &Path, config: &ProjectConfig) -> Result<()> {
    let value = serde_json::to_value(config).context("Failed to serialize config")?;
    save_config_value(project_root, &value)
}

/// Recursive object merge; non-object values in `source` replace.
pub fn merge_values(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_values(existing, value);
                    }
                    _ => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

/// Look up a dotted key such as `github.owner`.
#[must_use]
pub fn get_value<'a>(config: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(config, |current, part| current.get(part))
}

/// Set a dotted key, creating intermediate objects.
///
/// `raw` replaces an existing string as-is. Anywhere else `true`/`false`
/// become booleans and numeric text becomes a number.
pub fn set_value(config: &mut Value, key: &str, raw: &str) {
    let mut parts: Vec<&str> = key.split('.').collect();
    let Some(last) = parts.pop() else {
        return;
    };

    let mut current = config;
    for part in parts {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        let child = map
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !child.is_object() {
            *child = Value::Object(Map::new());
        }
        current = child;
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    let Value::Object(map) = current else {
        return;
    };
    let keep_string = matches!(map.get(last), Some(Value::String(_)));
    let value = if keep_string {
        Value::String(raw.to_string())
    } else {
        coerce(raw)
    };
    map.insert(last.to_string(), value);
}

fn coerce(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::from(n);
    }
    if let Some(n) = trimmed
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        return Value::Number(n);
    }
    Value::String(raw.to_string())
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gco/config.toml"))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(path) = user_config_path() else {
        return Ok(UserConfig::default());
    };
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Canonical output mode name for user input, accepting legacy aliases.
#[must_use]
pub fn normalize_output_mode(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "table" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

/// Output mode precedence: CLI flag, `FORMAT`, user config, then TTY check.
#[must_use]
pub fn resolve_output(cli: Option<&str>, user: &UserConfig) -> &'static str {
    let env_format = env::var("FORMAT").ok();
    resolve_output_from(
        cli,
        env_format.as_deref(),
        user.output.as_deref(),
        std::io::stdout().is_terminal(),
    )
}

fn resolve_output_from(
    cli: Option<&str>,
    env_format: Option<&str>,
    user_output: Option<&str>,
    is_tty: bool,
) -> &'static str {
    [cli, env_format, user_output]
        .into_iter()
        .flatten()
        .find_map(normalize_output_mode)
        .unwrap_or(if is_tty { "pretty" } else { "text" })
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_main_branch() -> String {
    "develop".to_string()
}

fn default_branch_prefix() -> String {
    "agent".to_string()
}

fn default_archive_time() -> String {
    "23:59".to_string()
}

fn default_template() -> String {
    "generic".to_string()
}

fn default_agents() -> BTreeMap<String, AgentConfig> {
    [("vscode", "copilot-chat"), ("copilot", "copilot-cli")]
        .into_iter()
        .map(|(key, kind)| {
            (
                key.to_string(),
                AgentConfig {
                    name: format!("@{key}"),
                    kind: kind.to_string(),
                },
            )
        })
        .collect()
}
