//! Text layout of the current journal partition.

use serde::Serialize;

use crate::model::{EntryKind, JournalEntry, Status};

/// Header row and rule of the agent status table.
pub const STATUS_TABLE_HEADER: &str = "| Agente | Tarea | Estado | Rama | Última Actividad | Bloqueos |\n|--------|-------|--------|------|------------------|----------|";

/// Marks the end of the status table region: the rule before the alerts section.
pub const STATUS_TABLE_END: &str = "\n---\n\n## 🚨";

/// Fresh partition header for `date`.
#[must_use]
pub fn header(date: &str, project: &str) -> String {
    format!(
        "# DEVELOP_LOG - {date}

> Proyecto: {project}
> Agente responsable de actualizar: CUALQUIER agente que trabaje

---

## 📊 Estado de Agents (auto-generado por `gco status`)

{STATUS_TABLE_HEADER}

---

## 🚨 Alertas de Consistencia (auto-generado por `gco validate`)

---

## 📝 Entradas de Log (cronológico, más reciente abajo)

"
    )
}

/// One entry block, including its trailing blank line.
#[must_use]
pub fn entry_block(entry: &JournalEntry) -> String {
    format!(
        "### [{}] @{} - {} - {}\n{}\n\n",
        entry.time, entry.agent, entry.task_id, entry.kind, entry.message
    )
}

/// One row of the agent status table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatusRow {
    pub agent: String,
    pub task_id: String,
    pub status: Status,
    pub status_text: String,
    pub branch: String,
    pub last_activity: String,
    pub blocks: String,
}

impl AgentStatusRow {
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "| {} | {} | {} {} | `{}` | {} | {} |\n",
            self.agent,
            self.task_id,
            self.status.icon(),
            self.status_text,
            self.branch,
            self.last_activity,
            self.blocks
        )
    }
}

/// Replace the body of the status table with `rows`.
///
/// Returns `None` when either delimiter is missing, leaving the caller to
/// skip the write.
#[must_use]
pub fn replace_status_table(content: &str, rows: &[AgentStatusRow]) -> Option<String> {
    let start = content.find(STATUS_TABLE_HEADER)?;
    let body_start = start + STATUS_TABLE_HEADER.len();
    let end = body_start + content[body_start..].find(STATUS_TABLE_END)?;

    let mut out = String::with_capacity(content.len());
    out.push_str(&content[..body_start]);
    out.push('\n');
    for row in rows {
        out.push_str(&row.render());
    }
    out.push_str(&content[end..]);
    Some(out)
}

fn is_time(s: &str) -> bool {
    s.len() == 8
        && s.bytes().enumerate().all(|(i, b)| match i {
            2 | 5 => b == b':',
            _ => b.is_ascii_digit(),
        })
}

pub(crate) fn is_token(s: &str) -> bool {
    !s.is_empty() && !s.contains(char::is_whitespace)
}

/// Parse `### [HH:MM:SS] @agent - TASK-NNN - type` into an entry with an
/// empty message.
fn parse_entry_header(line: &str) -> Option<JournalEntry> {
    let rest = line.strip_prefix("### [")?;
    let (time, rest) = rest.split_once("] @")?;
    let mut parts = rest.splitn(3, " - ");
    let agent = parts.next()?;
    let task_id = parts.next()?;
    let kind: EntryKind = parts.next()?.trim().parse().ok()?;
    if !is_time(time) || !is_token(agent) || !is_token(task_id) {
        return None;
    }
    Some(JournalEntry {
        date: None,
        agent: agent.to_string(),
        task_id: task_id.to_string(),
        kind,
        message: String::new(),
        time: time.to_string(),
    })
}

fn ends_message(line: &str) -> bool {
    line.starts_with("### ") || line.starts_with("## ")
}

/// Every well-formed entry block in `content`, in document order.
///
/// A message runs from the line after its header to the next `###`/`##`
/// heading, trimmed.
#[must_use]
pub fn parse_entries(content: &str) -> Vec<JournalEntry> {
    let mut entries = Vec::new();
    let mut current: Option<(JournalEntry, Vec<&str>)> = None;

    for line in content.lines() {
        if ends_message(line) {
            if let Some((entry, body)) = current.take() {
                entries.push(finish(entry, &body));
            }
            current = parse_entry_header(line).map(|entry| (entry, Vec::new()));
            continue;
        }
        if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }
    if let Some((entry, body)) = current {
        entries.push(finish(entry, &body));
    }
    entries
}

fn finish(mut entry: JournalEntry, body: &[&str]) -> JournalEntry {
    entry.message = body.join("\n").trim().to_string();
    entry
}
