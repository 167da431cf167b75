//! `gco read` and `gco history`: look at the journal.

use crate::cmd::Project;
use crate::output::{CliError, OutputMode, fail, pretty_section, render, render_mode};
use anyhow::Result;
use clap::Args;
use gco_core::journal::JournalError;
use gco_core::model::JournalEntry;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Print the raw partition even in JSON mode.
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Task ID.
    pub id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct History<'a> {
    task_id: &'a str,
    entries: Vec<JournalEntry>,
}

pub(crate) fn write_entry(w: &mut dyn Write, entry: &JournalEntry) -> io::Result<()> {
    let date = entry.date.as_deref().unwrap_or_default();
    writeln!(
        w,
        "{date} {} @{} {} [{}] {}",
        entry.time, entry.agent, entry.task_id, entry.kind, entry.message
    )
}

pub fn run_read(args: &ReadArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::discover(project_root, output)?;
    let journal_failure = |err: JournalError| fail(output, &CliError::from(&err));

    if output.is_json() && !args.raw {
        let entries = project.journal.entries().map_err(journal_failure)?;
        return render(output, &entries, |_, _| Ok(()));
    }

    let content = project.journal.read_current().map_err(journal_failure)?;
    let mut out = io::stdout().lock();
    if content.trim().is_empty() {
        writeln!(out, "The journal is empty.")?;
    } else {
        write!(out, "{content}")?;
    }
    Ok(())
}

pub fn run_history(args: &HistoryArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::discover(project_root, output)?;
    let entries = project
        .journal
        .entries_for(&args.id)
        .map_err(|err| fail(output, &CliError::from(&err)))?;
    let history = History {
        task_id: &args.id,
        entries,
    };

    render_mode(
        output,
        &history,
        |h, w| {
            for entry in &h.entries {
                write_entry(w, entry)?;
            }
            Ok(())
        },
        |h, w| {
            pretty_section(w, &format!("History of {}", h.task_id))?;
            if h.entries.is_empty() {
                return writeln!(w, "No journal entries yet.");
            }
            for entry in &h.entries {
                write_entry(w, entry)?;
            }
            Ok(())
        },
    )
}
