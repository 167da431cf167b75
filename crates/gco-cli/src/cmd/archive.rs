use crate::cmd::Project;
use crate::output::{CliError, OutputMode, fail, render};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct ArchiveOutput {
    archived: bool,
    path: Option<String>,
}

/// Execute `gco archive`: move the current journal partition into
/// `.gco-logs/<YYYY-MM-DD>.md` and start a fresh one.
pub fn run_archive(output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::discover(project_root, output)?;
    let archived = project
        .journal
        .archive()
        .map_err(|err| fail(output, &CliError::from(&err)))?;

    let result = ArchiveOutput {
        archived: archived.is_some(),
        path: archived.map(|p| p.display().to_string()),
    };
    render(output, &result, |r, w| match &r.path {
        Some(path) => writeln!(w, "✓ Journal archived to {path}"),
        None => writeln!(w, "Nothing to archive."),
    })
}
