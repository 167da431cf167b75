//! `gco validate`: consistency checks and cross-agent file collisions.

use crate::cmd::{Project, store_failure};
use crate::git::CommandGit;
use crate::output::{OutputMode, pretty_section, render_mode};
use anyhow::{Result, bail};
use clap::Args;
use gco_core::validate::{Level, Report};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Exit non-zero when any error-level issue is found.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Serialize)]
struct Counts {
    error: usize,
    warning: usize,
    info: usize,
}

#[derive(Debug, Serialize)]
struct ValidateOutput<'a> {
    ok: bool,
    clean: bool,
    counts: Counts,
    #[serde(flatten)]
    report: &'a Report,
}

fn write_text(out: &ValidateOutput<'_>, w: &mut dyn Write) -> io::Result<()> {
    for issue in &out.report.issues {
        writeln!(w, "{}\t{}\t{}", issue.level, issue.task_id, issue.message)?;
    }
    for collision in &out.report.collisions {
        let touches: Vec<String> = collision.touches.iter().map(ToString::to_string).collect();
        writeln!(w, "collision\t{}\t{}", collision.file, touches.join(", "))?;
    }
    Ok(())
}

fn write_pretty(out: &ValidateOutput<'_>, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Consistency check")?;
    if out.report.issues.is_empty() {
        writeln!(w, "✓ No issues found")?;
    }
    for issue in &out.report.issues {
        let icon = match issue.level {
            Level::Error => "❌",
            Level::Warning => "⚠️ ",
            Level::Info => "ℹ️ ",
        };
        writeln!(w, "{icon} {}: {}", issue.task_id, issue.message)?;
    }
    writeln!(w)?;
    if out.report.collisions.is_empty() {
        writeln!(w, "✓ No file collisions between agents")?;
    } else {
        writeln!(w, "File collisions:")?;
        for collision in &out.report.collisions {
            let touches: Vec<String> =
                collision.touches.iter().map(ToString::to_string).collect();
            writeln!(w, "  {}: {}", collision.file, touches.join(", "))?;
        }
    }
    if out.clean {
        return writeln!(w, "\nBoard is consistent.");
    }
    writeln!(
        w,
        "\n{} errors, {} warnings, {} info",
        out.counts.error, out.counts.warning, out.counts.info
    )
}

pub fn run_validate(args: &ValidateArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::discover(project_root, output)?;
    let board = project
        .store
        .load()
        .map_err(|err| store_failure(output, &err))?;
    let git = CommandGit::new(&project.root);
    let report = Report::run(&board.tasks, &git, &project.config.branch_policy());

    let out = ValidateOutput {
        ok: !report.has_errors(),
        clean: report.is_clean(),
        counts: Counts {
            error: report.count(Level::Error),
            warning: report.count(Level::Warning),
            info: report.count(Level::Info),
        },
        report: &report,
    };
    render_mode(output, &out, |o, w| write_text(o, w), |o, w| write_pretty(o, w))?;

    if args.strict && report.has_errors() {
        bail!("validation found {} error(s)", report.count(Level::Error));
    }
    Ok(())
}
