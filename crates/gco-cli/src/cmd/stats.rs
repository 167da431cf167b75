//! `gco stats`: board totals by status and by agent.

use crate::cmd::{Project, store_failure};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use anyhow::Result;
use gco_core::model::Status;
use gco_core::report::Stats;
use std::io::{self, Write};
use std::path::Path;

fn write_text(stats: &Stats, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "total\t{}", stats.summary.total)?;
    for (status, n) in &stats.summary.by_status {
        writeln!(w, "{status}\t{n}")?;
    }
    for (agent, s) in &stats.by_agent {
        writeln!(w, "{agent}\t{}\t{}", s.total, s.completed)?;
    }
    writeln!(w, "completion\t{}%", stats.completion_percent)
}

fn write_pretty(stats: &Stats, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Board statistics")?;
    pretty_kv(w, "Total tasks", stats.summary.total.to_string())?;
    for status in Status::ALL {
        let n = stats.summary.count(status);
        if n > 0 {
            pretty_kv(w, &format!("{} {status}", status.icon()), n.to_string())?;
        }
    }
    pretty_kv(
        w,
        "Completion",
        format!(
            "{}% ({}/{})",
            stats.completion_percent, stats.completed, stats.summary.total
        ),
    )?;
    if stats.by_agent.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    pretty_section(w, "By agent")?;
    for (agent, s) in &stats.by_agent {
        pretty_kv(w, agent, format!("{}/{} completed", s.completed, s.total))?;
    }
    Ok(())
}

pub fn run_stats(output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::discover(project_root, output)?;
    let board = project
        .store
        .load()
        .map_err(|err| store_failure(output, &err))?;
    let stats = Stats::of(&board.tasks);
    render_mode(output, &stats, |s, w| write_text(s, w), |s, w| write_pretty(s, w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gco_core::model::Task;

    #[test]
    fn pretty_lists_agents_and_skips_empty_statuses() {
        let mut done = Task::new("TASK-001", "a");
        done.status = Status::Completed;
        done.assigned = "@vscode".into();
        let open = Task::new("TASK-002", "b");
        let stats = Stats::of(&[done, open]);

        let mut buf = Vec::new();
        write_pretty(&stats, &mut buf).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("50% (1/2)"));
        assert!(text.contains("@vscode"));
        assert!(text.contains("1/1 completed"));
        assert!(!text.contains("blocked"));
    }
}
