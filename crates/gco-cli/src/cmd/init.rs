use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use gco_core::clock::SystemClock;
use gco_core::config::ProjectConfig;
use gco_core::project::init_project;
use std::path::Path;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project template recorded in the config (generic, react, node).
    #[arg(long, default_value = "generic")]
    pub template: String,

    /// Branch agent branches start from and are diffed against.
    #[arg(long, value_name = "BRANCH", default_value = "develop")]
    pub main_branch: String,
}

/// Execute `gco init`. Creates the project skeleton in `project_root`:
///
/// ```text
/// .gco/config.json
/// tasks.md
/// .gco-logs/current.md
/// .gco-logs/index.json
/// DEVELOP_LOG.md
/// ```
///
/// Existing files are kept, so re-running is harmless.
///
/// # Errors
///
/// Returns an error if any filesystem operation fails.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let mut config = ProjectConfig {
        main_branch: args.main_branch.clone(),
        ..ProjectConfig::default()
    };
    config.templates.kind.clone_from(&args.template);

    let outcome = init_project(project_root, &config, &SystemClock)?;
    render(output, &outcome, |o, w| {
        if o.already_initialized() {
            return writeln!(w, "Already initialized; nothing to do.");
        }
        writeln!(w, "✓ Initialized gco project in {}", project_root.display())?;
        for (created, what) in [
            (o.created_config, ".gco/config.json"),
            (o.created_board, "tasks.md"),
            (o.created_journal, ".gco-logs/ and DEVELOP_LOG.md"),
        ] {
            if created {
                writeln!(w, "  created {what}")?;
            }
        }
        Ok(())
    })
}
