//! `git` subprocess adapter for the validator, status and review commands.

use gco_core::git::{GitError, GitService};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::debug;

/// Runs `git` in the project directory.
#[derive(Debug, Clone)]
pub struct CommandGit {
    dir: PathBuf,
}

impl CommandGit {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output, GitError> {
        debug!(?args, dir = %self.dir.display(), "running git");
        Ok(Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?)
    }

    fn stdout(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.run(args)?;
        if !output.status.success() {
            return Err(command_error(args, &output));
        }
        String::from_utf8(output.stdout).map_err(|_| GitError::Utf8)
    }
}

fn command_error(args: &[&str], output: &Output) -> GitError {
    GitError::Command {
        command: args.join(" "),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

impl GitService for CommandGit {
    fn branch_exists(&self, branch: &str) -> Result<bool, GitError> {
        let reference = format!("refs/heads/{branch}");
        let args = ["rev-parse", "--verify", "--quiet", reference.as_str()];
        let output = self.run(&args)?;
        if output.status.success() {
            return Ok(true);
        }
        // `--quiet` exits non-zero without a message when the ref is missing.
        if output.stderr.iter().all(u8::is_ascii_whitespace) {
            return Ok(false);
        }
        Err(command_error(&args, &output))
    }

    fn changed_files(&self, branch: &str, base: &str) -> Result<Vec<String>, GitError> {
        let range = format!("{base}...{branch}");
        let text = self.stdout(&["diff", "--name-only", range.as_str()])?;
        Ok(non_empty_lines(&text))
    }

    fn commits(&self, branch: &str, base: &str) -> Result<Vec<String>, GitError> {
        let range = format!("{base}..{branch}");
        let text = self.stdout(&["log", "--oneline", range.as_str()])?;
        Ok(non_empty_lines(&text))
    }

    fn merge_branch(&self, branch: &str, base: &str, message: &str) -> Result<(), GitError> {
        self.stdout(&["checkout", base])?;
        let merged = self.stdout(&["merge", "--no-ff", "-m", message, branch]);
        if merged.is_err() {
            // Leave the base clean; the original merge error is what matters.
            if let Err(err) = self.stdout(&["merge", "--abort"]) {
                debug!(error = %err, "merge --abort failed");
            }
        }
        merged.map(|_| ())
    }

    fn delete_branch(&self, branch: &str) -> Result<(), GitError> {
        self.stdout(&["branch", "-D", branch]).map(|_| ())
    }

    fn current_branch(&self) -> Result<Option<String>, GitError> {
        let name = self.stdout(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = name.trim();
        Ok((!name.is_empty() && name != "HEAD").then(|| name.to_string()))
    }
}
