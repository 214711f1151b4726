use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow, bail};
use tracing::debug;

use crate::layout::ResolvedLayout;
use crate::settings::InstallerSettings;

pub const DEFAULT_REMOTE: &str = "origin";

pub trait GitBackend {
    fn is_checkout(&mut self, path: &Path) -> Result<bool>;
    fn clone_branch(&mut self, url: &str, branch: &str, path: &Path) -> Result<()>;
    fn pull(&mut self, path: &Path, remote: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Existing,
    Cloned,
}

/// Runs the `git` executable found on `PATH`.
#[derive(Debug, Default)]
pub struct GitCli;

impl GitCli {
    fn run<I, S>(&self, args: I, dir: Option<&Path>) -> Result<std::process::Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new("git");
        command.args(args);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }
        debug!(?command, "running git");
        command.output().context("failed to execute git command")
    }

    fn run_checked<I, S>(&self, args: I, dir: Option<&Path>, action: &str) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.run(args, dir)?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(anyhow!("git {action} failed: {}", stderr.trim()))
    }
}

impl GitBackend for GitCli {
    /// True only when `path` is the top of its own work tree; a plain directory
    /// nested in an enclosing repository does not count.
    fn is_checkout(&mut self, path: &Path) -> Result<bool> {
        if !path.is_dir() {
            return Ok(false);
        }
        let output = self.run(["rev-parse", "--show-toplevel"], Some(path))?;
        if !output.status.success() {
            return Ok(false);
        }
        let toplevel = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        let toplevel = fs::canonicalize(&toplevel)
            .with_context(|| format!("failed to resolve {}", toplevel.display()))?;
        let path =
            fs::canonicalize(path).with_context(|| format!("failed to resolve {}", path.display()))?;
        Ok(toplevel == path)
    }

    fn clone_branch(&mut self, url: &str, branch: &str, path: &Path) -> Result<()> {
        self.run_checked(
            [
                OsStr::new("clone"),
                OsStr::new("--branch"),
                OsStr::new(branch),
                OsStr::new(url),
                path.as_os_str(),
            ],
            None,
            "clone",
        )
    }

    fn pull(&mut self, path: &Path, remote: &str) -> Result<()> {
        self.run_checked(["pull", remote], Some(path), "pull")
    }
}

/// Opens the working copy, cloning it first when the directory does not exist yet.
pub fn ensure_checkout<G: GitBackend>(
    layout: &ResolvedLayout,
    settings: &InstallerSettings,
    git: &mut G,
) -> Result<CheckoutOutcome> {
    let path = &layout.checkout_dir;
    if !path.exists() {
        git.clone_branch(&settings.repo_url, &settings.branch, path)
            .with_context(|| {
                format!(
                    "failed to clone {} ({}) into {}",
                    settings.repo_url,
                    settings.branch,
                    path.display()
                )
            })?;
        return Ok(CheckoutOutcome::Cloned);
    }

    if !git.is_checkout(path)? {
        bail!("{} exists but is not a git checkout", path.display());
    }
    Ok(CheckoutOutcome::Existing)
}

pub fn update_checkout<G: GitBackend>(layout: &ResolvedLayout, git: &mut G) -> Result<()> {
    git.pull(&layout.checkout_dir, DEFAULT_REMOTE)
        .with_context(|| format!("failed to pull {}", layout.checkout_dir.display()))
}
