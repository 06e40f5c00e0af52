// Aquaserver
// Copyright (C) 2025 Aquaserver Contributors

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Repository operations the snapshot cycler depends on
//!
//! The cycler talks to git, npm, and the filesystem only through the
//! [`RepoOps`] trait; [`GitRepoOps`] is the production implementation that
//! shells out to the real tools.

use crate::config::Config;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("command `{command}` failed: {detail}")]
    Command { command: String, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blocking task failed: {0}")]
    Task(String),
}

/// External repository operations, one method per tool invocation
#[async_trait]
pub trait RepoOps: Send + Sync {
    /// Names of the repositories under continuous testing
    async fn active_repos(&self) -> Result<Vec<String>, RepoError>;

    /// Whether the local tracking branch is behind its remote
    async fn is_stale(&self, repo: &str) -> Result<bool, RepoError>;

    async fn pull(&self, repo: &str) -> Result<(), RepoError>;

    /// Clone any active repository that is absent on disk, returning the
    /// names that were cloned
    async fn clone_missing(&self) -> Result<Vec<String>, RepoError>;

    async fn has_package_manifest(&self, repo: &str) -> bool;

    async fn npm_update(&self, repo: &str) -> Result<(), RepoError>;

    /// Revision currently checked out
    async fn current_sha(&self, repo: &str) -> Result<String, RepoError>;

    /// Copy the repository's working tree into `destination`
    async fn copy_repo(&self, repo: &str, destination: &Path) -> Result<(), RepoError>;
}

/// Production [`RepoOps`] shelling out to git and npm
pub struct GitRepoOps {
    root: PathBuf,
    repo_list_file: PathBuf,
    branch: String,
    clone_url_base: Option<String>,
}

impl GitRepoOps {
    pub fn new(config: &Config) -> Self {
        Self {
            root: config.root_dir.clone(),
            repo_list_file: config.repo_list_file(),
            branch: config.branch.clone(),
            clone_url_base: config.clone_url_base.clone(),
        }
    }

    fn repo_dir(&self, repo: &str) -> PathBuf {
        self.root.join(repo)
    }

    async fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<String, RepoError> {
        let output = Command::new(program).args(args).current_dir(cwd).output().await?;
        if !output.status.success() {
            return Err(RepoError::Command {
                command: format!("{program} {}", args.join(" ")),
                detail: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl RepoOps for GitRepoOps {
    async fn active_repos(&self) -> Result<Vec<String>, RepoError> {
        let listing = tokio::fs::read_to_string(&self.repo_list_file).await?;
        Ok(listing
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn is_stale(&self, repo: &str) -> Result<bool, RepoError> {
        let dir = self.repo_dir(repo);
        if !dir.is_dir() {
            // not cloned yet; clone_missing picks it up once anything is stale
            debug!(repo, "repository not on disk, skipping staleness check");
            return Ok(false);
        }
        let local = self.run("git", &["rev-parse", "HEAD"], &dir).await?;
        let remote = self.run("git", &["ls-remote", "origin", &self.branch], &dir).await?;
        let remote_sha = remote.split_whitespace().next().unwrap_or_default();
        Ok(!remote_sha.is_empty() && remote_sha != local.trim())
    }

    async fn pull(&self, repo: &str) -> Result<(), RepoError> {
        self.run("git", &["pull"], &self.repo_dir(repo)).await?;
        Ok(())
    }

    async fn clone_missing(&self) -> Result<Vec<String>, RepoError> {
        let Some(base) = &self.clone_url_base else {
            debug!("no clone URL base configured, skipping clone of missing repositories");
            return Ok(Vec::new());
        };
        let mut cloned = Vec::new();
        for repo in self.active_repos().await? {
            let dir = self.repo_dir(&repo);
            if dir.is_dir() {
                continue;
            }
            let url = format!("{base}/{repo}.git");
            let target = dir.to_string_lossy().into_owned();
            self.run("git", &["clone", &url, &target], &self.root).await?;
            cloned.push(repo);
        }
        Ok(cloned)
    }

    async fn has_package_manifest(&self, repo: &str) -> bool {
        tokio::fs::try_exists(self.repo_dir(repo).join("package.json"))
            .await
            .unwrap_or(false)
    }

    async fn npm_update(&self, repo: &str) -> Result<(), RepoError> {
        let dir = self.repo_dir(repo);
        self.run("npm", &["prune"], &dir).await?;
        self.run("npm", &["update"], &dir).await?;
        Ok(())
    }

    async fn current_sha(&self, repo: &str) -> Result<String, RepoError> {
        let output = self.run("git", &["rev-parse", "HEAD"], &self.repo_dir(repo)).await?;
        Ok(output.trim().to_string())
    }

    async fn copy_repo(&self, repo: &str, destination: &Path) -> Result<(), RepoError> {
        let source = self.repo_dir(repo);
        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || copy_dir_recursive(&source, &destination))
            .await
            .map_err(|join_error| RepoError::Task(join_error.to_string()))??;
        Ok(())
    }
}

/// Recursive working-tree copy. `.git` directories are left behind; clients
/// only ever load the checked-out files.
fn copy_dir_recursive(source: &Path, destination: &Path) -> Result<(), RepoError> {
    std::fs::create_dir_all(destination)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let name = entry.file_name();
        if file_type.is_dir() {
            if name == ".git" {
                continue;
            }
            copy_dir_recursive(&entry.path(), &destination.join(&name))?;
        } else if file_type.is_file() {
            std::fs::copy(entry.path(), destination.join(&name))?;
        }
    }
    Ok(())
}
