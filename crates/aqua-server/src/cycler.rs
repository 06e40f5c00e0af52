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

//! The snapshot cycler
//!
//! A single long-lived task that keeps the checked-out repositories fresh
//! and materializes a new snapshot whenever their revisions have been stable
//! for one full polling round after a change. A failing iteration is logged
//! and the loop simply runs again on the next tick.

use crate::config::Config;
use crate::enumerator::{EnumerateError, TestEnumerator};
use crate::repos::{RepoError, RepoOps};
use crate::state::AppState;
use aqua_core::snapshot::Snapshot;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// What a single cycler iteration did
#[derive(Debug)]
pub enum CycleOutcome {
    /// Repositories were behind and have been synchronized; snapshot
    /// creation waits for a quiet round
    Synced {
        stale_repos: Vec<String>,
        cloned_repos: Vec<String>,
    },

    /// A stable point was reached and a snapshot was published
    SnapshotCreated(Arc<Snapshot>),

    /// Nothing changed since the last snapshot
    Idle,
}

#[derive(Debug, Error)]
pub enum CyclerError {
    #[error("repository operation failed: {0}")]
    Repo(#[from] RepoError),

    #[error("test enumeration failed: {0}")]
    Enumerate(#[from] EnumerateError),

    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Background loop producing and retiring snapshots
pub struct SnapshotCycler {
    state: Arc<AppState>,
    repo_ops: Arc<dyn RepoOps>,
    enumerator: Arc<dyn TestEnumerator>,
    snapshots_dir: PathBuf,
    self_repo: String,
    poll_interval: Duration,
    was_stale: bool,
    last_timestamp: i64,
}

impl SnapshotCycler {
    pub fn new(
        state: Arc<AppState>,
        repo_ops: Arc<dyn RepoOps>,
        enumerator: Arc<dyn TestEnumerator>,
        config: &Config,
    ) -> Self {
        Self {
            state,
            repo_ops,
            enumerator,
            snapshots_dir: config.snapshots_dir(),
            self_repo: config.self_repo.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            // starting stale makes the first quiet round produce a snapshot,
            // so a freshly booted server has something to dispatch
            was_stale: true,
            last_timestamp: 0,
        }
    }

    /// Run forever. Only process exit stops the cycler.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            interval.tick().await;
            match self.run_once().await {
                Ok(outcome) => debug!(?outcome, "snapshot cycle finished"),
                Err(cycle_error) => error!(error = %cycle_error, "snapshot cycle failed"),
            }
        }
    }

    /// One iteration of the cycle: synchronize stale repositories, or
    /// publish a snapshot once a stable point is reached.
    pub async fn run_once(&mut self) -> Result<CycleOutcome, CyclerError> {
        let repos = self.repo_ops.active_repos().await?;
        let repos_to_check: Vec<String> = repos.iter().filter(|repo| **repo != self.self_repo).cloned().collect();
        self.state
            .set_snapshot_status(format!("Checking {} repositories for updates", repos_to_check.len()));

        let mut stale_repos = Vec::new();
        for repo in &repos_to_check {
            if self.repo_ops.is_stale(repo).await? {
                stale_repos.push(repo.clone());
            }
        }

        if !stale_repos.is_empty() {
            self.was_stale = true;
            info!(repos = ?stale_repos, "pulling stale repositories");
            self.state.set_snapshot_status(format!("Pulling {}", stale_repos.join(", ")));
            for repo in &stale_repos {
                self.repo_ops.pull(repo).await?;
            }

            self.state.set_snapshot_status("Cloning missing repositories");
            let cloned_repos = self.repo_ops.clone_missing().await?;

            let mut update_targets = stale_repos.clone();
            for repo in &cloned_repos {
                if !update_targets.contains(repo) {
                    update_targets.push(repo.clone());
                }
            }
            for repo in &update_targets {
                if self.repo_ops.has_package_manifest(repo).await {
                    self.state.set_snapshot_status(format!("Updating packages for {repo}"));
                    self.repo_ops.npm_update(repo).await?;
                }
            }

            self.state.set_snapshot_status("Waiting for repositories to settle");
            return Ok(CycleOutcome::Synced { stale_repos, cloned_repos });
        }

        if !self.was_stale {
            return Ok(CycleOutcome::Idle);
        }

        let snapshot = self.create_snapshot(&repos).await?;
        self.was_stale = false;
        self.last_timestamp = snapshot.timestamp();

        let rotation = self.state.publish_snapshot(snapshot.clone(), snapshot.timestamp());
        for old in &rotation.evicted {
            debug!(name = old.name(), "evicted snapshot from ring");
        }
        if let Some(beyond) = rotation.to_deactivate {
            let to_remove = beyond.clone();
            match tokio::task::spawn_blocking(move || to_remove.remove()).await {
                Ok(Ok(())) => info!(name = beyond.name(), "removed snapshot directory"),
                Ok(Err(remove_error)) => {
                    warn!(name = beyond.name(), error = %remove_error, "failed to remove snapshot directory");
                }
                Err(join_error) => warn!(error = %join_error, "snapshot removal task failed"),
            }
        }

        self.state
            .set_snapshot_status(format!("Idle, latest snapshot is {}", snapshot.name()));
        Ok(CycleOutcome::SnapshotCreated(snapshot))
    }

    async fn create_snapshot(&self, repos: &[String]) -> Result<Arc<Snapshot>, CyclerError> {
        // iterations can land in the same millisecond; names must stay unique
        let timestamp = Utc::now().timestamp_millis().max(self.last_timestamp + 1);
        let name = Snapshot::name_for_timestamp(timestamp);
        self.state.set_snapshot_status(format!("Creating {name}"));

        let directory = self.snapshots_dir.join(timestamp.to_string());
        tokio::fs::create_dir_all(&directory).await?;

        let mut shas = BTreeMap::new();
        for repo in repos {
            self.repo_ops.copy_repo(repo, &directory.join(repo)).await?;
            shas.insert(repo.clone(), self.repo_ops.current_sha(repo).await?);
        }

        let descriptors = self.enumerator.enumerate(&directory).await?;
        info!(name = %name, tests = descriptors.len(), "created snapshot");
        Ok(Arc::new(Snapshot::new(timestamp, directory, repos.to_vec(), shas, descriptors)))
    }
}
