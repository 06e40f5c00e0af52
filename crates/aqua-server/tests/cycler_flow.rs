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

//! Drives the snapshot cycler against scripted repository operations.

use aqua_core::test::{TestDescriptor, TestKind};
use aqua_server::config::Config;
use aqua_server::cycler::{CycleOutcome, CyclerError, SnapshotCycler};
use aqua_server::enumerator::{EnumerateError, TestEnumerator};
use aqua_server::repos::{RepoError, RepoOps};
use aqua_server::state::AppState;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Repository operations driven by a script of staleness rounds. Each
/// `active_repos` call consumes one round; a missing round means quiet.
struct ScriptedRepoOps {
    repos: Vec<String>,
    rounds: Mutex<VecDeque<Vec<String>>>,
    current: Mutex<HashSet<String>>,
}

impl ScriptedRepoOps {
    fn new(repos: &[&str], rounds: Vec<Vec<&str>>) -> Self {
        Self {
            repos: repos.iter().map(|s| s.to_string()).collect(),
            rounds: Mutex::new(rounds.into_iter().map(|round| round.into_iter().map(str::to_string).collect()).collect()),
            current: Mutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl RepoOps for ScriptedRepoOps {
    async fn active_repos(&self) -> Result<Vec<String>, RepoError> {
        let round = self.rounds.lock().pop_front().unwrap_or_default();
        *self.current.lock() = round.into_iter().collect();
        Ok(self.repos.clone())
    }

    async fn is_stale(&self, repo: &str) -> Result<bool, RepoError> {
        Ok(self.current.lock().contains(repo))
    }

    async fn pull(&self, _repo: &str) -> Result<(), RepoError> {
        Ok(())
    }

    async fn clone_missing(&self) -> Result<Vec<String>, RepoError> {
        Ok(Vec::new())
    }

    async fn has_package_manifest(&self, _repo: &str) -> bool {
        false
    }

    async fn npm_update(&self, _repo: &str) -> Result<(), RepoError> {
        Ok(())
    }

    async fn current_sha(&self, repo: &str) -> Result<String, RepoError> {
        Ok(format!("sha-of-{repo}"))
    }

    async fn copy_repo(&self, repo: &str, destination: &Path) -> Result<(), RepoError> {
        std::fs::create_dir_all(destination)?;
        std::fs::write(destination.join("README.md"), format!("copy of {repo}"))?;
        Ok(())
    }
}

struct FakeEnumerator {
    descriptors: Vec<TestDescriptor>,
    fail_next: AtomicBool,
}

impl FakeEnumerator {
    fn new(descriptors: Vec<TestDescriptor>) -> Self {
        Self {
            descriptors,
            fail_next: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl TestEnumerator for FakeEnumerator {
    async fn enumerate(&self, _snapshot_dir: &Path) -> Result<Vec<TestDescriptor>, EnumerateError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(EnumerateError::Command {
                command: "fake".to_string(),
                detail: "scripted failure".to_string(),
            });
        }
        Ok(self.descriptors.clone())
    }
}

fn sim(names: &[&str]) -> TestDescriptor {
    TestDescriptor {
        test: names.iter().map(|s| s.to_string()).collect(),
        kind: TestKind::SimTest,
        brand: None,
        es5: true,
        build_dependencies: Vec::new(),
        url: None,
        query_parameters: None,
    }
}

struct Fixture {
    state: Arc<AppState>,
    cycler: SnapshotCycler,
    root: tempfile::TempDir,
}

fn fixture(ops: ScriptedRepoOps, enumerator: FakeEnumerator) -> Fixture {
    let root = tempfile::tempdir().unwrap();
    let config = Config {
        root_dir: root.path().to_path_buf(),
        ..Config::default()
    };
    let state = Arc::new(AppState::new());
    let cycler = SnapshotCycler::new(state.clone(), Arc::new(ops), Arc::new(enumerator), &config);
    Fixture { state, cycler, root }
}

#[tokio::test]
async fn first_quiet_round_creates_the_initial_snapshot() {
    let ops = ScriptedRepoOps::new(&["gravity"], Vec::new());
    let mut fx = fixture(ops, FakeEnumerator::new(vec![sim(&["gravity", "fuzz"])]));

    let outcome = fx.cycler.run_once().await.unwrap();
    let CycleOutcome::SnapshotCreated(snapshot) = outcome else {
        panic!("expected a snapshot, got {outcome:?}");
    };
    assert_eq!(fx.state.snapshot_count(), 1);
    assert_eq!(snapshot.repos(), ["gravity"]);
    assert!(snapshot.directory().join("gravity/README.md").is_file());
    assert_eq!(snapshot.shas()["gravity"], "sha-of-gravity");

    let response = fx.state.next_test(false);
    assert_eq!(response.snapshot_name.as_deref(), Some(snapshot.name()));

    // nothing changed, so the next round is idle
    let outcome = fx.cycler.run_once().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Idle));
    assert_eq!(fx.state.snapshot_count(), 1);
}

#[tokio::test]
async fn snapshots_wait_for_a_full_quiet_round() {
    let ops = ScriptedRepoOps::new(&["gravity", "acid-rain"], vec![vec!["gravity"]]);
    let mut fx = fixture(ops, FakeEnumerator::new(vec![sim(&["gravity", "fuzz"])]));

    // round 1: gravity is behind; synchronize, do not snapshot
    let outcome = fx.cycler.run_once().await.unwrap();
    let CycleOutcome::Synced { stale_repos, cloned_repos } = outcome else {
        panic!("expected a sync round, got {outcome:?}");
    };
    assert_eq!(stale_repos, vec!["gravity"]);
    assert!(cloned_repos.is_empty());
    assert_eq!(fx.state.snapshot_count(), 0);
    assert!(fx.state.snapshot_status().contains("settle"));

    // round 2: quiet again, the stable point produces the snapshot
    let outcome = fx.cycler.run_once().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::SnapshotCreated(_)));
    assert_eq!(fx.state.snapshot_count(), 1);
    assert!(fx.state.snapshot_status().contains("Idle"));
}

#[tokio::test]
async fn self_repo_is_not_checked_for_staleness() {
    // the only "stale" repo is the server's own, so the round counts as quiet
    let ops = ScriptedRepoOps::new(&["aquaserver", "gravity"], vec![vec!["aquaserver"]]);
    let mut fx = fixture(ops, FakeEnumerator::new(Vec::new()));

    let outcome = fx.cycler.run_once().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::SnapshotCreated(_)));
}

#[tokio::test]
async fn fourth_snapshot_deactivates_the_oldest_directory() {
    let rounds = vec![vec![], vec!["gravity"], vec![], vec!["gravity"], vec![], vec!["gravity"], vec![]];
    let ops = ScriptedRepoOps::new(&["gravity"], rounds);
    let mut fx = fixture(ops, FakeEnumerator::new(vec![sim(&["gravity", "fuzz"])]));

    // initial snapshot from the quiet start, then three more from the
    // scripted bursts
    let mut created = Vec::new();
    for _ in 0..7 {
        if let CycleOutcome::SnapshotCreated(snapshot) = fx.cycler.run_once().await.unwrap() {
            created.push(snapshot);
        }
    }
    assert_eq!(created.len(), 4);
    assert_eq!(fx.state.snapshot_count(), 4);

    let oldest = &created[0];
    assert!(!oldest.exists());
    assert!(!oldest.directory().exists());
    for newer in &created[1..] {
        assert!(newer.exists());
        assert!(newer.directory().is_dir());
    }

    let payload = fx.state.results_payload().unwrap();
    assert_eq!(payload["snapshots"][3]["exists"], false);
    assert_eq!(payload["snapshots"][0]["exists"], true);
}

#[tokio::test]
async fn failed_snapshot_creation_is_retried_on_the_next_stable_round() {
    let ops = ScriptedRepoOps::new(&["gravity"], Vec::new());
    let enumerator = FakeEnumerator::new(vec![sim(&["gravity", "fuzz"])]);
    enumerator.fail_next.store(true, Ordering::SeqCst);
    let mut fx = fixture(ops, enumerator);

    let error = fx.cycler.run_once().await.unwrap_err();
    assert!(matches!(error, CyclerError::Enumerate(_)));
    assert_eq!(fx.state.snapshot_count(), 0);

    // the quiet state is still pending, so the next round succeeds
    let outcome = fx.cycler.run_once().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::SnapshotCreated(_)));
    assert_eq!(fx.state.snapshot_count(), 1);
}

#[tokio::test]
async fn orphaned_directories_from_failed_attempts_are_harmless() {
    let ops = ScriptedRepoOps::new(&["gravity"], Vec::new());
    let enumerator = FakeEnumerator::new(Vec::new());
    enumerator.fail_next.store(true, Ordering::SeqCst);
    let mut fx = fixture(ops, enumerator);

    fx.cycler.run_once().await.unwrap_err();

    // the partially materialized directory stays on disk but is never
    // published
    let snapshots_dir: PathBuf = fx.root.path().join("ct-snapshots");
    assert_eq!(std::fs::read_dir(&snapshots_dir).unwrap().count(), 1);
    assert_eq!(fx.state.snapshot_count(), 0);
}
