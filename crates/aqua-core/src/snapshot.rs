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

//! Immutable snapshots of the checked-out source tree
//!
//! A snapshot records the revision of every active repository at a stable
//! point, the on-disk copy of their working trees, and the tests enumerated
//! against that copy. Apart from the `exists` flag nothing changes after
//! creation.

use crate::test::{Brand, Test, TestDescriptor, TestKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// An immutable, timestamped copy of all active repositories together with
/// the tests enumerated against it
#[derive(Debug)]
pub struct Snapshot {
    timestamp: i64,
    name: String,
    directory: PathBuf,
    shas: BTreeMap<String, String>,
    repos: Vec<String>,
    exists: AtomicBool,
    tests: Vec<Test>,
}

/// Ring summary entry exposed by the `results` endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub name: String,
    pub timestamp: i64,
    pub exists: bool,
}

impl Snapshot {
    /// Derived identifier for a creation instant in milliseconds
    pub fn name_for_timestamp(timestamp: i64) -> String {
        format!("snapshot-{timestamp}")
    }

    pub fn new(
        timestamp: i64,
        directory: PathBuf,
        repos: Vec<String>,
        shas: BTreeMap<String, String>,
        descriptors: Vec<TestDescriptor>,
    ) -> Self {
        let name = Self::name_for_timestamp(timestamp);
        let tests = descriptors
            .into_iter()
            .map(|descriptor| Test::from_descriptor(descriptor, &name, timestamp))
            .collect();
        Self {
            timestamp,
            name,
            directory,
            shas,
            repos,
            exists: AtomicBool::new(true),
            tests,
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn shas(&self) -> &BTreeMap<String, String> {
        &self.shas
    }

    pub fn repos(&self) -> &[String] {
        &self.repos
    }

    /// True from creation until `remove` has completed
    pub fn exists(&self) -> bool {
        self.exists.load(Ordering::SeqCst)
    }

    pub fn tests(&self) -> &[Test] {
        &self.tests
    }

    /// Delete the on-disk materialization and retire this snapshot from
    /// dispatch. The record itself stays in the ring for historical
    /// reporting. A directory that is already gone is not an error.
    pub fn remove(&self) -> io::Result<()> {
        match std::fs::remove_dir_all(&self.directory) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => return Err(error),
        }
        self.exists.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Whether a build test for `(repo, brand)` has completed successfully
    /// within this snapshot
    pub fn build_succeeded(&self, repo: &str, brand: Brand) -> bool {
        self.tests.iter().any(|test| {
            test.kind() == TestKind::Build && test.repo() == repo && test.brand() == Some(brand) && {
                let status = test.local_status();
                status.complete && status.success
            }
        })
    }

    /// Browser tests a client may currently be handed. Empty once the
    /// snapshot has been removed.
    pub fn available_browser_tests(&self, es5_only: bool) -> Vec<&Test> {
        if !self.exists() {
            return Vec::new();
        }
        self.tests
            .iter()
            .filter(|test| test.is_browser_available(es5_only, self))
            .collect()
    }

    /// Lint and build tests that have not run yet
    pub fn locally_available_tests(&self) -> Vec<&Test> {
        self.tests.iter().filter(|test| test.is_locally_available()).collect()
    }

    /// Browser tests that have never been dispatched, the progress signal
    /// behind the `test-status` endpoint
    pub fn zero_count_browser_tests(&self) -> usize {
        self.tests
            .iter()
            .filter(|test| test.kind().is_browser() && test.count() == 0)
            .count()
    }

    /// Resolve a reported result path to the test it belongs to. Clients may
    /// append extra segments, so the longest matching name prefix wins.
    pub fn find_test(&self, path: &[String]) -> Option<&Test> {
        self.tests
            .iter()
            .filter(|test| test.matches_path(path))
            .max_by_key(|test| test.names().len())
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            name: self.name.clone(),
            timestamp: self.timestamp,
            exists: self.exists(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::BuildDependency;

    fn descriptor(names: &[&str], kind: TestKind) -> TestDescriptor {
        TestDescriptor {
            test: names.iter().map(|s| s.to_string()).collect(),
            kind,
            brand: None,
            es5: true,
            build_dependencies: Vec::new(),
            url: None,
            query_parameters: None,
        }
    }

    fn snapshot_with(descriptors: Vec<TestDescriptor>) -> Snapshot {
        Snapshot::new(
            1_700_000_000_000,
            PathBuf::from("/tmp/ct-snapshots/1700000000000"),
            vec!["acid-rain".to_string()],
            BTreeMap::new(),
            descriptors,
        )
    }

    #[test]
    fn name_derives_from_timestamp() {
        let snapshot = snapshot_with(Vec::new());
        assert_eq!(snapshot.name(), "snapshot-1700000000000");
        assert!(snapshot.exists());
    }

    #[test]
    fn build_dependency_gates_browser_availability() {
        let mut gated = descriptor(&["acid-rain", "fuzz"], TestKind::SimTest);
        gated.build_dependencies = vec![BuildDependency {
            repo: "acid-rain".to_string(),
            brand: Brand::Phet,
        }];
        let mut build = descriptor(&["acid-rain", "build"], TestKind::Build);
        build.brand = Some(Brand::Phet);
        let snapshot = snapshot_with(vec![gated, build]);

        assert!(snapshot.available_browser_tests(false).is_empty());

        let build_test = snapshot.find_test(&["acid-rain".into(), "build".into()]).unwrap();
        build_test.record_local_outcome(false);
        assert!(snapshot.available_browser_tests(false).is_empty());

        build_test.record_local_outcome(true);
        let available = snapshot.available_browser_tests(false);
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].names(), ["acid-rain", "fuzz"]);
        assert_eq!(available[0].snapshot_name(), snapshot.name());
        assert_eq!(available[0].snapshot_timestamp(), snapshot.timestamp());
    }

    #[test]
    fn local_tests_stay_available_until_they_complete() {
        let snapshot = snapshot_with(vec![
            descriptor(&["a", "lint"], TestKind::Lint),
            descriptor(&["a", "build"], TestKind::Build),
            descriptor(&["a", "fuzz"], TestKind::SimTest),
        ]);
        assert_eq!(snapshot.locally_available_tests().len(), 2);

        snapshot.find_test(&["a".into(), "lint".into()]).unwrap().record_local_outcome(true);
        let remaining = snapshot.locally_available_tests();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].names(), ["a", "build"]);
    }

    #[test]
    fn es5_only_filters_modern_tests() {
        let mut modern = descriptor(&["a", "fuzz"], TestKind::SimTest);
        modern.es5 = false;
        let legacy = descriptor(&["b", "fuzz"], TestKind::SimTest);
        let snapshot = snapshot_with(vec![modern, legacy]);

        assert_eq!(snapshot.available_browser_tests(false).len(), 2);
        let es5 = snapshot.available_browser_tests(true);
        assert_eq!(es5.len(), 1);
        assert_eq!(es5[0].names(), ["b", "fuzz"]);
    }

    #[test]
    fn find_test_prefers_longest_prefix() {
        let snapshot = snapshot_with(vec![
            descriptor(&["a"], TestKind::PageloadTest),
            descriptor(&["a", "fuzz"], TestKind::SimTest),
        ]);
        let path: Vec<String> = vec!["a".into(), "fuzz".into(), "chrome".into()];
        let found = snapshot.find_test(&path).unwrap();
        assert_eq!(found.names(), ["a", "fuzz"]);
    }

    #[test]
    fn zero_counts_track_undispatched_browser_tests() {
        let snapshot = snapshot_with(vec![
            descriptor(&["a", "fuzz"], TestKind::SimTest),
            descriptor(&["b", "fuzz"], TestKind::SimTest),
            descriptor(&["a", "lint"], TestKind::Lint),
        ]);
        assert_eq!(snapshot.zero_count_browser_tests(), 2);
        snapshot.tests()[0].increment_count();
        assert_eq!(snapshot.zero_count_browser_tests(), 1);
    }

    #[test]
    fn remove_retires_snapshot_and_deletes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let materialized = dir.path().join("1700000000000");
        std::fs::create_dir_all(materialized.join("acid-rain")).unwrap();

        let snapshot = Snapshot::new(
            1_700_000_000_000,
            materialized.clone(),
            vec!["acid-rain".to_string()],
            BTreeMap::new(),
            vec![descriptor(&["acid-rain", "fuzz"], TestKind::SimTest)],
        );
        assert_eq!(snapshot.available_browser_tests(false).len(), 1);

        snapshot.remove().unwrap();
        assert!(!snapshot.exists());
        assert!(!materialized.exists());
        assert!(snapshot.available_browser_tests(false).is_empty());

        // removing again is a no-op
        snapshot.remove().unwrap();
    }
}
