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

//! Retention ring of snapshots, newest first
//!
//! The ring bounds how much history the server keeps: a maximum entry count,
//! an age bound for snapshots whose directories are already gone, and a small
//! window of snapshots whose on-disk copies stay materialized.

use crate::snapshot::{Snapshot, SnapshotSummary};
use std::sync::Arc;

/// Maximum number of snapshot records retained for reporting
pub const MAX_RETAINED: usize = 70;

/// Snapshots whose on-disk directories are kept materialized
pub const NUM_ACTIVE: usize = 3;

/// Age bound for already-removed snapshots
pub const MAX_REMOVED_AGE_MS: i64 = 2 * 24 * 60 * 60 * 1000;

/// Ordered sequence of snapshots, newest first
#[derive(Debug, Default)]
pub struct SnapshotRing {
    snapshots: Vec<Arc<Snapshot>>,
}

impl SnapshotRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a freshly created snapshot
    pub fn push(&mut self, snapshot: Arc<Snapshot>) {
        self.snapshots.insert(0, snapshot);
    }

    pub fn snapshots(&self) -> &[Arc<Snapshot>] {
        &self.snapshots
    }

    pub fn newest(&self) -> Option<&Arc<Snapshot>> {
        self.snapshots.first()
    }

    pub fn find(&self, name: &str) -> Option<&Arc<Snapshot>> {
        self.snapshots.iter().find(|snapshot| snapshot.name() == name)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Pop expired tail entries and return them so the caller can purge
    /// their results.
    ///
    /// A tail entry is evicted while the ring is over capacity, or while the
    /// entry is older than the age bound and its directory is already gone.
    pub fn evict_expired(&mut self, now_ms: i64) -> Vec<Arc<Snapshot>> {
        let mut evicted = Vec::new();
        loop {
            let evict = match self.snapshots.last() {
                Some(tail) => {
                    self.snapshots.len() > MAX_RETAINED
                        || (now_ms - tail.timestamp() > MAX_REMOVED_AGE_MS && !tail.exists())
                }
                None => false,
            };
            if !evict {
                break;
            }
            if let Some(tail) = self.snapshots.pop() {
                evicted.push(tail);
            }
        }
        evicted
    }

    /// The first snapshot past the active window, whose directory should be
    /// removed next
    pub fn beyond_active(&self) -> Option<&Arc<Snapshot>> {
        self.snapshots.get(NUM_ACTIVE)
    }

    pub fn summaries(&self) -> Vec<SnapshotSummary> {
        self.snapshots.iter().map(|snapshot| snapshot.summary()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn snapshot(timestamp: i64) -> Arc<Snapshot> {
        Arc::new(Snapshot::new(
            timestamp,
            PathBuf::from(format!("/nonexistent/ct-snapshots/{timestamp}")),
            Vec::new(),
            BTreeMap::new(),
            Vec::new(),
        ))
    }

    #[test]
    fn push_keeps_newest_first() {
        let mut ring = SnapshotRing::new();
        ring.push(snapshot(1));
        ring.push(snapshot(2));
        ring.push(snapshot(3));
        let timestamps: Vec<i64> = ring.snapshots().iter().map(|s| s.timestamp()).collect();
        assert_eq!(timestamps, vec![3, 2, 1]);
        assert_eq!(ring.newest().unwrap().timestamp(), 3);
    }

    #[test]
    fn find_by_name() {
        let mut ring = SnapshotRing::new();
        ring.push(snapshot(10));
        assert!(ring.find("snapshot-10").is_some());
        assert!(ring.find("snapshot-11").is_none());
    }

    #[test]
    fn over_capacity_evicts_oldest() {
        let mut ring = SnapshotRing::new();
        for timestamp in 1..=72 {
            ring.push(snapshot(timestamp));
        }
        let evicted = ring.evict_expired(100);
        assert_eq!(ring.len(), MAX_RETAINED);
        let names: Vec<&str> = evicted.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["snapshot-1", "snapshot-2"]);
    }

    #[test]
    fn age_eviction_only_applies_to_removed_snapshots() {
        let now = 10 * 24 * 60 * 60 * 1000;
        let mut ring = SnapshotRing::new();
        let old = snapshot(1);
        ring.push(old.clone());
        ring.push(snapshot(now - 1));

        // still materialized, so the age bound does not apply
        assert!(ring.evict_expired(now).is_empty());
        assert_eq!(ring.len(), 2);

        old.remove().unwrap();
        let evicted = ring.evict_expired(now);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].name(), "snapshot-1");
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn beyond_active_is_the_fourth_entry() {
        let mut ring = SnapshotRing::new();
        for timestamp in 1..=3 {
            ring.push(snapshot(timestamp));
        }
        assert!(ring.beyond_active().is_none());
        ring.push(snapshot(4));
        assert_eq!(ring.beyond_active().unwrap().timestamp(), 1);
    }
}
