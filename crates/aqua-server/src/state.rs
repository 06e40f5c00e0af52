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

//! Process-wide dispatcher state
//!
//! One [`AppState`] is constructed at startup and shared between the HTTP
//! handlers and the snapshot cycler. The snapshot ring, the result tree, and
//! the cycler's status string all live here behind their own locks.

use crate::models::{NextTestResponse, TIMEOUT_MESSAGE_SENTINEL, TestResultPayload};
use aqua_core::dispatch;
use aqua_core::results::{ResultNode, ResultRecord};
use aqua_core::ring::SnapshotRing;
use aqua_core::snapshot::Snapshot;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of rotating a fresh snapshot into the ring
#[derive(Debug)]
pub struct SnapshotRotation {
    /// Snapshots that fell out of the ring; their results are already purged
    pub evicted: Vec<Arc<Snapshot>>,

    /// Snapshot that slid past the active window and whose directory should
    /// now be removed
    pub to_deactivate: Option<Arc<Snapshot>>,
}

/// Shared mutable state of the dispatcher
pub struct AppState {
    ring: RwLock<SnapshotRing>,
    results: RwLock<ResultNode>,
    status: RwLock<String>,
    /// Linearizes the minimum-count computation, the random pick, and the
    /// counter increment of concurrent `next-test` calls
    dispatch_lock: Mutex<()>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            ring: RwLock::new(SnapshotRing::new()),
            results: RwLock::new(ResultNode::new()),
            status: RwLock::new("Starting up".to_string()),
            dispatch_lock: Mutex::new(()),
        }
    }

    /// Hand out one test from the least-dispatched cohort of the newest two
    /// snapshots, or the empty shape when nothing is dispatchable
    pub fn next_test(&self, es5_only: bool) -> NextTestResponse {
        let _dispatch = self.dispatch_lock.lock();
        let ring = self.ring.read();
        let mut rng = rand::thread_rng();
        match dispatch::select_next(ring.snapshots(), es5_only, &mut rng) {
            Some(dispatched) => NextTestResponse {
                count: dispatched.count,
                snapshot_name: Some(dispatched.snapshot.name().to_string()),
                test: Some(dispatched.test.to_wire()),
                url: dispatched.test.harness_url(),
            },
            None => NextTestResponse::empty(),
        }
    }

    /// Record a client-reported result.
    ///
    /// Results for unknown snapshots are discarded (the client replayed
    /// after retirement), timeouts are dropped silently, and failures get
    /// the client id appended for attribution. A result that resolves to a
    /// lint or build test marks it complete, which is what unlocks
    /// build-gated browser tests.
    pub fn record_result(&self, payload: TestResultPayload) {
        let mut message = payload.message.clone().unwrap_or_default();
        if message.contains(TIMEOUT_MESSAGE_SENTINEL) {
            debug!(snapshot = %payload.snapshot_name, "dropping timed-out result");
            return;
        }

        let ring = self.ring.read();
        let Some(snapshot) = ring.find(&payload.snapshot_name) else {
            warn!(snapshot = %payload.snapshot_name, "result for unknown snapshot, discarding");
            return;
        };

        if !payload.passed {
            if let Some(id) = &payload.id {
                message.push_str("\nid: ");
                message.push_str(id);
            }
        }

        if let Some(test) = snapshot.find_test(&payload.test) {
            if test.kind().is_local() {
                test.record_local_outcome(payload.passed);
                info!(test = ?test.names(), passed = payload.passed, "local test completed");
            }
        }

        let record = ResultRecord {
            passed: payload.passed,
            snapshot_name: snapshot.name().to_string(),
            snapshot_timestamp: snapshot.timestamp(),
            message,
        };
        self.results.write().insert(&payload.test, record);
    }

    /// The whole result tree plus a summary of the snapshot ring
    pub fn results_payload(&self) -> Result<Value, serde_json::Error> {
        let mut value = {
            let results = self.results.read();
            serde_json::to_value(&*results)?
        };
        value["snapshots"] = serde_json::to_value(self.ring.read().summaries())?;
        Ok(value)
    }

    /// Number of browser tests in the newest snapshot that have never been
    /// dispatched
    pub fn zero_count_tests(&self) -> usize {
        self.ring
            .read()
            .newest()
            .map(|snapshot| snapshot.zero_count_browser_tests())
            .unwrap_or(0)
    }

    pub fn snapshot_status(&self) -> String {
        self.status.read().clone()
    }

    pub fn set_snapshot_status(&self, status: impl Into<String>) {
        let status = status.into();
        debug!(status = %status, "snapshot status");
        *self.status.write() = status;
    }

    /// Rotate a fresh snapshot into the ring: prepend, evict expired tails,
    /// purge their results, and report which snapshot (if any) slid past the
    /// active window.
    pub fn publish_snapshot(&self, snapshot: Arc<Snapshot>, now_ms: i64) -> SnapshotRotation {
        let (evicted, to_deactivate) = {
            let mut ring = self.ring.write();
            ring.push(snapshot);
            let evicted = ring.evict_expired(now_ms);
            let to_deactivate = ring.beyond_active().filter(|beyond| beyond.exists()).cloned();
            (evicted, to_deactivate)
        };

        if !evicted.is_empty() {
            let mut results = self.results.write();
            for old in &evicted {
                results.remove_results_for_snapshot(old.name());
            }
        }

        SnapshotRotation { evicted, to_deactivate }
    }

    /// Ring length, for reporting and tests
    pub fn snapshot_count(&self) -> usize {
        self.ring.read().len()
    }
}
