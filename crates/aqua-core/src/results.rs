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

//! In-memory hierarchical store of reported test results
//!
//! Results are keyed by the test's dotted path; each node of the tree holds
//! the records reported at exactly that path. The whole tree is serialized
//! as-is by the `results` endpoint.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One reported pass/fail outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub passed: bool,
    pub snapshot_name: String,
    pub snapshot_timestamp: i64,
    pub message: String,
}

/// Node of the result tree
#[derive(Debug, Default, Serialize)]
pub struct ResultNode {
    pub children: BTreeMap<String, ResultNode>,
    pub results: Vec<ResultRecord>,
}

impl ResultNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record at `path`, creating intermediate nodes on demand
    pub fn insert(&mut self, path: &[String], record: ResultRecord) {
        let mut node = self;
        for segment in path {
            node = node.children.entry(segment.clone()).or_default();
        }
        node.results.push(record);
    }

    /// Drop every record belonging to a retired snapshot. Emptied nodes are
    /// left in place.
    pub fn remove_results_for_snapshot(&mut self, snapshot_name: &str) {
        self.results.retain(|record| record.snapshot_name != snapshot_name);
        for child in self.children.values_mut() {
            child.remove_results_for_snapshot(snapshot_name);
        }
    }

    /// Descend to the node at `path`, if it exists
    pub fn node_at(&self, path: &[&str]) -> Option<&ResultNode> {
        let mut node = self;
        for segment in path {
            node = node.children.get(*segment)?;
        }
        Some(node)
    }

    /// Number of records across the whole subtree carrying `snapshot_name`
    pub fn count_records_for_snapshot(&self, snapshot_name: &str) -> usize {
        let own = self
            .results
            .iter()
            .filter(|record| record.snapshot_name == snapshot_name)
            .count();
        own + self
            .children
            .values()
            .map(|child| child.count_records_for_snapshot(snapshot_name))
            .sum::<usize>()
    }
}
