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

//! Wire models for the dispatcher endpoints

use aqua_core::test::NO_TEST_URL;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Substring that marks a client-side timeout; such results are dropped
pub const TIMEOUT_MESSAGE_SENTINEL: &str = "errors.html#timeout";

/// Result payload posted by a browser client via `test-result`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultPayload {
    pub passed: bool,

    /// Dotted path of the test, possibly extended by the client
    pub test: Vec<String>,

    pub snapshot_name: String,

    #[serde(default)]
    pub timestamp: Option<i64>,

    #[serde(default)]
    pub message: Option<String>,

    /// Client identifier, appended to failure messages for attribution
    #[serde(default)]
    pub id: Option<String>,
}

/// Response of `next-test`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextTestResponse {
    pub count: u32,
    pub snapshot_name: Option<String>,
    pub test: Option<Value>,
    pub url: String,
}

impl NextTestResponse {
    /// The shape a client receives when nothing is dispatchable; it backs
    /// off and polls again
    pub fn empty() -> Self {
        Self {
            count: 0,
            snapshot_name: None,
            test: None,
            url: NO_TEST_URL.to_string(),
        }
    }
}

/// Acknowledgement of `test-result`, returned unconditionally
#[derive(Debug, Clone, Serialize)]
pub struct ReceivedResponse {
    pub received: &'static str,
}

impl Default for ReceivedResponse {
    fn default() -> Self {
        Self { received: "true" }
    }
}

/// Response of `snapshot-status`
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotStatusResponse {
    pub status: String,
}

/// Response of `test-status`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStatusResponse {
    pub zero_counts: usize,
}
