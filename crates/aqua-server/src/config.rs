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

//! Configuration for the dispatcher

use std::env;
use std::path::PathBuf;

/// Configuration for the dispatcher, loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server to
    pub bind_address: String,

    /// Parent directory holding the sibling repositories
    pub root_dir: PathBuf,

    /// Repository this server itself lives in, excluded from staleness checks
    pub self_repo: String,

    /// Tracking branch compared against the remote
    pub branch: String,

    /// Base URL missing repositories are cloned from, e.g.
    /// `https://github.com/my-org`. Cloning is skipped when unset.
    pub clone_url_base: Option<String>,

    /// Seconds between snapshot-cycler iterations
    pub poll_interval_secs: u64,

    /// Command producing the JSON test list, run inside a fresh snapshot
    pub list_tests_command: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:45366".to_string(),
            root_dir: PathBuf::from(".."),
            self_repo: "aquaserver".to_string(),
            branch: "main".to_string(),
            clone_url_base: None,
            poll_interval_secs: 60,
            list_tests_command: "node ./list-continuous-tests.js".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env::var("AQUASERVER_BIND_ADDRESS").unwrap_or(defaults.bind_address),
            root_dir: env::var("AQUASERVER_ROOT_DIR").map(PathBuf::from).unwrap_or(defaults.root_dir),
            self_repo: env::var("AQUASERVER_SELF_REPO").unwrap_or(defaults.self_repo),
            branch: env::var("AQUASERVER_BRANCH").unwrap_or(defaults.branch),
            clone_url_base: env::var("AQUASERVER_CLONE_URL_BASE").ok(),
            poll_interval_secs: env::var("AQUASERVER_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.poll_interval_secs),
            list_tests_command: env::var("AQUASERVER_LIST_TESTS_COMMAND").unwrap_or(defaults.list_tests_command),
        }
    }

    /// Directory snapshots are materialized under
    pub fn snapshots_dir(&self) -> PathBuf {
        self.root_dir.join("ct-snapshots")
    }

    /// Newline-delimited list of active repositories
    pub fn repo_list_file(&self) -> PathBuf {
        self.root_dir.join("active-repos")
    }
}
