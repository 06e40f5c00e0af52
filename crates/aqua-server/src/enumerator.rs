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

//! External test-list generation
//!
//! Each snapshot's tests come from a command run inside the freshly
//! materialized snapshot directory; it prints a JSON array of test
//! descriptors on stdout.

use aqua_core::test::TestDescriptor;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum EnumerateError {
    #[error("test lister `{command}` failed: {detail}")]
    Command { command: String, detail: String },

    #[error("test list is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces the test list for a snapshot
#[async_trait]
pub trait TestEnumerator: Send + Sync {
    async fn enumerate(&self, snapshot_dir: &Path) -> Result<Vec<TestDescriptor>, EnumerateError>;
}

/// Runs a configured command with the snapshot directory as its working
/// directory and parses its stdout
pub struct CommandEnumerator {
    command: String,
}

impl CommandEnumerator {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }
}

#[async_trait]
impl TestEnumerator for CommandEnumerator {
    async fn enumerate(&self, snapshot_dir: &Path) -> Result<Vec<TestDescriptor>, EnumerateError> {
        let mut parts = self.command.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(EnumerateError::Command {
                command: self.command.clone(),
                detail: "empty command".to_string(),
            });
        };
        let output = Command::new(program).args(parts).current_dir(snapshot_dir).output().await?;
        if !output.status.success() {
            return Err(EnumerateError::Command {
                command: self.command.clone(),
                detail: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}
