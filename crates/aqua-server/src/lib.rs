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

//! Continuous-test dispatcher
//!
//! A single-process coordinator that keeps materializing snapshots of the
//! sibling repositories, enumerates the tests of each snapshot, hands them
//! out fairly to polling browser clients over HTTP, and aggregates the
//! reported results in memory.

pub mod config;
pub mod cycler;
pub mod enumerator;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repos;
pub mod router;
pub mod server;
pub mod state;
