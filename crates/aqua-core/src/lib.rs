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

//! Domain model for the continuous-test coordinator
//!
//! This crate holds the snapshot ring, the tests enumerated against each
//! snapshot, the dispatch selection over them, and the in-memory result tree.
//! Everything here is synchronous; the server crate wraps it in locks and
//! drives it from the HTTP surface and the snapshot cycler.

pub mod dispatch;
pub mod results;
pub mod ring;
pub mod snapshot;
