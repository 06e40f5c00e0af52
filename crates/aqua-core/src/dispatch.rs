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

//! Fair test selection across the most recent snapshots
//!
//! Each dispatch draws from the least-dispatched cohort of the newest two
//! snapshots, uniformly at random within the tie pool. New snapshots start
//! at count zero and therefore monopolize dispatch until they catch up,
//! which is exactly the rebalancing we want.

use crate::snapshot::Snapshot;
use crate::test::Test;
use rand::Rng;
use std::sync::Arc;

/// How far back in the ring dispatch looks
pub const DISPATCH_WINDOW: usize = 2;

/// A test handed to a client, with its post-increment dispatch count
#[derive(Debug)]
pub struct Dispatched<'a> {
    pub snapshot: &'a Snapshot,
    pub test: &'a Test,
    pub count: u32,
}

/// Select one browser test from the least-dispatched cohort of the newest
/// two snapshots and increment its counter.
///
/// The caller must hold the dispatch lock so that the minimum computation,
/// the pick, and the increment are observed as one step by concurrent
/// dispatches.
pub fn select_next<'a, R: Rng + ?Sized>(
    snapshots: &'a [Arc<Snapshot>],
    es5_only: bool,
    rng: &mut R,
) -> Option<Dispatched<'a>> {
    let mut candidates: Vec<(&'a Snapshot, &'a Test)> = Vec::new();
    for snapshot in snapshots.iter().take(DISPATCH_WINDOW) {
        for test in snapshot.available_browser_tests(es5_only) {
            candidates.push((snapshot.as_ref(), test));
        }
    }

    let minimum = candidates.iter().map(|(_, test)| test.count()).min()?;
    let pool: Vec<(&'a Snapshot, &'a Test)> = candidates
        .into_iter()
        .filter(|(_, test)| test.count() == minimum)
        .collect();

    let (snapshot, test) = pool[rng.gen_range(0..pool.len())];
    let count = test.increment_count();
    Some(Dispatched { snapshot, test, count })
}
