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

//! Test dispatch handler

use super::json_response;
use crate::error::ApiResult;
use crate::state::AppState;
use http_body_util::Full;
use hyper::Response;
use hyper::body::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// GET /aquaserver/next-test
///
/// The `old` query flag marks an ES5-only client that must not be handed
/// modern tests.
pub async fn next_test(params: HashMap<String, String>, state: Arc<AppState>) -> ApiResult<Response<Full<Bytes>>> {
    let es5_only = params.get("old").map(|value| value == "true").unwrap_or(false);
    let response = state.next_test(es5_only);
    match &response.test {
        Some(test) => debug!(test = %test, count = response.count, "dispatched test"),
        None => debug!(es5_only, "no test available"),
    }
    json_response(&response)
}
