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

//! Result intake and reporting handlers

use super::json_response;
use crate::error::ApiResult;
use crate::models::{ReceivedResponse, TestResultPayload};
use crate::state::AppState;
use http_body_util::Full;
use hyper::Response;
use hyper::body::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// GET /aquaserver/test-result
///
/// The payload travels as a URL-encoded JSON query parameter. The response
/// is an acknowledgement regardless of payload validity; a client that
/// cannot produce well-formed results must not be given a reason to
/// retry-storm.
pub async fn test_result(params: HashMap<String, String>, state: Arc<AppState>) -> ApiResult<Response<Full<Bytes>>> {
    match params.get("result") {
        Some(raw) => match serde_json::from_str::<TestResultPayload>(raw) {
            Ok(payload) => state.record_result(payload),
            Err(error) => warn!(%error, "malformed test result, discarding"),
        },
        None => warn!("test result without a result parameter"),
    }
    json_response(&ReceivedResponse::default())
}

/// GET /aquaserver/results
pub async fn results(state: Arc<AppState>) -> ApiResult<Response<Full<Bytes>>> {
    let payload = state.results_payload()?;
    json_response(&payload)
}
