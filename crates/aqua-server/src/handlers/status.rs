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

//! Status handlers

use super::json_response;
use crate::error::ApiResult;
use crate::models::{SnapshotStatusResponse, TestStatusResponse};
use crate::state::AppState;
use http_body_util::Full;
use hyper::Response;
use hyper::body::Bytes;
use std::sync::Arc;

/// GET /aquaserver/snapshot-status
pub async fn snapshot_status(state: Arc<AppState>) -> ApiResult<Response<Full<Bytes>>> {
    json_response(&SnapshotStatusResponse {
        status: state.snapshot_status(),
    })
}

/// GET /aquaserver/test-status
pub async fn test_status(state: Arc<AppState>) -> ApiResult<Response<Full<Bytes>>> {
    json_response(&TestStatusResponse {
        zero_counts: state.zero_count_tests(),
    })
}
