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

//! HTTP routing for the dispatcher

use crate::error::{ApiError, ApiResult};
use crate::handlers::{dispatch, results, status};
use crate::state::AppState;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// HTTP router for the dispatcher endpoints
pub struct Router {
    state: Arc<AppState>,
}

impl Router {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Route a request to the appropriate handler
    pub async fn route<B>(&self, req: Request<B>) -> ApiResult<Response<Full<Bytes>>> {
        let path = req.uri().path().to_string();
        let method = req.method().clone();
        let query = req.uri().query().unwrap_or("").to_string();

        debug!("Routing request: {} {}", method, path);

        if method == Method::OPTIONS {
            return preflight_response();
        }

        let params = parse_query_params(&query);

        match (&method, path.as_str()) {
            (&Method::GET, "/aquaserver/next-test") => dispatch::next_test(params, self.state.clone()).await,
            (&Method::GET, "/aquaserver/test-result") => results::test_result(params, self.state.clone()).await,
            (&Method::GET, "/aquaserver/results") => results::results(self.state.clone()).await,
            (&Method::GET, "/aquaserver/snapshot-status") => status::snapshot_status(self.state.clone()).await,
            (&Method::GET, "/aquaserver/test-status") => status::test_status(self.state.clone()).await,
            (&Method::GET, _) => {
                warn!("Route not found: {} {}", method, path);
                Err(ApiError::NotFound {
                    message: format!("Route not found: {} {}", method, path),
                })
            }
            _ => Err(ApiError::MethodNotAllowed {
                message: format!("{} not allowed on {}", method, path),
            }),
        }
    }
}

/// Parse URL query parameters into a map, percent-decoding as needed
pub fn parse_query_params(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes()).into_owned().collect()
}

fn preflight_response() -> ApiResult<Response<Full<Bytes>>> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("access-control-allow-origin", "*")
        .header("access-control-allow-methods", "GET, OPTIONS")
        .header("access-control-allow-headers", "content-type")
        .body(Full::new(Bytes::new()))?)
}
