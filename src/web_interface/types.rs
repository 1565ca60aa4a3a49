use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use warp::http::StatusCode;
use warp::reply::{self, Reply};

use crate::analysis::AnalysisRequest;

/// API error payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// JSON body with its status code. Handlers return this so they can be exercised without a
/// running server.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!(ApiError::new(message)),
        }
    }
}

impl Reply for ApiResponse {
    fn into_response(self) -> reply::Response {
        reply::with_status(reply::json(&self.body), self.status).into_response()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchRequest {
    pub logs: Vec<AnalysisRequest>,
}
