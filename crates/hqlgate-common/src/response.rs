//! Response Envelope
//!
//! Every gateway response is the same JSON envelope:
//! `{"code": int, "message": string, "body": any}`.
//!
//! # Status Codes
//!
//! - `200`: success, `body` holds the result (cached or fresh)
//! - `400`: malformed request (missing/empty fields)
//! - `500`: backend execution error or unexpected internal failure
//! - `503`: all agents in the target pool unavailable
//! - `504`: target cluster does not exist

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

/// Success
pub const CODE_OK: u16 = 200;
/// Malformed request
pub const CODE_BAD_REQUEST: u16 = 400;
/// Backend execution error or internal failure
pub const CODE_INTERNAL_ERROR: u16 = 500;
/// All agents in the target pool unavailable
pub const CODE_UNAVAILABLE: u16 = 503;
/// Target cluster does not exist
pub const CODE_NO_SUCH_CLUSTER: u16 = 504;

/// The gateway's JSON response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Envelope status code (also used as the HTTP status)
    pub code: u16,
    /// Short human-readable outcome description
    pub message: String,
    /// Result payload; empty string when there is none
    pub body: Value,
}

impl ApiResponse {
    /// Create a success response carrying a result payload.
    pub fn ok(body: Value) -> Self {
        Self {
            code: CODE_OK,
            message: "Ok".into(),
            body,
        }
    }

    /// Create a bad-request response (missing or empty fields).
    pub fn bad_request() -> Self {
        Self {
            code: CODE_BAD_REQUEST,
            message: "Bad Request".into(),
            body: Value::String(String::new()),
        }
    }

    /// Create an internal-error response with the failure detail.
    pub fn internal_error(msg: &str) -> Self {
        Self {
            code: CODE_INTERNAL_ERROR,
            message: msg.into(),
            body: Value::String(String::new()),
        }
    }

    /// Create a service-unavailable response (no agent reachable).
    pub fn unavailable() -> Self {
        Self {
            code: CODE_UNAVAILABLE,
            message: "System Is Down".into(),
            body: Value::String(String::new()),
        }
    }

    /// Create a no-such-cluster response.
    pub fn no_such_cluster(msg: &str) -> Self {
        Self {
            code: CODE_NO_SUCH_CLUSTER,
            message: msg.into(),
            body: Value::String(String::new()),
        }
    }
}

impl From<&GatewayError> for ApiResponse {
    /// Map a gateway error onto the envelope per the status table.
    fn from(err: &GatewayError) -> Self {
        match err {
            GatewayError::NoSuchCluster(_) => Self::no_such_cluster(&err.to_string()),
            GatewayError::AllAgentsDown => Self::unavailable(),
            GatewayError::InvalidRequest(_) => Self::bad_request(),
            other => Self::internal_error(&other.to_string()),
        }
    }
}
