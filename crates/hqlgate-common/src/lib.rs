//! hqlgate Common Types
//!
//! This crate provides the shared definitions used by every hqlgate
//! component:
//!
//! - **Protocol**: the gateway request and the JSON response envelope
//! - **Errors**: the [`GatewayError`] taxonomy and `Result` alias
//! - **Config**: the JSON configuration file consumed at startup
//! - **Timing**: the per-request phase timer used in access logs
//!
//! # Example
//!
//! ```
//! use hqlgate_common::{ApiResponse, GatewayRequest};
//! use serde_json::json;
//!
//! let request = GatewayRequest::new("SELECT 1", "main");
//! let response = ApiResponse::ok(json!({"rows": []}));
//! assert_eq!(response.code, 200);
//! ```

pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub mod timing;

pub use config::{CacheSettings, Config, Endpoint, HealthSettings};
pub use error::{GatewayError, Result};
pub use request::GatewayRequest;
pub use response::ApiResponse;
pub use timing::Timing;
