//! HTTP Transport Utilities
//!
//! This module turns evaluation outcomes and control replies into hyper
//! responses.
//!
//! # Status Mapping
//!
//! | Outcome | Status |
//! |---------|--------|
//! | successful evaluation, control reply | 200 |
//! | evaluation error, unsupported language | 400 |
//! | oversized body | 413 |
//!
//! # Example
//!
//! ```
//! use polyeval_common::protocol::EvalResult;
//! use polyeval_common::transport::http::HttpTransport;
//! use hyper::StatusCode;
//!
//! let response = HttpTransport::from_eval_result(EvalResult::error("Error: x"));
//! assert_eq!(response.status(), StatusCode::BAD_REQUEST);
//! ```

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONNECTION, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};

use crate::protocol::EvalResult;

/// Type alias for Hyper incoming requests
pub type HyperRequest = Request<Incoming>;

/// Type alias for Hyper responses with full body
pub type HyperResponse = Response<Full<Bytes>>;

const TEXT_PLAIN: &str = "text/plain";

/// HTTP transport utility functions
pub struct HttpTransport;

impl HttpTransport {
    /// Creates a `text/plain` response with the given status and body.
    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> HyperResponse {
        let mut response = Response::new(Full::new(body.into()));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
        response
    }

    /// Creates a `text/plain` response with an empty body.
    pub fn empty(status: StatusCode) -> HyperResponse {
        Self::text(status, Bytes::new())
    }

    /// Writes an evaluation result as a response.
    ///
    /// The result's `data` is the raw body: 400 when `is_error` is set,
    /// 200 otherwise.
    pub fn from_eval_result(result: EvalResult) -> HyperResponse {
        let status = if result.is_error {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::OK
        };
        Self::text(status, result.data)
    }

    /// Marks a response so the connection is closed once it has been written.
    pub fn closing(mut response: HyperResponse) -> HyperResponse {
        response
            .headers_mut()
            .insert(CONNECTION, HeaderValue::from_static("close"));
        response
    }
}
