//! Polyeval Transport Layer
//!
//! HTTP response construction for the evaluation server. Every response the
//! server writes is `text/plain` with no structured envelope; the status code
//! alone communicates success or failure.

pub mod http;

pub use http::{HttpTransport, HyperRequest, HyperResponse};
