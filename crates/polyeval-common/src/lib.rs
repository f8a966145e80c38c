//! Polyeval Common Types and Transport
//!
//! This crate provides the wire-level pieces shared by the polyeval server and
//! anything that talks to it:
//!
//! - **Protocol Layer**: request field decoding, evaluation results, error handling
//! - **Transport Layer**: plain-text HTTP response construction
//!
//! # Wire Format
//!
//! Requests carry a boundary-delimited, line-oriented body (a reduced form of
//! `multipart/form-data`) with three conventional fields:
//!
//! - `mimetype`: the content-kind selecting the guest language
//! - `code`: the source text to evaluate
//! - `echo`: `"TRUE"` to return the evaluated value, anything else to suppress it
//!
//! Responses are always `text/plain`; the status code carries success or failure.
//!
//! # Example
//!
//! ```
//! use polyeval_common::protocol::{decode_fields, encode_fields, RequestFields};
//!
//! let mut fields = RequestFields::new();
//! fields.insert("mimetype", "application/javascript");
//! fields.insert("code", "1+1");
//! fields.insert("echo", "TRUE");
//!
//! let body = encode_fields(&fields, "----polyeval");
//! let decoded = decode_fields(&body);
//! assert_eq!(decoded, fields);
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
