//! Polyeval Server
//!
//! This crate provides an HTTP front-end that evaluates guest-language code
//! (JavaScript, R, Ruby) against process-wide interpreter contexts and
//! returns the result as plain text.
//!
//! JavaScript runs in an embedded Boa engine; R and Ruby run in long-lived
//! interpreter subprocesses. State defined by one request stays visible to
//! later requests in the same language.

pub mod adapters;
pub mod dispatcher;
pub mod http_router;
pub mod http_server;
pub mod limits;
pub mod runtime;

pub use dispatcher::Dispatcher;
pub use http_server::HttpServer;
pub use limits::ServerLimits;
pub use runtime::GuestCommands;
