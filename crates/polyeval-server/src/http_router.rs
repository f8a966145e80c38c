//! HTTP Router for the Polyeval Server
//!
//! Classifies each request by its path and method and produces the response.
//!
//! # Routing
//!
//! The path component after the leading `/` is the command:
//!
//! - **`ping`**: answered with `pong` (any method)
//! - **`stop`**: answered with `stop`, then the server shuts down once the
//!   response has been written (any method)
//! - **anything else, `POST`**: the body is decoded and evaluated
//! - **anything else, other methods**: 200 with an empty body
//!
//! The query string plays no part in routing.

use std::cell::Cell;
use std::rc::Rc;

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Method, StatusCode};
use polyeval_common::protocol::error::{PolyevalError, Result};
use polyeval_common::protocol::decode_fields;
use polyeval_common::transport::{HttpTransport, HyperRequest, HyperResponse};

use crate::dispatcher::Dispatcher;
use crate::limits::ServerLimits;

/// What a request asks the server to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Health check
    Ping,
    /// Shut the server down
    Stop,
    /// Evaluate the request body
    Evaluate,
    /// Nothing to do; answered with an empty 200
    Ignore,
}

impl Command {
    /// Classifies a request by method and URI path.
    pub fn classify(method: &Method, path: &str) -> Self {
        match path.strip_prefix('/').unwrap_or(path) {
            "ping" => Command::Ping,
            "stop" => Command::Stop,
            _ if method == Method::POST => Command::Evaluate,
            _ => Command::Ignore,
        }
    }
}

/// HTTP router for the evaluation server.
pub struct CommandRouter {
    dispatcher: Rc<Dispatcher>,
    limits: ServerLimits,
}

impl CommandRouter {
    /// Creates a new router.
    ///
    /// # Arguments
    ///
    /// * `dispatcher` - The dispatcher shared by every connection
    /// * `limits` - Limits applied to evaluation requests
    ///
    /// # Returns
    ///
    /// A new `CommandRouter` instance
    pub fn new(dispatcher: Rc<Dispatcher>, limits: ServerLimits) -> Self {
        Self { dispatcher, limits }
    }

    /// Handles one request.
    ///
    /// # Arguments
    ///
    /// * `req` - The incoming HTTP request
    /// * `stop` - Flag owned by the connection
    ///
    /// `stop` is set when the request was a stop command; the connection
    /// owner uses it to shut the server down after the response is flushed.
    ///
    /// # Errors
    ///
    /// Returns `PolyevalError::Transport` if the request body cannot be read;
    /// hyper then drops the connection.
    pub async fn handle_request(&self, req: HyperRequest, stop: &Cell<bool>) -> Result<HyperResponse> {
        let command = Command::classify(req.method(), req.uri().path());
        tracing::debug!("{} {} -> {:?}", req.method(), req.uri().path(), command);

        match command {
            Command::Ping => Ok(HttpTransport::text(StatusCode::OK, "pong")),
            Command::Stop => {
                tracing::info!("Stop command received");
                stop.set(true);
                Ok(HttpTransport::closing(HttpTransport::text(StatusCode::OK, "stop")))
            }
            Command::Ignore => Ok(HttpTransport::empty(StatusCode::OK)),
            Command::Evaluate => self.evaluate(req).await,
        }
    }

    async fn evaluate(&self, req: HyperRequest) -> Result<HyperResponse> {
        let body = match read_body(req.into_body(), self.limits.max_body_bytes).await {
            Ok(body) => body,
            Err(PolyevalError::BodyTooLarge { limit }) => {
                tracing::warn!("Request body exceeded {} bytes; closing connection", limit);
                return Ok(HttpTransport::closing(HttpTransport::empty(
                    StatusCode::PAYLOAD_TOO_LARGE,
                )));
            }
            Err(e) => return Err(e),
        };

        let fields = decode_fields(&String::from_utf8_lossy(&body));
        let result = self.dispatcher.dispatch(&fields);
        if result.is_error {
            tracing::debug!("Evaluation failed: {}", result.data);
        }
        Ok(HttpTransport::from_eval_result(result))
    }
}

/// Collects the body, giving up as soon as it grows past `limit` bytes.
async fn read_body(mut body: Incoming, limit: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(frame) = body.frame().await {
        let frame = frame
            .map_err(|e| PolyevalError::Transport(format!("Failed to read request body: {}", e)))?;
        if let Ok(chunk) = frame.into_data() {
            buf.extend_from_slice(&chunk);
            if buf.len() > limit {
                return Err(PolyevalError::BodyTooLarge { limit });
            }
        }
    }
    Ok(buf)
}
