//! HTTP Server for the Polyeval Server
//!
//! This module provides the listener loop, using hyper for HTTP/1.1.
//!
//! # Architecture
//!
//! The server is single-threaded:
//! - It runs inside a tokio `LocalSet`; each connection is a `spawn_local` task
//! - Evaluation is synchronous inside the request handler, so one evaluation
//!   finishes (and its response is queued) before any other task makes progress
//! - Guest contexts are therefore never touched concurrently and need no locks
//! - A slow or endless evaluation stalls every connection; there is no timeout
//!
//! # Shutdown
//!
//! A `/stop` request is answered with `Connection: close`. When that
//! connection finishes, the response has been flushed; the accept loop is
//! then woken and [`HttpServer::run`] returns `Ok(())`.
//!
//! # Example
//!
//! ```no_run
//! use polyeval_server::{Dispatcher, GuestCommands, HttpServer};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let dispatcher = Dispatcher::with_default_adapters(&GuestCommands::default()).unwrap();
//!     let server = HttpServer::new(dispatcher);
//!     server.run("127.0.0.1:8080".parse().unwrap()).await.unwrap();
//! }
//! ```

use std::cell::Cell;
use std::net::SocketAddr;
use std::rc::Rc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use polyeval_common::protocol::error::{PolyevalError, Result};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::LocalSet;

use crate::dispatcher::Dispatcher;
use crate::http_router::CommandRouter;
use crate::limits::ServerLimits;

/// HTTP server for guest-language evaluation.
pub struct HttpServer {
    dispatcher: Rc<Dispatcher>,
    limits: ServerLimits,
}

impl HttpServer {
    /// Creates a new HTTP server over the given dispatcher.
    ///
    /// The server starts with [`ServerLimits::default`].
    ///
    /// # Arguments
    ///
    /// * `dispatcher` - The dispatcher routing each request to its guest adapter
    ///
    /// # Returns
    ///
    /// A new `HttpServer` instance
    ///
    /// # Example
    ///
    /// ```no_run
    /// use polyeval_server::{Dispatcher, GuestCommands, HttpServer};
    ///
    /// let dispatcher = Dispatcher::with_default_adapters(&GuestCommands::default()).unwrap();
    /// let server = HttpServer::new(dispatcher);
    /// ```
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Rc::new(dispatcher),
            limits: ServerLimits::default(),
        }
    }

    /// Replaces the server limits.
    ///
    /// # Arguments
    ///
    /// * `limits` - Limits checked by [`serve`](Self::serve) before accepting
    ///
    /// # Example
    ///
    /// ```no_run
    /// use polyeval_server::{Dispatcher, HttpServer, ServerLimits};
    ///
    /// let server = HttpServer::new(Dispatcher::new())
    ///     .with_limits(ServerLimits::new().with_max_body_bytes(64 * 1024));
    /// ```
    pub fn with_limits(mut self, limits: ServerLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Runs the HTTP server on the specified address.
    ///
    /// Serves until a stop command has been answered and its connection closed.
    /// Must be called from a current-thread tokio runtime; connections are
    /// driven on a `LocalSet` created here.
    ///
    /// # Arguments
    ///
    /// * `addr` - The socket address to bind to
    ///
    /// # Returns
    ///
    /// `Ok(())` after a stop command
    ///
    /// # Errors
    ///
    /// Returns `PolyevalError::Transport` if the address cannot be bound and
    /// `PolyevalError::InvalidConfig` if the limits are invalid.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use polyeval_server::{Dispatcher, GuestCommands, HttpServer};
    ///
    /// #[tokio::main(flavor = "current_thread")]
    /// async fn main() {
    ///     let dispatcher = Dispatcher::with_default_adapters(&GuestCommands::default()).unwrap();
    ///     let server = HttpServer::new(dispatcher);
    ///     server.run("127.0.0.1:8080".parse().unwrap()).await.unwrap();
    /// }
    /// ```
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| PolyevalError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;
        self.serve(listener).await
    }

    /// Serves on an already-bound listener until a stop command has been answered.
    ///
    /// Useful when the caller needs the bound address first, e.g. after
    /// binding port 0.
    ///
    /// # Arguments
    ///
    /// * `listener` - A bound tokio listener
    ///
    /// # Errors
    ///
    /// Returns `PolyevalError::InvalidConfig` if the limits are invalid.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        self.limits.validate()?;
        LocalSet::new().run_until(self.accept_loop(listener)).await
    }

    async fn accept_loop(self, listener: TcpListener) -> Result<()> {
        let router = Rc::new(CommandRouter::new(self.dispatcher, self.limits));
        let shutdown = Rc::new(Notify::new());

        tracing::info!(
            "HTTP server listening on {}",
            listener
                .local_addr()
                .map_err(|e| PolyevalError::Transport(format!("Failed to get local address: {}", e)))?
        );

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::error!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
                _ = shutdown.notified() => {
                    tracing::info!("Stop response delivered; shutting down");
                    return Ok(());
                }
            };

            tracing::debug!("Connection from {}", peer);

            let io = TokioIo::new(stream);
            let router = router.clone();
            let shutdown = shutdown.clone();

            tokio::task::spawn_local(async move {
                let stop = Rc::new(Cell::new(false));
                let service = {
                    let stop = stop.clone();
                    service_fn(move |req| {
                        let router = router.clone();
                        let stop = stop.clone();
                        async move { router.handle_request(req, &stop).await }
                    })
                };

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::error!("Error serving connection: {}", err);
                }

                if stop.get() {
                    shutdown.notify_one();
                }
            });
        }
    }
}
