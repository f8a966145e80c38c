//! Server limits.
//!
//! Caps applied to incoming requests before any evaluation happens.

use polyeval_common::protocol::error::{PolyevalError, Result};

/// Default cap on an evaluation request body, in bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1_000_000;

/// Limits applied by the command server.
///
/// # Fields
///
/// - `max_body_bytes` - Largest accepted request body (default: 1,000,000 bytes).
///   A body that grows past this is answered with 413 and the connection is closed.
///
/// Evaluation time is unbounded: a long-running guest evaluation
/// holds the server until it finishes.
///
/// # Example
///
/// ```
/// use polyeval_server::ServerLimits;
///
/// let limits = ServerLimits::new().with_max_body_bytes(64 * 1024);
/// assert!(limits.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLimits {
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerLimits {
    /// Creates limits with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the body size cap.
    ///
    /// # Arguments
    ///
    /// * `max_body_bytes` - Largest accepted body in bytes; must be non-zero
    ///   for [`validate`](Self::validate) to pass
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `PolyevalError::InvalidConfig` if the body cap is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_body_bytes == 0 {
            return Err(PolyevalError::InvalidConfig(
                "max body size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
