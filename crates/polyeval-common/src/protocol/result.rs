//! Evaluation Result
//!
//! The uniform outcome every guest adapter produces, whatever the guest's own
//! error conventions are.

/// Outcome of one evaluation.
///
/// `data` is either the serialized value or the error message; the server
/// writes it verbatim as the response body. `is_error` selects the status
/// code (400 when set, 200 otherwise).
///
/// # Example
///
/// ```
/// use polyeval_common::protocol::EvalResult;
///
/// let ok = EvalResult::success("2");
/// assert!(!ok.is_error);
///
/// let failed = EvalResult::error("Error: x");
/// assert!(failed.is_error);
/// assert_eq!(failed.data, "Error: x");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalResult {
    /// Serialized value or error message
    pub data: String,
    /// Whether the evaluation failed
    pub is_error: bool,
}

impl EvalResult {
    /// Creates a successful result carrying an already-serialized value.
    pub fn success(data: impl Into<String>) -> Self {
        EvalResult {
            data: data.into(),
            is_error: false,
        }
    }

    /// Creates a failed result carrying an error message.
    pub fn error(data: impl Into<String>) -> Self {
        EvalResult {
            data: data.into(),
            is_error: true,
        }
    }
}
