//! Guest Runtime Port
//!
//! The narrow interface adapters use to reach an interpreter they do not
//! embed. An implementation owns one persistent evaluation context: symbols
//! exported and globals defined by one call remain visible to later calls.

use polyeval_common::protocol::error::Result;

/// A persistent guest-language evaluation context.
///
/// Errors raised by guest code come back as `PolyevalError::GuestEvaluation`
/// with the guest's own message. A runtime that cannot be reached reports
/// `PolyevalError::RuntimeUnavailable`.
pub trait GuestRuntime {
    /// Bind a string to a named symbol in the guest's global scope.
    fn export(&mut self, name: &str, value: &str) -> Result<()>;

    /// Evaluate source in the guest's global scope and return the guest's
    /// text rendering of the value. Strings come back verbatim; other values
    /// in the guest's printed form.
    fn eval(&mut self, source: &str) -> Result<String>;
}

impl<T: GuestRuntime + ?Sized> GuestRuntime for Box<T> {
    fn export(&mut self, name: &str, value: &str) -> Result<()> {
        (**self).export(name, value)
    }

    fn eval(&mut self, source: &str) -> Result<String> {
        (**self).eval(source)
    }
}
