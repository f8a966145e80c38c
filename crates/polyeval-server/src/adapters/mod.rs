//! Guest Adapters
//!
//! Each adapter wraps one guest language's evaluation primitive and maps its
//! echo and error conventions onto [`EvalResult`]. Adapters never fail past
//! their boundary: every error is folded into the result before returning.
//!
//! | Adapter | Content-kinds | Errors reported |
//! |---------|---------------|-----------------|
//! | [`JavaScriptAdapter`] | `application/javascript`, `text/javascript` | yes |
//! | [`RAdapter`] | `application/x-r`, `text/x-r` | yes |
//! | [`RubyAdapter`] | `application/x-ruby` | never (`-1` sentinel) |

pub mod javascript;
pub mod r;
pub mod ruby;

#[cfg(test)]
pub(crate) mod fake;

pub use javascript::JavaScriptAdapter;
pub use r::RAdapter;
pub use ruby::RubyAdapter;

use polyeval_common::protocol::EvalResult;

/// Uniform evaluation capability over one guest language.
pub trait GuestAdapter {
    /// Short language name used in logs.
    fn language(&self) -> &'static str;

    /// Content-kinds this adapter answers to.
    fn content_kinds(&self) -> &'static [&'static str];

    /// Evaluate `code` in the adapter's persistent context.
    fn evaluate(&mut self, code: &str, echo: bool) -> EvalResult;
}
