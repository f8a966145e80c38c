use polyeval_common::protocol::EvalResult;

use crate::adapters::GuestAdapter;
use crate::runtime::GuestRuntime;

const CODE_SYMBOL: &str = "code";

const WRAPPER: &str =
    "begin; TOPLEVEL_BINDING.eval(polyeval_import('code')); rescue Exception; -1; end";

/// Value reported in place of any failure.
const SENTINEL: &str = "-1";

/// Dynamic-language adapter.
///
/// The code is stored in a guest-side symbol and run through a wrapper that
/// rescues every exception into `-1`. This adapter never reports an error.
/// The `echo` flag has no effect here: both settings return the value.
pub struct RubyAdapter<R> {
    runtime: R,
}

impl<R: GuestRuntime> RubyAdapter<R> {
    pub const CONTENT_KINDS: &'static [&'static str] = &["application/x-ruby"];

    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }
}

impl<R: GuestRuntime> GuestAdapter for RubyAdapter<R> {
    fn language(&self) -> &'static str {
        "Ruby"
    }

    fn content_kinds(&self) -> &'static [&'static str] {
        Self::CONTENT_KINDS
    }

    fn evaluate(&mut self, code: &str, _echo: bool) -> EvalResult {
        let outcome = self
            .runtime
            .export(CODE_SYMBOL, code)
            .and_then(|()| self.runtime.eval(WRAPPER));

        match outcome {
            Ok(value) => EvalResult::success(value),
            Err(e) => {
                tracing::warn!("Ruby evaluation failed outside the guest: {}", e);
                EvalResult::success(SENTINEL)
            }
        }
    }
}
