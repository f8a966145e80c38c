use polyeval_common::protocol::EvalResult;

use crate::adapters::GuestAdapter;
use crate::runtime::JsContext;

/// Script-engine adapter backed by the embedded Boa context.
///
/// On success the value is returned as JSON when `echo` is set, otherwise as
/// JSON `null`. Anything thrown is reported with its string form.
pub struct JavaScriptAdapter {
    ctx: JsContext,
}

impl JavaScriptAdapter {
    pub const CONTENT_KINDS: &'static [&'static str] = &["application/javascript", "text/javascript"];

    pub fn new(ctx: JsContext) -> Self {
        Self { ctx }
    }
}

impl GuestAdapter for JavaScriptAdapter {
    fn language(&self) -> &'static str {
        "JavaScript"
    }

    fn content_kinds(&self) -> &'static [&'static str] {
        Self::CONTENT_KINDS
    }

    fn evaluate(&mut self, code: &str, echo: bool) -> EvalResult {
        match self.ctx.eval_to_json(code, echo) {
            Ok(json) => EvalResult::success(json),
            Err(e) => EvalResult::error(e.to_string()),
        }
    }
}
