use polyeval_common::protocol::error::Result;
use polyeval_common::protocol::EvalResult;

use crate::adapters::GuestAdapter;
use crate::runtime::GuestRuntime;

const CODE_SYMBOL: &str = ".polyeval_code";

const PARSE: &str = ".polyeval_expr <- parse(text = .polyeval_code); NULL";

const EVALUATE: &str = "\
.polyeval_result <- tryCatch(
  list(error = FALSE, value = eval(.polyeval_expr, envir = globalenv())),
  error = function(e) list(error = TRUE, value = conditionMessage(e))
); NULL";

const ERROR_FLAG: &str = "isTRUE(.polyeval_result$error)";

const MESSAGE: &str = ".polyeval_result$value";

const SERIALIZED_VALUE: &str = "paste(deparse(.polyeval_result$value), collapse = \"\\n\")";

/// R's rendering of a suppressed value.
const NULL: &str = "NULL";

/// Statistical-language adapter.
///
/// Parsing is a separate step from evaluation, so a parse failure surfaces as
/// an adapter error before anything runs. Evaluation happens under
/// `tryCatch`; the error flag and the value or message are then read back from
/// the guest. Successful values are returned deparsed, or as `NULL` when
/// `echo` is off.
pub struct RAdapter<R> {
    runtime: R,
}

impl<R: GuestRuntime> RAdapter<R> {
    pub const CONTENT_KINDS: &'static [&'static str] = &["application/x-r", "text/x-r"];

    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }

    fn run(&mut self, code: &str, echo: bool) -> Result<EvalResult> {
        self.runtime.export(CODE_SYMBOL, code)?;
        self.runtime.eval(PARSE)?;
        self.runtime.eval(EVALUATE)?;

        if self.runtime.eval(ERROR_FLAG)? == "TRUE" {
            return Ok(EvalResult::error(self.runtime.eval(MESSAGE)?));
        }
        if !echo {
            return Ok(EvalResult::success(NULL));
        }
        Ok(EvalResult::success(self.runtime.eval(SERIALIZED_VALUE)?))
    }
}

impl<R: GuestRuntime> GuestAdapter for RAdapter<R> {
    fn language(&self) -> &'static str {
        "R"
    }

    fn content_kinds(&self) -> &'static [&'static str] {
        Self::CONTENT_KINDS
    }

    fn evaluate(&mut self, code: &str, echo: bool) -> EvalResult {
        self.run(code, echo)
            .unwrap_or_else(|e| EvalResult::error(e.to_string()))
    }
}
