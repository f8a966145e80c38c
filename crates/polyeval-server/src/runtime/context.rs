use boa_engine::{js_string, object::JsObject, value::JsValue, Context, Source};
use polyeval_common::protocol::error::{PolyevalError, Result};

/// Long-lived Boa context shared by every JavaScript evaluation.
///
/// Globals defined by one evaluation stay visible to the next one for the
/// lifetime of the process. Boa's `Context` is neither `Send` nor `Sync`, so
/// this type is owned by a single thread and never locked; the server's
/// single-threaded request loop serializes access.
///
/// `JSON.stringify` is captured at construction, so guest code reassigning
/// the global `JSON` does not change how results are serialized.
pub struct JsContext {
    ctx: Context,
    json: JsValue,
    stringify: JsObject,
}

impl JsContext {
    /// Create a fresh Boa context.
    pub fn new() -> Result<Self> {
        let mut ctx = Context::default();

        let json = ctx
            .global_object()
            .get(js_string!("JSON"), &mut ctx)
            .map_err(|e| PolyevalError::RuntimeUnavailable(format!("JSON lookup failed: {}", e)))?;

        let stringify = json
            .as_object()
            .and_then(|o| o.get(js_string!("stringify"), &mut ctx).ok())
            .ok_or_else(|| PolyevalError::RuntimeUnavailable("JSON.stringify is missing".into()))?;

        let stringify = stringify
            .as_object()
            .map(|o| o.clone())
            .ok_or_else(|| PolyevalError::RuntimeUnavailable("JSON.stringify is not callable".into()))?;

        Ok(Self { ctx, json, stringify })
    }

    /// Evaluate source text in the global scope.
    ///
    /// Anything the guest throws, including syntax errors, comes back as
    /// `PolyevalError::GuestEvaluation` carrying the engine's display form of
    /// the thrown value.
    pub fn eval(&mut self, code: &str) -> Result<JsValue> {
        tracing::debug!("eval: {} bytes of JavaScript", code.len());
        self.ctx
            .eval(Source::from_bytes(code))
            .map_err(|e| PolyevalError::GuestEvaluation(e.to_string()))
    }

    /// Serialize a value with the engine's own `JSON.stringify`.
    ///
    /// Values `JSON.stringify` maps to `undefined` (functions, symbols,
    /// `undefined` itself) are written as `null`.
    pub fn to_json(&mut self, value: JsValue) -> Result<String> {
        let out = self
            .stringify
            .call(&self.json, &[value], &mut self.ctx)
            .map_err(|e| PolyevalError::GuestEvaluation(e.to_string()))?;

        if out.is_undefined() {
            return Ok("null".to_string());
        }

        out.as_string()
            .map(|s| s.to_std_string_escaped())
            .ok_or_else(|| PolyevalError::GuestEvaluation("JSON.stringify returned a non-string".into()))
    }

    /// Evaluate and serialize in one step.
    ///
    /// With `echo` off the value is still computed (side effects persist) but
    /// the returned payload is the serialization of `null`.
    pub fn eval_to_json(&mut self, code: &str, echo: bool) -> Result<String> {
        let value = self.eval(code)?;
        if echo {
            self.to_json(value)
        } else {
            self.to_json(JsValue::null())
        }
    }
}
