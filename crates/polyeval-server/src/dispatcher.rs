//! Evaluation Dispatcher
//!
//! Routes decoded request fields to the guest adapter registered for their
//! content-kind. Adding a language means registering one more adapter; the
//! dispatch logic does not change.

use std::cell::RefCell;
use std::collections::HashMap;

use polyeval_common::protocol::error::{PolyevalError, Result};
use polyeval_common::protocol::{EvalResult, RequestFields};

use crate::adapters::{GuestAdapter, JavaScriptAdapter, RAdapter, RubyAdapter};
use crate::runtime::{GuestCommands, JsContext, ProcessRuntime};

/// Content-kind registry over guest adapters.
///
/// Adapters sit in `RefCell`s: they are only ever driven from the server's
/// single thread, one evaluation at a time, so no locking is involved.
pub struct Dispatcher {
    adapters: Vec<RefCell<Box<dyn GuestAdapter>>>,
    by_kind: HashMap<&'static str, usize>,
}

impl Dispatcher {
    /// Creates an empty dispatcher. Every request is unsupported until
    /// adapters are registered.
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
            by_kind: HashMap::new(),
        }
    }

    /// Creates a dispatcher with the JavaScript, R and Ruby adapters.
    ///
    /// The JavaScript context is created immediately; the R and Ruby
    /// interpreters start on their first request.
    ///
    /// # Arguments
    ///
    /// * `commands` - Interpreter commands for the R and Ruby runtimes
    ///
    /// # Errors
    ///
    /// Returns `PolyevalError::RuntimeUnavailable` if the JavaScript context
    /// cannot be initialised. A missing R or Ruby interpreter is not an error
    /// here; it surfaces on the first request for that language.
    ///
    /// # Example
    ///
    /// ```
    /// use polyeval_server::{Dispatcher, GuestCommands};
    ///
    /// let dispatcher = Dispatcher::with_default_adapters(&GuestCommands::default()).unwrap();
    /// assert!(dispatcher.content_kinds().contains(&"application/x-ruby"));
    /// ```
    pub fn with_default_adapters(commands: &GuestCommands) -> Result<Self> {
        let mut dispatcher = Self::new();
        dispatcher.register(Box::new(JavaScriptAdapter::new(JsContext::new()?)));
        dispatcher.register(Box::new(RAdapter::new(ProcessRuntime::r(commands.r_command.clone()))));
        dispatcher.register(Box::new(RubyAdapter::new(ProcessRuntime::ruby(
            commands.ruby_command.clone(),
        ))));
        Ok(dispatcher)
    }

    /// Registers an adapter under each of its content-kinds.
    ///
    /// A content-kind that is already taken moves to the new adapter (logged
    /// at `warn`); the previous adapter keeps any other kinds it owns.
    ///
    /// # Arguments
    ///
    /// * `adapter` - The adapter to register
    ///
    /// # Example
    ///
    /// ```
    /// use polyeval_server::adapters::JavaScriptAdapter;
    /// use polyeval_server::runtime::JsContext;
    /// use polyeval_server::Dispatcher;
    ///
    /// let mut dispatcher = Dispatcher::new();
    /// dispatcher.register(Box::new(JavaScriptAdapter::new(JsContext::new().unwrap())));
    /// assert_eq!(dispatcher.content_kinds(), vec!["application/javascript", "text/javascript"]);
    /// ```
    pub fn register(&mut self, adapter: Box<dyn GuestAdapter>) {
        let index = self.adapters.len();
        for &kind in adapter.content_kinds() {
            if self.by_kind.insert(kind, index).is_some() {
                tracing::warn!("Content-kind {} re-registered to {}", kind, adapter.language());
            }
        }
        tracing::debug!("Registered {} adapter for {:?}", adapter.language(), adapter.content_kinds());
        self.adapters.push(RefCell::new(adapter));
    }

    /// All registered content-kinds, sorted.
    pub fn content_kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<&'static str> = self.by_kind.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// Evaluates the request's code with the adapter matching its `mimetype`.
    ///
    /// # Arguments
    ///
    /// * `fields` - Decoded request fields (`mimetype`, `code`, `echo`)
    ///
    /// # Returns
    ///
    /// The adapter's [`EvalResult`]; this never fails.
    ///
    /// An unknown or missing content-kind yields an error result carrying the
    /// JSON-serialized message `Unsupported language: <mimetype>`; no adapter
    /// runs in that case.
    pub fn dispatch(&self, fields: &RequestFields) -> EvalResult {
        let mimetype = fields.mimetype().unwrap_or("");

        let Some(&index) = self.by_kind.get(mimetype) else {
            tracing::debug!("No adapter for content-kind {:?}", mimetype);
            return unsupported(mimetype).unwrap_or_else(|e| EvalResult::error(e.to_string()));
        };

        let Ok(mut adapter) = self.adapters[index].try_borrow_mut() else {
            return EvalResult::error("Evaluation already in progress");
        };

        tracing::debug!("Dispatching {} bytes to {}", fields.code().len(), adapter.language());
        adapter.evaluate(fields.code(), fields.echo())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Error result for a content-kind with no adapter; `data` is the
/// JSON-serialized message.
fn unsupported(mimetype: &str) -> Result<EvalResult> {
    let message = PolyevalError::UnsupportedLanguage(mimetype.to_string()).to_string();
    Ok(EvalResult::error(serde_json::to_string(&message)?))
}
