//! In-memory stand-in for a guest runtime, for adapter tests.

use std::collections::HashMap;

use polyeval_common::protocol::error::{PolyevalError, Result};

use crate::runtime::GuestRuntime;

type Responder = Box<dyn FnMut(&HashMap<String, String>, &str) -> Result<String>>;

pub(crate) struct FakeRuntime {
    pub exports: HashMap<String, String>,
    pub evals: Vec<String>,
    responder: Responder,
}

impl FakeRuntime {
    /// Answers every eval through `responder`, which sees the current exports.
    pub fn new(responder: impl FnMut(&HashMap<String, String>, &str) -> Result<String> + 'static) -> Self {
        Self {
            exports: HashMap::new(),
            evals: Vec::new(),
            responder: Box::new(responder),
        }
    }

    /// A runtime whose interpreter cannot be started.
    pub fn unavailable() -> Self {
        Self::new(|_, _| Err(PolyevalError::RuntimeUnavailable("no interpreter".into())))
    }
}

impl GuestRuntime for FakeRuntime {
    fn export(&mut self, name: &str, value: &str) -> Result<()> {
        self.exports.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn eval(&mut self, source: &str) -> Result<String> {
        self.evals.push(source.to_string());
        (self.responder)(&self.exports, source)
    }
}
