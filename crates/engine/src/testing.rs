//! Test doubles for the automation runtime.

use crate::traits::{ScriptError, ScriptResult, ScriptRunner};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

type Handler = Box<dyn Fn(&str) -> ScriptResult<String> + Send + Sync>;

/// Runner that replays queued responses (or a handler) and records every
/// script it receives.
#[derive(Default)]
pub struct StubRunner {
    queue: Mutex<VecDeque<ScriptResult<String>>>,
    handler: Option<Handler>,
    seen: Mutex<Vec<String>>,
}

impl StubRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(f: impl Fn(&str) -> ScriptResult<String> + Send + Sync + 'static) -> Self {
        Self {
            handler: Some(Box::new(f)),
            ..Self::default()
        }
    }

    pub fn respond(self, text: &str) -> Self {
        self.queue.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, raw: &str) -> Self {
        self.queue
            .lock()
            .unwrap()
            .push_back(Err(ScriptError::automation("osascript exited with 1", Some(raw.to_string()))));
        self
    }

    pub fn scripts(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ScriptRunner for StubRunner {
    async fn run_script(&self, script: &str) -> ScriptResult<String> {
        self.seen.lock().unwrap().push(script.to_string());
        if let Some(ref handler) = self.handler {
            return handler(script);
        }
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ScriptError::automation("stub has no scripted response", None)))
    }
}

/// Evaluate a `"literal" & variable & ...` concatenation the way the
/// automation runtime would, resolving variables from `bindings`.
pub fn evaluate_concat(expr: &str, bindings: &HashMap<&str, &str>) -> String {
    expr.split(" & ")
        .map(|term| {
            let term = term.trim();
            match term.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
                Some(lit) => lit.replace("\\\"", "\"").replace("\\\\", "\\"),
                None => bindings
                    .get(term)
                    .unwrap_or_else(|| panic!("unbound variable {}", term))
                    .to_string(),
            }
        })
        .collect()
}
