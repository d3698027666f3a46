//! Capability traits the engine talks to the outside world through.

/// Result type for every automation round trip.
pub type ScriptResult<T> = Result<T, ScriptError>;

/// Coarse classification of a [`ScriptError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptErrorKind {
    Automation,
    Parse,
}

/// Failure of a script round trip.
///
/// `Automation` covers anything the automation runtime or the target
/// application reported (not running, permission denied, script error,
/// missing playlist). `Parse` means the runtime succeeded but its output
/// did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("automation failure: {message}")]
    Automation {
        message: String,
        raw: Option<String>,
    },

    #[error("parse failure: {message}")]
    Parse {
        message: String,
        raw: Option<String>,
    },
}

impl ScriptError {
    pub fn automation(message: impl Into<String>, raw: Option<String>) -> Self {
        ScriptError::Automation {
            message: message.into(),
            raw,
        }
    }

    pub fn parse(message: impl Into<String>, raw: impl Into<String>) -> Self {
        ScriptError::Parse {
            message: message.into(),
            raw: Some(raw.into()),
        }
    }

    pub fn kind(&self) -> ScriptErrorKind {
        match self {
            ScriptError::Automation { .. } => ScriptErrorKind::Automation,
            ScriptError::Parse { .. } => ScriptErrorKind::Parse,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ScriptError::Automation { message, .. } | ScriptError::Parse { message, .. } => message,
        }
    }

    /// Raw diagnostic text from the runtime, or the offending output.
    pub fn raw(&self) -> Option<&str> {
        match self {
            ScriptError::Automation { raw, .. } | ScriptError::Parse { raw, .. } => raw.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Script execution
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Execute `script` and return its trimmed standard output.
    ///
    /// Blocks for as long as the script runs; there is no timeout and no
    /// retry at this layer.
    async fn run_script(&self, script: &str) -> ScriptResult<String>;

    /// Whether this runner can reach a real automation runtime at all.
    fn is_available(&self) -> bool {
        true
    }
}

/// Direct `app` to run `command` and return the runtime's output.
pub async fn tell(runner: &dyn ScriptRunner, app: &str, command: &str) -> ScriptResult<String> {
    let script = format!(
        "tell application {}\n{}\nend tell",
        quote_literal(app),
        command.trim_end()
    );
    tracing::debug!(app, bytes = script.len(), "dispatching tell script");
    runner.run_script(&script).await
}

/// Render `value` as a double-quoted AppleScript string literal.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
