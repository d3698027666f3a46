use crate::traits::{ScriptError, ScriptErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Result envelope – the stable output contract of every command and probe
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub run_id: String,
    /// Surface that produced the result: "call", "probe", "doctor".
    pub command: String,
    /// Command or probe name.
    pub target: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    pub timing_ms: TimingInfo,
    pub env_summary: EnvSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pass,
    Fail,
    Skip,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }
}

impl From<&ScriptError> for ErrorInfo {
    fn from(err: &ScriptError) -> Self {
        let code = match err.kind() {
            ScriptErrorKind::Automation => ErrorCode::AutomationFailure,
            ScriptErrorKind::Parse => ErrorCode::ParseFailure,
        };
        Self {
            code,
            message: err.to_string(),
            details: match err.raw() {
                Some(raw) => serde_json::json!({ "raw": raw }),
                None => serde_json::Value::Null,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    Unsupported,
    AutomationFailure,
    ParseFailure,
    ExternalInterference,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        f.write_str(&s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TimingInfo {
    pub total: u64,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub steps: HashMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvSummary {
    pub os: String,
    pub arch: String,
    pub headless: bool,
}

impl Default for EnvSummary {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            headless: detect_headless(),
        }
    }
}

impl CommandResult {
    fn shell(command: &str, target: &str, run_id: &str, total_ms: u64, status: Status) -> Self {
        Self {
            run_id: run_id.to_string(),
            command: command.to_string(),
            target: target.to_string(),
            status,
            error: None,
            timing_ms: TimingInfo {
                total: total_ms,
                steps: HashMap::new(),
            },
            env_summary: EnvSummary::default(),
            data: None,
        }
    }

    /// Successful result; caller fills in `data`.
    pub fn pass(command: &str, target: &str, run_id: &str, total_ms: u64) -> Self {
        Self::shell(command, target, run_id, total_ms, Status::Pass)
    }

    pub fn error(command: &str, target: &str, run_id: &str, total_ms: u64, error: ErrorInfo) -> Self {
        let mut r = Self::shell(command, target, run_id, total_ms, Status::Error);
        r.error = Some(error);
        r
    }

    pub fn skip(
        command: &str,
        target: &str,
        run_id: &str,
        total_ms: u64,
        reason: impl Into<String>,
    ) -> Self {
        let mut r = Self::shell(command, target, run_id, total_ms, Status::Skip);
        r.error = Some(ErrorInfo::new(ErrorCode::Unsupported, reason));
        r
    }
}

// ---------------------------------------------------------------------------
// Doctor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorReport {
    pub os_name: String,
    pub os_version: String,
    pub arch: String,
    pub headless: bool,
    /// Resolved path of `osascript`, if on PATH.
    pub osascript: Option<String>,
    pub automation_available: bool,
    pub target_app: String,
    pub star_value: u32,
    pub library_source: String,
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScenarioStep {
    Call {
        call: String,
        #[serde(default)]
        args: serde_json::Value,
        #[serde(default = "default_expect_status")]
        expect_status: Status,
    },
    Probe {
        probe: String,
    },
}

fn default_expect_status() -> Status {
    Status::Pass
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: Option<String>,
    pub overall_status: Status,
    pub step_results: Vec<CommandResult>,
}

// ---------------------------------------------------------------------------
// Daemon protocol
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonRequest {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CommandResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn detect_headless() -> bool {
    match std::env::consts::OS {
        "linux" => std::env::var("DISPLAY").is_err() && std::env::var("WAYLAND_DISPLAY").is_err(),
        // An SSH session without a forwarded display cannot see the player UI
        "macos" => std::env::var("SSH_TTY").is_ok() && std::env::var("DISPLAY").is_err(),
        _ => false,
    }
}

/// Generate a new run ID (UUIDv4).
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
