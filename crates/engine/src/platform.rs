//! Platform implementations of [`ScriptRunner`].
//!
//! - [`OsascriptRunner`]: real AppleScript execution via `osascript`
//! - [`UnsupportedRunner`]: fails every call with an automation failure

use crate::traits::*;
use tokio::process::Command;

// ===========================================================================
// osascript – macOS automation runtime
// ===========================================================================

pub struct OsascriptRunner {
    program: String,
}

impl OsascriptRunner {
    pub fn new() -> Self {
        Self {
            program: "osascript".to_string(),
        }
    }

    /// Use a different executable with the same `-e <script>` contract.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for OsascriptRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ScriptRunner for OsascriptRunner {
    async fn run_script(&self, script: &str) -> ScriptResult<String> {
        let output = Command::new(&self.program)
            .arg("-e")
            .arg(script)
            .output()
            .await
            .map_err(|e| {
                let message = if e.kind() == std::io::ErrorKind::NotFound {
                    format!("{} not found", self.program)
                } else {
                    format!("failed to spawn {}: {}", self.program, e)
                };
                ScriptError::automation(message, Some(e.to_string()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(status = %output.status, stderr = %stderr, "script failed");
            return Err(ScriptError::automation(
                format!("{} exited with {}", self.program, output.status),
                Some(stderr),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn is_available(&self) -> bool {
        which(&self.program).is_some()
    }
}

/// Resolve `program` against `PATH`.
pub fn which(program: &str) -> Option<std::path::PathBuf> {
    let path = std::path::Path::new(program);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }
    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(program))
            .find(|candidate| candidate.is_file())
    })
}

// ===========================================================================
// Unsupported – no automation runtime on this platform
// ===========================================================================

/// Runner for platforms without an automation runtime. Never panics.
pub struct UnsupportedRunner;

#[async_trait::async_trait]
impl ScriptRunner for UnsupportedRunner {
    async fn run_script(&self, _script: &str) -> ScriptResult<String> {
        Err(ScriptError::automation(
            format!(
                "no automation runtime available on {}",
                std::env::consts::OS
            ),
            None,
        ))
    }

    fn is_available(&self) -> bool {
        false
    }
}
