//! Doctor – gather environment facts for diagnostics.

use crate::context::AppContext;
use crate::platform::which;
use crate::types::*;
use std::time::Instant;

/// Run the doctor check and return a full report as a CommandResult.
pub fn run_doctor(ctx: &AppContext) -> CommandResult {
    let run_id = new_run_id();
    let start = Instant::now();

    let report = gather_report(ctx);

    let mut r = CommandResult::pass("doctor", "env", &run_id, start.elapsed().as_millis() as u64);
    r.data = Some(serde_json::json!(report));
    r
}

fn gather_report(ctx: &AppContext) -> DoctorReport {
    let music = ctx.music_config();
    DoctorReport {
        os_name: std::env::consts::OS.to_string(),
        os_version: os_version(),
        arch: std::env::consts::ARCH.to_string(),
        headless: detect_headless(),
        osascript: which("osascript").map(|p| p.display().to_string()),
        automation_available: ctx.runner().is_available(),
        target_app: music.app_name.clone(),
        star_value: music.star_value,
        library_source: music.library_source.clone(),
    }
}

fn os_version() -> String {
    #[cfg(target_os = "macos")]
    {
        run_cmd("sw_vers", &["-productVersion"]).unwrap_or_else(|| "unknown".into())
    }
    #[cfg(target_os = "linux")]
    {
        if let Ok(content) = std::fs::read_to_string("/etc/os-release") {
            for line in content.lines() {
                if let Some(ver) = line.strip_prefix("PRETTY_NAME=") {
                    return ver.trim_matches('"').to_string();
                }
            }
        }
        "unknown".to_string()
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        "unknown".to_string()
    }
}

#[cfg(target_os = "macos")]
fn run_cmd(cmd: &str, args: &[&str]) -> Option<String> {
    std::process::Command::new(cmd)
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
}
