//! `musicctl` – drive the Music app through its scripting interface.
//!
//! Every subcommand produces the engine's `CommandResult` envelope, either
//! as human-readable text or as JSON.

mod config;
mod logging;
mod serve;

use clap::{Parser, Subcommand};
use engine::types::*;
use engine::{AppContext, CommandRegistry, CommandResult};
use std::path::{Path, PathBuf};

// ===========================================================================
// CLI definition
// ===========================================================================

#[derive(Parser)]
#[command(
    name = "musicctl",
    version,
    about = "Control the Music app through its scripting interface"
)]
struct Cli {
    /// Extra YAML config file, layered over musicctl.yaml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect environment facts relevant to automation.
    Doctor {
        /// Output as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
        /// Write result JSON to this path.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Invoke a command by name with JSON args.
    Call {
        /// Command name (e.g. "current_track", "set_rating").
        cmd: String,
        /// JSON args to pass to the command.
        #[arg(long, default_value = "{}")]
        args: String,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Directory for artifacts output.
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },

    /// List the registered command names.
    #[command(name = "commands")]
    ListCommands,

    /// Targeted check: automation | target | codec
    Probe {
        target: String,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Directory for artifacts output.
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },

    /// Run a scripted scenario from a YAML file.
    RunScenario {
        /// Path to the scenario YAML file.
        file: PathBuf,
        /// Directory for artifacts output.
        #[arg(long)]
        artifacts: Option<PathBuf>,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Serve requests over a Unix socket, one at a time.
    Serve {
        /// Path for the Unix domain socket.
        #[arg(long)]
        socket: PathBuf,
    },
}

// ===========================================================================
// Main
// ===========================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match config::init_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(2);
        }
    };
    logging::init_logging(cfg);

    let ctx = AppContext::default_platform(cfg.music.clone());
    let registry = CommandRegistry::new();

    match cli.command {
        Commands::Doctor { json, out } => cmd_doctor(json, out, &ctx),
        Commands::Call {
            cmd,
            args,
            json,
            artifacts,
        } => cmd_call(&cmd, &args, json, artifacts, &ctx, &registry).await,
        Commands::ListCommands => {
            for name in registry.list() {
                println!("{}", name);
            }
        }
        Commands::Probe {
            target,
            json,
            artifacts,
        } => cmd_probe(&target, json, artifacts, &ctx).await,
        Commands::RunScenario {
            file,
            artifacts,
            json,
        } => cmd_run_scenario(&file, json, artifacts, &ctx, &registry).await,
        Commands::Serve { socket } => serve::run_daemon(socket, ctx, registry).await,
    }
}

// ===========================================================================
// Subcommand implementations
// ===========================================================================

fn cmd_doctor(json: bool, out: Option<PathBuf>, ctx: &AppContext) {
    let result = engine::doctor::run_doctor(ctx);
    if let Some(ref path) = out {
        write_result_file(path, &result);
    }
    output_result(&result, json);
}

async fn cmd_call(
    cmd: &str,
    args_str: &str,
    json: bool,
    artifacts: Option<PathBuf>,
    ctx: &AppContext,
    registry: &CommandRegistry,
) {
    let args: serde_json::Value = match serde_json::from_str(args_str) {
        Ok(v) => v,
        Err(e) => {
            let r = CommandResult::error(
                "call",
                cmd,
                &new_run_id(),
                0,
                ErrorInfo::new(ErrorCode::InvalidInput, format!("invalid JSON args: {}", e)),
            );
            output_result(&r, json);
            return;
        }
    };

    let result = registry.execute(cmd, args, ctx).await;
    if let Some(ref dir) = artifacts {
        write_artifacts(dir, &result.run_id, &result, std::slice::from_ref(&result));
    }
    output_result(&result, json);
}

async fn cmd_probe(target: &str, json: bool, artifacts: Option<PathBuf>, ctx: &AppContext) {
    let result = engine::probes::run_probe(target, ctx).await;
    if let Some(ref dir) = artifacts {
        write_artifacts(dir, &result.run_id, &result, std::slice::from_ref(&result));
    }
    output_result(&result, json);
}

async fn cmd_run_scenario(
    file: &Path,
    json: bool,
    artifacts: Option<PathBuf>,
    ctx: &AppContext,
    registry: &CommandRegistry,
) {
    let fail = |code: ErrorCode, message: String| {
        let r = CommandResult::error(
            "run-scenario",
            &file.display().to_string(),
            &new_run_id(),
            0,
            ErrorInfo::new(code, message),
        );
        output_result(&r, json);
    };

    let yaml = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => return fail(ErrorCode::InvalidInput, format!("cannot read scenario file: {}", e)),
    };
    let scenario = match engine::scenario::load_scenario(&yaml) {
        Ok(s) => s,
        Err(e) => return fail(ErrorCode::InvalidInput, e),
    };

    let scenario_result = engine::scenario::run_scenario(&scenario, ctx, registry).await;

    if json {
        let j = serde_json::to_string_pretty(&scenario_result).unwrap_or_default();
        println!("{}", j);
    } else {
        println!(
            "Scenario: {}",
            scenario_result.name.as_deref().unwrap_or("<unnamed>")
        );
        println!("Overall: {:?}", scenario_result.overall_status);
        for (i, sr) in scenario_result.step_results.iter().enumerate() {
            println!(
                "  Step {}: {} -> {:?} ({}ms)",
                i, sr.target, sr.status, sr.timing_ms.total
            );
        }
    }

    if let Some(ref dir) = artifacts {
        write_artifacts(
            dir,
            &new_run_id(),
            &scenario_result,
            &scenario_result.step_results,
        );
    }

    exit_for(scenario_result.overall_status);
}

// ===========================================================================
// Output helpers
// ===========================================================================

fn output_result(result: &CommandResult, json: bool) {
    if json {
        let j = serde_json::to_string_pretty(result).unwrap_or_default();
        println!("{}", j);
    } else {
        print_human(result);
    }
    exit_for(result.status);
}

/// Exit non-zero on fail (1) or error (2).
fn exit_for(status: Status) {
    match status {
        Status::Pass | Status::Skip => {}
        Status::Fail => std::process::exit(1),
        Status::Error => std::process::exit(2),
    }
}

fn print_human(r: &CommandResult) {
    let status_icon = match r.status {
        Status::Pass => "PASS",
        Status::Fail => "FAIL",
        Status::Skip => "SKIP",
        Status::Error => "ERROR",
    };

    println!("[{}] {} {}", status_icon, r.command, r.target);
    println!("  run_id: {}", r.run_id);
    println!("  timing: {}ms", r.timing_ms.total);
    for (step, ms) in &r.timing_ms.steps {
        println!("    {}: {}ms", step, ms);
    }

    if let Some(ref err) = r.error {
        println!("  error:  {} – {}", err.code, err.message);
        if let Some(raw) = err.details.get("raw").and_then(|v| v.as_str()) {
            println!("  raw:    {}", raw);
        }
    }

    if let Some(ref data) = r.data {
        if let Ok(s) = serde_json::to_string_pretty(data) {
            for line in s.lines() {
                println!("  {}", line);
            }
        }
    }

    println!(
        "  env: os={} arch={} headless={}",
        r.env_summary.os, r.env_summary.arch, r.env_summary.headless
    );
}

// ===========================================================================
// Artifact helpers
// ===========================================================================

fn write_result_file(path: &Path, result: &CommandResult) {
    let j = serde_json::to_string_pretty(result).unwrap_or_default();
    if let Err(e) = std::fs::write(path, &j) {
        tracing::warn!(path = %path.display(), error = %e, "failed to write result");
    }
}

/// `<dir>/<run_id>/result.json` plus one `events.jsonl` line per step.
fn write_artifacts<T: serde::Serialize>(
    dir: &Path,
    run_id: &str,
    result: &T,
    events: &[CommandResult],
) {
    let art_dir = dir.join(run_id);
    if let Err(e) = std::fs::create_dir_all(&art_dir) {
        tracing::warn!(dir = %art_dir.display(), error = %e, "failed to create artifacts dir");
        return;
    }

    let j = serde_json::to_string_pretty(result).unwrap_or_default();
    let _ = std::fs::write(art_dir.join("result.json"), j);

    let mut lines = String::new();
    for ev in events {
        if let Ok(line) = serde_json::to_string(ev) {
            lines.push_str(&line);
            lines.push('\n');
        }
    }
    let _ = std::fs::write(art_dir.join("events.jsonl"), lines);
}
