//! Targeted capability probes – automation runtime, target app, query codec.

use crate::context::AppContext;
use crate::query::{create_query_string, parse_query_record, QueryFieldMap};
use crate::traits::{quote_literal, ScriptError};
use crate::types::*;
use std::collections::HashMap;
use std::time::Instant;

pub const PROBES: &[&str] = &["automation", "target", "codec"];

/// Run a probe by name and return a full CommandResult.
pub async fn run_probe(name: &str, ctx: &AppContext) -> CommandResult {
    let run_id = new_run_id();
    if !PROBES.contains(&name) {
        return CommandResult::error(
            "probe",
            name,
            &run_id,
            0,
            ErrorInfo::new(
                ErrorCode::InvalidInput,
                format!("unknown probe: {} (available: {})", name, PROBES.join(", ")),
            ),
        );
    }

    let start = Instant::now();
    if !ctx.runner().is_available() {
        return CommandResult::skip(
            "probe",
            name,
            &run_id,
            start.elapsed().as_millis() as u64,
            "no automation runtime on this host",
        );
    }

    match name {
        "automation" => probe_automation(ctx, &run_id, start).await,
        "target" => probe_target(ctx, &run_id, start).await,
        _ => probe_codec(ctx, &run_id, start).await,
    }
}

fn probe_err(
    target: &str,
    run_id: &str,
    start: Instant,
    steps: HashMap<String, u64>,
    failed_step: &str,
    err: &ScriptError,
) -> CommandResult {
    let mut info = ErrorInfo::from(err);
    info.message = format!("{} probe failed at {}: {}", target, failed_step, err);
    let mut r = CommandResult::error("probe", target, run_id, start.elapsed().as_millis() as u64, info);
    r.timing_ms.steps = steps;
    r
}

// ---------------------------------------------------------------------------
// Automation runtime: a script that only echoes
// ---------------------------------------------------------------------------

async fn probe_automation(ctx: &AppContext, run_id: &str, start: Instant) -> CommandResult {
    let mut steps = HashMap::new();
    let t0 = Instant::now();
    let out = ctx.runner().run_script("return \"ok\"").await;
    steps.insert("echo".into(), t0.elapsed().as_millis() as u64);

    match out {
        Ok(text) if text == "ok" => {
            let mut r = CommandResult::pass("probe", "automation", run_id, start.elapsed().as_millis() as u64);
            r.timing_ms.steps = steps;
            r
        }
        Ok(text) => {
            let mut info = ErrorInfo::new(
                ErrorCode::ExternalInterference,
                "automation runtime echoed unexpected output",
            );
            info.details = serde_json::json!({ "raw": text });
            let mut r = CommandResult::error("probe", "automation", run_id, start.elapsed().as_millis() as u64, info);
            r.timing_ms.steps = steps;
            r
        }
        Err(e) => probe_err("automation", run_id, start, steps, "echo", &e),
    }
}

// ---------------------------------------------------------------------------
// Target app: is it running? (does not launch it)
// ---------------------------------------------------------------------------

async fn probe_target(ctx: &AppContext, run_id: &str, start: Instant) -> CommandResult {
    let mut steps = HashMap::new();
    let app = &ctx.music_config().app_name;
    let script = format!("return application {} is running", quote_literal(app));

    let t0 = Instant::now();
    let out = ctx.runner().run_script(&script).await;
    steps.insert("is_running".into(), t0.elapsed().as_millis() as u64);

    match out {
        Ok(text) => {
            let running = text == "true";
            let mut r = CommandResult::pass("probe", "target", run_id, start.elapsed().as_millis() as u64);
            if !running {
                r.status = Status::Fail;
                r.error = Some(ErrorInfo::new(
                    ErrorCode::AutomationFailure,
                    format!("{} is not running", app),
                ));
            }
            r.timing_ms.steps = steps;
            r.data = Some(serde_json::json!({ "app": app, "running": running }));
            r
        }
        Err(e) => probe_err("target", run_id, start, steps, "is_running", &e),
    }
}

// ---------------------------------------------------------------------------
// Query codec: encode, evaluate in the real runtime, decode
// ---------------------------------------------------------------------------

async fn probe_codec(ctx: &AppContext, run_id: &str, start: Instant) -> CommandResult {
    let mut steps = HashMap::new();
    let expected = [
        ("probeText", "text", "engine codec probe"),
        ("probeNumber", "number", "42"),
        ("probeColon", "colon", "a: b"),
    ];

    let mut fields = QueryFieldMap::new();
    let mut script = String::new();
    for (variable, alias, value) in expected {
        fields = fields.field(variable, alias);
        script.push_str(&format!("set {} to {}\n", variable, quote_literal(value)));
    }
    script.push_str(&format!("return {}", create_query_string(&fields)));

    let t0 = Instant::now();
    let evaluated = ctx.runner().run_script(&script).await;
    steps.insert("evaluate".into(), t0.elapsed().as_millis() as u64);
    let out = match evaluated {
        Ok(out) => out,
        Err(e) => return probe_err("codec", run_id, start, steps, "evaluate", &e),
    };

    let t1 = Instant::now();
    let decoded = parse_query_record(&out);
    steps.insert("decode".into(), t1.elapsed().as_millis() as u64);
    let record = match decoded {
        Ok(record) => record,
        Err(e) => return probe_err("codec", run_id, start, steps, "decode", &e),
    };

    let intact = record.len() == expected.len()
        && expected
            .iter()
            .all(|(_, alias, value)| record.get(alias) == Some(*value));

    let mut r = if intact {
        CommandResult::pass("probe", "codec", run_id, start.elapsed().as_millis() as u64)
    } else {
        let mut info = ErrorInfo::new(
            ErrorCode::ExternalInterference,
            "decoded record does not match encoded values",
        );
        info.details = serde_json::json!({ "raw": out });
        CommandResult::error("probe", "codec", run_id, start.elapsed().as_millis() as u64, info)
    };
    r.timing_ms.steps = steps;
    r.data = Some(serde_json::json!({ "record": record }));
    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::MusicConfig;
    use crate::testing::{evaluate_concat, StubRunner};

    fn ctx_with(stub: StubRunner) -> AppContext {
        AppContext::new(Box::new(stub), MusicConfig::default())
    }

    #[tokio::test]
    async fn test_unknown_probe() {
        let r = run_probe("network", &AppContext::default_headless()).await;
        assert_eq!(r.status, Status::Error);
        assert_eq!(r.error.unwrap().code, ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn test_headless_probe_skips() {
        let r = run_probe("automation", &AppContext::default_headless()).await;
        assert_eq!(r.status, Status::Skip);
    }

    #[tokio::test]
    async fn test_automation_probe() {
        let r = run_probe("automation", &ctx_with(StubRunner::new().respond("ok"))).await;
        assert_eq!(r.status, Status::Pass);
        let r = run_probe("automation", &ctx_with(StubRunner::new().respond("nope"))).await;
        assert_eq!(r.error.unwrap().code, ErrorCode::ExternalInterference);
    }

    #[tokio::test]
    async fn test_target_probe_not_running_fails() {
        let r = run_probe("target", &ctx_with(StubRunner::new().respond("false"))).await;
        assert_eq!(r.status, Status::Fail);
        assert_eq!(r.data.unwrap()["running"], false);
    }

    #[tokio::test]
    async fn test_codec_probe_round_trip() {
        // Evaluate the probe script the way the runtime would.
        let stub = StubRunner::with_handler(|script| {
            let mut bindings = std::collections::HashMap::new();
            let mut expr = "";
            for line in script.lines() {
                if let Some(rest) = line.strip_prefix("set ") {
                    let (var, lit) = rest.split_once(" to ").unwrap();
                    bindings.insert(var, lit.trim_matches('"'));
                } else if let Some(rest) = line.strip_prefix("return ") {
                    expr = rest;
                }
            }
            Ok(evaluate_concat(expr, &bindings))
        });
        let r = run_probe("codec", &ctx_with(stub)).await;
        assert_eq!(r.status, Status::Pass, "{:?}", r.error);
        assert_eq!(r.data.unwrap()["record"]["colon"], "a: b");
    }

    #[tokio::test]
    async fn test_codec_failure_keeps_step_timing() {
        let r = run_probe("codec", &ctx_with(StubRunner::new().fail("runtime gone"))).await;
        assert_eq!(r.status, Status::Error);
        assert!(r.timing_ms.steps.contains_key("evaluate"));

        let r = run_probe("codec", &ctx_with(StubRunner::new().respond("garbage"))).await;
        assert!(r.timing_ms.steps.contains_key("evaluate"));
        assert!(r.timing_ms.steps.contains_key("decode"));
    }

    #[tokio::test]
    async fn test_codec_probe_decode_failure() {
        let r = run_probe("codec", &ctx_with(StubRunner::new().respond("garbage"))).await;
        assert_eq!(r.status, Status::Error);
        assert_eq!(r.error.unwrap().code, ErrorCode::ParseFailure);
    }
}
