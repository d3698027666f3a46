//! Daemon mode – newline-delimited JSON requests over a Unix socket.
//!
//! Connections and requests are handled one at a time, so the target app
//! never sees two scripts at once.

use engine::types::*;
use engine::{AppContext, CommandRegistry};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;

pub async fn run_daemon(socket_path: PathBuf, ctx: AppContext, registry: CommandRegistry) {
    // Remove stale socket if it exists
    let _ = std::fs::remove_file(&socket_path);

    let listener = match UnixListener::bind(&socket_path) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: cannot bind socket {}: {}", socket_path.display(), e);
            std::process::exit(2);
        }
    };

    tracing::info!(socket = %socket_path.display(), "musicctl daemon listening");

    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let (reader, mut writer) = stream.into_split();
                let mut lines = BufReader::new(reader).lines();

                while let Ok(Some(line)) = lines.next_line().await {
                    let response = handle_request(&line, &ctx, &registry).await;
                    let mut resp_json =
                        serde_json::to_string(&response).unwrap_or_else(|_| "{}".into());
                    resp_json.push('\n');
                    if writer.write_all(resp_json.as_bytes()).await.is_err() {
                        break;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "accept error");
            }
        }
    }
}

async fn handle_request(
    line: &str,
    ctx: &AppContext,
    registry: &CommandRegistry,
) -> DaemonResponse {
    let req: DaemonRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            return DaemonResponse {
                id: "unknown".into(),
                result: None,
                error: Some(ErrorInfo::new(
                    ErrorCode::InvalidInput,
                    format!("invalid JSON request: {}", e),
                )),
            };
        }
    };

    let str_param = |key: &str| req.params.get(key).and_then(|v| v.as_str()).unwrap_or("");

    let result = match req.method.as_str() {
        "call" => {
            let args = req
                .params
                .get("args")
                .cloned()
                .unwrap_or(serde_json::Value::Object(Default::default()));
            registry.execute(str_param("cmd"), args, ctx).await
        }
        "probe" => engine::probes::run_probe(str_param("target"), ctx).await,
        "doctor" => engine::doctor::run_doctor(ctx),
        other => {
            return DaemonResponse {
                id: req.id.clone(),
                result: None,
                error: Some(ErrorInfo::new(
                    ErrorCode::InvalidInput,
                    format!("unknown method: {}", other),
                )),
            };
        }
    };

    DaemonResponse {
        id: req.id.clone(),
        result: Some(result),
        error: None,
    }
}
