//! Command registry and the Music commands it exposes.
//!
//! Commands are registered by name and invoked with JSON input/output.

use crate::context::AppContext;
use crate::track::{Stars, MAX_STARS};
use crate::traits::ScriptError;
use crate::types::*;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, CommandError>> + Send + 'a>>;

/// Signature for all engine commands.
pub type CommandHandler = for<'a> fn(Value, &'a AppContext) -> HandlerFuture<'a>;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Script(#[from] ScriptError),
}

impl CommandError {
    pub fn error_info(&self) -> ErrorInfo {
        match self {
            CommandError::InvalidInput(_) => ErrorInfo::new(ErrorCode::InvalidInput, self.to_string()),
            CommandError::Script(e) => ErrorInfo::from(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct CommandRegistry {
    handlers: HashMap<String, CommandHandler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            handlers: HashMap::new(),
        };
        reg.register("ping", |a, c| Box::pin(cmd_ping(a, c)));
        reg.register("reveal", |a, c| Box::pin(cmd_reveal(a, c)));
        reg.register("love", |a, c| Box::pin(cmd_love(a, c)));
        reg.register("dislike", |a, c| Box::pin(cmd_dislike(a, c)));
        reg.register("add_to_library", |a, c| Box::pin(cmd_add_to_library(a, c)));
        reg.register("get_rating", |a, c| Box::pin(cmd_get_rating(a, c)));
        reg.register("set_rating", |a, c| Box::pin(cmd_set_rating(a, c)));
        reg.register("add_to_playlist", |a, c| Box::pin(cmd_add_to_playlist(a, c)));
        reg.register("current_track", |a, c| Box::pin(cmd_current_track(a, c)));
        reg
    }

    pub fn register(&mut self, name: &str, handler: CommandHandler) {
        self.handlers.insert(name.to_string(), handler);
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    /// Execute a command by name and return a full CommandResult.
    pub async fn execute(&self, name: &str, args: Value, ctx: &AppContext) -> CommandResult {
        let run_id = new_run_id();
        let start = Instant::now();

        let Some(handler) = self.handlers.get(name) else {
            return CommandResult::error(
                "call",
                name,
                &run_id,
                start.elapsed().as_millis() as u64,
                ErrorInfo::new(ErrorCode::InvalidInput, format!("unknown command: {}", name)),
            );
        };

        tracing::debug!(command = name, run_id = %run_id, "executing command");
        match handler(args, ctx).await {
            Ok(data) => {
                let mut r = CommandResult::pass("call", name, &run_id, start.elapsed().as_millis() as u64);
                r.data = Some(data);
                r
            }
            Err(e) => CommandResult::error(
                "call",
                name,
                &run_id,
                start.elapsed().as_millis() as u64,
                e.error_info(),
            ),
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Built-in commands
// ===========================================================================

type CommandOutput = Result<Value, CommandError>;

fn output(text: String) -> Value {
    serde_json::json!({ "output": text })
}

/// `ping` – returns { "pong": true } without touching the runtime.
async fn cmd_ping(_args: Value, _ctx: &AppContext) -> CommandOutput {
    Ok(serde_json::json!({ "pong": true }))
}

async fn cmd_reveal(_args: Value, ctx: &AppContext) -> CommandOutput {
    Ok(output(ctx.music().reveal().await?))
}

async fn cmd_love(_args: Value, ctx: &AppContext) -> CommandOutput {
    Ok(output(ctx.music().love().await?))
}

async fn cmd_dislike(_args: Value, ctx: &AppContext) -> CommandOutput {
    Ok(output(ctx.music().dislike().await?))
}

async fn cmd_add_to_library(_args: Value, ctx: &AppContext) -> CommandOutput {
    Ok(output(ctx.music().add_to_library().await?))
}

/// `get_rating` – returns `{ "stars": 0..5 }`.
async fn cmd_get_rating(_args: Value, ctx: &AppContext) -> CommandOutput {
    let stars = ctx.music().get_rating().await?;
    Ok(serde_json::json!({ "stars": stars }))
}

/// `set_rating` – write a star rating to the current track.
///
/// Args: `{ "stars": 4 }`
/// Returns: `{ "stars": 4, "scaled": 80 }`
async fn cmd_set_rating(args: Value, ctx: &AppContext) -> CommandOutput {
    let value = args
        .get("stars")
        .ok_or_else(|| CommandError::InvalidInput("missing 'stars' field".into()))?;
    let stars = value
        .as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .and_then(Stars::new)
        .ok_or_else(|| {
            CommandError::InvalidInput(format!(
                "'stars' must be an integer in 0..={}, got {}",
                MAX_STARS, value
            ))
        })?;

    ctx.music().set_rating(stars).await?;
    Ok(serde_json::json!({
        "stars": stars,
        "scaled": stars.to_scale(ctx.music_config().star_value),
    }))
}

/// `add_to_playlist` – copy the current track into a named playlist.
///
/// Args: `{ "playlist": "Road Trip" }`
/// Blocks until the app finishes any library duplication it needs.
async fn cmd_add_to_playlist(args: Value, ctx: &AppContext) -> CommandOutput {
    let playlist = args
        .get("playlist")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CommandError::InvalidInput("missing 'playlist' string field".into()))?;

    let out = ctx.music().add_to_playlist(playlist).await?;
    Ok(serde_json::json!({ "playlist": playlist, "output": out }))
}

async fn cmd_current_track(_args: Value, ctx: &AppContext) -> CommandOutput {
    let track = ctx.music().current_track().await?;
    Ok(serde_json::json!(track))
}

// ===========================================================================
// Tests
// ===========================================================================
